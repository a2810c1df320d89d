//! Fixtures for tests

use crate::model::{Model, ModelParameters};
use crate::port::{Port, PortMap, PortRole};
use crate::sailing::SailingTimeTable;
use crate::units::{Hours, Money, MoneyPerDay, MoneyPerTonne, Tonnes, TonnesPerDay};
use crate::vessel::{Vessel, VesselMap};
use indexmap::indexmap;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn vessel() -> Vessel {
    Vessel {
        id: "T1".into(),
        capacity: Tonnes(50_000.0),
        charter_rate: MoneyPerDay(24_000.0),
        fuel_burn: TonnesPerDay(24.0),
        time_budget: Hours(720.0),
    }
}

#[fixture]
pub fn vessels(vessel: Vessel) -> VesselMap {
    indexmap! { vessel.id.clone() => vessel }
}

#[fixture]
pub fn ports() -> PortMap {
    [
        Port {
            id: "L1".into(),
            role: PortRole::Loading,
            handling_charge: Money(1_000.0),
        },
        Port {
            id: "U1".into(),
            role: PortRole::Unloading {
                demand: Tonnes(40_000.0),
            },
            handling_charge: Money(500.0),
        },
        Port {
            id: "U2".into(),
            role: PortRole::Unloading {
                demand: Tonnes(20_000.0),
            },
            handling_charge: Money(500.0),
        },
    ]
    .into_iter()
    .map(|port| (port.id.clone(), port))
    .collect()
}

#[fixture]
pub fn sailing_times() -> SailingTimeTable {
    [
        ("L1", "U1", 12.0),
        ("L1", "U2", 24.0),
        ("U1", "U2", 6.0),
        ("U2", "U1", 6.0),
        ("U1", "L1", 12.0),
        ("U2", "L1", 24.0),
    ]
    .into_iter()
    .map(|(from, to, hours)| (from.into(), to.into(), Hours(hours)))
    .collect()
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        fuel_price: MoneyPerTonne(500.0),
        ..ModelParameters::default()
    }
}

#[fixture]
pub fn model(
    model_parameters: ModelParameters,
    vessels: VesselMap,
    ports: PortMap,
    sailing_times: SailingTimeTable,
) -> Model {
    Model {
        model_path: PathBuf::new(),
        parameters: model_parameters,
        vessels,
        ports,
        sailing_times,
    }
}
