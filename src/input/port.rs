//! Code for reading the ports CSV file.
use super::*;
use crate::error::PlanningError;
use crate::id::IDCollection;
use crate::port::{Port, PortMap, PortRole};
use crate::units::{Money, Tonnes};
use anyhow::ensure;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

const PORTS_FILE_NAME: &str = "ports.csv";

/// The role column of the ports CSV file
#[derive(PartialEq, Debug, Clone, Copy, DeserializeLabeledStringEnum)]
enum PortRoleRaw {
    #[string = "loading"]
    Loading,
    #[string = "unloading"]
    Unloading,
}

/// A row of the ports CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct PortRaw {
    id: String,
    role: PortRoleRaw,
    demand_t: Option<Tonnes>,
    handling_charge: Option<Money>,
}

/// Read ports from a CSV file.
///
/// Ports without a handling charge take the default for their role from the model parameters.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `parameters` - Model parameters
///
/// # Returns
///
/// A map of ports, in the order in which they appear in the file
pub fn read_ports(model_dir: &Path, parameters: &ModelParameters) -> Result<PortMap> {
    let file_path = model_dir.join(PORTS_FILE_NAME);
    let ports_csv = read_csv(&file_path)?;
    read_ports_from_iter(ports_csv, parameters).with_context(|| input_err_msg(&file_path))
}

fn read_ports_from_iter<I>(iter: I, parameters: &ModelParameters) -> Result<PortMap>
where
    I: Iterator<Item = PortRaw>,
{
    let mut ports = PortMap::new();
    for raw in iter {
        ensure!(
            ports.get_id(&raw.id).is_err(),
            "Duplicate port ID {}",
            raw.id
        );

        let (role, default_charge) = match (raw.role, raw.demand_t) {
            (PortRoleRaw::Loading, None) => {
                (PortRole::Loading, parameters.default_loading_port_charge)
            }
            (PortRoleRaw::Loading, Some(_)) => Err(PlanningError::invalid(
                format!("demand_t of {}", raw.id),
                "cannot be given for loading ports",
            ))?,
            (PortRoleRaw::Unloading, Some(demand)) => (
                PortRole::Unloading { demand },
                parameters.default_unloading_port_charge,
            ),
            (PortRoleRaw::Unloading, None) => Err(PlanningError::invalid(
                format!("demand_t of {}", raw.id),
                "is required for unloading ports",
            ))?,
        };

        let port = Port {
            id: raw.id.into(),
            role,
            handling_charge: raw.handling_charge.unwrap_or(default_charge),
        };
        port.validate()?;
        ports.insert(port.id.clone(), port);
    }

    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_macro::hash_map;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_ports() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PORTS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,role,demand_t,handling_charge
L1,loading,,
U1,unloading,40000,
U2,unloading,0,2500"
            )
            .unwrap();
        }

        let ports = read_ports(dir.path(), &ModelParameters::default()).unwrap();
        assert_eq!(ports.len(), 3);
        assert_eq!(ports["L1"].role, PortRole::Loading);
        assert_eq!(ports["U1"].demand(), Tonnes(40_000.0));
        assert_eq!(ports["U2"].demand(), Tonnes(0.0));

        // Missing charges take the default for the port's role
        let charges: HashMap<_, _> = ports
            .values()
            .map(|port| (port.id.to_string(), port.handling_charge))
            .collect();
        assert_eq!(
            charges,
            hash_map! {
                "L1".to_string() => Money(100_000.0),
                "U1".to_string() => Money(80_000.0),
                "U2".to_string() => Money(2_500.0),
            }
        );
    }

    #[rstest]
    #[case(PortRoleRaw::Loading, Some(10.0), "cannot be given for loading ports")]
    #[case(PortRoleRaw::Unloading, None, "is required for unloading ports")]
    fn test_read_ports_bad_demand(
        #[case] role: PortRoleRaw,
        #[case] demand: Option<f64>,
        #[case] reason: &str,
    ) {
        let raw = PortRaw {
            id: "P1".into(),
            role,
            demand_t: demand.map(Tonnes),
            handling_charge: None,
        };
        let err = read_ports_from_iter([raw].into_iter(), &ModelParameters::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanningError>(),
            Some(&PlanningError::invalid("demand_t of P1", reason))
        );
    }

    #[test]
    fn test_read_ports_negative_demand() {
        let raw = PortRaw {
            id: "U1".into(),
            role: PortRoleRaw::Unloading,
            demand_t: Some(Tonnes(-5.0)),
            handling_charge: None,
        };
        assert!(read_ports_from_iter([raw].into_iter(), &ModelParameters::default()).is_err());
    }

    #[test]
    fn test_read_ports_duplicate() {
        let raw = || PortRaw {
            id: "L1".into(),
            role: PortRoleRaw::Loading,
            demand_t: None,
            handling_charge: None,
        };
        let err = read_ports_from_iter([raw(), raw()].into_iter(), &ModelParameters::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate port ID L1");
    }
}
