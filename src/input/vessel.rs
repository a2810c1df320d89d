//! Code for reading the vessels CSV file.
use super::*;
use crate::id::IDCollection;
use crate::units::{Hours, MoneyPerDay, Tonnes, TonnesPerDay};
use crate::vessel::{Vessel, VesselMap};
use anyhow::ensure;
use serde::Deserialize;

const VESSELS_FILE_NAME: &str = "vessels.csv";

/// A row of the vessels CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct VesselRaw {
    id: String,
    capacity_t: Tonnes,
    charter_rate_per_day: MoneyPerDay,
    fuel_burn_t_per_day: TonnesPerDay,
    monthly_time_budget_hours: Option<Hours>,
}

/// Read vessels from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `parameters` - Model parameters, which supply the default time budget
///
/// # Returns
///
/// A map of vessels, in the order in which they appear in the file
pub fn read_vessels(model_dir: &Path, parameters: &ModelParameters) -> Result<VesselMap> {
    let file_path = model_dir.join(VESSELS_FILE_NAME);
    let vessels_csv = read_csv(&file_path)?;
    read_vessels_from_iter(vessels_csv, parameters.default_time_budget)
        .with_context(|| input_err_msg(&file_path))
}

fn read_vessels_from_iter<I>(iter: I, default_time_budget: Hours) -> Result<VesselMap>
where
    I: Iterator<Item = VesselRaw>,
{
    let mut vessels = VesselMap::new();
    for raw in iter {
        ensure!(
            vessels.get_id(&raw.id).is_err(),
            "Duplicate vessel ID {}",
            raw.id
        );

        let vessel = Vessel {
            id: raw.id.into(),
            capacity: raw.capacity_t,
            charter_rate: raw.charter_rate_per_day,
            fuel_burn: raw.fuel_burn_t_per_day,
            time_budget: raw.monthly_time_budget_hours.unwrap_or(default_time_budget),
        };
        vessel.validate()?;
        vessels.insert(vessel.id.clone(), vessel);
    }

    Ok(vessels)
}
