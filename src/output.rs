//! The module responsible for writing output data to disk.
use crate::costing::CostedPatterns;
use crate::diagnostics::{InfeasibilityReport, UnderservedPort};
use crate::model::Model;
use crate::pattern::VoyagePattern;
use crate::planner::{Plan, PlanOutcome};
use crate::port::PortID;
use crate::result::{PlanResult, PortDelivery, Trip, VesselUtilisation};
use crate::units::{Hours, Money, Tonnes};
use crate::vessel::VesselID;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "fleetplan_results";

/// The output file name for the plan summary
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// The output file name for trips
const TRIPS_FILE_NAME: &str = "trips.csv";

/// The output file name for vessel utilisation
const VESSEL_UTILISATION_FILE_NAME: &str = "vessel_utilisation.csv";

/// The output file name for port deliveries
const PORT_DELIVERIES_FILE_NAME: &str = "port_deliveries.csv";

/// The output file name for the infeasibility report
const INFEASIBILITY_FILE_NAME: &str = "infeasibility.toml";

/// The output file name for under-served ports
const UNDERSERVED_PORTS_FILE_NAME: &str = "underserved_ports.csv";

/// The output file name for costed patterns
const COSTED_PATTERNS_FILE_NAME: &str = "debug_costed_patterns.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, emptying it first if it exists and `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing, non-empty directory is being overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the trips CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TripRow {
    trip_number: usize,
    vessel_id: VesselID,
    loading_port: PortID,
    discharge_port_1: PortID,
    volume_1: Tonnes,
    discharge_port_2: Option<PortID>,
    volume_2: Option<Tonnes>,
    total_cargo: Tonnes,
    duration_hours: Hours,
    fuel_t: Tonnes,
    emissions_t: Tonnes,
    charter_cost: Money,
    port_charges: Money,
    fuel_cost: Money,
    total_cost: Money,
}

impl TripRow {
    fn new(trip_number: usize, trip: &Trip) -> Self {
        let first = &trip.deliveries[0];
        let second = trip.deliveries.get(1);
        Self {
            trip_number,
            vessel_id: trip.vessel_id.clone(),
            loading_port: trip.loading_port.clone(),
            discharge_port_1: first.port_id.clone(),
            volume_1: first.volume,
            discharge_port_2: second.map(|delivery| delivery.port_id.clone()),
            volume_2: second.map(|delivery| delivery.volume),
            total_cargo: trip.cargo(),
            duration_hours: trip.duration,
            fuel_t: trip.fuel,
            emissions_t: trip.emissions,
            charter_cost: trip.charter_cost,
            port_charges: trip.port_charges,
            fuel_cost: trip.fuel_cost,
            total_cost: trip.total_cost,
        }
    }
}

/// Represents a row in the vessel utilisation CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct VesselUtilisationRow {
    vessel_id: VesselID,
    trips: usize,
    used_hours: Hours,
    time_budget_hours: Hours,
    utilisation_percentage: f64,
}

impl From<&VesselUtilisation> for VesselUtilisationRow {
    fn from(utilisation: &VesselUtilisation) -> Self {
        Self {
            vessel_id: utilisation.vessel_id.clone(),
            trips: utilisation.trips,
            used_hours: utilisation.used_hours,
            time_budget_hours: utilisation.time_budget,
            utilisation_percentage: utilisation.utilisation_percentage,
        }
    }
}

/// Represents a row in the port deliveries CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PortDeliveryRow {
    port_id: PortID,
    demand_t: Tonnes,
    delivered_t: Tonnes,
}

impl From<&PortDelivery> for PortDeliveryRow {
    fn from(delivery: &PortDelivery) -> Self {
        Self {
            port_id: delivery.port_id.clone(),
            demand_t: delivery.demand,
            delivered_t: delivery.delivered,
        }
    }
}

/// Represents a row in the under-served ports CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct UnderservedPortRow {
    rank: usize,
    port_id: PortID,
    demand_t: Tonnes,
    estimated_shortfall_t: Tonnes,
    unreachable: bool,
}

impl UnderservedPortRow {
    fn new(rank: usize, port: &UnderservedPort) -> Self {
        Self {
            rank,
            port_id: port.port_id.clone(),
            demand_t: port.demand,
            estimated_shortfall_t: port.estimated_shortfall,
            unreachable: port.unreachable,
        }
    }
}

/// Represents a row in the costed patterns CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CostedPatternRow {
    vessel_id: VesselID,
    pattern: String,
    sailing_hours: Hours,
    duration_hours: Hours,
    fuel_t: Tonnes,
    emissions_t: Tonnes,
    charter_cost: Money,
    port_charges: Money,
    fuel_cost: Money,
    total_cost: Money,
}

/// Write a sequence of rows to a new CSV file
fn write_csv<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a value to a new TOML file
fn write_toml<T: Serialize>(file_path: &Path, value: &T) -> Result<()> {
    fs::write(file_path, toml::to_string(value)?)
        .with_context(|| format!("Could not write {}", file_path.display()))
}

/// Write the summary, trips, vessel utilisation and port deliveries of a plan
pub fn write_plan_result(output_path: &Path, result: &PlanResult) -> Result<()> {
    write_toml(&output_path.join(SUMMARY_FILE_NAME), &result.summary)?;
    write_csv(
        &output_path.join(TRIPS_FILE_NAME),
        result
            .trips
            .iter()
            .enumerate()
            .map(|(idx, trip)| TripRow::new(idx + 1, trip)),
    )?;
    write_csv(
        &output_path.join(VESSEL_UTILISATION_FILE_NAME),
        result.vessel_utilisation.iter().map(VesselUtilisationRow::from),
    )?;
    write_csv(
        &output_path.join(PORT_DELIVERIES_FILE_NAME),
        result.port_deliveries.iter().map(PortDeliveryRow::from),
    )
}

/// Write the explanation of why no plan was found
pub fn write_infeasibility_report(output_path: &Path, report: &InfeasibilityReport) -> Result<()> {
    write_toml(&output_path.join(INFEASIBILITY_FILE_NAME), report)?;
    write_csv(
        &output_path.join(UNDERSERVED_PORTS_FILE_NAME),
        report
            .underserved_ports
            .iter()
            .enumerate()
            .map(|(idx, port)| UnderservedPortRow::new(idx + 1, port)),
    )
}

/// Write every costed pattern, for debugging the model
pub fn write_costed_patterns(
    output_path: &Path,
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
) -> Result<()> {
    let rows = costed_patterns.iter().map(|(_, costed)| CostedPatternRow {
        vessel_id: model.vessels[costed.vessel_idx].id.clone(),
        pattern: patterns[costed.pattern_idx].to_string(),
        sailing_hours: Hours(costed.sailing_time.to_f64()),
        duration_hours: costed.duration_hours(),
        fuel_t: costed.fuel_tonnes(),
        emissions_t: costed.emissions_tonnes(),
        charter_cost: Money(costed.cost.charter.to_f64()),
        port_charges: Money(costed.cost.port_charges.to_f64()),
        fuel_cost: Money(costed.cost.fuel.to_f64()),
        total_cost: costed.total_cost(),
    });

    write_csv(&output_path.join(COSTED_PATTERNS_FILE_NAME), rows)
}

/// Write every output file for a planning run
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `model` - The model which was planned
/// * `plan` - The outcome of the run
/// * `debug_model` - Whether to include the costed patterns
pub fn write_plan(output_path: &Path, model: &Model, plan: &Plan, debug_model: bool) -> Result<()> {
    match &plan.outcome {
        PlanOutcome::Solved(result) => write_plan_result(output_path, result)?,
        PlanOutcome::Unsolved(report) => write_infeasibility_report(output_path, report)?,
    }

    if debug_model {
        write_costed_patterns(output_path, model, &plan.patterns, &plan.costed_patterns)?;
    }

    Ok(())
}
