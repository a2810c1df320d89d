//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::error::PlanningError;
use crate::input::{input_err_msg, read_toml};
use crate::units::{Hours, Money, MoneyPerTonne, Tonnes};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::path::Path;
use std::time::Duration;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// The longest solve time which can be requested (one week)
const MAX_SOLVE_TIME_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_fuel_price, MoneyPerTonne, 45_000.0);
define_unit_param_default!(default_time_budget, Hours, 720.0);
define_unit_param_default!(default_loading_service_time, Hours, 6.0);
define_unit_param_default!(default_unloading_service_time, Hours, 4.0);
define_unit_param_default!(default_loading_port_charge, Money, 100_000.0);
define_unit_param_default!(default_unloading_port_charge, Money, 80_000.0);
define_unit_param_default!(default_min_split_leg, Tonnes, 1_000.0);
define_param_default!(default_max_voyages_per_vessel, u32, 10);
define_param_default!(default_co2_per_tonne_fuel, f64, 3.114);
define_param_default!(default_max_solve_time_seconds, f64, 300.0);
define_param_default!(default_workers, u32, 4);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The price of bunker fuel
    #[serde(default = "default_fuel_price", rename = "fuel_price_per_tonne")]
    pub fuel_price: MoneyPerTonne,
    /// The quantity which the optimisation minimises
    #[serde(default)]
    pub objective: ObjectiveKind,
    /// Whether voyage durations include the return leg to the loading port
    #[serde(default)]
    pub round_trip: bool,
    /// Time budget for vessels which don't specify their own
    #[serde(default = "default_time_budget", rename = "default_time_budget_hours")]
    pub default_time_budget: Hours,
    /// Time spent loading at the start of each voyage
    #[serde(
        default = "default_loading_service_time",
        rename = "loading_service_hours"
    )]
    pub loading_service_time: Hours,
    /// Time spent at each discharge port
    #[serde(
        default = "default_unloading_service_time",
        rename = "unloading_service_hours"
    )]
    pub unloading_service_time: Hours,
    /// Handling charge for loading ports which don't specify their own
    #[serde(default = "default_loading_port_charge")]
    pub default_loading_port_charge: Money,
    /// Handling charge for unloading ports which don't specify their own
    #[serde(default = "default_unloading_port_charge")]
    pub default_unloading_port_charge: Money,
    /// The maximum number of voyages a vessel can make in the month
    #[serde(default = "default_max_voyages_per_vessel")]
    pub max_voyages_per_vessel: u32,
    /// The least cargo which can be discharged at each port of a split voyage
    #[serde(default = "default_min_split_leg", rename = "min_split_leg_tonnes")]
    pub min_split_leg: Tonnes,
    /// Tonnes of CO2 emitted per tonne of fuel burnt
    #[serde(default = "default_co2_per_tonne_fuel")]
    pub co2_per_tonne_fuel: f64,
    /// Whether missing reverse entries in the sailing time table are filled from the forward ones
    #[serde(default)]
    pub symmetric_sailing_times: bool,
    /// Options for the solver
    #[serde(default)]
    pub solver: SolverParameters,
}

/// The `[solver]` section of the model file
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SolverParameters {
    /// Wall-clock limit for the solver
    #[serde(default = "default_max_solve_time_seconds")]
    pub max_solve_time_seconds: f64,
    /// The number of threads the solver may use
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Seed for the solver's random number generator
    #[serde(default)]
    pub random_seed: u32,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            max_solve_time_seconds: default_max_solve_time_seconds(),
            workers: default_workers(),
            random_seed: 0,
        }
    }
}

impl SolverParameters {
    /// The time limit as a [`Duration`]
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.max_solve_time_seconds)
    }
}

/// The quantity minimised by the assignment model
#[derive(
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
)]
pub enum ObjectiveKind {
    /// Total charter, port and fuel cost
    #[default]
    #[string = "cost"]
    Cost,
    /// Total time spent on voyages
    #[string = "time"]
    Time,
    /// Total CO2 emitted
    #[string = "emissions"]
    Emissions,
    /// Number of voyages, which favours fewer, fuller voyages
    #[string = "utilisation"]
    #[alias = "utilization"]
    Utilisation,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            fuel_price: default_fuel_price(),
            objective: ObjectiveKind::default(),
            round_trip: false,
            default_time_budget: default_time_budget(),
            loading_service_time: default_loading_service_time(),
            unloading_service_time: default_unloading_service_time(),
            default_loading_port_charge: default_loading_port_charge(),
            default_unloading_port_charge: default_unloading_port_charge(),
            max_voyages_per_vessel: default_max_voyages_per_vessel(),
            min_split_leg: default_min_split_leg(),
            co2_per_tonne_fuel: default_co2_per_tonne_fuel(),
            symmetric_sailing_times: false,
            solver: SolverParameters::default(),
        }
    }
}

/// Check that a parameter is a finite number greater than zero
fn check_positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        Err(PlanningError::invalid(
            field,
            "must be a finite number greater than zero",
        ))?;
    }

    Ok(())
}

/// Check that a parameter is a finite number which is not negative
fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        Err(PlanningError::invalid(
            field,
            "must be a finite, non-negative number",
        ))?;
    }

    Ok(())
}

/// Check that a count parameter is not zero
fn check_nonzero_count(field: &str, value: u32) -> Result<()> {
    if value == 0 {
        Err(PlanningError::invalid(field, "cannot be zero"))?;
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        check_positive("fuel_price_per_tonne", self.fuel_price.value())?;
        check_positive(
            "default_time_budget_hours",
            self.default_time_budget.value(),
        )?;
        check_non_negative("loading_service_hours", self.loading_service_time.value())?;
        check_non_negative(
            "unloading_service_hours",
            self.unloading_service_time.value(),
        )?;
        check_non_negative(
            "default_loading_port_charge",
            self.default_loading_port_charge.value(),
        )?;
        check_non_negative(
            "default_unloading_port_charge",
            self.default_unloading_port_charge.value(),
        )?;
        check_nonzero_count("max_voyages_per_vessel", self.max_voyages_per_vessel)?;
        check_non_negative("min_split_leg_tonnes", self.min_split_leg.value())?;
        check_non_negative("co2_per_tonne_fuel", self.co2_per_tonne_fuel)?;
        check_positive(
            "solver.max_solve_time_seconds",
            self.solver.max_solve_time_seconds,
        )?;
        if self.solver.max_solve_time_seconds > MAX_SOLVE_TIME_SECONDS {
            Err(PlanningError::invalid(
                "solver.max_solve_time_seconds",
                format!("cannot exceed {MAX_SOLVE_TIME_SECONDS} seconds"),
            ))?;
        }
        check_nonzero_count("solver.workers", self.solver.workers)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_parameters() {
        let params = ModelParameters::default();
        assert_eq!(params.fuel_price, MoneyPerTonne(45_000.0));
        assert_eq!(params.objective, ObjectiveKind::Cost);
        assert!(!params.round_trip);
        assert_eq!(params.default_time_budget, Hours(720.0));
        assert_eq!(params.max_voyages_per_vessel, 10);
        assert_eq!(params.solver, SolverParameters::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "fuel_price_per_tonne = 50000.0
objective = \"emissions\"
round_trip = true

[solver]
max_solve_time_seconds = 60.0
workers = 8"
            )
            .unwrap();
        }

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.fuel_price, MoneyPerTonne(50_000.0));
        assert_eq!(params.objective, ObjectiveKind::Emissions);
        assert!(params.round_trip);
        assert_eq!(params.solver.time_limit(), Duration::from_secs(60));
        assert_eq!(params.solver.workers, 8);
        assert_eq!(params.solver.random_seed, 0);
    }

    #[test]
    fn test_model_params_from_path_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "fuel_price_per_tonne = -1.0").unwrap();
        }

        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanningError>(),
            Some(&PlanningError::invalid(
                "fuel_price_per_tonne",
                "must be a finite number greater than zero"
            ))
        );
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(1e-10, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_positive(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_positive("x", value).is_ok(), expected_valid);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(5.0, true)]
    #[case(-1e-10, false)]
    #[case(f64::NAN, false)]
    fn test_check_non_negative(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_non_negative("x", value).is_ok(), expected_valid);
    }

    #[rstest]
    #[case(60.0, true)]
    #[case(MAX_SOLVE_TIME_SECONDS, true)]
    #[case(MAX_SOLVE_TIME_SECONDS + 1.0, false)]
    #[case(1e30, false)]
    fn test_validate_max_solve_time(#[case] seconds: f64, #[case] expected_valid: bool) {
        let mut params = ModelParameters::default();
        params.solver.max_solve_time_seconds = seconds;
        assert_eq!(params.validate().is_ok(), expected_valid);
        if expected_valid {
            assert_eq!(params.solver.time_limit(), Duration::from_secs_f64(seconds));
        }
    }

    #[test]
    fn test_validate_huge_solve_time_message() {
        let mut params = ModelParameters::default();
        params.solver.max_solve_time_seconds = 1e30;
        assert_eq!(
            params.validate().unwrap_err().downcast_ref::<PlanningError>(),
            Some(&PlanningError::invalid(
                "solver.max_solve_time_seconds",
                "cannot exceed 604800 seconds"
            ))
        );
    }

    #[rstest]
    #[case("cost", ObjectiveKind::Cost)]
    #[case("utilisation", ObjectiveKind::Utilisation)]
    #[case("utilization", ObjectiveKind::Utilisation)]
    fn test_objective_kind_from_toml(#[case] name: &str, #[case] expected: ObjectiveKind) {
        let params: ModelParameters = toml::from_str(&format!("objective = \"{name}\"")).unwrap();
        assert_eq!(params.objective, expected);
    }

    #[test]
    fn test_objective_kind_display() {
        assert_eq!(ObjectiveKind::Cost.to_string(), "cost");
        assert_eq!(ObjectiveKind::Utilisation.to_string(), "utilisation");
    }
}
