//! The model represents the static input data for one planning month.
use crate::error::PlanningError;
use crate::input::load_model;
use crate::port::{PortID, PortMap, iter_loading_ports, iter_unloading_ports};
use crate::sailing::SailingTimeTable;
use crate::vessel::VesselMap;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::{ModelParameters, ObjectiveKind, SolverParameters};

/// Model definition
#[derive(PartialEq, Debug, Clone)]
pub struct Model {
    /// Path to model folder (empty for models constructed in code)
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The fleet of vessels available this month
    pub vessels: VesselMap,
    /// Loading and unloading ports
    pub ports: PortMap,
    /// Sailing times between pairs of ports
    pub sailing_times: SailingTimeTable,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        load_model(model_dir)
    }

    /// Check that every value in the model is usable and that sailing times only refer to known
    /// ports.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;

        for vessel in self.vessels.values() {
            vessel.validate()?;
        }

        for port in self.ports.values() {
            port.validate()?;
        }

        for (from, to, hours) in self.sailing_times.iter() {
            for id in [from, to] {
                if !self.ports.contains_key(id) {
                    Err(PlanningError::invalid(
                        "sailing_times",
                        format!("Unknown port {id}"),
                    ))?;
                }
            }

            if !(hours.is_finite() && hours.value() >= 0.0) {
                Err(PlanningError::invalid(
                    format!("hours from {from} to {to}"),
                    "must be a finite, non-negative number",
                ))?;
            }
        }

        Ok(())
    }

    /// Iterate over the IDs of the loading ports
    pub fn iter_loading_port_ids(&self) -> impl Iterator<Item = &PortID> {
        iter_loading_ports(&self.ports).map(|port| &port.id)
    }

    /// Iterate over the IDs of the unloading ports
    pub fn iter_unloading_port_ids(&self) -> impl Iterator<Item = &PortID> {
        iter_unloading_ports(&self.ports).map(|port| &port.id)
    }
}
