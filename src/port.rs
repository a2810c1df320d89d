//! Ports where cargo is loaded or discharged.
use crate::error::PlanningError;
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Money, Tonnes};
use indexmap::IndexMap;

define_id_type! {PortID}

/// A map of [`Port`]s, keyed by port ID
pub type PortMap = IndexMap<PortID, Port>;

/// What a port is used for
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum PortRole {
    /// Cargo is loaded here. Supply is unlimited.
    Loading,
    /// Cargo is discharged here and the monthly demand must be met exactly
    Unloading {
        /// Monthly demand
        demand: Tonnes,
    },
}

/// A port visited by the fleet
#[derive(PartialEq, Debug, Clone)]
pub struct Port {
    /// A unique identifier for the port (e.g. "L1")
    pub id: PortID,
    /// Whether the port loads or discharges cargo
    pub role: PortRole,
    /// Charge levied each time a vessel calls at the port
    pub handling_charge: Money,
}
define_id_getter! {Port, PortID}

impl Port {
    /// Monthly demand at the port (zero for loading ports)
    pub fn demand(&self) -> Tonnes {
        match self.role {
            PortRole::Loading => Tonnes(0.0),
            PortRole::Unloading { demand } => demand,
        }
    }

    /// Whether this is a loading port
    pub fn is_loading(&self) -> bool {
        self.role == PortRole::Loading
    }

    /// Check that the port's parameters are usable
    pub fn validate(&self) -> Result<(), PlanningError> {
        if let PortRole::Unloading { demand } = self.role {
            if !(demand.is_finite() && demand >= Tonnes(0.0)) {
                return Err(PlanningError::invalid_field(
                    &self.id,
                    "demand_t",
                    "must be a finite, non-negative number",
                ));
            }
        }

        if !(self.handling_charge.is_finite() && self.handling_charge >= Money(0.0)) {
            return Err(PlanningError::invalid_field(
                &self.id,
                "handling_charge",
                "must be a finite, non-negative number",
            ));
        }

        Ok(())
    }
}

/// Iterate over the loading ports in the map
pub fn iter_loading_ports(ports: &PortMap) -> impl Iterator<Item = &Port> {
    ports.values().filter(|port| port.is_loading())
}

/// Iterate over the unloading ports in the map
pub fn iter_unloading_ports(ports: &PortMap) -> impl Iterator<Item = &Port> {
    ports.values().filter(|port| !port.is_loading())
}

/// Total demand across all unloading ports
pub fn total_demand(ports: &PortMap) -> Tonnes {
    iter_unloading_ports(ports).map(Port::demand).sum()
}
