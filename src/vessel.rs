//! Vessels are the tankers which make up the fleet.
use crate::error::PlanningError;
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Hours, MoneyPerDay, Tonnes, TonnesPerDay};
use indexmap::IndexMap;

define_id_type! {VesselID}

/// A map of [`Vessel`]s, keyed by vessel ID
pub type VesselMap = IndexMap<VesselID, Vessel>;

/// A tanker which can be assigned to voyages.
///
/// Vessels are read-only for the duration of a planning run.
#[derive(PartialEq, Debug, Clone)]
pub struct Vessel {
    /// A unique identifier for the vessel (e.g. "T1")
    pub id: VesselID,
    /// Maximum cargo carried on a single voyage
    pub capacity: Tonnes,
    /// Cost of chartering the vessel for one day
    pub charter_rate: MoneyPerDay,
    /// Fuel burnt per day spent sailing
    pub fuel_burn: TonnesPerDay,
    /// Maximum number of hours the vessel can spend on voyages this month
    pub time_budget: Hours,
}
define_id_getter! {Vessel, VesselID}

impl Vessel {
    /// Check that the vessel's parameters are usable
    pub fn validate(&self) -> Result<(), PlanningError> {
        let check_positive = |field, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PlanningError::invalid_field(
                    &self.id,
                    field,
                    "must be a finite number greater than zero",
                ))
            }
        };

        check_positive("capacity_t", self.capacity.value())?;
        check_positive("charter_rate_per_day", self.charter_rate.value())?;
        check_positive("monthly_time_budget_hours", self.time_budget.value())?;

        if !(self.fuel_burn.is_finite() && self.fuel_burn >= TonnesPerDay(0.0)) {
            return Err(PlanningError::invalid_field(
                &self.id,
                "fuel_burn_t_per_day",
                "must be a finite, non-negative number",
            ));
        }

        Ok(())
    }
}
