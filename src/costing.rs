//! Computes the duration, fuel use and cost of each voyage pattern for each vessel.
//!
//! All quantities are computed in fixed point (see [`crate::fixed`]).
use crate::error::PlanningError;
use crate::fixed::Fixed;
use crate::model::parameters::ModelParameters;
use crate::pattern::VoyagePattern;
use crate::port::{PortID, PortMap};
use crate::sailing::SailingTimeTable;
use crate::units::{Hours, Money, Tonnes};
use crate::vessel::{Vessel, VesselMap};
use anyhow::{Context, Result};
use std::ops::Index;

/// The hours in a day, for converting hourly durations into daily rates
const HOURS_PER_DAY: i64 = 24;

/// Convert a decimal quantity into fixed point, reporting which field it came from on failure
fn to_fixed(field: &str, value: f64) -> Result<Fixed, PlanningError> {
    Fixed::from_f64(value).ok_or_else(|| {
        PlanningError::invalid(field, "cannot be represented as a fixed-point number")
    })
}

/// The cost of one execution of a voyage, split by source
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct CostBreakdown {
    /// Charter hire for the duration of the voyage
    pub charter: Fixed,
    /// Handling charges at every port visited
    pub port_charges: Fixed,
    /// Bunker fuel burnt while sailing
    pub fuel: Fixed,
    /// Sum of the above
    pub total: Fixed,
}

impl CostBreakdown {
    fn new(charter: Fixed, port_charges: Fixed, fuel: Fixed) -> Self {
        Self {
            charter,
            port_charges,
            fuel,
            total: charter + port_charges + fuel,
        }
    }
}

/// The index of a [`CostedPattern`] in [`CostedPatterns`]
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub struct CostedPatternIdx(pub usize);

/// A voyage pattern bound to one vessel, with its computed duration and cost.
///
/// The vessel and pattern are referred to by their indexes in the vessel map and pattern list.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CostedPattern {
    /// Index of the vessel in the model's [`VesselMap`]
    pub vessel_idx: usize,
    /// Index of the pattern in the list of generated patterns
    pub pattern_idx: usize,
    /// Total time spent sailing (centi-hours)
    pub sailing_time: Fixed,
    /// Total duration including port service (centi-hours)
    pub duration: Fixed,
    /// Fuel burnt (centi-tonnes)
    pub fuel: Fixed,
    /// CO2 emitted (centi-tonnes)
    pub emissions: Fixed,
    /// Cost of one execution
    pub cost: CostBreakdown,
}

impl CostedPattern {
    /// Duration as a decimal quantity
    pub fn duration_hours(&self) -> Hours {
        Hours(self.duration.to_f64())
    }

    /// Fuel burnt as a decimal quantity
    pub fn fuel_tonnes(&self) -> Tonnes {
        Tonnes(self.fuel.to_f64())
    }

    /// CO2 emitted as a decimal quantity
    pub fn emissions_tonnes(&self) -> Tonnes {
        Tonnes(self.emissions.to_f64())
    }

    /// Total cost as a decimal quantity
    pub fn total_cost(&self) -> Money {
        Money(self.cost.total.to_f64())
    }
}

/// An arena of [`CostedPattern`]s, ordered by vessel and then by pattern
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CostedPatterns(Vec<CostedPattern>);

impl CostedPatterns {
    /// Iterate over the costed patterns along with their indexes
    pub fn iter(&self) -> impl Iterator<Item = (CostedPatternIdx, &CostedPattern)> {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, costed)| (CostedPatternIdx(idx), costed))
    }

    /// The number of costed patterns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no costed patterns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<CostedPatternIdx> for CostedPatterns {
    type Output = CostedPattern;

    fn index(&self, index: CostedPatternIdx) -> &Self::Output {
        &self.0[index.0]
    }
}

/// Fixed-point copies of the parameters which feed into every costed pattern
struct CostingParameters {
    loading_service_time: Fixed,
    unloading_service_time: Fixed,
    fuel_price: Fixed,
    co2_per_tonne_fuel: f64,
    round_trip: bool,
}

impl CostingParameters {
    fn new(params: &ModelParameters) -> Result<Self, PlanningError> {
        Ok(Self {
            loading_service_time: to_fixed(
                "loading_service_hours",
                params.loading_service_time.value(),
            )?,
            unloading_service_time: to_fixed(
                "unloading_service_hours",
                params.unloading_service_time.value(),
            )?,
            fuel_price: to_fixed("fuel_price_per_tonne", params.fuel_price.value())?,
            co2_per_tonne_fuel: params.co2_per_tonne_fuel,
            round_trip: params.round_trip,
        })
    }
}

/// Compute the total sailing time for a pattern
fn sailing_time(
    pattern: &VoyagePattern,
    sailing_times: &SailingTimeTable,
    round_trip: bool,
) -> Result<Fixed, PlanningError> {
    let mut route: Vec<&PortID> = Vec::with_capacity(4);
    route.push(&pattern.loading_port);
    route.extend(pattern.discharge.as_slice());
    if round_trip {
        route.push(&pattern.loading_port);
    }

    route
        .windows(2)
        .map(|leg| {
            let hours = sailing_times.get(leg[0], leg[1])?;
            to_fixed(&format!("sailing time from {} to {}", leg[0], leg[1]), hours.value())
        })
        .sum()
}

/// Sum the handling charges of every port visited on a pattern
fn port_charges(pattern: &VoyagePattern, ports: &PortMap) -> Result<Fixed, PlanningError> {
    std::iter::once(&pattern.loading_port)
        .chain(pattern.discharge.as_slice())
        .map(|id| {
            let port = ports.get(id).ok_or_else(|| {
                PlanningError::invalid("port", format!("Unknown port {id} in voyage pattern"))
            })?;
            to_fixed(
                &format!("handling_charge of {id}"),
                port.handling_charge.value(),
            )
        })
        .sum()
}

/// Cost a single pattern for a single vessel
fn cost_pattern(
    vessel_idx: usize,
    vessel: &Vessel,
    pattern_idx: usize,
    pattern: &VoyagePattern,
    ports: &PortMap,
    sailing_times: &SailingTimeTable,
    params: &CostingParameters,
) -> Result<CostedPattern, PlanningError> {
    let sailing = sailing_time(pattern, sailing_times, params.round_trip)?;
    let num_discharge = if pattern.discharge.is_split() { 2 } else { 1 };
    let duration = params.loading_service_time
        + sailing
        + params.unloading_service_time.times(num_discharge);

    let charter_rate = to_fixed(
        &format!("charter_rate_per_day of {}", vessel.id),
        vessel.charter_rate.value(),
    )?;
    let fuel_burn = to_fixed(
        &format!("fuel_burn_t_per_day of {}", vessel.id),
        vessel.fuel_burn.value(),
    )?;

    let charter = duration.mul_div(charter_rate, HOURS_PER_DAY);
    let fuel = sailing.mul_div(fuel_burn, HOURS_PER_DAY);
    let fuel_cost = fuel.mul_div(params.fuel_price, 1);
    let emissions = to_fixed("co2_per_tonne_fuel", fuel.to_f64() * params.co2_per_tonne_fuel)?;

    Ok(CostedPattern {
        vessel_idx,
        pattern_idx,
        sailing_time: sailing,
        duration,
        fuel,
        emissions,
        cost: CostBreakdown::new(charter, port_charges(pattern, ports)?, fuel_cost),
    })
}

/// Cost every pattern for every vessel.
///
/// The result is ordered by vessel (in map order) and then by pattern. Costs do not depend on
/// whether a vessel can actually sail a pattern within its limits; that is decided when building
/// the model.
///
/// # Returns
///
/// The costed patterns, or an error if a sailing time is missing or a quantity is out of range.
pub fn cost_patterns(
    vessels: &VesselMap,
    ports: &PortMap,
    patterns: &[VoyagePattern],
    sailing_times: &SailingTimeTable,
    params: &ModelParameters,
) -> Result<CostedPatterns> {
    let costing_params = CostingParameters::new(params)?;

    let mut costed = Vec::with_capacity(vessels.len() * patterns.len());
    for (vessel_idx, vessel) in vessels.values().enumerate() {
        for (pattern_idx, pattern) in patterns.iter().enumerate() {
            let costed_pattern = cost_pattern(
                vessel_idx,
                vessel,
                pattern_idx,
                pattern,
                ports,
                sailing_times,
                &costing_params,
            )
            .with_context(|| format!("Failed to cost pattern {pattern} for vessel {}", vessel.id))?;
            costed.push(costed_pattern);
        }
    }

    Ok(CostedPatterns(costed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model_parameters, ports, sailing_times, vessels};
    use crate::pattern::generate_patterns;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn patterns() -> Vec<VoyagePattern> {
        generate_patterns(&["L1".into()], &["U1".into(), "U2".into()])
    }

    #[rstest]
    fn test_cost_direct_pattern(
        vessels: VesselMap,
        ports: PortMap,
        sailing_times: SailingTimeTable,
        model_parameters: ModelParameters,
    ) {
        let costed =
            cost_patterns(&vessels, &ports, &patterns(), &sailing_times, &model_parameters)
                .unwrap();
        assert_eq!(costed.len(), 4);

        // L1->U1: 6 h loading + 12 h sailing + 4 h unloading
        let direct = &costed[CostedPatternIdx(0)];
        assert_eq!(direct.vessel_idx, 0);
        assert_eq!(direct.pattern_idx, 0);
        assert_eq!(direct.sailing_time, Fixed::from_units(12));
        assert_eq!(direct.duration, Fixed::from_units(22));
        assert_eq!(direct.fuel, Fixed::from_units(12));
        assert_eq!(
            direct.cost,
            CostBreakdown::new(
                Fixed::from_units(22_000),
                Fixed::from_units(1_500),
                Fixed::from_units(6_000)
            )
        );
        assert_approx_eq!(f64, direct.total_cost().value(), 29_500.0);
        assert_approx_eq!(f64, direct.emissions_tonnes().value(), 37.37);
    }

    #[rstest]
    fn test_cost_split_pattern(
        vessels: VesselMap,
        ports: PortMap,
        sailing_times: SailingTimeTable,
        model_parameters: ModelParameters,
    ) {
        let costed =
            cost_patterns(&vessels, &ports, &patterns(), &sailing_times, &model_parameters)
                .unwrap();

        // L1->U1->U2: 6 + 12 + 4 + 6 + 4 hours
        let split = &costed[CostedPatternIdx(2)];
        assert_eq!(split.sailing_time, Fixed::from_units(18));
        assert_eq!(split.duration, Fixed::from_units(32));
        assert_eq!(split.cost.port_charges, Fixed::from_units(2_000));
        assert_eq!(split.cost.total, Fixed::from_units(32_000 + 2_000 + 9_000));
    }

    #[rstest]
    fn test_cost_round_trip(
        vessels: VesselMap,
        ports: PortMap,
        sailing_times: SailingTimeTable,
        mut model_parameters: ModelParameters,
    ) {
        model_parameters.round_trip = true;
        let costed =
            cost_patterns(&vessels, &ports, &patterns(), &sailing_times, &model_parameters)
                .unwrap();
        assert_eq!(costed[CostedPatternIdx(0)].duration, Fixed::from_units(34));
        assert_approx_eq!(f64, costed[CostedPatternIdx(0)].duration_hours().value(), 34.0);
    }

    #[rstest]
    fn test_cost_missing_sailing_time(
        vessels: VesselMap,
        ports: PortMap,
        model_parameters: ModelParameters,
    ) {
        let sailing_times: SailingTimeTable = [("L1".into(), "U1".into(), Hours(12.0))]
            .into_iter()
            .collect();
        let err = cost_patterns(&vessels, &ports, &patterns(), &sailing_times, &model_parameters)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanningError>(),
            Some(&PlanningError::MissingDistanceData {
                from: "L1".into(),
                to: "U2".into()
            })
        );
    }

    #[rstest]
    fn test_cost_fractional_values(
        mut vessels: VesselMap,
        ports: PortMap,
        sailing_times: SailingTimeTable,
        model_parameters: ModelParameters,
    ) {
        // 22 h at 1000.01 per day = 916.675833..., which rounds to 916.68
        vessels[0].charter_rate = crate::units::MoneyPerDay(1_000.01);
        let costed =
            cost_patterns(&vessels, &ports, &patterns(), &sailing_times, &model_parameters)
                .unwrap();
        assert_eq!(
            costed[CostedPatternIdx(0)].cost.charter,
            Fixed::from_raw(91_668)
        );
    }
}
