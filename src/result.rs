//! Converts a solved assignment into trip records and a summary of the plan.
//!
//! Every invariant of a plan is checked again here, in integer arithmetic, against the trips
//! themselves. A violation aborts the run.
use crate::costing::{CostBreakdown, CostedPatternIdx, CostedPatterns};
use crate::error::PlanningError;
use crate::fixed::Fixed;
use crate::model::{Model, ObjectiveKind};
use crate::optimisation::{AssignmentModel, port_demands, vessel_limits};
use crate::pattern::VoyagePattern;
use crate::port::PortID;
use crate::solver::{RawSolution, SolveStatus};
use crate::units::{Hours, Money, Tonnes};
use crate::vessel::VesselID;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::info;
use serde::Serialize;
use std::time::Duration;

/// Fleet utilisation below which the fleet is considered under-used (%)
const LOW_UTILISATION_PERCENTAGE: f64 = 70.0;

/// Fleet utilisation above which the fleet is considered stretched (%)
const HIGH_UTILISATION_PERCENTAGE: f64 = 95.0;

/// Average cost per tonne above which costs are flagged
const HIGH_COST_PER_TONNE: f64 = 2_500.0;

/// Cargo discharged at one port on one trip
#[derive(PartialEq, Debug, Clone)]
pub struct Delivery {
    /// Where the cargo is discharged
    pub port_id: PortID,
    /// How much is discharged
    pub volume: Tonnes,
}

/// One execution of a voyage pattern by a vessel
#[derive(PartialEq, Debug, Clone)]
pub struct Trip {
    /// The vessel sailing the voyage
    pub vessel_id: VesselID,
    /// Where the cargo is loaded
    pub loading_port: PortID,
    /// Cargo discharged at each port, in order of visit
    pub deliveries: Vec<Delivery>,
    /// Time from the start of loading to the end of the voyage
    pub duration: Hours,
    /// Fuel burnt
    pub fuel: Tonnes,
    /// CO2 emitted
    pub emissions: Tonnes,
    /// Charter hire for the voyage
    pub charter_cost: Money,
    /// Handling charges at every port visited
    pub port_charges: Money,
    /// Cost of fuel burnt
    pub fuel_cost: Money,
    /// Total cost of the voyage
    pub total_cost: Money,
}

impl Trip {
    /// Total cargo carried on the trip
    pub fn cargo(&self) -> Tonnes {
        self.deliveries.iter().map(|delivery| delivery.volume).sum()
    }
}

/// How much of a vessel's time budget is used by the plan
#[derive(PartialEq, Debug, Clone)]
pub struct VesselUtilisation {
    /// The vessel
    pub vessel_id: VesselID,
    /// The number of trips the vessel makes
    pub trips: usize,
    /// Total duration of the vessel's trips
    pub used_hours: Hours,
    /// The vessel's time budget
    pub time_budget: Hours,
    /// Used hours as a percentage of the time budget
    pub utilisation_percentage: f64,
}

/// Cargo delivered to an unloading port
#[derive(PartialEq, Debug, Clone)]
pub struct PortDelivery {
    /// The port
    pub port_id: PortID,
    /// The port's demand
    pub demand: Tonnes,
    /// Total cargo delivered over all trips
    pub delivered: Tonnes,
}

/// Totals for a plan
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct PlanSummary {
    /// What the solver found
    pub status: SolveStatus,
    /// Time spent in the solver
    pub solve_time_seconds: f64,
    /// The quantity which was minimised
    pub objective: ObjectiveKind,
    /// Total number of trips
    pub total_trips: usize,
    /// Total cost of all trips
    pub total_cost: Money,
    /// Charter hire over all trips
    pub charter_cost: Money,
    /// Port charges over all trips
    pub port_charges: Money,
    /// Fuel costs over all trips
    pub fuel_cost: Money,
    /// Cargo delivered over all trips
    pub total_volume_delivered: Tonnes,
    /// Fuel burnt over all trips
    pub total_fuel: Tonnes,
    /// CO2 emitted over all trips
    pub total_emissions: Tonnes,
    /// Cargo delivered as a percentage of demand
    pub demand_satisfaction_percentage: f64,
    /// Hours used as a percentage of the fleet's total time budget
    pub fleet_utilisation_percentage: f64,
    /// Whether every port received exactly its demand
    pub demand_matched: bool,
    /// Suggestions for the planner
    pub recommendations: Vec<String>,
}

/// A solved voyage plan
#[derive(PartialEq, Debug, Clone)]
pub struct PlanResult {
    /// Totals for the plan
    pub summary: PlanSummary,
    /// One record per voyage
    pub trips: Vec<Trip>,
    /// Time budget use for every vessel, including unused ones
    pub vessel_utilisation: Vec<VesselUtilisation>,
    /// Cargo delivered to every unloading port
    pub port_deliveries: Vec<PortDelivery>,
}

/// A trip before conversion to decimal quantities
struct RawTrip {
    costed_idx: CostedPatternIdx,
    volumes: Vec<i64>,
}

/// The volume carried on each leg of the `trip`th of `count` executions.
///
/// Leg totals are divided evenly. Remainders go to the earliest trips for the first leg and to the
/// latest trips for the second leg, so that no trip carries more than the average load rounded up
/// and the capacity limit, which holds on average, holds for every trip.
fn leg_volumes_for_trip(totals: &[i64], count: i64, trip: i64) -> Vec<i64> {
    totals
        .iter()
        .enumerate()
        .map(|(leg, &total)| {
            let (quotient, remainder) = (total / count, total % count);
            let extra = if leg == 0 {
                trip < remainder
            } else {
                trip >= count - remainder
            };
            quotient + i64::from(extra)
        })
        .collect()
}

/// Expand each count variable into one trip per execution
fn expand_trips(assignment_model: &AssignmentModel, values: &[i64]) -> Vec<RawTrip> {
    let mut trips = Vec::new();
    for (costed_idx, columns) in assignment_model.variables.iter() {
        let count = values[columns.count];
        let totals: Vec<_> = columns.legs.iter().map(|&leg| values[leg]).collect();
        trips.extend((0..count).map(|trip| RawTrip {
            costed_idx,
            volumes: leg_volumes_for_trip(&totals, count, trip),
        }));
    }

    trips
}

/// Totals per vessel and port, checked against the plan invariants
struct VerifiedTotals {
    used_by_vessel: Vec<Fixed>,
    delivered_by_port: IndexMap<PortID, Fixed>,
}

/// Check that the trips deliver exactly the demand at every port, that no trip exceeds its
/// vessel's capacity and that no vessel exceeds its time budget.
fn verify_trips(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    trips: &[RawTrip],
) -> Result<VerifiedTotals, PlanningError> {
    let limits = vessel_limits(model)?;
    let demands = port_demands(model)?;

    let mut used_by_vessel = vec![Fixed::ZERO; limits.len()];
    let mut delivered_by_port: IndexMap<PortID, Fixed> =
        demands.keys().map(|id| (id.clone(), Fixed::ZERO)).collect();
    for trip in trips {
        let costed = &costed_patterns[trip.costed_idx];
        let vessel_id = &model.vessels[costed.vessel_idx].id;
        let cargo = Fixed::from_raw(trip.volumes.iter().sum());
        if cargo > limits[costed.vessel_idx].capacity {
            return Err(PlanningError::InvariantViolation(format!(
                "A trip by {vessel_id} carries {cargo} t, more than its capacity"
            )));
        }

        used_by_vessel[costed.vessel_idx] = used_by_vessel[costed.vessel_idx] + costed.duration;

        let pattern = &patterns[costed.pattern_idx];
        for (port_id, &volume) in pattern.discharge.as_slice().iter().zip(&trip.volumes) {
            let delivered = delivered_by_port.get_mut(port_id).ok_or_else(|| {
                PlanningError::InvariantViolation(format!(
                    "A trip by {vessel_id} delivers to {port_id}, which is not an unloading port"
                ))
            })?;
            *delivered = *delivered + Fixed::from_raw(volume);
        }
    }

    for ((vessel_id, vessel_limits), used) in
        model.vessels.keys().zip(&limits).zip(&used_by_vessel)
    {
        if *used > vessel_limits.time_budget {
            return Err(PlanningError::InvariantViolation(format!(
                "Trips by {vessel_id} take {used} h, more than its time budget"
            )));
        }
    }

    for (port_id, delivered) in &delivered_by_port {
        let demand = demands[port_id];
        if *delivered != demand {
            return Err(PlanningError::InvariantViolation(format!(
                "{delivered} t delivered to {port_id}, but demand is {demand} t"
            )));
        }
    }

    Ok(VerifiedTotals {
        used_by_vessel,
        delivered_by_port,
    })
}

/// Convert a raw trip into a [`Trip`] with decimal quantities
fn to_trip(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    trip: &RawTrip,
) -> Trip {
    let costed = &costed_patterns[trip.costed_idx];
    let pattern = &patterns[costed.pattern_idx];
    let deliveries = pattern
        .discharge
        .as_slice()
        .iter()
        .zip(&trip.volumes)
        .map(|(port_id, &volume)| Delivery {
            port_id: port_id.clone(),
            volume: Tonnes(Fixed::from_raw(volume).to_f64()),
        })
        .collect();

    Trip {
        vessel_id: model.vessels[costed.vessel_idx].id.clone(),
        loading_port: pattern.loading_port.clone(),
        deliveries,
        duration: costed.duration_hours(),
        fuel: costed.fuel_tonnes(),
        emissions: costed.emissions_tonnes(),
        charter_cost: Money(costed.cost.charter.to_f64()),
        port_charges: Money(costed.cost.port_charges.to_f64()),
        fuel_cost: Money(costed.cost.fuel.to_f64()),
        total_cost: costed.total_cost(),
    }
}

/// Express `part` as a percentage of `whole`, treating an empty whole as fully satisfied
#[allow(clippy::cast_precision_loss)]
fn percentage(part: Fixed, whole: Fixed) -> f64 {
    if whole == Fixed::ZERO {
        100.0
    } else {
        part.raw() as f64 / whole.raw() as f64 * 100.0
    }
}

/// Suggestions based on how well the fleet is used and what the plan costs
fn recommendations(
    fleet_utilisation_percentage: f64,
    total_cost: Money,
    total_volume: Tonnes,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if fleet_utilisation_percentage < LOW_UTILISATION_PERCENTAGE {
        recommendations.push(format!(
            "Fleet utilisation is low ({fleet_utilisation_percentage:.0}%). Consider reducing \
             fleet size or seeking additional cargo."
        ));
    } else if fleet_utilisation_percentage > HIGH_UTILISATION_PERCENTAGE {
        recommendations.push(format!(
            "Fleet utilisation is very high ({fleet_utilisation_percentage:.0}%). Consider adding \
             vessels or shortening voyages."
        ));
    }

    if total_volume > Tonnes(0.0) {
        let cost_per_tonne = total_cost.value() / total_volume.value();
        if cost_per_tonne > HIGH_COST_PER_TONNE {
            recommendations.push(format!(
                "Average cost per tonne is high ({cost_per_tonne:.0}). Review fuel efficiency and \
                 port charges."
            ));
        }
    }

    if recommendations.is_empty() {
        recommendations.push("Current fleet deployment appears efficient.".into());
    }

    recommendations
}

/// Convert a solution into a [`PlanResult`].
///
/// # Arguments
///
/// * `model` - The model
/// * `patterns` - All voyage patterns
/// * `costed_patterns` - Every pattern costed for every vessel
/// * `assignment_model` - The model which was solved
/// * `solution` - The solver output, which must have a solution
///
/// # Returns
///
/// The plan, or an [`PlanningError::InvariantViolation`] if the solution is not valid.
pub fn extract_result(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    assignment_model: &AssignmentModel,
    solution: &RawSolution,
) -> Result<PlanResult> {
    ensure!(
        solution.status.has_solution(),
        "Cannot extract a plan from a solve with status {}",
        solution.status
    );

    let values = assignment_model.round_assignment(&solution.values)?;
    let raw_trips = expand_trips(assignment_model, &values);
    let totals = verify_trips(model, patterns, costed_patterns, &raw_trips)?;
    let trips: Vec<_> = raw_trips
        .iter()
        .map(|trip| to_trip(model, patterns, costed_patterns, trip))
        .collect();

    let mut trips_by_vessel = vec![0; model.vessels.len()];
    for trip in &raw_trips {
        trips_by_vessel[costed_patterns[trip.costed_idx].vessel_idx] += 1;
    }

    let limits = vessel_limits(model)?;
    let vessel_utilisation = model
        .vessels
        .values()
        .zip(&limits)
        .zip(&totals.used_by_vessel)
        .zip(trips_by_vessel)
        .map(|(((vessel, vessel_limits), &used), trips)| VesselUtilisation {
            vessel_id: vessel.id.clone(),
            trips,
            used_hours: Hours(used.to_f64()),
            time_budget: vessel.time_budget,
            utilisation_percentage: percentage(used, vessel_limits.time_budget),
        })
        .collect();

    let port_deliveries = totals
        .delivered_by_port
        .iter()
        .map(|(port_id, delivered)| PortDelivery {
            port_id: port_id.clone(),
            demand: model.ports[port_id].demand(),
            delivered: Tonnes(delivered.to_f64()),
        })
        .collect();

    let costs_of = |select: fn(&CostBreakdown) -> Fixed| -> Fixed {
        raw_trips
            .iter()
            .map(|trip| select(&costed_patterns[trip.costed_idx].cost))
            .sum()
    };
    let total_cost = Money(costs_of(|cost| cost.total).to_f64());
    let delivered: Fixed = totals.delivered_by_port.values().copied().sum();
    let demand: Fixed = port_demands(model)?.values().copied().sum();
    let used: Fixed = totals.used_by_vessel.iter().copied().sum();
    let budget: Fixed = limits.iter().map(|vessel_limits| vessel_limits.time_budget).sum();
    let fleet_utilisation_percentage = percentage(used, budget);
    let total_volume_delivered = Tonnes(delivered.to_f64());

    let summary = PlanSummary {
        status: solution.status,
        solve_time_seconds: solution.solve_time.as_secs_f64(),
        objective: model.parameters.objective,
        total_trips: trips.len(),
        total_cost,
        charter_cost: Money(costs_of(|cost| cost.charter).to_f64()),
        port_charges: Money(costs_of(|cost| cost.port_charges).to_f64()),
        fuel_cost: Money(costs_of(|cost| cost.fuel).to_f64()),
        total_volume_delivered,
        total_fuel: trips.iter().map(|trip| trip.fuel).sum(),
        total_emissions: trips.iter().map(|trip| trip.emissions).sum(),
        demand_satisfaction_percentage: percentage(delivered, demand),
        fleet_utilisation_percentage,
        demand_matched: delivered == demand,
        recommendations: recommendations(
            fleet_utilisation_percentage,
            total_cost,
            total_volume_delivered,
        ),
    };

    info!(
        "Plan found ({}): {} trips, total cost {:.2}, fleet utilisation {:.1}%",
        summary.status, summary.total_trips, summary.total_cost.value(), fleet_utilisation_percentage
    );

    Ok(PlanResult {
        summary,
        trips,
        vessel_utilisation,
        port_deliveries,
    })
}

impl PlanResult {
    /// Time spent in the solver
    pub fn solve_time(&self) -> Duration {
        Duration::from_secs_f64(self.summary.solve_time_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::cost_patterns;
    use crate::fixture::model;
    use crate::optimisation::build_assignment_model;
    use crate::pattern::generate_patterns;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    struct Built {
        patterns: Vec<VoyagePattern>,
        costed: CostedPatterns,
        assignment_model: AssignmentModel,
    }

    fn build(model: &Model) -> Built {
        let patterns = generate_patterns(&["L1".into()], &["U1".into(), "U2".into()]);
        let costed = cost_patterns(
            &model.vessels,
            &model.ports,
            &patterns,
            &model.sailing_times,
            &model.parameters,
        )
        .unwrap();
        let assignment_model = build_assignment_model(model, &patterns, &costed).unwrap();
        Built {
            patterns,
            costed,
            assignment_model,
        }
    }

    /// Build solver output which sails each given costed pattern `count` times with the given leg
    /// totals (in tonnes)
    fn solution(built: &Built, assignments: &[(usize, i64, &[i64])]) -> RawSolution {
        let mut values = vec![0.0; built.assignment_model.columns.len()];
        for &(idx, count, legs) in assignments {
            let columns = built
                .assignment_model
                .variables
                .get(CostedPatternIdx(idx))
                .unwrap();
            values[columns.count] = count as f64;
            for (&leg, &volume) in columns.legs.iter().zip(legs) {
                values[leg] = (volume * 100) as f64;
            }
        }

        RawSolution {
            status: SolveStatus::Optimal,
            values,
            solve_time: Duration::from_millis(250),
        }
    }

    #[rstest]
    #[case(&[6, 4], 3, 0, vec![2, 2])]
    #[case(&[16, 14], 3, 0, vec![6, 4])]
    #[case(&[16, 14], 3, 1, vec![5, 5])]
    #[case(&[16, 14], 3, 2, vec![5, 5])]
    #[case(&[7], 2, 0, vec![4])]
    #[case(&[7], 2, 1, vec![3])]
    fn test_leg_volumes_for_trip(
        #[case] totals: &[i64],
        #[case] count: i64,
        #[case] trip: i64,
        #[case] expected: Vec<i64>,
    ) {
        assert_eq!(leg_volumes_for_trip(totals, count, trip), expected);
    }

    #[test]
    fn test_leg_volumes_within_capacity() {
        // Legs summing to exactly capacity * count never overload a single trip
        let capacity = 10;
        for count in 1..=5 {
            for first in 0..=capacity * count {
                let totals = [first, capacity * count - first];
                for trip in 0..count {
                    let volumes = leg_volumes_for_trip(&totals, count, trip);
                    assert!(volumes.iter().sum::<i64>() <= capacity);
                }
            }
        }
    }

    #[rstest]
    fn test_extract_direct_trips(model: Model) {
        let built = build(&model);
        let solution = solution(&built, &[(0, 1, &[40_000]), (1, 1, &[20_000])]);
        let result = extract_result(
            &model,
            &built.patterns,
            &built.costed,
            &built.assignment_model,
            &solution,
        )
        .unwrap();

        assert_eq!(result.trips.len(), 2);
        let trip = &result.trips[0];
        assert_eq!(trip.vessel_id, "T1".into());
        assert_eq!(trip.loading_port, "L1".into());
        assert_eq!(
            trip.deliveries,
            [Delivery {
                port_id: "U1".into(),
                volume: Tonnes(40_000.0)
            }]
        );
        assert_eq!(trip.duration, Hours(22.0));
        assert_eq!(trip.total_cost, Money(29_500.0));

        let summary = &result.summary;
        assert_eq!(summary.status, SolveStatus::Optimal);
        assert_eq!(summary.total_trips, 2);
        assert_eq!(summary.total_cost, Money(29_500.0 + 47_500.0));
        assert_eq!(summary.total_volume_delivered, Tonnes(60_000.0));
        assert_approx_eq!(f64, summary.demand_satisfaction_percentage, 100.0);
        assert!(summary.demand_matched);
        assert_approx_eq!(f64, summary.fleet_utilisation_percentage, 56.0 / 720.0 * 100.0);
        assert_approx_eq!(f64, summary.solve_time_seconds, 0.25);
        assert!(summary.recommendations[0].starts_with("Fleet utilisation is low"));

        assert_eq!(result.vessel_utilisation.len(), 1);
        assert_eq!(result.vessel_utilisation[0].trips, 2);
        assert_eq!(result.vessel_utilisation[0].used_hours, Hours(56.0));
        assert_eq!(
            result.port_deliveries[1],
            PortDelivery {
                port_id: "U2".into(),
                demand: Tonnes(20_000.0),
                delivered: Tonnes(20_000.0)
            }
        );
    }

    #[rstest]
    fn test_extract_split_trips(model: Model) {
        let built = build(&model);

        // L1->U1->U2 twice, carrying 60,000 t in total
        let solution = solution(&built, &[(2, 2, &[40_000, 20_000])]);
        let result = extract_result(
            &model,
            &built.patterns,
            &built.costed,
            &built.assignment_model,
            &solution,
        )
        .unwrap();

        assert_eq!(result.trips.len(), 2);
        for trip in &result.trips {
            assert_eq!(trip.cargo(), Tonnes(30_000.0));
            assert_eq!(trip.deliveries[0].port_id, "U1".into());
            assert_eq!(trip.deliveries[1].port_id, "U2".into());
        }
        assert_eq!(result.summary.total_trips, 2);
        assert_eq!(result.vessel_utilisation[0].used_hours, Hours(64.0));
    }

    #[rstest]
    fn test_extract_invalid_solution(model: Model) {
        let built = build(&model);

        // U2 is not served
        let solution = solution(&built, &[(0, 1, &[40_000])]);
        let err = extract_result(
            &model,
            &built.patterns,
            &built.costed,
            &built.assignment_model,
            &solution,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanningError>(),
            Some(PlanningError::InvariantViolation(_))
        ));
    }

    #[rstest]
    fn test_extract_no_solution(model: Model) {
        let built = build(&model);
        let solution = RawSolution {
            status: SolveStatus::Infeasible,
            values: Vec::new(),
            solve_time: Duration::ZERO,
        };
        assert!(
            extract_result(
                &model,
                &built.patterns,
                &built.costed,
                &built.assignment_model,
                &solution
            )
            .is_err()
        );
    }

    #[test]
    fn test_recommendations() {
        let recs = recommendations(80.0, Money(1_000.0), Tonnes(10.0));
        assert_eq!(recs, ["Current fleet deployment appears efficient."]);

        let recs = recommendations(99.0, Money(30_000.0), Tonnes(10.0));
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("very high (99%)"));
        assert!(recs[1].contains("(3000)"));
    }
}
