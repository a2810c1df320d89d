//! Explains why no voyage plan was found.
//!
//! The diagnostic is computed from the model data alone, so it is available whether the solver
//! proved the model infeasible or simply ran out of time. Each attribution is backed by a bound
//! which cannot be met, so an instance is never blamed on capacity when only time is short, or
//! vice versa. Where neither bound is violated the cause is reported as undetermined.
use crate::costing::{CostedPattern, CostedPatterns};
use crate::fixed::Fixed;
use crate::model::Model;
use crate::optimisation::{
    VesselLimits, max_executions, port_demands, serves_demand, vessel_limits,
};
use crate::pattern::VoyagePattern;
use crate::port::PortID;
use crate::solver::{RawSolution, SolveStatus};
use crate::units::{Hours, Money, Tonnes};
use anyhow::Result;
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use serde::Serialize;
use serde_string_enum::SerializeLabeledStringEnum;

/// The number of suggestions included in a report
const MAX_SUGGESTIONS: usize = 5;

/// Share of total demand at a single port above which demand is considered concentrated
const CONCENTRATED_DEMAND_SHARE: f64 = 0.3;

/// Share of total demand a single port is suggested to be reduced to
const BALANCED_DEMAND_SHARE: f64 = 0.25;

/// Fleets smaller than this are flagged as inflexible
const SMALL_FLEET_SIZE: usize = 5;

/// Solve time limits below this are flagged when the solver times out
const SHORT_SOLVE_TIME_SECONDS: f64 = 120.0;

/// Worker counts below this are flagged when the solver times out
const FEW_WORKERS: u32 = 4;

/// Days of charter assumed when estimating the cost of extra vessels
const CHARTER_DAYS_PER_MONTH: f64 = 30.0;

/// The constraint(s) to which a failure to find a plan is attributed
#[derive(PartialEq, Eq, Debug, Clone, Copy, SerializeLabeledStringEnum)]
pub enum InfeasibilityCause {
    /// The fleet can't carry the demand even with unlimited time
    #[string = "capacity"]
    Capacity,
    /// The fleet could carry the demand with more time, but not within the time budgets
    #[string = "time"]
    Time,
    /// Both capacity and time budgets are too small
    #[string = "capacity_and_time"]
    CapacityAndTime,
    /// Some ports with demand can't be served by any vessel, however long it is given
    #[string = "unreachable_ports"]
    UnreachablePorts,
    /// No bound is violated, so the cause lies in the interaction between constraints
    #[string = "undetermined"]
    Undetermined,
}

/// How urgent a suggestion is
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, SerializeLabeledStringEnum,
)]
pub enum SuggestionPriority {
    /// Addresses the identified cause directly
    #[string = "High"]
    High,
    /// Likely to help
    #[string = "Medium"]
    Medium,
    /// Worth considering
    #[string = "Low"]
    Low,
}

/// A remedial action for the planner
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Suggestion {
    /// How urgent the suggestion is
    pub priority: SuggestionPriority,
    /// What to do
    pub action: String,
    /// What doing it achieves
    pub impact: String,
    /// Estimated monthly cost of doing it (zero for operational changes)
    pub cost_estimate: Money,
}

impl Suggestion {
    fn new<A: Into<String>, I: Into<String>>(
        priority: SuggestionPriority,
        action: A,
        impact: I,
        cost_estimate: Money,
    ) -> Self {
        Self {
            priority,
            action: action.into(),
            impact: impact.into(),
            cost_estimate,
        }
    }
}

/// An unloading port which is estimated not to receive all of its demand
#[derive(PartialEq, Debug, Clone)]
pub struct UnderservedPort {
    /// The port
    pub port_id: PortID,
    /// The port's demand
    pub demand: Tonnes,
    /// Estimated cargo which can't be delivered
    pub estimated_shortfall: Tonnes,
    /// Whether no vessel can serve the port, even with an unlimited time budget
    pub unreachable: bool,
}

/// The outcome of a planning run which found no plan
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct InfeasibilityReport {
    /// What the solver found
    pub status: SolveStatus,
    /// Time spent in the solver
    pub solve_time_seconds: f64,
    /// The solver's time limit
    pub time_limit_seconds: f64,
    /// The constraint(s) to which the failure is attributed
    pub cause: InfeasibilityCause,
    /// Whether demand exceeds what the fleet could carry with unlimited time
    pub capacity_bound: bool,
    /// Whether demand exceeds what the fleet can carry within its time budgets
    pub time_bound: bool,
    /// Total demand over all unloading ports
    pub total_demand: Tonnes,
    /// Upper bound on the cargo the fleet can carry this month
    pub deliverable_capacity: Tonnes,
    /// Demand in excess of the deliverable capacity
    pub capacity_gap: Tonnes,
    /// Lower bound on the voyage hours needed to meet demand at reachable ports
    pub required_hours: Hours,
    /// Total time budget of the fleet
    pub available_hours: Hours,
    /// Ports with demand which no vessel can serve, even with an unlimited time budget
    pub unreachable_ports: Vec<PortID>,
    /// Ports with demand which vessels could serve, but only with a longer time budget
    pub time_unreachable_ports: Vec<PortID>,
    /// Ports ranked by estimated shortfall
    #[serde(skip)]
    pub underserved_ports: Vec<UnderservedPort>,
    /// Ranked remedial actions
    pub suggestions: Vec<Suggestion>,
}

/// Bounds on what one vessel can do this month
struct VesselBounds {
    /// Whether the vessel can sail any pattern if time is unlimited
    usable: bool,
    /// Most voyages the vessel can fit in its time budget
    max_voyages: i64,
}

/// Hours per centi-tonne for a costed pattern as a fraction (duration, capacity)
fn hours_per_tonne(costed: &CostedPattern, limits: &[VesselLimits]) -> (i128, i128) {
    (
        i128::from(costed.duration.raw()),
        i128::from(limits[costed.vessel_idx].capacity.raw()),
    )
}

/// Convert a fixed-point value held in an `i128` back to a decimal
#[allow(clippy::cast_precision_loss)]
fn to_f64(raw: i128) -> f64 {
    raw as f64 / Fixed::from_units(1).raw() as f64
}

/// Everything computed from the model data, before it is turned into a report
struct GapAnalysis {
    capacity_bound: bool,
    time_bound: bool,
    total_demand: i128,
    reachable_demand: i128,
    deliverable_capacity: i128,
    required_hours: i128,
    available_hours: i128,
    unreachable_ports: Vec<PortID>,
    /// Ports only served by voyages longer than any vessel's budget, with the shortest such voyage
    time_unreachable_ports: IndexMap<PortID, Fixed>,
    /// Demand at ports which can be served within the time budgets
    timed_demand: i128,
    demands: IndexMap<PortID, Fixed>,
}

fn analyse_gap(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
) -> Result<GapAnalysis> {
    let limits = vessel_limits(model)?;
    let demands = port_demands(model)?;
    let min_split_leg = Fixed::from_f64(model.parameters.min_split_leg.value()).unwrap_or_default();
    let voyage_cap = i64::from(model.parameters.max_voyages_per_vessel);

    let mut bounds: Vec<_> = limits
        .iter()
        .map(|_| VesselBounds {
            usable: false,
            max_voyages: 0,
        })
        .collect();
    let mut shortest_trip: Vec<Option<Fixed>> = vec![None; limits.len()];
    // Shortest voyage serving each port if time is unlimited
    let mut shortest_untimed: IndexMap<&PortID, Fixed> = IndexMap::new();
    // Smallest hours per tonne of any pattern serving each port, as (duration, capacity)
    let mut best_rate: IndexMap<&PortID, (i128, i128)> = IndexMap::new();

    for (_, costed) in costed_patterns.iter() {
        let pattern = &patterns[costed.pattern_idx];
        if !serves_demand(pattern, &demands) {
            continue;
        }

        let vessel_limits = &limits[costed.vessel_idx];
        let untimed = VesselLimits {
            time_budget: Fixed::from_raw(i64::MAX),
            ..*vessel_limits
        };
        if max_executions(costed, pattern, &untimed, min_split_leg, voyage_cap) == 0 {
            continue;
        }
        bounds[costed.vessel_idx].usable = true;
        for port in pattern.discharge.as_slice() {
            shortest_untimed
                .entry(port)
                .and_modify(|shortest| *shortest = (*shortest).min(costed.duration))
                .or_insert(costed.duration);
        }

        if max_executions(costed, pattern, vessel_limits, min_split_leg, voyage_cap) == 0 {
            continue;
        }

        let shortest = &mut shortest_trip[costed.vessel_idx];
        if shortest.is_none_or(|duration| costed.duration < duration) {
            *shortest = Some(costed.duration);
        }

        let (duration, capacity) = hours_per_tonne(costed, &limits);
        for port in pattern.discharge.as_slice() {
            best_rate
                .entry(port)
                .and_modify(|best| {
                    if duration * best.1 < best.0 * capacity {
                        *best = (duration, capacity);
                    }
                })
                .or_insert((duration, capacity));
        }
    }

    for ((bound, vessel_limits), shortest) in bounds.iter_mut().zip(&limits).zip(&shortest_trip) {
        bound.max_voyages = match shortest {
            Some(duration) if *duration > Fixed::ZERO => {
                voyage_cap.min(vessel_limits.time_budget.whole_multiples(*duration))
            }
            Some(_) => voyage_cap,
            None => 0,
        };
    }

    let unreachable_ports: Vec<PortID> = demands
        .iter()
        .filter(|(id, demand)| **demand > Fixed::ZERO && !shortest_untimed.contains_key(id))
        .map(|(id, _)| id.clone())
        .collect();
    let time_unreachable_ports: IndexMap<PortID, Fixed> = demands
        .iter()
        .filter(|(id, demand)| **demand > Fixed::ZERO && !best_rate.contains_key(id))
        .filter_map(|(id, _)| Some((id.clone(), *shortest_untimed.get(id)?)))
        .collect();

    let demand_at = |is_served: &dyn Fn(&PortID) -> bool| -> i128 {
        demands
            .iter()
            .filter(|(id, _)| is_served(*id))
            .map(|(_, demand)| i128::from(demand.raw()))
            .sum()
    };
    let total_demand = demand_at(&|_| true);
    let reachable_demand = demand_at(&|id| shortest_untimed.contains_key(id));
    let timed_demand = demand_at(&|id| best_rate.contains_key(id));

    let capacity_limit: i128 = bounds
        .iter()
        .zip(&limits)
        .filter(|(bound, _)| bound.usable)
        .map(|(_, vessel_limits)| i128::from(vessel_limits.capacity.raw()) * i128::from(voyage_cap))
        .sum();
    let deliverable_capacity: i128 = bounds
        .iter()
        .zip(&limits)
        .map(|(bound, vessel_limits)| {
            i128::from(vessel_limits.capacity.raw()) * i128::from(bound.max_voyages)
        })
        .sum();

    // Rounded down, so this never overstates the hours needed
    let required_hours: i128 = best_rate
        .iter()
        .map(|(port, &(duration, capacity))| {
            i128::from(demands[*port].raw()) * duration / capacity.max(1)
        })
        .sum();
    let available_hours: i128 = limits
        .iter()
        .map(|vessel_limits| i128::from(vessel_limits.time_budget.raw()))
        .sum();

    let capacity_bound = reachable_demand > capacity_limit;
    let time_bound = !time_unreachable_ports.is_empty()
        || (reachable_demand > deliverable_capacity && !capacity_bound)
        || required_hours > available_hours;

    Ok(GapAnalysis {
        capacity_bound,
        time_bound,
        total_demand,
        reachable_demand,
        deliverable_capacity,
        required_hours,
        available_hours,
        unreachable_ports,
        time_unreachable_ports,
        timed_demand,
        demands,
    })
}

impl GapAnalysis {
    fn cause(&self) -> InfeasibilityCause {
        match (self.capacity_bound, self.time_bound) {
            (true, true) => InfeasibilityCause::CapacityAndTime,
            (true, false) => InfeasibilityCause::Capacity,
            (false, true) => InfeasibilityCause::Time,
            (false, false) if !self.unreachable_ports.is_empty() => {
                InfeasibilityCause::UnreachablePorts
            }
            (false, false) => InfeasibilityCause::Undetermined,
        }
    }

    fn capacity_gap(&self) -> i128 {
        (self.total_demand - self.deliverable_capacity).max(0)
    }

    /// Estimated cargo which can't be delivered to ports served within the time budgets
    #[allow(clippy::cast_precision_loss)]
    fn timed_shortfall(&self) -> f64 {
        let capacity_shortfall = to_f64((self.timed_demand - self.deliverable_capacity).max(0));
        let time_shortfall = if self.required_hours > self.available_hours {
            to_f64(self.timed_demand)
                * (1.0 - self.available_hours as f64 / self.required_hours as f64)
        } else {
            0.0
        };

        capacity_shortfall.max(time_shortfall)
    }

    /// Whether the port can be served within the time budgets
    fn is_timed_reachable(&self, id: &PortID) -> bool {
        !self.unreachable_ports.contains(id) && !self.time_unreachable_ports.contains_key(id)
    }

    /// Rank ports by estimated shortfall.
    ///
    /// Unreachable ports come first, then ports which are out of reach within the time budgets,
    /// both with their full demand. The remaining shortfall is shared between the other ports in
    /// proportion to their demand.
    #[allow(clippy::cast_precision_loss)]
    fn underserved_ports(&self, model: &Model) -> Vec<UnderservedPort> {
        let full_shortfall = |id: &PortID, unreachable| UnderservedPort {
            port_id: id.clone(),
            demand: model.ports[id].demand(),
            estimated_shortfall: model.ports[id].demand(),
            unreachable,
        };
        let unreachable = self
            .unreachable_ports
            .iter()
            .map(|id| full_shortfall(id, true));
        let time_unreachable = self
            .time_unreachable_ports
            .keys()
            .map(|id| full_shortfall(id, false));

        let shortfall = self.timed_shortfall();
        let timed_demand = to_f64(self.timed_demand);
        let reachable = self
            .demands
            .iter()
            .filter(|(id, demand)| {
                shortfall > 0.0 && **demand > Fixed::ZERO && self.is_timed_reachable(id)
            })
            .map(|(id, demand)| UnderservedPort {
                port_id: id.clone(),
                demand: model.ports[id].demand(),
                estimated_shortfall: Tonnes(shortfall * demand.to_f64() / timed_demand),
                unreachable: false,
            })
            .sorted_by(|a, b| b.estimated_shortfall.0.total_cmp(&a.estimated_shortfall.0));

        unreachable.chain(time_unreachable).chain(reachable).collect()
    }
}

/// Work out suggestions for the planner, most important first
fn suggestions(
    model: &Model,
    analysis: &GapAnalysis,
    status: SolveStatus,
) -> Vec<Suggestion> {
    use SuggestionPriority::{High, Low, Medium};

    let mut suggestions = Vec::new();
    let num_vessels = model.vessels.len();
    #[allow(clippy::cast_precision_loss)]
    let fleet_size = num_vessels.max(1) as f64;
    let average_capacity =
        model.vessels.values().map(|v| v.capacity.value()).sum::<f64>() / fleet_size;
    let average_rate =
        model.vessels.values().map(|v| v.charter_rate.value()).sum::<f64>() / fleet_size;

    let capacity_gap = to_f64(analysis.capacity_gap());
    if analysis.capacity_bound || (analysis.time_bound && capacity_gap > 0.0) {
        let capacity = if average_capacity > 0.0 { average_capacity } else { 25_000.0 };
        let per_vessel = capacity * f64::from(model.parameters.max_voyages_per_vessel);
        let vessels_needed = (capacity_gap / per_vessel).ceil().max(1.0);
        suggestions.push(Suggestion::new(
            High,
            format!("Add {vessels_needed} vessel(s) with about {capacity:.0} t capacity each"),
            format!("Covers a shortfall of {capacity_gap:.0} t"),
            Money(vessels_needed * average_rate * CHARTER_DAYS_PER_MONTH),
        ));
    }

    if analysis.time_bound {
        let extra_hours = to_f64((analysis.required_hours - analysis.available_hours).max(0));
        let (action, impact) = if extra_hours > 0.0 {
            (
                format!("Extend vessel time budgets by at least {extra_hours:.0} hours in total"),
                "Gives the fleet enough hours for the voyages demand requires".to_string(),
            )
        } else {
            (
                "Extend vessel time budgets or allow more voyages per vessel".to_string(),
                "Allows vessels to complete the voyages demand requires".to_string(),
            )
        };
        suggestions.push(Suggestion::new(
            High,
            action,
            impact,
            Money(extra_hours / 24.0 * average_rate),
        ));
    }

    for (port_id, shortest) in &analysis.time_unreachable_ports {
        suggestions.push(Suggestion::new(
            High,
            format!(
                "Extend the time budget of a vessel to at least {} hours to reach {port_id}",
                shortest.to_f64().ceil()
            ),
            format!(
                "Allows {} t of demand to be served",
                model.ports[port_id].demand()
            ),
            Money(0.0),
        ));
    }

    for port_id in &analysis.unreachable_ports {
        suggestions.push(Suggestion::new(
            High,
            format!("Add a vessel and loading port able to serve {port_id}"),
            format!(
                "Allows {} t of demand to be served",
                model.ports[port_id].demand()
            ),
            Money(0.0),
        ));
    }

    if analysis.cause() == InfeasibilityCause::Undetermined {
        suggestions.push(Suggestion::new(
            Medium,
            "Relax max_voyages_per_vessel or min_split_leg_tonnes",
            "Demand fits within capacity and time bounds, so per-voyage limits are binding",
            Money(0.0),
        ));
    }

    if status == SolveStatus::TimedOutNoSolution {
        let solver = &model.parameters.solver;
        if solver.max_solve_time_seconds < SHORT_SOLVE_TIME_SECONDS {
            suggestions.push(Suggestion::new(
                High,
                format!(
                    "Increase max solve time from {}s to 300s or more",
                    solver.max_solve_time_seconds
                ),
                "Allows the solver more time to find a plan",
                Money(0.0),
            ));
        }

        if solver.workers < FEW_WORKERS {
            suggestions.push(Suggestion::new(
                Medium,
                format!("Increase worker threads from {} to 8", solver.workers),
                "Enables parallel search for a plan",
                Money(0.0),
            ));
        }
    }

    if num_vessels < SMALL_FLEET_SIZE {
        suggestions.push(Suggestion::new(
            Medium,
            format!("Include more vessels in the plan (currently {num_vessels})"),
            "Increases routing flexibility and coverage",
            Money(0.0),
        ));
    }

    let total_demand = to_f64(analysis.total_demand);
    if let Some((port_id, demand)) = analysis
        .demands
        .iter()
        .max_by_key(|(_, demand)| **demand)
    {
        let demand = demand.to_f64();
        if total_demand > 0.0 && demand > total_demand * CONCENTRATED_DEMAND_SHARE {
            let reduction = demand - total_demand * BALANCED_DEMAND_SHARE;
            suggestions.push(Suggestion::new(
                Low,
                format!("Reduce demand at {port_id} by {reduction:.0} t"),
                "Balances demand across ports",
                Money(0.0),
            ));
        }
    }

    suggestions.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.cost_estimate.0.total_cmp(&a.cost_estimate.0))
    });
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Explain why no plan was found.
///
/// # Arguments
///
/// * `model` - The model
/// * `patterns` - All voyage patterns
/// * `costed_patterns` - Every pattern costed for every vessel
/// * `solution` - The solver output
pub fn diagnose(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    solution: &RawSolution,
) -> Result<InfeasibilityReport> {
    let analysis = analyse_gap(model, patterns, costed_patterns)?;
    let cause = analysis.cause();
    warn!(
        "No plan found ({}); cause: {cause}, estimated capacity gap {} t",
        solution.status,
        to_f64(analysis.capacity_gap())
    );

    Ok(InfeasibilityReport {
        status: solution.status,
        solve_time_seconds: solution.solve_time.as_secs_f64(),
        time_limit_seconds: model.parameters.solver.max_solve_time_seconds,
        cause,
        capacity_bound: analysis.capacity_bound,
        time_bound: analysis.time_bound,
        total_demand: Tonnes(to_f64(analysis.total_demand)),
        deliverable_capacity: Tonnes(to_f64(analysis.deliverable_capacity)),
        capacity_gap: Tonnes(to_f64(analysis.capacity_gap())),
        required_hours: Hours(to_f64(analysis.required_hours)),
        available_hours: Hours(to_f64(analysis.available_hours)),
        unreachable_ports: analysis.unreachable_ports.clone(),
        time_unreachable_ports: analysis.time_unreachable_ports.keys().cloned().collect(),
        underserved_ports: analysis.underserved_ports(model),
        suggestions: suggestions(model, &analysis, solution.status),
    })
}
