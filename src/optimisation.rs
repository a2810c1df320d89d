//! Code for building the integer assignment model.
//!
//! The model is expressed as plain integer columns and rows, which any
//! [`Solver`](crate::solver::Solver) can take. All coefficients are fixed-point values (see
//! [`crate::fixed`]) and a solution can be checked exactly.
//!
//! For each vessel and each pattern it can sail there is one count variable, giving the number of
//! times the pattern is sailed this month, and one volume variable per discharge port, giving the
//! total cargo discharged there over all of those voyages. For split patterns the division of
//! cargo between the two ports is therefore chosen by the solver.
use crate::costing::{CostedPattern, CostedPatternIdx, CostedPatterns};
use crate::error::PlanningError;
use crate::fixed::Fixed;
use crate::model::{Model, ObjectiveKind};
use crate::pattern::VoyagePattern;
use crate::port::PortID;
use crate::vessel::VesselID;
use anyhow::Result;
use indexmap::IndexMap;
use log::debug;

pub mod constraints;
use constraints::add_constraints;

/// The index of a column in an [`AssignmentModel`]
pub type Variable = usize;

/// An integer decision variable with a lower bound of zero
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct ColumnDef {
    /// Objective coefficient
    pub cost: i64,
    /// Upper bound
    pub upper: i64,
}

/// What a row of the model constrains
#[derive(PartialEq, Eq, Debug, Clone, derive_more::Display)]
pub enum ConstraintKind {
    /// Cargo discharged at a port must equal its demand
    #[display("demand at {_0}")]
    Demand(PortID),
    /// Cargo carried on each voyage must not exceed the vessel's capacity
    #[display("capacity of costed pattern {}", _0.0)]
    LegCapacity(CostedPatternIdx),
    /// Each leg of a split voyage must carry a minimum volume
    #[display("minimum split leg of costed pattern {}", _0.0)]
    MinSplitLeg(CostedPatternIdx),
    /// A vessel's voyages must fit in its time budget
    #[display("time budget of {_0}")]
    TimeBudget(VesselID),
    /// A vessel can only make a limited number of voyages
    #[display("voyage cap of {_0}")]
    VoyageCap(VesselID),
}

/// A linear constraint on integer columns
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RowDef {
    /// What the row constrains
    pub kind: ConstraintKind,
    /// Lower bound, if any
    pub lower: Option<i64>,
    /// Upper bound, if any
    pub upper: Option<i64>,
    /// Column coefficients
    pub terms: Vec<(Variable, i64)>,
}

impl RowDef {
    /// Create an equality row
    pub fn equal(kind: ConstraintKind, value: i64, terms: Vec<(Variable, i64)>) -> Self {
        Self {
            kind,
            lower: Some(value),
            upper: Some(value),
            terms,
        }
    }

    /// Create a row with an upper bound only
    pub fn at_most(kind: ConstraintKind, value: i64, terms: Vec<(Variable, i64)>) -> Self {
        Self {
            kind,
            lower: None,
            upper: Some(value),
            terms,
        }
    }

    /// Create a row with a lower bound only
    pub fn at_least(kind: ConstraintKind, value: i64, terms: Vec<(Variable, i64)>) -> Self {
        Self {
            kind,
            lower: Some(value),
            upper: None,
            terms,
        }
    }

    /// Evaluate the row for an integer assignment, in 128-bit arithmetic
    fn activity(&self, values: &[i64]) -> i128 {
        self.terms
            .iter()
            .map(|&(var, coeff)| i128::from(coeff) * i128::from(values[var]))
            .sum()
    }

    /// Whether the row is satisfied by an integer assignment
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let activity = self.activity(values);
        self.lower.is_none_or(|lower| activity >= i128::from(lower))
            && self.upper.is_none_or(|upper| activity <= i128::from(upper))
    }
}

/// The columns associated with one costed pattern
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct AssignmentColumns {
    /// Number of times the pattern is sailed
    pub count: Variable,
    /// Total cargo (centi-tonnes) discharged at each port of the pattern, in order of visit
    pub legs: Vec<Variable>,
}

/// A map for easy lookup of variables in the model.
///
/// Only costed patterns which the vessel can actually sail appear here. The entries are ordered
/// (see [`IndexMap`]).
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct VariableMap(IndexMap<CostedPatternIdx, AssignmentColumns>);

impl VariableMap {
    /// Get the columns for the given costed pattern, if it is in the model
    pub fn get(&self, idx: CostedPatternIdx) -> Option<&AssignmentColumns> {
        self.0.get(&idx)
    }

    /// Iterate over the costed patterns in the model and their columns
    pub fn iter(&self) -> impl Iterator<Item = (CostedPatternIdx, &AssignmentColumns)> {
        self.0.iter().map(|(idx, columns)| (*idx, columns))
    }

    /// The number of costed patterns in the model
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the model has no variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fixed-point limits for a vessel
#[derive(Debug, Clone, Copy)]
pub struct VesselLimits {
    /// Capacity (centi-tonnes)
    pub capacity: Fixed,
    /// Monthly time budget (centi-hours)
    pub time_budget: Fixed,
}

/// The integer assignment model
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct AssignmentModel {
    /// Columns of the model
    pub columns: Vec<ColumnDef>,
    /// Rows of the model
    pub rows: Vec<RowDef>,
    /// Lookup from costed patterns to columns
    pub variables: VariableMap,
}

impl AssignmentModel {
    fn add_column(&mut self, cost: i64, upper: i64) -> Variable {
        self.columns.push(ColumnDef { cost, upper });
        self.columns.len() - 1
    }

    /// Check an integer assignment against the bounds of every column and every row.
    ///
    /// # Returns
    ///
    /// An [`PlanningError::InvariantViolation`] naming the first bound or row which is violated.
    pub fn check_assignment(&self, values: &[i64]) -> Result<(), PlanningError> {
        if values.len() != self.columns.len() {
            return Err(PlanningError::InvariantViolation(format!(
                "Expected {} values but got {}",
                self.columns.len(),
                values.len()
            )));
        }

        for (var, (column, &value)) in self.columns.iter().zip(values).enumerate() {
            if !(0..=column.upper).contains(&value) {
                return Err(PlanningError::InvariantViolation(format!(
                    "Column {var} has value {value} outside of [0, {}]",
                    column.upper
                )));
            }
        }

        if let Some(row) = self.rows.iter().find(|row| !row.is_satisfied(values)) {
            return Err(PlanningError::InvariantViolation(format!(
                "Constraint on {} is not satisfied",
                row.kind
            )));
        }

        Ok(())
    }

    /// Round the values returned by a solver to integers and check that they satisfy the model
    /// exactly.
    ///
    /// # Returns
    ///
    /// The integer values, or an [`PlanningError::InvariantViolation`] if any value is not finite
    /// or they don't satisfy the model.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn round_assignment(&self, values: &[f64]) -> Result<Vec<i64>, PlanningError> {
        let values: Vec<i64> = values
            .iter()
            .enumerate()
            .map(|(var, value)| {
                let rounded = value.round();
                if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                    Ok(rounded as i64)
                } else {
                    Err(PlanningError::InvariantViolation(format!(
                        "Column {var} has invalid value {value}"
                    )))
                }
            })
            .collect::<Result<_, _>>()?;

        self.check_assignment(&values)?;
        Ok(values)
    }

    /// As [`AssignmentModel::round_assignment`], but returning `None` on failure
    pub fn integral_assignment(&self, values: &[f64]) -> Option<Vec<i64>> {
        self.round_assignment(values).ok()
    }

    /// The objective value for an integer assignment
    pub fn objective_value(&self, values: &[i64]) -> i128 {
        self.columns
            .iter()
            .zip(values)
            .map(|(column, &value)| i128::from(column.cost) * i128::from(value))
            .sum()
    }
}

/// Convert a decimal quantity to fixed point, reporting which field it came from on failure
fn to_fixed(field: String, value: f64) -> Result<Fixed, PlanningError> {
    Fixed::from_f64(value)
        .ok_or_else(|| PlanningError::invalid(field, "cannot be represented as a fixed-point number"))
}

/// Get the fixed-point capacity and time budget of every vessel, in map order
pub fn vessel_limits(model: &Model) -> Result<Vec<VesselLimits>, PlanningError> {
    model
        .vessels
        .values()
        .map(|vessel| {
            Ok(VesselLimits {
                capacity: to_fixed(format!("capacity_t of {}", vessel.id), vessel.capacity.value())?,
                time_budget: to_fixed(
                    format!("monthly_time_budget_hours of {}", vessel.id),
                    vessel.time_budget.value(),
                )?,
            })
        })
        .collect()
}

/// Get the fixed-point demand of every unloading port, in map order
pub fn port_demands(model: &Model) -> Result<IndexMap<PortID, Fixed>, PlanningError> {
    model
        .iter_unloading_port_ids()
        .map(|id| {
            let demand = to_fixed(format!("demand_t of {id}"), model.ports[id].demand().value())?;
            Ok((id.clone(), demand))
        })
        .collect()
}

/// Whether every port a pattern discharges at has some demand
pub fn serves_demand(pattern: &VoyagePattern, demands: &IndexMap<PortID, Fixed>) -> bool {
    pattern
        .discharge
        .as_slice()
        .iter()
        .all(|port| demands.get(port).is_some_and(|demand| *demand > Fixed::ZERO))
}

/// The most times a vessel could sail a costed pattern, ignoring its other voyages.
///
/// Returns zero if the pattern can't be sailed at all, either because one voyage takes longer than
/// the vessel's time budget or because a split voyage can't carry the minimum volume to both
/// ports.
pub fn max_executions(
    costed: &CostedPattern,
    pattern: &VoyagePattern,
    limits: &VesselLimits,
    min_split_leg: Fixed,
    voyage_cap: i64,
) -> i64 {
    if pattern.discharge.is_split() && min_split_leg.times(2) > limits.capacity {
        return 0;
    }

    if costed.duration <= Fixed::ZERO {
        return voyage_cap;
    }

    voyage_cap.min(limits.time_budget.whole_multiples(costed.duration))
}

/// The objective coefficient for one execution of a costed pattern
fn objective_coefficient(costed: &CostedPattern, objective: ObjectiveKind) -> i64 {
    match objective {
        ObjectiveKind::Cost => costed.cost.total.raw(),
        ObjectiveKind::Time => costed.duration.raw(),
        ObjectiveKind::Emissions => costed.emissions.raw(),
        ObjectiveKind::Utilisation => 1,
    }
}

/// Build the assignment model.
///
/// # Arguments
///
/// * `model` - The model
/// * `patterns` - All voyage patterns
/// * `costed_patterns` - Every pattern costed for every vessel
///
/// # Returns
///
/// An integer model whose solutions are valid voyage assignments.
pub fn build_assignment_model(
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
) -> Result<AssignmentModel> {
    let limits = vessel_limits(model)?;
    let demands = port_demands(model)?;
    let min_split_leg = to_fixed(
        "min_split_leg_tonnes".into(),
        model.parameters.min_split_leg.value(),
    )?;
    let voyage_cap = i64::from(model.parameters.max_voyages_per_vessel);

    let mut assignment_model = AssignmentModel::default();
    add_variables(
        &mut assignment_model,
        model.parameters.objective,
        patterns,
        costed_patterns,
        &limits,
        &demands,
        min_split_leg,
        voyage_cap,
    )?;
    add_constraints(
        &mut assignment_model,
        model,
        patterns,
        costed_patterns,
        &limits,
        &demands,
        min_split_leg,
    );

    debug!(
        "Assignment model has {} variables for {} costed patterns and {} constraints",
        assignment_model.columns.len(),
        assignment_model.variables.len(),
        assignment_model.rows.len()
    );

    Ok(assignment_model)
}

/// Add variables for each costed pattern which can be sailed by its vessel.
///
/// Patterns which discharge at a port with no demand are left out, as they could never carry any
/// cargo there.
#[allow(clippy::too_many_arguments)]
fn add_variables(
    assignment_model: &mut AssignmentModel,
    objective: ObjectiveKind,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    limits: &[VesselLimits],
    demands: &IndexMap<PortID, Fixed>,
    min_split_leg: Fixed,
    voyage_cap: i64,
) -> Result<(), PlanningError> {
    for (idx, costed) in costed_patterns.iter() {
        let pattern = &patterns[costed.pattern_idx];
        let vessel_limits = &limits[costed.vessel_idx];
        if !serves_demand(pattern, demands) {
            continue;
        }

        let max = max_executions(costed, pattern, vessel_limits, min_split_leg, voyage_cap);
        if max == 0 {
            continue;
        }

        let leg_upper = vessel_limits.capacity.raw().checked_mul(max).ok_or_else(|| {
            PlanningError::invalid("capacity_t", "is too large to be represented in the model")
        })?;

        let count = assignment_model.add_column(objective_coefficient(costed, objective), max);
        let legs = pattern
            .discharge
            .as_slice()
            .iter()
            .map(|_| assignment_model.add_column(0, leg_upper))
            .collect();
        assignment_model
            .variables
            .0
            .insert(idx, AssignmentColumns { count, legs });
    }

    Ok(())
}
