//! Code for adding constraints to the assignment model.
use super::{AssignmentModel, ConstraintKind, RowDef, Variable, VesselLimits};
use crate::costing::CostedPatterns;
use crate::fixed::Fixed;
use crate::model::Model;
use crate::pattern::VoyagePattern;
use crate::port::PortID;
use indexmap::IndexMap;

/// Add all constraints to the model.
///
/// Must be called after all variables have been added.
pub fn add_constraints(
    assignment_model: &mut AssignmentModel,
    model: &Model,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    limits: &[VesselLimits],
    demands: &IndexMap<PortID, Fixed>,
    min_split_leg: Fixed,
) {
    add_demand_constraints(assignment_model, patterns, costed_patterns, demands);
    add_leg_capacity_constraints(assignment_model, costed_patterns, limits);
    add_min_split_leg_constraints(assignment_model, min_split_leg);
    add_vessel_constraints(assignment_model, model, costed_patterns, limits);
}

/// Add a demand equality constraint for every unloading port.
///
/// A row is added even for ports which no variable serves. Unreachable demand leaves the model
/// infeasible.
fn add_demand_constraints(
    assignment_model: &mut AssignmentModel,
    patterns: &[VoyagePattern],
    costed_patterns: &CostedPatterns,
    demands: &IndexMap<PortID, Fixed>,
) {
    let mut terms: IndexMap<&PortID, Vec<(Variable, i64)>> =
        demands.keys().map(|id| (id, Vec::new())).collect();
    for (idx, columns) in assignment_model.variables.iter() {
        let pattern = &patterns[costed_patterns[idx].pattern_idx];
        for (port_id, &leg) in pattern.discharge.as_slice().iter().zip(&columns.legs) {
            if let Some(port_terms) = terms.get_mut(port_id) {
                port_terms.push((leg, 1));
            }
        }
    }

    let rows: Vec<_> = terms
        .into_iter()
        .map(|(port_id, terms)| {
            RowDef::equal(
                ConstraintKind::Demand(port_id.clone()),
                demands[port_id].raw(),
                terms,
            )
        })
        .collect();
    assignment_model.rows.extend(rows);
}

/// Add constraints limiting the cargo carried on each voyage to the vessel's capacity.
///
/// The volume variables hold totals over all executions, so the total over all legs must not
/// exceed capacity times the number of executions.
fn add_leg_capacity_constraints(
    assignment_model: &mut AssignmentModel,
    costed_patterns: &CostedPatterns,
    limits: &[VesselLimits],
) {
    let rows: Vec<_> = assignment_model
        .variables
        .iter()
        .map(|(idx, columns)| {
            let capacity = limits[costed_patterns[idx].vessel_idx].capacity;
            let mut terms: Vec<_> = columns.legs.iter().map(|&leg| (leg, 1)).collect();
            terms.push((columns.count, -capacity.raw()));
            RowDef::at_most(ConstraintKind::LegCapacity(idx), 0, terms)
        })
        .collect();
    assignment_model.rows.extend(rows);
}

/// Add constraints requiring each leg of a split voyage to carry at least the minimum volume
fn add_min_split_leg_constraints(assignment_model: &mut AssignmentModel, min_split_leg: Fixed) {
    if min_split_leg <= Fixed::ZERO {
        return;
    }

    let rows: Vec<_> = assignment_model
        .variables
        .iter()
        .filter(|(_, columns)| columns.legs.len() > 1)
        .flat_map(|(idx, columns)| {
            columns.legs.iter().map(move |&leg| {
                RowDef::at_least(
                    ConstraintKind::MinSplitLeg(idx),
                    0,
                    vec![(leg, 1), (columns.count, -min_split_leg.raw())],
                )
            })
        })
        .collect();
    assignment_model.rows.extend(rows);
}

/// Add time budget and voyage cap constraints for every vessel with at least one variable
fn add_vessel_constraints(
    assignment_model: &mut AssignmentModel,
    model: &Model,
    costed_patterns: &CostedPatterns,
    limits: &[VesselLimits],
) {
    let mut counts_by_vessel: Vec<Vec<(Variable, Fixed)>> = vec![Vec::new(); limits.len()];
    for (idx, columns) in assignment_model.variables.iter() {
        let costed = &costed_patterns[idx];
        counts_by_vessel[costed.vessel_idx].push((columns.count, costed.duration));
    }

    let voyage_cap = i64::from(model.parameters.max_voyages_per_vessel);
    for ((vessel_id, vessel_limits), counts) in
        model.vessels.keys().zip(limits).zip(counts_by_vessel)
    {
        if counts.is_empty() {
            continue;
        }

        let time_terms = counts
            .iter()
            .map(|&(count, duration)| (count, duration.raw()))
            .collect();
        assignment_model.rows.push(RowDef::at_most(
            ConstraintKind::TimeBudget(vessel_id.clone()),
            vessel_limits.time_budget.raw(),
            time_terms,
        ));

        let cap_terms = counts.iter().map(|&(count, _)| (count, 1)).collect();
        assignment_model.rows.push(RowDef::at_most(
            ConstraintKind::VoyageCap(vessel_id.clone()),
            voyage_cap,
            cap_terms,
        ));
    }
}
