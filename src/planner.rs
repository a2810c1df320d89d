//! Runs the planning pipeline from a validated model to a plan or an explanation of why there is
//! none.
use crate::costing::{CostedPatterns, cost_patterns};
use crate::diagnostics::{InfeasibilityReport, diagnose};
use crate::error::PlanningError;
use crate::model::Model;
use crate::optimisation::build_assignment_model;
use crate::pattern::{VoyagePattern, generate_patterns};
use crate::result::{PlanResult, extract_result};
use crate::solver::{SolveStatus, Solver, SolverOptions};
use anyhow::Result;
use itertools::Itertools;
use log::info;

/// What a planning run produced
#[derive(PartialEq, Debug, Clone)]
pub enum PlanOutcome {
    /// A plan was found
    Solved(PlanResult),
    /// No plan was found, either because none exists or because the solver ran out of time
    Unsolved(InfeasibilityReport),
}

impl PlanOutcome {
    /// Convert an unsolved outcome into the corresponding [`PlanningError`]
    pub fn into_result(self) -> Result<PlanResult> {
        match self {
            Self::Solved(result) => Ok(result),
            Self::Unsolved(report) => Err(match report.status {
                SolveStatus::TimedOutNoSolution => PlanningError::SolverTimeout {
                    time_limit_secs: report.time_limit_seconds,
                },
                _ => PlanningError::ModelInfeasible {
                    capacity_gap: report.capacity_gap,
                },
            }
            .into()),
        }
    }
}

/// A planning run, with the intermediate data needed for debugging output
#[derive(Debug, Clone)]
pub struct Plan {
    /// Every voyage pattern considered
    pub patterns: Vec<VoyagePattern>,
    /// Every pattern costed for every vessel
    pub costed_patterns: CostedPatterns,
    /// The plan, or an explanation of why there isn't one
    pub outcome: PlanOutcome,
}

/// Plan voyages for the fleet in `model`.
///
/// # Arguments
///
/// * `model` - The model to plan for
/// * `solver` - The engine used to solve the assignment model
///
/// # Returns
///
/// The plan, or an error if the input is invalid, a sailing time is missing, the solver fails or
/// the solution breaks one of the model's invariants. A model with no solution is not an error.
pub fn plan_fleet(model: &Model, solver: &dyn Solver) -> Result<Plan> {
    model.validate()?;

    let loading_ports = model.iter_loading_port_ids().cloned().collect_vec();
    let unloading_ports = model.iter_unloading_port_ids().cloned().collect_vec();
    let patterns = generate_patterns(&loading_ports, &unloading_ports);
    info!("Generated {} voyage patterns", patterns.len());

    let costed_patterns = cost_patterns(
        &model.vessels,
        &model.ports,
        &patterns,
        &model.sailing_times,
        &model.parameters,
    )?;

    let assignment_model = build_assignment_model(model, &patterns, &costed_patterns)?;
    info!(
        "Built assignment model with {} columns and {} constraints",
        assignment_model.columns.len(),
        assignment_model.rows.len()
    );

    let options = SolverOptions::from(&model.parameters.solver);
    let solution = solver.solve(&assignment_model, &options)?;
    info!(
        "Solver finished with status {} after {:.2}s",
        solution.status,
        solution.solve_time.as_secs_f64()
    );

    let outcome = if solution.status.has_solution() {
        PlanOutcome::Solved(extract_result(
            model,
            &patterns,
            &costed_patterns,
            &assignment_model,
            &solution,
        )?)
    } else {
        PlanOutcome::Unsolved(diagnose(model, &patterns, &costed_patterns, &solution)?)
    };

    Ok(Plan {
        patterns,
        costed_patterns,
        outcome,
    })
}
