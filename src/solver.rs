//! Solvers for the integer assignment model.
//!
//! [`HighsSolver`] is the default implementation of [`Solver`].
use crate::model::SolverParameters;
use crate::optimisation::AssignmentModel;
use anyhow::{Result, anyhow};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;
use serde_string_enum::SerializeLabeledStringEnum;
use std::time::{Duration, Instant};

/// The outcome reported by a solver
#[derive(PartialEq, Eq, Debug, Clone, Copy, SerializeLabeledStringEnum)]
pub enum SolveStatus {
    /// The assignment is proven to be the best possible
    #[string = "optimal"]
    Optimal,
    /// The assignment is valid, but the solver stopped before proving it optimal
    #[string = "feasible"]
    Feasible,
    /// The solver proved that no valid assignment exists
    #[string = "infeasible"]
    Infeasible,
    /// The solver stopped without finding a valid assignment or proving there is none
    #[string = "timed_out_no_solution"]
    TimedOutNoSolution,
}

impl SolveStatus {
    /// Whether the solver returned a usable assignment
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

/// Options passed to a solver
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Wall-clock limit for the solve
    pub time_limit: Duration,
    /// Maximum number of threads to use
    pub workers: u32,
    /// Seed for any randomised decisions, for reproducible results
    pub random_seed: u32,
}

impl From<&SolverParameters> for SolverOptions {
    fn from(params: &SolverParameters) -> Self {
        Self {
            time_limit: params.time_limit(),
            workers: params.workers,
            random_seed: params.random_seed,
        }
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::from(&SolverParameters::default())
    }
}

/// The raw output of a solver, before any interpretation
#[derive(PartialEq, Debug, Clone)]
pub struct RawSolution {
    /// What the solver found
    pub status: SolveStatus,
    /// Value of each column, in order (empty if there is no solution)
    pub values: Vec<f64>,
    /// Time spent solving
    pub solve_time: Duration,
}

/// Something which can solve an [`AssignmentModel`]
pub trait Solver {
    /// Solve the model within the given limits.
    ///
    /// An error is returned only if the engine itself fails. An infeasible model or an exhausted
    /// time limit are reported through [`RawSolution::status`].
    fn solve(&self, model: &AssignmentModel, options: &SolverOptions) -> Result<RawSolution>;
}

/// Solves assignment models with the `HiGHS` mixed-integer solver
#[derive(Debug, Default, Clone, Copy)]
pub struct HighsSolver;

impl HighsSolver {
    /// Translate the model into a `HiGHS` problem
    #[allow(clippy::cast_precision_loss)]
    fn to_problem(model: &AssignmentModel) -> Problem {
        let mut problem = Problem::default();
        let columns: Vec<_> = model
            .columns
            .iter()
            .map(|column| problem.add_integer_column(column.cost as f64, 0.0..=column.upper as f64))
            .collect();

        for row in &model.rows {
            let terms: Vec<_> = row
                .terms
                .iter()
                .map(|&(var, coeff)| (columns[var], coeff as f64))
                .collect();
            match (row.lower, row.upper) {
                (Some(lower), Some(upper)) => {
                    problem.add_row((lower as f64)..=(upper as f64), terms);
                }
                (Some(lower), None) => {
                    problem.add_row((lower as f64).., terms);
                }
                (None, Some(upper)) => {
                    problem.add_row(..=(upper as f64), terms);
                }
                (None, None) => {}
            }
        }

        problem
    }
}

impl Solver for HighsSolver {
    fn solve(&self, model: &AssignmentModel, options: &SolverOptions) -> Result<RawSolution> {
        let mut highs_model = Self::to_problem(model).optimise(Sense::Minimise);
        enable_highs_logging(&mut highs_model);
        highs_model.set_option("time_limit", options.time_limit.as_secs_f64());
        highs_model.set_option("threads", i32::try_from(options.workers).unwrap_or(i32::MAX));
        highs_model.set_option(
            "random_seed",
            i32::try_from(options.random_seed).unwrap_or(i32::MAX),
        );
        highs_model.set_option("mip_rel_gap", 0.0);

        let start = Instant::now();
        let solved = highs_model
            .try_solve()
            .map_err(|status| anyhow!("HiGHS failed to solve the model: {status:?}"))?;
        let solve_time = start.elapsed();

        let highs_status = solved.status();
        debug!("HiGHS finished with status {highs_status:?} in {solve_time:?}");
        let values = solved.get_solution().columns().to_vec();
        let status = match highs_status {
            HighsModelStatus::Optimal => SolveStatus::Optimal,
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                SolveStatus::Infeasible
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                if model.integral_assignment(&values).is_some() {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::TimedOutNoSolution
                }
            }
            // The only assignment for a model without columns is the empty one
            HighsModelStatus::ModelEmpty => {
                if model.integral_assignment(&values).is_some() {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Infeasible
                }
            }
            status => return Err(anyhow!("Could not solve: {status:?}")),
        };

        let values = if status.has_solution() {
            values
        } else {
            Vec::new()
        };

        Ok(RawSolution {
            status,
            values,
            solve_time,
        })
    }
}

/// Enable console output for the `HiGHS` solver, but only when debugging
fn enable_highs_logging(model: &mut highs::Model) {
    let verbose = crate::log::is_verbose();
    model.set_option("output_flag", verbose);
    model.set_option("log_to_console", verbose);
}
