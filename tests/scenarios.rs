//! End-to-end planning scenarios solved with `HiGHS`.
use anyhow::Result;
use fleetplan::diagnostics::InfeasibilityCause;
use fleetplan::error::PlanningError;
use fleetplan::model::{Model, ModelParameters};
use fleetplan::optimisation::AssignmentModel;
use fleetplan::planner::{PlanOutcome, plan_fleet};
use fleetplan::port::{Port, PortID, PortRole};
use fleetplan::result::PlanResult;
use fleetplan::sailing::SailingTimeTable;
use fleetplan::solver::{HighsSolver, RawSolution, SolveStatus, Solver, SolverOptions};
use fleetplan::units::{Hours, Money, MoneyPerDay, MoneyPerTonne, Tonnes, TonnesPerDay};
use fleetplan::vessel::Vessel;
use float_cmp::assert_approx_eq;
use std::path::PathBuf;

fn vessel(id: &str, capacity: f64, time_budget: f64) -> Vessel {
    Vessel {
        id: id.into(),
        capacity: Tonnes(capacity),
        charter_rate: MoneyPerDay(24_000.0),
        fuel_burn: TonnesPerDay(24.0),
        time_budget: Hours(time_budget),
    }
}

fn port(id: &str, demand: Option<f64>) -> Port {
    let (role, handling_charge) = match demand {
        Some(demand) => (
            PortRole::Unloading {
                demand: Tonnes(demand),
            },
            Money(500.0),
        ),
        None => (PortRole::Loading, Money(1_000.0)),
    };

    Port {
        id: id.into(),
        role,
        handling_charge,
    }
}

/// A model with one loading port and two unloading ports
fn model(vessels: Vec<Vessel>, demand_u1: f64, demand_u2: f64) -> Model {
    let ports = [
        port("L1", None),
        port("U1", Some(demand_u1)),
        port("U2", Some(demand_u2)),
    ];
    let sailing_times: SailingTimeTable = [
        ("L1", "U1", 12.0),
        ("L1", "U2", 24.0),
        ("U1", "U2", 6.0),
        ("U2", "U1", 6.0),
    ]
    .into_iter()
    .map(|(from, to, hours)| (from.into(), to.into(), Hours(hours)))
    .collect();

    Model {
        model_path: PathBuf::new(),
        parameters: ModelParameters {
            fuel_price: MoneyPerTonne(500.0),
            ..ModelParameters::default()
        },
        vessels: vessels.into_iter().map(|v| (v.id.clone(), v)).collect(),
        ports: ports.into_iter().map(|p| (p.id.clone(), p)).collect(),
        sailing_times,
    }
}

fn solve(model: &Model) -> PlanOutcome {
    plan_fleet(model, &HighsSolver).unwrap().outcome
}

fn solved(model: &Model) -> PlanResult {
    match solve(model) {
        PlanOutcome::Solved(result) => result,
        PlanOutcome::Unsolved(report) => panic!("No plan found: {report:?}"),
    }
}

/// Check the invariants every plan must satisfy
fn check_plan(model: &Model, result: &PlanResult) {
    assert!(result.summary.status.has_solution());
    assert!(result.summary.demand_matched);
    assert_approx_eq!(f64, result.summary.demand_satisfaction_percentage, 100.0);

    for delivery in &result.port_deliveries {
        assert_eq!(delivery.delivered, delivery.demand);
    }

    for trip in &result.trips {
        let vessel = &model.vessels[&trip.vessel_id];
        assert!(trip.cargo() <= vessel.capacity);
    }

    for utilisation in &result.vessel_utilisation {
        assert!(utilisation.used_hours <= utilisation.time_budget);
    }
}

#[test]
fn test_single_direct_voyage() {
    let model = model(vec![vessel("T1", 50_000.0, 720.0)], 40_000.0, 0.0);
    let result = solved(&model);
    check_plan(&model, &result);

    assert_eq!(result.summary.status, SolveStatus::Optimal);
    assert_eq!(result.trips.len(), 1);
    let trip = &result.trips[0];
    assert_eq!(trip.deliveries.len(), 1);
    assert_eq!(trip.deliveries[0].port_id, "U1".into());
    assert_eq!(trip.deliveries[0].volume, Tonnes(40_000.0));
    assert_eq!(trip.duration, Hours(22.0));
    assert_eq!(trip.total_cost, Money(29_500.0));
    assert_eq!(result.summary.total_cost, Money(29_500.0));
}

#[test]
fn test_capacity_infeasible() {
    let model = model(vec![vessel("T1", 50_000.0, 720.0)], 600_000.0, 300_000.0);
    let PlanOutcome::Unsolved(report) = solve(&model) else {
        panic!("Expected no plan");
    };

    assert_eq!(report.status, SolveStatus::Infeasible);
    assert_eq!(report.cause, InfeasibilityCause::Capacity);
    assert_eq!(report.capacity_gap, Tonnes(400_000.0));
    assert!(!report.suggestions.is_empty());

    let err = PlanOutcome::Unsolved(report).into_result().unwrap_err();
    assert_eq!(
        err.downcast_ref::<PlanningError>(),
        Some(&PlanningError::ModelInfeasible {
            capacity_gap: Tonnes(400_000.0)
        })
    );
}

#[test]
fn test_split_voyage() {
    // Discharging at both ports on one voyage is cheaper than two direct voyages
    let model = model(vec![vessel("T1", 50_000.0, 720.0)], 30_000.0, 20_000.0);
    let result = solved(&model);
    check_plan(&model, &result);

    assert_eq!(result.trips.len(), 1);
    let trip = &result.trips[0];
    assert_eq!(trip.deliveries.len(), 2);
    assert_eq!(trip.deliveries[0].port_id, "U1".into());
    assert_eq!(trip.deliveries[0].volume, Tonnes(30_000.0));
    assert_eq!(trip.deliveries[1].port_id, "U2".into());
    assert_eq!(trip.deliveries[1].volume, Tonnes(20_000.0));
    assert_eq!(result.summary.total_cost, Money(43_000.0));
}

#[test]
fn test_split_voyages_respect_capacity() {
    // Two full voyages are needed. No single trip may carry more than the capacity.
    let model = model(vec![vessel("T1", 50_000.0, 720.0)], 60_000.0, 40_000.0);
    let result = solved(&model);
    check_plan(&model, &result);

    assert_eq!(result.trips.len(), 2);
    for trip in &result.trips {
        assert_eq!(trip.cargo(), Tonnes(50_000.0));
    }
}

#[test]
fn test_split_demand_above_capacity() {
    // Each port fits in one voyage but together they don't
    let model = model(vec![vessel("T1", 50_000.0, 720.0)], 30_000.0, 30_000.0);
    let result = solved(&model);
    check_plan(&model, &result);

    assert_eq!(result.trips.len(), 2);
    let mut delivered = [Tonnes(0.0), Tonnes(0.0)];
    for trip in &result.trips {
        assert!(trip.cargo() <= Tonnes(50_000.0));
        for delivery in &trip.deliveries {
            assert!(delivery.volume <= Tonnes(50_000.0));
            let idx = usize::from(delivery.port_id != PortID::from("U1"));
            delivered[idx] = delivered[idx] + delivery.volume;
        }
    }
    assert_eq!(delivered, [Tonnes(30_000.0), Tonnes(30_000.0)]);
}

#[test]
fn test_port_beyond_time_budget() {
    // The only voyage with demand takes 22 hours
    let model = model(vec![vessel("T1", 50_000.0, 20.0)], 10_000.0, 0.0);
    let PlanOutcome::Unsolved(report) = solve(&model) else {
        panic!("Expected no plan");
    };

    assert_eq!(report.cause, InfeasibilityCause::Time);
    assert!(report.time_bound);
    assert!(report.unreachable_ports.is_empty());
    assert_eq!(report.time_unreachable_ports, [PortID::from("U1")]);
}

#[test]
fn test_time_bound() {
    let model = model(vec![vessel("T1", 50_000.0, 100.0)], 150_000.0, 100_000.0);
    let PlanOutcome::Unsolved(report) = solve(&model) else {
        panic!("Expected no plan");
    };

    assert_eq!(report.status, SolveStatus::Infeasible);
    assert_eq!(report.cause, InfeasibilityCause::Time);
    assert!(report.time_bound);
    assert!(!report.capacity_bound);
}

#[test]
fn test_multiple_vessels() {
    let model = model(
        vec![
            vessel("T1", 50_000.0, 720.0),
            vessel("T2", 30_000.0, 200.0),
            vessel("T3", 25_000.0, 100.0),
        ],
        140_000.0,
        65_000.0,
    );
    let result = solved(&model);
    check_plan(&model, &result);
    assert_eq!(result.vessel_utilisation.len(), 3);
}

#[test]
fn test_resolve_is_idempotent() {
    let model = model(
        vec![vessel("T1", 50_000.0, 720.0), vessel("T2", 30_000.0, 720.0)],
        70_000.0,
        45_000.0,
    );
    let first = solved(&model);
    let second = solved(&model);

    assert_eq!(first.trips, second.trips);
    assert_eq!(first.summary.total_cost, second.summary.total_cost);
    assert_eq!(first.port_deliveries, second.port_deliveries);
}

/// A solver which always runs out of time
struct OutOfTime;

impl Solver for OutOfTime {
    fn solve(&self, _model: &AssignmentModel, options: &SolverOptions) -> Result<RawSolution> {
        Ok(RawSolution {
            status: SolveStatus::TimedOutNoSolution,
            values: Vec::new(),
            solve_time: options.time_limit,
        })
    }
}

#[test]
fn test_timeout() {
    let mut model = model(vec![vessel("T1", 50_000.0, 720.0)], 40_000.0, 20_000.0);
    model.parameters.solver.max_solve_time_seconds = 10.0;

    let plan = plan_fleet(&model, &OutOfTime).unwrap();
    let PlanOutcome::Unsolved(report) = &plan.outcome else {
        panic!("Expected no plan");
    };
    assert_eq!(report.status, SolveStatus::TimedOutNoSolution);
    assert_approx_eq!(f64, report.solve_time_seconds, 10.0);
    assert!(
        report
            .suggestions
            .iter()
            .any(|s| s.action.starts_with("Increase max solve time"))
    );

    let err = plan.outcome.into_result().unwrap_err();
    assert_eq!(
        err.downcast_ref::<PlanningError>(),
        Some(&PlanningError::SolverTimeout {
            time_limit_secs: 10.0
        })
    );
}
