use smsat::*;

fn lit(i: i32) -> Lit {
    Lit::from_dimacs(i)
}

fn clause(ints: &[i32]) -> Vec<Lit> {
    ints.iter().map(|i| lit(*i)).collect()
}

#[test]
fn propagate_reports_open_then_sat() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1, 2]).into_iter()));

    let r = solver.step_propagate();
    assert_eq!(r.result, PropagationResult::Open);

    for v in 1..=6 {
        if solver.lit_value(lit(v)) == LBOOL_UNDEF {
            let r = solver.assign_literal(lit(v));
            assert_ne!(r.result, PropagationResult::Conflict);
        }
    }
    let r = solver.step_propagate();
    assert_eq!(r.result, PropagationResult::Sat);
}

#[test]
fn assign_literal_counts_propagations() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));
    assert!(solver.add_clause(clause(&[-2, 3]).into_iter()));

    let r = solver.assign_literal(lit(1));
    assert_eq!(r.result, PropagationResult::Open);
    // the decision plus the two implied literals
    assert_eq!(r.num_prop_lits, 3);
    assert_eq!(solver.decision_level(), 1);
    assert_eq!(solver.lit_value(lit(3)), LBOOL_TRUE);
}

#[test]
fn backtrack_rejects_going_past_root() {
    let mut solver = SatSolver::new(4, NullOracle);
    solver.assign_literal(lit(1));
    solver.assign_literal(lit(2));
    assert_eq!(solver.decision_level(), 2);

    assert!(!solver.backtrack(3));
    assert_eq!(solver.decision_level(), 2);

    assert!(solver.backtrack(1));
    assert_eq!(solver.decision_level(), 1);
    assert_eq!(solver.lit_value(lit(2)), LBOOL_UNDEF);
    assert_eq!(solver.lit_value(lit(1)), LBOOL_TRUE);
}

#[test]
fn learn_clause_from_cached_conflict() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));
    assert!(solver.add_clause(clause(&[-1, -2]).into_iter()));

    let r = solver.assign_literal(lit(1));
    assert_eq!(r.result, PropagationResult::Conflict);

    let r = solver.learn_clause();
    assert_ne!(r.result, PropagationResult::Conflict);
    // analysis derives the unit -1, asserted at the root
    assert_eq!(solver.decision_level(), 0);
    assert_eq!(solver.lit_value(lit(1)), LBOOL_FALSE);
}

#[test]
fn learn_clause_without_conflict_is_a_noop() {
    let mut solver = SatSolver::new(4, NullOracle);
    let r = solver.learn_clause();
    assert_eq!(r.result, PropagationResult::Open);
}

#[test]
fn propagation_scope_iterates_the_trail() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));

    solver.assign_literal(lit(1));
    solver.assign_literal(lit(3));

    // from level 2 only the single decision is visible
    assert!(solver.request_propagation_scope(2));
    assert_eq!(solver.next_prop_lit(), Some(lit(3)));
    assert_eq!(solver.next_prop_lit(), None);

    // the whole trail, in assignment order
    assert!(solver.request_propagation_scope(0));
    let mut all = Vec::new();
    while let Some(l) = solver.next_prop_lit() {
        all.push(l.to_dimacs());
    }
    assert_eq!(all, vec![1, 2, 3]);

    assert!(!solver.request_propagation_scope(5));
}

#[test]
fn ingestion_of_asserting_clause_backjumps_to_second_highest_level() {
    let mut solver = SatSolver::new(4, NullOracle);
    solver.assign_literal(lit(1));
    solver.assign_literal(lit(2));
    solver.assign_literal(lit(-3));
    assert_eq!(solver.decision_level(), 3);

    // all three literals are false, one per level: asserting after a
    // backjump to level 2
    let n_clauses = solver.num_clauses();
    assert!(solver.add_clause_during_search(&clause(&[-1, -2, 3])));

    assert_eq!(solver.decision_level(), 2);
    assert_eq!(solver.lit_value(lit(3)), LBOOL_TRUE);
    assert_eq!(solver.num_clauses(), n_clauses + 1);

    // the run still finishes and the model satisfies the ingested clause
    assert_eq!(solver.solve().as_bool(), Some(true));
    let sat = solver.model_value(lit(-1)) == LBOOL_TRUE
        || solver.model_value(lit(-2)) == LBOOL_TRUE
        || solver.model_value(lit(3)) == LBOOL_TRUE;
    assert!(sat);
}

#[test]
fn ingestion_of_conflicting_clause_triggers_analysis() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));

    // deciding 1 propagates 2 at the same level
    let r = solver.assign_literal(lit(1));
    assert_eq!(r.result, PropagationResult::Open);
    assert_eq!(solver.decision_level(), 1);

    // both literals false at level 1: conflicting, so analysis runs and
    // the derived unit -1 lands at the root
    assert!(solver.add_clause_during_search(&clause(&[-1, -2])));
    assert_eq!(solver.decision_level(), 0);
    assert_eq!(solver.lit_value(lit(1)), LBOOL_FALSE);

    assert_eq!(solver.solve().as_bool(), Some(true));
}

#[test]
fn ingestion_of_unit_rewinds_to_root() {
    let mut solver = SatSolver::new(4, NullOracle);
    solver.assign_literal(lit(1));
    solver.assign_literal(lit(2));

    assert!(solver.add_clause_during_search(&clause(&[-5])));
    assert_eq!(solver.decision_level(), 0);
    assert_eq!(solver.lit_value(lit(5)), LBOOL_FALSE);
}

#[test]
fn ingestion_with_unassigned_pair_is_plain_attachment() {
    let mut solver = SatSolver::new(4, NullOracle);
    solver.assign_literal(lit(1));
    let level = solver.decision_level();
    let n_clauses = solver.num_clauses();

    assert!(solver.add_clause_during_search(&clause(&[5, 6, -1])));
    // nothing to reconcile: the trail is untouched
    assert_eq!(solver.decision_level(), level);
    assert_eq!(solver.lit_value(lit(5)), LBOOL_UNDEF);
    assert_eq!(solver.num_clauses(), n_clauses + 1);
}

#[test]
fn ingestion_of_falsified_root_clause_is_unsat() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1]).into_iter()));
    solver.assign_literal(lit(2));

    assert!(!solver.add_clause_during_search(&clause(&[-1])));
}

#[test]
fn ingestion_of_empty_clause_is_unsat() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(!solver.add_clause_during_search(&[]));
}

#[test]
fn fast_switch_keeps_the_deepest_shared_prefix() {
    let mut solver = SatSolver::new(4, NullOracle);
    solver.assign_literal(lit(1));
    solver.assign_literal(lit(-2));
    solver.assign_literal(lit(3));
    assert_eq!(solver.decision_level(), 3);

    // prefix [1] is in the target set; -2 is not (2 does not occur)
    let r = solver.fast_switch_assignment(&[1, 3, -4]);

    assert_ne!(r.result, PropagationResult::Conflict);
    assert_eq!(r.num_decisions_executed, 2);
    assert_eq!(solver.lit_value(lit(1)), LBOOL_TRUE);
    assert_eq!(solver.lit_value(lit(2)), LBOOL_UNDEF);
    assert_eq!(solver.lit_value(lit(3)), LBOOL_TRUE);
    assert_eq!(solver.lit_value(lit(4)), LBOOL_FALSE);
    assert_eq!(solver.decision_level(), 3);
}

#[test]
fn fast_switch_detects_inconsistent_targets() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));

    solver.assign_literal(lit(1));
    assert_eq!(solver.lit_value(lit(2)), LBOOL_TRUE);

    // -2 contradicts the implied literal 2 while 1 stays decided
    let r = solver.fast_switch_assignment(&[1, -2]);
    assert_eq!(r.result, PropagationResult::InconsistentAssumptions);
    assert!(!solver.conflict.is_empty());
}

#[test]
fn fast_switch_onto_conflicting_decisions_reports_conflict() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-2, 3]).into_iter()));
    assert!(solver.add_clause(clause(&[-2, -3]).into_iter()));

    solver.assign_literal(lit(1));
    // deciding 2 propagates both 3 and -3
    let r = solver.fast_switch_assignment(&[1, 2]);
    assert_eq!(r.result, PropagationResult::Conflict);
    assert_eq!(r.num_decisions_executed, 1);
}

#[test]
fn enumeration_blocks_edge_assignments_only() {
    let mut solver = SatSolver::new(4, NullOracle);

    // pin four of the six edges, forbid 1=T,2=T: exactly three edge
    // assignments remain
    for v in 3..=6 {
        assert!(solver.add_clause(clause(&[v]).into_iter()));
    }
    assert!(solver.add_clause(clause(&[-1, -2]).into_iter()));

    // an unconstrained auxiliary variable must not multiply the count
    solver.new_var(LBOOL_UNDEF, true);

    let r = solver.run_solver_enumerate(-1.0, usize::max_value());
    assert_eq!(r.num_solutions, 3);
    assert_eq!(r.termination, EnumerationTermination::Done);
    assert_eq!(solver.solutions().len(), 3);

    // the three stored edge assignments are pairwise distinct
    for (i, a) in solver.solutions().iter().enumerate() {
        for b in solver.solutions().iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn enumeration_respects_the_solution_limit() {
    let mut solver = SatSolver::new(4, NullOracle);
    let r = solver.run_solver_enumerate(-1.0, 2);
    assert_eq!(r.num_solutions, 2);
    assert_eq!(r.termination, EnumerationTermination::Limit);
}

#[test]
fn ffi_surface_drives_a_small_instance() {
    unsafe {
        let s = ffi::smsat_create_solver(4);

        for l in &[-1, 2, 0, -2, 3, 0] {
            ffi::smsat_add(s, *l);
        }

        let r = ffi::smsat_assign_literal(s, 1);
        assert_eq!(r.result, 0); // OPEN
        assert_eq!(r.num_prop_lits, 3);

        assert_eq!(ffi::smsat_backtrack(s, 1), 1);
        assert_eq!(ffi::smsat_backtrack(s, 1), 0);

        assert_eq!(ffi::smsat_run_solver(s, -1.0), 10);
        assert_eq!(ffi::smsat_n_vars(s), 6);

        ffi::smsat_destroy_solver(s);
    }
}
