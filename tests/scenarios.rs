use smsat::*;

fn lit(i: i32) -> Lit {
    Lit::from_dimacs(i)
}

fn clause(ints: &[i32]) -> Vec<Lit> {
    ints.iter().map(|i| lit(*i)).collect()
}

fn verify_model<O: Oracle>(solver: &mut SmsSolver<O>) -> bool {
    if solver.solve().as_bool().unwrap() {
        // check that each clause is satisfied
        let model = solver
            .get_model()
            .unwrap()
            .iter()
            .map(|l| l.as_bool().unwrap())
            .collect::<Vec<bool>>();
        for c in solver.get_clauses() {
            if !c.iter().any(|l| {
                if l.sign() {
                    !model[l.var().idx()]
                } else {
                    model[l.var().idx()]
                }
            }) {
                println!("  clause not sat: {:?}", c);
                return false;
            }
        }
        println!(
            "  ok -- sat model, checked {} clauses against {} variables",
            solver.get_clauses().count(),
            solver.get_model().unwrap().len()
        );
    }
    true
}

/// Records every check; accepts everything.
#[derive(Default)]
struct CountingOracle {
    checks: usize,
    full_checks: usize,
}

impl Oracle for CountingOracle {
    fn check(&mut self, _: &AdjacencyMatrix, is_full: bool) -> Verdict {
        self.checks += 1;
        if is_full {
            self.full_checks += 1;
        }
        Verdict::Ok
    }
}

#[test]
fn trivial_sat_with_oracle_disabled() {
    let mut solver = SmsSolver::new(4, CountingOracle::default());
    solver.oracle_enabled = false;

    let result = solver.solve();
    assert_eq!(result.as_bool(), Some(true));
    assert_eq!(solver.get_model().unwrap().len(), 6);
    assert_eq!(solver.oracle.checks, 0);
}

#[test]
fn unsat_by_root_conflict_without_branching() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1]).into_iter()));
    assert!(!solver.add_clause(clause(&[-1]).into_iter()));

    assert_eq!(solver.solve().as_bool(), Some(false));
    assert_eq!(solver.stats.decisions, 0);
    assert!(!solver.is_ok());

    // the solver is permanently infeasible
    assert_eq!(solver.solve().as_bool(), Some(false));
}

/// Returns the lemma `[-3, 4]` whenever edge variable 3 is true and edge
/// variable 4 is false in the snapshot.
struct PairOracle {
    lemmas: usize,
}

impl Oracle for PairOracle {
    fn check(&mut self, graph: &AdjacencyMatrix, _is_full: bool) -> Verdict {
        // DIMACS variable 3 is edge {1,2}, variable 4 is edge {0,3}
        if graph[1][2] == TruthValue::True && graph[0][3] == TruthValue::False {
            self.lemmas += 1;
            Verdict::ForbiddenGraph(vec![
                (TruthValue::True, (1, 2)),
                (TruthValue::False, (0, 3)),
            ])
        } else {
            Verdict::Ok
        }
    }
}

#[test]
fn symmetry_lemma_is_absorbed() {
    let mut solver = SmsSolver::new(4, PairOracle { lemmas: 0 });
    assert!(solver.add_clause(clause(&[1, 2]).into_iter()));
    assert!(solver.add_clause(clause(&[-1, -2]).into_iter()));

    let result = solver.solve();
    assert_eq!(result.as_bool(), Some(true));

    // the model must satisfy the lemma -3 v 4
    let v3 = solver.model_value(lit(3)) == LBOOL_TRUE;
    let v4 = solver.model_value(lit(4)) == LBOOL_TRUE;
    assert!(!v3 || v4);

    assert!(verify_model(&mut solver));
}

#[test]
fn lemma_fired_mid_search_is_absorbed() {
    let mut solver = SmsSolver::new(4, PairOracle { lemmas: 0 });
    // pin edge variable 3 true so a later decision on 4 trips the oracle
    assert!(solver.add_clause(clause(&[3]).into_iter()));

    let result = solver.solve();
    assert_eq!(result.as_bool(), Some(true));
    assert!(solver.oracle.lemmas >= 1);

    let v3 = solver.model_value(lit(3)) == LBOOL_TRUE;
    let v4 = solver.model_value(lit(4)) == LBOOL_TRUE;
    assert!(!v3 || v4);
    assert!(v4);
}

#[test]
fn multi_clause_lemmas_are_taken_one_at_a_time() {
    struct TwoClauseOracle {
        fired: bool,
    }
    impl Oracle for TwoClauseOracle {
        fn check(&mut self, _: &AdjacencyMatrix, is_full: bool) -> Verdict {
            if is_full && !self.fired {
                self.fired = true;
                Verdict::Clauses(vec![vec![-1, -2], vec![-1, -3]])
            } else {
                Verdict::Ok
            }
        }
    }

    let mut solver = SmsSolver::new(4, TwoClauseOracle { fired: false });
    for v in 1..=6 {
        assert!(solver.add_clause(clause(&[v]).into_iter()));
    }

    // the first lemma -1 v -2 contradicts the units at the root
    assert_eq!(solver.solve().as_bool(), Some(false));
    assert!(solver.oracle.fired);
}

#[test]
fn empty_lemma_means_unsat() {
    struct EmptyLemmaOracle;
    impl Oracle for EmptyLemmaOracle {
        fn check(&mut self, _: &AdjacencyMatrix, is_full: bool) -> Verdict {
            if is_full {
                Verdict::ForbiddenGraph(vec![])
            } else {
                Verdict::Ok
            }
        }
    }

    let mut solver = SmsSolver::new(4, EmptyLemmaOracle);
    assert_eq!(solver.solve().as_bool(), Some(false));
}

#[test]
fn oracle_sees_symmetric_snapshot() {
    struct SnapshotOracle;
    impl Oracle for SnapshotOracle {
        fn check(&mut self, graph: &AdjacencyMatrix, is_full: bool) -> Verdict {
            assert_eq!(graph.len(), 4);
            for i in 0..4 {
                assert_eq!(graph[i][i], TruthValue::Unknown);
                for j in 0..4 {
                    assert_eq!(graph[i][j], graph[j][i]);
                }
            }
            if is_full {
                for i in 0..4 {
                    for j in 0..4 {
                        if i != j {
                            assert_ne!(graph[i][j], TruthValue::Unknown);
                        }
                    }
                }
            }
            Verdict::Ok
        }
    }

    let mut solver = SmsSolver::new(4, SnapshotOracle);
    assert!(solver.add_clause(clause(&[1, 2, 3]).into_iter()));
    assert_eq!(solver.solve().as_bool(), Some(true));
}

fn php_clauses(pigeons: i32, holes: i32) -> Vec<Vec<Lit>> {
    // pigeon p in hole h is variable p*holes + h + 1
    let var = |p: i32, h: i32| p * holes + h + 1;
    let mut clauses = Vec::new();
    for p in 0..pigeons {
        clauses.push((0..holes).map(|h| lit(var(p, h))).collect());
    }
    for h in 0..holes {
        for p1 in 0..pigeons {
            for p2 in (p1 + 1)..pigeons {
                clauses.push(vec![lit(-var(p1, h)), lit(-var(p2, h))]);
            }
        }
    }
    clauses
}

fn php_solver() -> SatSolver {
    let mut solver = SatSolver::new(2, NullOracle);
    solver.oracle_enabled = false;
    let clauses = php_clauses(6, 5);
    let num_vars = 6 * 5;
    while solver.num_vars() < num_vars {
        solver.new_var(LBOOL_UNDEF, true);
    }
    for c in clauses {
        solver.add_clause(c.into_iter());
    }
    solver
}

#[test]
fn pigeonhole_is_unsat_after_real_search() {
    let mut solver = php_solver();
    assert_eq!(solver.solve().as_bool(), Some(false));
    assert!(solver.stats.conflicts > 0);
    assert!(solver.stats.starts >= 1);
}

#[test]
fn restart_determinism_with_fixed_seed() {
    let mut first = php_solver();
    let mut second = php_solver();
    assert_eq!(first.solve().as_bool(), Some(false));
    assert_eq!(second.solve().as_bool(), Some(false));
    assert_eq!(first.stats.conflicts, second.stats.conflicts);
    assert_eq!(first.stats.decisions, second.stats.decisions);
    assert_eq!(first.stats.propagations, second.stats.propagations);
}

#[test]
fn conflict_budget_leaves_solver_usable() {
    let mut solver = php_solver();
    solver.set_conflict_budget(1);
    assert_eq!(solver.solve().as_bool(), None);
    assert!(solver.is_ok());

    solver.set_conflict_budget(-1);
    assert_eq!(solver.solve().as_bool(), Some(false));
}

#[test]
fn interrupt_reports_undef() {
    let mut solver = php_solver();
    solver.interrupt();
    assert_eq!(solver.solve().as_bool(), None);
    solver.clear_interrupt();
    assert_eq!(solver.solve().as_bool(), Some(false));
}

#[test]
fn gc_transparency_between_operations() {
    let mut base = php_solver();
    let mut forced = php_solver();

    base.set_conflict_budget(20);
    forced.set_conflict_budget(20);
    let r1 = base.solve();
    let r2 = forced.solve();
    assert_eq!(r1.as_bool(), r2.as_bool());

    // a forced collection between two operations must not change anything
    forced.garbage_collect();

    base.set_conflict_budget(-1);
    forced.set_conflict_budget(-1);
    assert_eq!(base.solve().as_bool(), forced.solve().as_bool());
    assert_eq!(base.stats.conflicts, forced.stats.conflicts);
}

#[test]
fn satisfiable_formula_with_learning() {
    // random-ish 3-sat instance that needs a few conflicts
    let mut solver = SatSolver::new(2, NullOracle);
    while solver.num_vars() < 8 {
        solver.new_var(LBOOL_UNDEF, true);
    }
    let cnf: &[&[i32]] = &[
        &[1, 2, -3],
        &[-1, -2, 3],
        &[2, 3, -4],
        &[-2, -3, 4],
        &[1, 4, 5],
        &[-1, -4, -5],
        &[3, 5, 6],
        &[-3, -5, 7],
        &[4, 6, -8],
        &[-4, 7, 8],
        &[5, -6, 8],
        &[-5, 6, -7],
    ];
    for c in cnf {
        assert!(solver.add_clause(clause(c).into_iter()));
    }
    assert!(verify_model(&mut solver));
}

#[test]
fn solve_with_failed_assumptions_yields_conflict_set() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[-1, 2]).into_iter()));
    assert!(solver.add_clause(clause(&[-2, 3]).into_iter()));

    // 1 and -3 cannot hold together
    let assumps = clause(&[1, -3]);
    assert_eq!(solver.solve_with_assumptions(&assumps).as_bool(), Some(false));
    assert!(!solver.conflict.is_empty());
    // the solver stays usable afterwards
    assert_eq!(solver.solve().as_bool(), Some(true));
}

#[test]
fn released_variables_are_recycled() {
    let mut solver = SatSolver::new(2, NullOracle);
    let a = solver.new_var(LBOOL_UNDEF, true);
    let _b = solver.new_var(LBOOL_UNDEF, true);
    let n = solver.num_vars();

    solver.release_var(a);
    assert_eq!(solver.solve().as_bool(), Some(true));

    // the released index comes back instead of growing the variable range
    let c = solver.new_var(LBOOL_UNDEF, true);
    assert_eq!(c.var(), a.var());
    assert_eq!(solver.num_vars(), n);
}
