use smsat::*;

fn clause(ints: &[i32]) -> Vec<Lit> {
    ints.iter().map(|i| Lit::from_dimacs(*i)).collect()
}

fn reload(text: &str) -> SatSolver {
    let mut solver = SatSolver::new(2, NullOracle);
    match dimacs::parse_dimacs(text).unwrap() {
        dimacs::Instance::Cnf { clauses, .. } => {
            for c in clauses.iter() {
                for l in c.lits() {
                    while solver.num_vars() < l.var().to_u64() as usize {
                        solver.new_var(LBOOL_UNDEF, true);
                    }
                }
                let lits = c.lits().iter().map(|l| {
                    Lit::new(
                        Var(l.var().to_u64() as i32 - 1),
                        l.sign() == dimacs::Sign::Neg,
                    )
                });
                solver.add_clause(lits);
            }
        }
        _ => panic!("expected cnf"),
    }
    solver
}

#[test]
fn dimacs_output_reparses_with_same_status() {
    let mut solver = SatSolver::new(4, NullOracle);
    let cnf: &[&[i32]] = &[&[1, 2], &[-1, 3], &[-2, -3], &[2, 4, 5], &[-4, 6]];
    for c in cnf {
        assert!(solver.add_clause(clause(c).into_iter()));
    }

    let mut out = Vec::new();
    solver.to_dimacs(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    println!("{}", text);
    assert!(text.starts_with("p cnf "));

    let mut reloaded = reload(&text);
    assert_eq!(
        solver.solve().as_bool(),
        reloaded.solve().as_bool()
    );
}

#[test]
fn dimacs_output_omits_satisfied_clauses_and_false_literals() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1]).into_iter()));
    assert!(solver.add_clause(clause(&[1, 2]).into_iter()));
    assert!(solver.add_clause(clause(&[-1, 2, 3]).into_iter()));

    let mut out = Vec::new();
    solver.to_dimacs(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();

    // [1] and [1 2] are satisfied at the root; [-1 2 3] loses -1
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("p cnf 2 1"));
    assert_eq!(lines.next(), Some("1 2 0"));
    assert_eq!(lines.next(), None);
}

#[test]
fn dimacs_output_emits_assumptions_as_units() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1, 2]).into_iter()));

    let mut out = Vec::new();
    solver.to_dimacs(&mut out, &clause(&[-3])).unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("p cnf "));
    assert_eq!(header.split_whitespace().last(), Some("2"));
    // the assumption variable maps after the clause variables
    assert_eq!(lines.next(), Some("-3 0"));
}

#[test]
fn contradictory_solver_writes_trivially_unsat_formula() {
    let mut solver = SatSolver::new(4, NullOracle);
    assert!(solver.add_clause(clause(&[1]).into_iter()));
    solver.add_clause(clause(&[-1]).into_iter());
    assert!(!solver.is_ok());

    let mut out = Vec::new();
    solver.to_dimacs(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "p cnf 1 2\n1 0\n-1 0\n");

    let mut reloaded = reload(&text);
    assert_eq!(reloaded.solve().as_bool(), Some(false));
}