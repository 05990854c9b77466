//! Stepwise driver surface: an outside agent can co-drive the search by
//! propagating, pushing decisions, backtracking, learning from a cached
//! conflict, and switching to a different assignment without restarting
//! from the root. Enumeration with edge-variable blocking clauses lives
//! here as well.

use crate::bools::*;
use crate::clausedb::*;
use crate::oracle::Oracle;
use crate::SmsSolver;
use log::debug;

/// Outcome kind of a stepwise operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PropagationResult {
    Conflict = -1,
    Open = 0,
    Sat = 1,
    /// A requested literal is false under the implied part of the trail;
    /// the solver is not in a learnable conflict (see
    /// [`SmsSolver::conflict`] for the responsible decisions).
    InconsistentAssumptions = 2,
}

/// Result of a propagation-like step.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    pub result: PropagationResult,
    /// Assigned literals above the last decision boundary.
    pub num_prop_lits: i32,
}

/// Result of [`SmsSolver::fast_switch_assignment`].
#[derive(Debug, Clone, Copy)]
pub struct AssignmentSwitchResult {
    pub result: PropagationResult,
    pub num_decisions_executed: i32,
    /// Total assigned literals, including assignments already in place.
    pub num_prop_lits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationTermination {
    Done,
    Time,
    Limit,
}

#[derive(Debug, Clone, Copy)]
pub struct EnumerationResult {
    pub num_solutions: usize,
    pub termination: EnumerationTermination,
}

impl<O: Oracle> SmsSolver<O> {
    fn prop_lits_above_last_decision(&self) -> i32 {
        let base = self.trail_lim.last().cloned().unwrap_or(0);
        self.trail.len() as i32 - base
    }

    fn step_state(&self) -> StepResult {
        let result = if self.cached_conflict != CLAUSE_NONE {
            PropagationResult::Conflict
        } else if self.n_assigns() == self.num_vars() {
            PropagationResult::Sat
        } else {
            PropagationResult::Open
        };
        StepResult {
            result,
            num_prop_lits: self.prop_lits_above_last_decision(),
        }
    }

    /// Propagate all enqueued facts; a conflict is cached for a later
    /// [`SmsSolver::learn_clause`].
    pub fn step_propagate(&mut self) -> StepResult {
        self.cached_conflict = self.propagate();
        self.step_state()
    }

    /// Push a fresh decision level, enqueue `lit` and propagate. While a
    /// conflict is cached the call is refused. A literal already true gets
    /// a dummy decision level; one already false reports
    /// `InconsistentAssumptions`.
    pub fn assign_literal(&mut self, lit: Lit) -> StepResult {
        if self.cached_conflict != CLAUSE_NONE {
            return StepResult {
                result: PropagationResult::Conflict,
                num_prop_lits: self.prop_lits_above_last_decision(),
            };
        }
        match self.lit_value(lit).as_bool() {
            None => {
                self.trail_lim.push(self.trail.len() as i32);
                self.unchecked_enqueue(lit, CLAUSE_NONE);
                self.step_propagate()
            }
            Some(true) => {
                self.trail_lim.push(self.trail.len() as i32);
                self.step_propagate()
            }
            Some(false) => {
                self.analyze_final(lit);
                StepResult {
                    result: PropagationResult::InconsistentAssumptions,
                    num_prop_lits: self.prop_lits_above_last_decision(),
                }
            }
        }
    }

    /// Undo `num_levels` decision levels. Fails when asked to go past the
    /// root.
    pub fn backtrack(&mut self, num_levels: u32) -> bool {
        if num_levels as usize > self.decision_level() {
            return false;
        }
        let target = self.decision_level() - num_levels as usize;
        self.cancel_until(target as i32);
        true
    }

    /// Run conflict analysis on the cached conflict, backjump, install the
    /// learnt clause and propagate. Without a cached conflict this is a
    /// no-op reporting `Open`; a root-level conflict makes the solver
    /// permanently UNSAT.
    pub fn learn_clause(&mut self) -> StepResult {
        if self.cached_conflict == CLAUSE_NONE {
            return StepResult {
                result: PropagationResult::Open,
                num_prop_lits: 0,
            };
        }
        if self.trail_lim.is_empty() {
            self.ok = false;
            return StepResult {
                result: PropagationResult::Conflict,
                num_prop_lits: 0,
            };
        }

        let confl = self.cached_conflict;
        self.cached_conflict = CLAUSE_NONE;

        let mut learnt = std::mem::replace(&mut self.learnt_tmp, Vec::new());
        learnt.clear();
        let backtrack_level = self.analyze(confl, &mut learnt);
        self.cancel_until(backtrack_level);

        if learnt.len() == 1 {
            self.unchecked_enqueue(learnt[0], CLAUSE_NONE);
        } else {
            let cref = self.clause_database.add_clause(&learnt, true);
            self.learnts.push(cref);
            self.attach_clause(cref);
            self.clause_bump_activity(cref);
            self.unchecked_enqueue(learnt[0], cref);
        }
        self.learnt_tmp = learnt;

        self.step_propagate()
    }

    /// Start iterating the trail at the first literal of the given
    /// decision level (0 means the whole trail). Fails for a level beyond
    /// the current decision level.
    pub fn request_propagation_scope(&mut self, level: u32) -> bool {
        if level == 0 {
            self.literator = 0;
            true
        } else if level as usize > self.decision_level() {
            false
        } else {
            self.literator = self.trail_lim[level as usize - 1];
            true
        }
    }

    /// Next literal of the iteration started by
    /// [`SmsSolver::request_propagation_scope`]; `None` exhausts the
    /// iterator.
    pub fn next_prop_lit(&mut self) -> Option<Lit> {
        if self.literator >= 0 && (self.literator as usize) < self.trail.len() {
            let l = self.trail[self.literator as usize];
            self.literator += 1;
            Some(l)
        } else {
            self.literator = -1;
            None
        }
    }

    /// Move the solver to (a superset of) the target assignment, reusing
    /// the deepest prefix of current decisions whose literals all occur in
    /// the target set. Remaining targets are applied as fresh decisions
    /// with propagation in between; targets already implied are skipped; a
    /// target false under the trail aborts with
    /// `InconsistentAssumptions`.
    pub fn fast_switch_assignment(&mut self, target: &[i32]) -> AssignmentSwitchResult {
        let mut lits: Vec<i32> = target.to_vec();

        // unassigned targets keep their order up front; assigned ones are
        // sorted for the binary-search membership test
        let mut n_unassigned = 0;
        for i in 0..lits.len() {
            if self.lit_value(Lit::from_dimacs(lits[i])) == LBOOL_UNDEF {
                lits.swap(n_unassigned, i);
                n_unassigned += 1;
            }
        }
        lits[n_unassigned..].sort_unstable();

        // deepest prefix of current decisions contained in the target set
        let mut btlev = 0;
        while btlev < self.decision_level() {
            let dec = self.trail[self.trail_lim[btlev] as usize];
            if lits[n_unassigned..].binary_search(&dec.to_dimacs()).is_err() {
                break;
            }
            btlev += 1;
        }
        debug!(
            "fast_switch: keeping {}/{} decision levels",
            btlev,
            self.decision_level()
        );
        let no_backjump = btlev == self.decision_level();
        self.cancel_until(btlev as i32);

        let mut num_decisions = 0;

        if no_backjump && self.cached_conflict != CLAUSE_NONE {
            return AssignmentSwitchResult {
                result: PropagationResult::Conflict,
                num_decisions_executed: 0,
                num_prop_lits: self.n_assigns() as i32,
            };
        }

        for int in lits.iter() {
            let l = Lit::from_dimacs(*int);
            match self.lit_value(l).as_bool() {
                None => {
                    num_decisions += 1;
                    self.trail_lim.push(self.trail.len() as i32);
                    self.unchecked_enqueue(l, CLAUSE_NONE);
                    self.cached_conflict = self.propagate();
                    if self.cached_conflict != CLAUSE_NONE {
                        return AssignmentSwitchResult {
                            result: PropagationResult::Conflict,
                            num_decisions_executed: num_decisions,
                            num_prop_lits: self.n_assigns() as i32,
                        };
                    }
                }
                Some(false) => {
                    // the target literal contradicts an implied assignment;
                    // no clause can be learnt the usual way
                    self.analyze_final(l);
                    return AssignmentSwitchResult {
                        result: PropagationResult::InconsistentAssumptions,
                        num_decisions_executed: num_decisions + 1,
                        num_prop_lits: self.n_assigns() as i32,
                    };
                }
                Some(true) => {
                    // already propagated to the requested value
                }
            }
        }

        let result = if self.n_assigns() == self.num_vars() {
            PropagationResult::Sat
        } else {
            PropagationResult::Open
        };
        AssignmentSwitchResult {
            result,
            num_decisions_executed: num_decisions,
            num_prop_lits: self.n_assigns() as i32,
        }
    }

    /// Time-budgeted solve for the driver surface.
    pub fn run_solver(&mut self, secs: f64) -> LBool {
        self.set_time_budget(secs);
        self.solve()
    }

    /// Enumerate models. Every model is blocked by the negation of its
    /// edge-variable assignment only, so two models differing just in
    /// auxiliary variables count once. Solutions (as edge literals) are
    /// collected in [`SmsSolver::solutions`].
    pub fn run_solver_enumerate(&mut self, secs: f64, max_solutions: usize) -> EnumerationResult {
        self.set_time_budget(secs);
        let mut num_solutions = 0;

        loop {
            let status = self.solve();
            if status == LBOOL_TRUE {
                num_solutions += 1;
                self.stats.solutions += 1;

                let m = self.graph().num_edges();
                let mut solution = Vec::with_capacity(m);
                let mut blocking = Vec::with_capacity(m);
                for v in (0..m).map(|v| Var(v as i32)) {
                    // literal true in the model, and its negation
                    let l = Lit::new(v, self.model[v.idx()] == LBOOL_FALSE);
                    solution.push(l);
                    blocking.push(l.inverse());
                }
                self.solution_store.push(solution);
                self.add_clause(blocking.iter().cloned());

                if num_solutions >= max_solutions {
                    return EnumerationResult {
                        num_solutions,
                        termination: EnumerationTermination::Limit,
                    };
                }
            } else if status == LBOOL_UNDEF {
                return EnumerationResult {
                    num_solutions,
                    termination: EnumerationTermination::Time,
                };
            } else {
                return EnumerationResult {
                    num_solutions,
                    termination: EnumerationTermination::Done,
                };
            }
        }
    }
}
