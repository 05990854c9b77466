//! CDCL SAT solver with an external symmetry-breaking propagator.
//!
//! The search engine is a conflict-driven clause-learning solver over an
//! arena-allocated clause database. On top of the classic loop it carries
//! two extensions: an [`Oracle`] consulted at stabilized search nodes
//! (propagation fixpoint, no pending conflict) whose lemmas are folded in
//! through [`SmsSolver::add_clause_during_search`], and a stepwise driver
//! surface (see [`stepwise`]) that lets an outside agent co-drive
//! propagation, decisions, backtracking and conflict analysis.

use log::{debug, info, trace};
use std::io::Write;

pub mod bools;
pub use bools::*;
pub mod clausedb;
use clausedb::*;
pub mod oracle;
pub use oracle::*;
pub mod stepwise;
pub use stepwise::*;
pub mod ffi;

use smallvec::SmallVec;

type VMap<T> = Vec<T>;

#[derive(Default, Copy, Clone)]
struct VariableData {
    reason: ClauseHeaderOffset,
    level: i32,
}

struct ShrinkStackElem {
    i: u32,
    l: Lit,
}

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
struct Watcher {
    cref: ClauseHeaderOffset,
    blocker: Lit,
}

struct OrderHeap {
    heap: Vec<Var>,
    indices: VMap<i32>,
}

impl OrderHeap {
    pub fn build(&mut self, ns: &[i32], act: &[f64]) {
        for i in 0..self.heap.len() {
            self.indices[self.heap[i].idx()] = -1;
        }
        self.heap.clear();

        for (i, n) in ns.iter().enumerate() {
            assert!(self.indices.len() > *n as usize);
            self.indices[*n as usize] = i as i32;
            self.heap.push(Var(*n));
        }

        let mut i = (self.heap.len() / 2) as i32 - 1;
        while i >= 0 {
            self.percolate_down(i, act);
            i -= 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn left(i: i32) -> i32 {
        i * 2 + 1
    }
    fn right(i: i32) -> i32 {
        (i + 1) * 2
    }
    fn parent(i: i32) -> i32 {
        (i - 1) >> 1
    }

    fn percolate_up(&mut self, mut i: i32, act: &[f64]) {
        let var = self.heap[i as usize];

        let mut p = Self::parent(i);
        while i != 0 && act[var.idx()] > act[self.heap[p as usize].idx()] {
            self.heap[i as usize] = self.heap[p as usize];
            self.indices[self.heap[p as usize].idx()] = i;
            i = p;
            p = Self::parent(p);
        }

        self.heap[i as usize] = var;
        self.indices[var.idx()] = i;
    }

    fn percolate_down(&mut self, mut i: i32, act: &[f64]) {
        let var = self.heap[i as usize];
        while (Self::left(i) as usize) < self.heap.len() {
            let child = if (Self::right(i) as usize) < self.heap.len()
                && act[self.heap[Self::right(i) as usize].idx()]
                    > act[self.heap[Self::left(i) as usize].idx()]
            {
                Self::right(i)
            } else {
                Self::left(i)
            };

            if !(act[self.heap[child as usize].idx()] > act[var.idx()]) {
                break;
            }

            self.heap[i as usize] = self.heap[child as usize];
            self.indices[self.heap[i as usize].idx()] = i;
            i = child;
        }

        self.heap[i as usize] = var;
        self.indices[var.idx()] = i;
    }

    pub fn contains(&self, var: Var) -> bool {
        var.idx() < self.indices.len() && self.indices[var.idx()] >= 0
    }

    pub fn decrease(&mut self, key: Var, act: &[f64]) {
        debug_assert!(self.contains(key));
        self.percolate_up(self.indices[key.idx()], act);
    }

    pub fn insert(&mut self, key: Var, act: &[f64]) {
        self.indices
            .resize((key.idx() + 1).max(self.indices.len()), -1);
        debug_assert!(!self.contains(key));

        self.indices[key.idx()] = self.heap.len() as i32;
        self.heap.push(key);
        self.percolate_up(self.indices[key.idx()], act);
    }

    pub fn remove_min(&mut self, act: &[f64]) -> Var {
        let var = self.heap[0];
        self.heap[0] = self.heap[self.heap.len() - 1];
        self.indices[self.heap[0].idx()] = 0;
        self.indices[var.idx()] = -1;
        self.heap.pop();
        if self.heap.len() > 1 {
            self.percolate_down(0, act);
        }
        var
    }
}

pub struct SolverParams {
    pub var_decay: f64,
    pub clause_decay: f64,
    pub random_var_freq: f64,
    pub random_seed: f64,
    pub luby_restart: bool,
    pub ccmin_mode: i32,
    pub phase_saving: i32,
    pub rnd_pol: bool,
    pub rnd_init_act: bool,
    pub garbage_frac: f64,
    pub min_learnts_lim: u32,
    pub restart_first: u32,
    pub restart_inc: f64,
    pub learntsize_factor: f64,
    pub learntsize_inc: f64,
    pub learntsize_adjust_start_confl: i32,
    pub learntsize_adjust_inc: f64,
    /// Consult the oracle on partial assignments only at every n-th
    /// stabilized node. Full assignments are always checked.
    pub oracle_check_frequency: u32,
    /// Cube blocking: once the prerun time is spent and at least this many
    /// edge variables are assigned, trace the cube and block it.
    pub assignment_cutoff: Option<u32>,
    pub assignment_cutoff_prerun_secs: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            var_decay: 0.95,
            clause_decay: 0.999,
            random_var_freq: 0.0,
            random_seed: 91648253.0,
            luby_restart: true,
            ccmin_mode: 2,
            phase_saving: 2,
            rnd_pol: false,
            rnd_init_act: false,
            garbage_frac: 0.20,
            min_learnts_lim: 0,
            restart_first: 100,
            restart_inc: 2.0,
            learntsize_factor: 1.0 / 3.0,
            learntsize_inc: 1.1,
            learntsize_adjust_start_confl: 100,
            learntsize_adjust_inc: 1.5,
            oracle_check_frequency: 1,
            assignment_cutoff: None,
            assignment_cutoff_prerun_secs: 0.0,
        }
    }
}

#[derive(Default)]
pub struct SolverStatistics {
    pub solves: usize,
    pub starts: usize,
    pub decisions: usize,
    pub rnd_decisions: usize,
    pub propagations: usize,
    pub conflicts: usize,
    pub dec_vars: usize,
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: usize,
    pub learnts_literals: usize,
    pub max_literals: usize,
    pub tot_literals: usize,
    pub oracle_checks: usize,
    pub oracle_lemmas: usize,
    pub solutions: usize,
}

pub struct SmsSolver<O> {
    pub oracle: O,
    graph: EdgeEncoding,
    /// Whether stabilized nodes are handed to the oracle at all.
    pub oracle_enabled: bool,

    pub tracelog_file: Option<std::io::BufWriter<std::fs::File>>,
    pub verbosity: u32,

    // Extra results (read-only for consumer)
    pub model: Vec<LBool>,
    pub conflict: Vec<Lit>,

    pub params: SolverParams,
    pub stats: SolverStatistics,

    // solver state
    clause_database: ClauseDatabase,
    clauses: Vec<ClauseHeaderOffset>,
    learnts: Vec<ClauseHeaderOffset>,

    trail: Vec<Lit>,
    trail_lim: Vec<i32>,
    assumptions: Vec<Lit>,

    // variable maps
    activity: VMap<f64>,
    assigns: VMap<LBool>,
    polarity: VMap<i8>,
    user_pol: VMap<LBool>,
    decision: VMap<i8>,
    vardata: VMap<VariableData>,

    watch_occs: VMap<Vec<Watcher>>,
    watch_dirty: VMap<i8>,
    watch_dirties: Vec<Lit>,

    order_heap: OrderHeap,

    ok: bool,
    cla_inc: f64,
    var_inc: f64,
    qhead: usize,

    simp_db_assigns: i32,
    simp_db_props: i64,
    remove_satisfied: bool,
    next_var: i32,

    released_vars: Vec<Var>,
    free_vars: Vec<Var>,
    seen: VMap<i8>,
    analyze_stack: Vec<ShrinkStackElem>,
    analyze_toclear: Vec<Lit>,
    add_tmp: Vec<Lit>,

    max_learnts: f64,
    learntsize_adjust_confl: f64,
    learntsize_adjust_cnt: i32,

    // resource constraints
    conflict_budget: i64,
    propagation_budget: i64,
    time_budget: f64,
    solve_time: f64,
    asynch_interrupt: bool,

    oracle_node_counter: u64,

    // stepwise driver state
    cached_conflict: ClauseHeaderOffset,
    literator: i32,
    learnt_tmp: Vec<Lit>,
    solution_store: Vec<Vec<Lit>>,
}

/// Plain CDCL solving without the symmetry discipline.
pub type SatSolver = SmsSolver<NullOracle>;

impl<O: Oracle> SmsSolver<O> {
    /// A solver for graph models on `vertices` vertices. The first
    /// `vertices*(vertices-1)/2` variables are created eagerly as decision
    /// variables; they encode the edges (see [`EdgeEncoding`]).
    pub fn new(vertices: usize, oracle: O) -> Self {
        let mut solver = SmsSolver {
            oracle,
            graph: EdgeEncoding::new(vertices),
            oracle_enabled: true,
            tracelog_file: None,
            verbosity: 1,

            model: Vec::new(),
            conflict: Vec::new(),
            params: Default::default(),
            stats: Default::default(),

            clause_database: ClauseDatabase::new(),
            clauses: Vec::new(),
            learnts: Vec::new(),

            trail: Vec::new(),
            trail_lim: Vec::new(),
            assumptions: Vec::new(),

            activity: Vec::new(),
            assigns: Vec::new(),
            polarity: Vec::new(),
            user_pol: Vec::new(),
            decision: Vec::new(),
            vardata: Vec::new(),

            watch_occs: Vec::new(),
            watch_dirty: Vec::new(),
            watch_dirties: Vec::new(),

            order_heap: OrderHeap {
                heap: Vec::new(),
                indices: Vec::new(),
            },

            ok: true,
            cla_inc: 1.0,
            var_inc: 1.0,
            qhead: 0,

            simp_db_assigns: -1,
            simp_db_props: 0,
            remove_satisfied: true,
            next_var: 0,

            released_vars: Vec::new(),
            free_vars: Vec::new(),
            seen: Vec::new(),
            analyze_stack: Vec::new(),
            analyze_toclear: Vec::new(),
            add_tmp: Vec::new(),

            max_learnts: 0.0,
            learntsize_adjust_confl: 0.0,
            learntsize_adjust_cnt: 0,

            conflict_budget: -1,
            propagation_budget: -1,
            time_budget: -1.0,
            solve_time: 0.0,
            asynch_interrupt: false,

            oracle_node_counter: 0,

            cached_conflict: CLAUSE_NONE,
            literator: -1,
            learnt_tmp: Vec::new(),
            solution_store: Vec::new(),
        };
        for _ in 0..solver.graph.num_edges() {
            solver.new_var(LBOOL_UNDEF, true);
        }
        solver
    }

    pub fn num_vars(&self) -> usize {
        self.next_var as usize
    }
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }
    pub fn num_learnts(&self) -> usize {
        self.learnts.len()
    }
    pub fn n_assigns(&self) -> usize {
        self.trail.len()
    }
    pub fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }
    pub fn graph(&self) -> &EdgeEncoding {
        &self.graph
    }
    pub fn solutions(&self) -> &[Vec<Lit>] {
        &self.solution_store
    }

    pub fn new_var(&mut self, user_polarity: LBool, decision_var: bool) -> Lit {
        let var = if let Some(var) = self.free_vars.pop() {
            var
        } else {
            let idx = self.next_var;
            self.next_var += 1;
            Var(idx)
        };

        for sign in &[false, true] {
            let l = Lit::new(var, *sign);
            map_insert(&mut self.watch_occs, l.0 as usize, Vec::new(), Vec::new());
            map_insert(&mut self.watch_dirty, l.0 as usize, 0, 0);
        }

        var_map_insert(&mut self.assigns, var, LBOOL_UNDEF, LBOOL_UNDEF);
        var_map_insert(
            &mut self.vardata,
            var,
            Default::default(),
            Default::default(),
        );
        var_map_insert(
            &mut self.activity,
            var,
            if self.params.rnd_init_act {
                drand(&mut self.params.random_seed) * 0.00001
            } else {
                0.0
            },
            0.0,
        );
        var_map_insert(&mut self.seen, var, 0, 0);
        var_map_insert(&mut self.polarity, var, 1, 1);
        var_map_insert(&mut self.user_pol, var, user_polarity, LBOOL_UNDEF);
        self.decision
            .resize((var.idx() + 1).max(self.decision.len()), 0);
        self.set_decision_var(var, decision_var);

        Lit::new(var, false)
    }

    /// Retire an unassigned variable: force it true with a unit clause and
    /// recycle its index after the next level-0 simplification.
    pub fn release_var(&mut self, l: Lit) {
        if self.lit_value(l) == LBOOL_UNDEF {
            self.add_clause(std::iter::once(l));
            self.released_vars.push(l.var());
        }
    }

    fn set_decision_var(&mut self, var: Var, b: bool) {
        if b && self.decision[var.idx()] == 0 {
            self.stats.dec_vars += 1;
        }
        if !b && self.decision[var.idx()] != 0 {
            self.stats.dec_vars -= 1;
        }

        self.decision[var.idx()] = b as i8;
        self.insert_var_order(var);
    }

    fn insert_var_order(&mut self, var: Var) {
        if !self.order_heap.contains(var) && self.decision[var.idx()] == 1 {
            self.order_heap.insert(var, &self.activity);
        }
    }

    fn var_decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.params.var_decay;
    }

    fn var_bump_activity(
        activity: &mut [f64],
        order_heap: &mut OrderHeap,
        var_inc: &mut f64,
        var: Var,
        inc: f64,
    ) {
        activity[var.idx()] += inc;
        if activity[var.idx()] > 1e100 {
            // rescale
            for act in activity.iter_mut() {
                *act *= 1e-100;
            }
            *var_inc *= 1e-100;
        }

        if order_heap.contains(var) {
            order_heap.decrease(var, &*activity);
        }
    }

    fn clause_decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.params.clause_decay;
    }

    fn clause_bump_activity(&mut self, cref: ClauseHeaderOffset) {
        let act = self.clause_database.get_activity(cref) + self.cla_inc as f32;
        self.clause_database.set_activity(cref, act);
        if act > 1e20 {
            // rescale
            for p in self.learnts.iter() {
                let a = self.clause_database.get_activity(*p);
                self.clause_database.set_activity(*p, a * 1e-20);
            }
            self.cla_inc *= 1e-20;
        }
    }

    pub fn var_value(&self, var: Var) -> LBool {
        self.assigns[var.idx()]
    }

    pub fn lit_value(&self, lit: Lit) -> LBool {
        Self::assigns_lit_value(&self.assigns, lit)
    }

    fn assigns_lit_value(assigns: &[LBool], lit: Lit) -> LBool {
        LBool::xor(&assigns[lit.var().idx()], lit.sign())
    }

    /// Value of a literal in the most recent model.
    pub fn model_value(&self, lit: Lit) -> LBool {
        LBool::xor(&self.model[lit.var().idx()], lit.sign())
    }

    pub fn get_model(&self) -> Option<&[LBool]> {
        if self.model.is_empty() {
            None
        } else {
            Some(&self.model)
        }
    }

    pub fn get_clauses<'a>(&'a self) -> impl Iterator<Item = &'a [Lit]> + 'a {
        let db = &self.clause_database;
        self.clauses.iter().map(move |cref| db.get_clause(*cref).1)
    }

    /// Add an original clause. Only legal at decision level 0; during
    /// search use [`SmsSolver::add_clause_during_search`].
    pub fn add_clause(&mut self, ps: impl IntoIterator<Item = Lit>) -> bool {
        assert!(self.trail_lim.is_empty());
        if !self.ok {
            return false;
        }

        self.add_tmp.clear();
        self.add_tmp.extend(ps);
        self.add_tmp.sort();
        {
            let mut prev = LIT_UNDEF;
            let mut already_sat = false;
            let add_tmp = &mut self.add_tmp;
            let assigns = &self.assigns;
            add_tmp.retain(|l| {
                if Self::assigns_lit_value(assigns, *l) == LBOOL_TRUE || *l == prev.inverse() {
                    already_sat = true;
                }
                !((prev, prev = *l).0 == *l
                    || Self::assigns_lit_value(assigns, *l) == LBOOL_FALSE)
            });

            if already_sat {
                return true;
            }
        }

        if self.add_tmp.is_empty() {
            self.ok = false;
            return false;
        } else if self.add_tmp.len() == 1 {
            self.unchecked_enqueue(self.add_tmp[0], CLAUSE_NONE);
            self.ok = self.propagate() == CLAUSE_NONE;
            return self.ok;
        } else {
            let cref = self.clause_database.add_clause(&self.add_tmp, false);
            self.clauses.push(cref);
            self.attach_clause(cref);
        }

        true
    }

    fn attach_clause(&mut self, cref: ClauseHeaderOffset) {
        let header = self.clause_database.get_header(cref);
        let sz = header.get_size();
        assert!(sz > 1);

        let lits = self.clause_database.get_lits(cref, sz as usize);
        trace!("attach cref={} {:?}", cref, lits);

        self.watch_occs[lits[0].inverse().0 as usize].push(Watcher {
            cref,
            blocker: lits[1],
        });
        self.watch_occs[lits[1].inverse().0 as usize].push(Watcher {
            cref,
            blocker: lits[0],
        });

        if header.get_learnt() {
            self.stats.num_learnts += 1;
            self.stats.learnts_literals += sz as usize;
        } else {
            self.stats.num_clauses += 1;
            self.stats.clauses_literals += sz as usize;
        }
    }

    fn detach_clause(&mut self, cref: ClauseHeaderOffset, strict: bool) {
        let header = self.clause_database.get_header(cref);
        let sz = header.get_size();
        assert!(sz > 1);
        let lits = self.clause_database.get_lits(cref, sz as usize);

        if strict {
            let w0 = Watcher {
                cref,
                blocker: lits[1],
            };
            let w1 = Watcher {
                cref,
                blocker: lits[0],
            };
            self.watch_occs[lits[0].inverse().0 as usize].retain(|w| w != &w0);
            self.watch_occs[lits[1].inverse().0 as usize].retain(|w| w != &w1);
        } else {
            Self::smudge_watcher(
                &mut self.watch_dirty,
                &mut self.watch_dirties,
                lits[0].inverse(),
            );
            Self::smudge_watcher(
                &mut self.watch_dirty,
                &mut self.watch_dirties,
                lits[1].inverse(),
            );
        }

        if header.get_learnt() {
            self.stats.num_learnts -= 1;
            self.stats.learnts_literals -= sz as usize;
        } else {
            self.stats.num_clauses -= 1;
            self.stats.clauses_literals -= sz as usize;
        }
    }

    fn smudge_watcher(dirty: &mut Vec<i8>, dirties: &mut Vec<Lit>, lit: Lit) {
        let flag = &mut dirty[lit.0 as usize];
        if *flag == 0 {
            *flag = 1;
            dirties.push(lit);
        }
    }

    fn remove_clause(&mut self, cref: ClauseHeaderOffset) {
        self.detach_clause(cref, false);
        let header = self.clause_database.get_header(cref);
        let lits = self
            .clause_database
            .get_lits(cref, header.get_size() as usize);

        if self.is_clause_locked(cref, lits) {
            self.vardata[lits[0].var().idx()].reason = CLAUSE_NONE;
        }

        self.clause_database.get_header_mut(cref).set_mark(1);
        self.clause_database.free(cref);
    }

    /// A clause is locked while it is the reason of its first literal's
    /// assignment; locked clauses survive `reduce_db` and GC.
    fn is_clause_locked(&self, cref: ClauseHeaderOffset, lits: &[Lit]) -> bool {
        let vardata = &self.vardata[lits[0].var().idx()];
        self.lit_value(lits[0]) == LBOOL_TRUE
            && vardata.reason != CLAUSE_NONE
            && vardata.reason == cref
    }

    fn assigns_satisfied(assigns: &[LBool], clause: &[Lit]) -> bool {
        clause
            .iter()
            .any(|l| Self::assigns_lit_value(assigns, *l) == LBOOL_TRUE)
    }

    /// Revert to the state at the given decision level, saving phases and
    /// reinserting unassigned variables into the order heap. Also drops
    /// the cached stepwise conflict.
    pub fn cancel_until(&mut self, level: i32) {
        if self.trail_lim.len() > level as usize {
            trace!("--> CANCEL_UNTIL {}", level);
            self.cached_conflict = CLAUSE_NONE;
            let mut c = (self.trail.len() - 1) as i32;
            while c >= self.trail_lim[level as usize] {
                let x = self.trail[c as usize];
                self.assigns[x.var().idx()] = LBOOL_UNDEF;
                if self.params.phase_saving > 1
                    || (self.params.phase_saving == 1 && Some(&c) > self.trail_lim.last())
                {
                    self.polarity[x.var().idx()] = x.sign() as i8;
                }
                self.insert_var_order(x.var());
                c -= 1;
            }

            self.qhead = self.trail_lim[level as usize] as usize;
            self.trail.truncate(self.trail_lim[level as usize] as usize);
            self.trail_lim.truncate(level as usize);
        }
    }

    fn pick_branch_lit(&mut self) -> Lit {
        let mut next = VAR_UNDEF;

        // random decision
        if drand(&mut self.params.random_seed) < self.params.random_var_freq
            && !self.order_heap.is_empty()
        {
            next = self.order_heap.heap[irand(
                &mut self.params.random_seed,
                self.order_heap.heap.len() as i32,
            ) as usize];
            if self.var_value(next) == LBOOL_UNDEF && self.decision[next.idx()] == 1 {
                self.stats.rnd_decisions += 1;
            }
        }

        // activity-based decision
        while next == VAR_UNDEF
            || self.var_value(next) != LBOOL_UNDEF
            || self.decision[next.idx()] == 0
        {
            if self.order_heap.is_empty() {
                next = VAR_UNDEF;
                break;
            } else {
                next = self.order_heap.remove_min(&self.activity);
            }
        }

        // polarity
        if next == VAR_UNDEF {
            LIT_UNDEF
        } else if self.user_pol[next.idx()] != LBOOL_UNDEF {
            Lit::new(next, self.user_pol[next.idx()] == LBOOL_TRUE)
        } else if self.params.rnd_pol {
            Lit::new(next, drand(&mut self.params.random_seed) < 0.5)
        } else {
            Lit::new(next, self.polarity[next.idx()] == 1)
        }
    }

    /// Analyze a conflict and produce a 1-UIP reason clause.
    ///
    /// Pre-conditions:
    /// * `out_learnt` is assumed to be empty.
    /// * Current decision level must be greater than root level.
    ///
    /// Post-conditions:
    /// * `out_learnt[0]` is the asserting literal at the returned
    ///   backtracking level.
    /// * if `out_learnt.len() > 1` then `out_learnt[1]` has the greatest
    ///   decision level of the remaining literals.
    fn analyze(
        &mut self,
        mut conflict_clause: ClauseHeaderOffset,
        out_learnt: &mut Vec<Lit>,
    ) -> i32 {
        trace!("--> ANALYZE cref={}", conflict_clause);
        let mut path_c = 0;
        let mut p = LIT_UNDEF;
        out_learnt.push(Lit(0)); // room for the asserting literal
        let mut index = self.trail.len() - 1;

        loop {
            assert!(conflict_clause != CLAUSE_NONE);
            let header = self.clause_database.get_header(conflict_clause);
            if header.get_learnt() {
                self.clause_bump_activity(conflict_clause);
            }

            let lits = self
                .clause_database
                .get_lits(conflict_clause, header.get_size() as usize);
            for q in lits.iter().skip(if p == LIT_UNDEF { 0 } else { 1 }) {
                if self.seen[q.var().idx()] == 0 && self.vardata[q.var().idx()].level > 0 {
                    let inc = self.var_inc;
                    Self::var_bump_activity(
                        &mut self.activity,
                        &mut self.order_heap,
                        &mut self.var_inc,
                        q.var(),
                        inc,
                    );
                    self.seen[q.var().idx()] = 1;
                    if self.vardata[q.var().idx()].level >= self.trail_lim.len() as i32 {
                        path_c += 1;
                    } else {
                        out_learnt.push(*q);
                    }
                }
            }

            // select next clause to look at
            loop {
                index -= 1;
                if self.seen[self.trail[index + 1].var().idx()] != 0 {
                    break;
                }
            }
            p = self.trail[index + 1];
            conflict_clause = self.get_reason(p.var());
            self.seen[p.var().idx()] = 0;
            path_c -= 1;

            if path_c <= 0 {
                break;
            }
        }

        out_learnt[0] = p.inverse();

        // minimize conflict clause
        self.analyze_toclear.clear();
        self.analyze_toclear.extend_from_slice(out_learnt);

        self.stats.max_literals += out_learnt.len();
        if self.params.ccmin_mode == 2 {
            let first = out_learnt[0];
            out_learnt.retain(|l| {
                *l == first
                    || self.vardata[l.var().idx()].reason == CLAUSE_NONE
                    || !self.lit_redundant(*l)
            });
        } else if self.params.ccmin_mode == 1 {
            let first = out_learnt[0];
            out_learnt.retain(|l| {
                if *l == first {
                    return true;
                }
                let reason = self.vardata[l.var().idx()].reason;
                if reason == CLAUSE_NONE {
                    return true;
                }
                let header = self.clause_database.get_header(reason);
                let lits = self
                    .clause_database
                    .get_lits(reason, header.get_size() as usize);
                lits.iter()
                    .skip(1)
                    .any(|x| self.seen[x.var().idx()] == 0 && self.vardata[x.var().idx()].level > 0)
            });
        }
        self.stats.tot_literals += out_learnt.len();

        trace!("ANALYZE learnt {:?}", out_learnt);

        // find correct backtrack level
        let out_level = if out_learnt.len() == 1 {
            0
        } else {
            let mut max_idx = 1;
            let mut max_level = self.vardata[out_learnt[1].var().idx()].level;
            for i in 2..out_learnt.len() {
                let lit_level = self.vardata[out_learnt[i].var().idx()].level;
                if lit_level > max_level {
                    max_idx = i;
                    max_level = lit_level;
                }
            }

            out_learnt.swap(1, max_idx);
            self.vardata[out_learnt[1].var().idx()].level
        };

        for l in self.analyze_toclear.iter() {
            self.seen[l.var().idx()] = 0;
        }

        out_level.max(0)
    }

    /// Deep redundancy test for conflict-clause minimization: `p` is
    /// redundant iff every literal of its reason is at level 0, already
    /// seen, or itself redundant. Memoized through the seen marks.
    fn lit_redundant(&mut self, p: Lit) -> bool {
        const SEEN_UNDEF: i8 = 0;
        const SEEN_SOURCE: i8 = 1;
        const SEEN_REMOVABLE: i8 = 2;
        const SEEN_FAILED: i8 = 3;

        debug_assert!(
            self.seen[p.var().idx()] == SEEN_UNDEF || self.seen[p.var().idx()] == SEEN_SOURCE
        );
        debug_assert!(self.vardata[p.var().idx()].reason != CLAUSE_NONE);

        self.analyze_stack.clear();

        let mut i: u32 = 0;
        let mut p = p;
        loop {
            i += 1;

            let reason = self.get_reason(p.var());
            let header = self.clause_database.get_header(reason);

            if i < header.get_size() {
                // checking 'p'-parents 'l'
                let l = self
                    .clause_database
                    .get_lits(reason, header.get_size() as usize)[i as usize];

                // variable at level 0 or previously removable
                if self.vardata[l.var().idx()].level == 0
                    || self.seen[l.var().idx()] == SEEN_SOURCE
                    || self.seen[l.var().idx()] == SEEN_REMOVABLE
                {
                    continue;
                }

                // cannot be removed for some local reason
                if self.get_reason(l.var()) == CLAUSE_NONE
                    || self.seen[l.var().idx()] == SEEN_FAILED
                {
                    self.analyze_stack.push(ShrinkStackElem { i: 0, l: p });
                    for elem in self.analyze_stack.iter() {
                        if self.seen[elem.l.var().idx()] == SEEN_UNDEF {
                            self.seen[elem.l.var().idx()] = SEEN_FAILED;
                            self.analyze_toclear.push(elem.l);
                        }
                    }
                    return false;
                }

                // recursively check 'l'
                self.analyze_stack.push(ShrinkStackElem { i, l: p });
                i = 0;
                p = l;
            } else {
                // finished with current element 'p' and its reason
                if self.seen[p.var().idx()] == SEEN_UNDEF {
                    self.seen[p.var().idx()] = SEEN_REMOVABLE;
                    self.analyze_toclear.push(p);
                }

                if let Some(elem) = self.analyze_stack.pop() {
                    i = elem.i;
                    p = elem.l;
                } else {
                    return true;
                }
            }
        }
    }

    /// Express a final conflict in terms of the decisions that caused it;
    /// used when an assumption or a switch-assignment target is already
    /// false. The result lands in `self.conflict`.
    fn analyze_final(&mut self, p: Lit) {
        self.conflict.clear();
        self.conflict.push(p);

        if self.trail_lim.is_empty() {
            return;
        }

        self.seen[p.var().idx()] = 1;

        let mut i: usize = self.trail.len() - 1;
        while i >= self.trail_lim[0] as usize {
            let var = self.trail[i].var();
            if self.seen[var.idx()] > 0 {
                let reason = self.get_reason(var);
                if reason == CLAUSE_NONE {
                    assert!(self.vardata[var.idx()].level > 0);
                    self.conflict.push(self.trail[i].inverse());
                } else {
                    let header = self.clause_database.get_header(reason);
                    let lits = self
                        .clause_database
                        .get_lits(reason, header.get_size() as usize);
                    for l in lits.iter().skip(1) {
                        if self.vardata[l.var().idx()].level > 0 {
                            self.seen[l.var().idx()] = 1;
                        }
                    }
                }
                self.seen[var.idx()] = 0;
            }
            if i == 0 {
                break;
            }
            i -= 1;
        }

        self.seen[p.var().idx()] = 0;
    }

    fn unchecked_enqueue(&mut self, lit: Lit, reason: ClauseHeaderOffset) {
        trace!("assign {:?} reason={}", lit, reason);
        debug_assert!(self.lit_value(lit) == LBOOL_UNDEF);
        self.assigns[lit.var().idx()] = LBool::from_bool(!lit.sign());
        self.vardata[lit.var().idx()] = VariableData {
            reason,
            level: self.trail_lim.len() as i32,
        };
        self.trail.push(lit);
    }

    fn get_reason(&self, var: Var) -> ClauseHeaderOffset {
        self.vardata[var.idx()].reason
    }

    /// Two-watched-literal unit propagation to fixpoint. Returns the
    /// conflicting clause, or `CLAUSE_NONE`. The propagation queue is
    /// drained even on conflict.
    pub fn propagate(&mut self) -> ClauseHeaderOffset {
        let mut conflict_clause = CLAUSE_NONE;
        let mut num_props = 0;

        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;

            self.clean_watch(p);

            num_props += 1;

            let (mut i, mut j) = (0, 0);
            'for_each_watch: while i < self.watch_occs[p.0 as usize].len() {
                let assigns = &self.assigns;
                let watches = &mut self.watch_occs[p.0 as usize];
                let blocker = watches[i].blocker;
                let cref = watches[i].cref;

                // try to avoid inspecting the clause
                if Self::assigns_lit_value(assigns, blocker) == LBOOL_TRUE {
                    watches[j] = watches[i];
                    j += 1;
                    i += 1;
                    continue;
                }

                // make sure the false literal is lits[1]
                let header = self.clause_database.get_header(cref);
                let lits = self
                    .clause_database
                    .get_lits_mut(cref, header.get_size() as usize);
                let false_lit = p.inverse();
                if lits[0] == false_lit {
                    lits.swap(0, 1);
                }
                debug_assert!(lits[1] == false_lit);

                i += 1;

                // if the 0th watch is true, the clause is already satisfied
                let first = lits[0];
                let w = Watcher {
                    cref,
                    blocker: first,
                };
                if first != blocker && Self::assigns_lit_value(assigns, first) == LBOOL_TRUE {
                    watches[j] = w;
                    j += 1;
                    continue;
                }

                // look for a new watch
                let mut k = 2;
                while k < lits.len() {
                    if Self::assigns_lit_value(assigns, lits[k]) != LBOOL_FALSE {
                        lits[1] = lits[k];
                        lits[k] = false_lit;
                        self.watch_occs[lits[1].inverse().0 as usize].push(w);
                        continue 'for_each_watch;
                    }
                    k += 1;
                }

                // did not find a watch -- clause is unit under assignment
                watches[j] = w;
                j += 1;
                if Self::assigns_lit_value(assigns, first) == LBOOL_FALSE {
                    trace!("conflict in cref={}", cref);
                    conflict_clause = cref;
                    self.qhead = self.trail.len();
                    // copy the remaining watches
                    while i < self.watch_occs[p.0 as usize].len() {
                        self.watch_occs[p.0 as usize][j] = self.watch_occs[p.0 as usize][i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.unchecked_enqueue(first, cref);
                }
            }

            self.watch_occs[p.0 as usize].truncate(j);
        }
        self.stats.propagations += num_props;
        self.simp_db_props -= num_props as i64;

        conflict_clause
    }

    /// Halve the learnt-clause database. Binaries sort last and are kept;
    /// the rest go lowest-activity-first. Locked clauses survive, as does
    /// anything outside the first half with activity above the floor.
    fn reduce_db(&mut self) {
        let extra_lim = self.cla_inc / self.learnts.len() as f64;
        {
            use std::cmp::Ordering;
            let db = &self.clause_database;
            self.learnts.sort_by(|x, y| {
                if db.get_header(*x).get_size() > 2
                    && (db.get_header(*y).get_size() == 2
                        || db.get_activity(*x) < db.get_activity(*y))
                {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            });
        }

        let n_before = self.learnts.len();
        let (mut i, mut j) = (0, 0);
        while i < self.learnts.len() {
            let cref = self.learnts[i];
            let header = self.clause_database.get_header(cref);
            let lits = self
                .clause_database
                .get_lits(cref, header.get_size() as usize);
            if header.get_size() > 2
                && !self.is_clause_locked(cref, lits)
                && (i < self.learnts.len() / 2
                    || (self.clause_database.get_activity(cref) as f64) < extra_lim)
            {
                self.remove_clause(cref);
            } else {
                self.learnts[j] = cref;
                j += 1;
            }
            i += 1;
        }
        self.learnts.truncate(j);
        debug!("reduce_db kept {}/{} learnts", j, n_before);
        self.check_garbage();
    }

    fn check_garbage(&mut self) {
        if (self.clause_database.wasted as f64)
            > (self.clause_database.clause_data.len() as f64) * self.params.garbage_frac
        {
            self.garbage_collect();
        }
    }

    /// Compact the clause arena, rewriting every live reference. Runs
    /// automatically at the `check_garbage` points; public so a driver can
    /// force a collection between any two operations.
    pub fn garbage_collect(&mut self) {
        let mut new_data = Vec::with_capacity(
            self.clause_database.clause_data.len() - self.clause_database.wasted as usize,
        );
        self.reloc_all_clauses(&mut new_data);
        debug!(
            "garbage collect: {} -> {} units",
            self.clause_database.clause_data.len(),
            new_data.len()
        );
        std::mem::swap(&mut self.clause_database.clause_data, &mut new_data);
        self.clause_database.wasted = 0;
    }

    fn reloc_all_clauses(&mut self, new_data: &mut Vec<u32>) {
        self.clean_all_watches();

        // watches
        for v in 0..self.next_var {
            for s in &[false, true] {
                let p = Lit::new(Var(v), *s);
                for w in self.watch_occs[p.0 as usize].iter_mut() {
                    w.cref = self.clause_database.relocate_clause(w.cref, new_data);
                }
            }
        }

        // reasons
        for i in 0..self.trail.len() {
            let var = self.trail[i].var();
            let reason = self.get_reason(var);
            if reason != CLAUSE_NONE {
                // a relocated clause must not be fed to is_clause_locked,
                // hence the reloced check first
                let header = self.clause_database.get_header(reason);
                let lits = self
                    .clause_database
                    .get_lits(reason, header.get_size() as usize);
                if header.get_reloced() || self.is_clause_locked(reason, lits) {
                    assert!(header.get_mark() != 1);
                    let cl = &mut self.vardata[var.idx()].reason;
                    *cl = self.clause_database.relocate_clause(*cl, new_data);
                }
            }
        }

        // cached stepwise conflict
        if self.cached_conflict != CLAUSE_NONE {
            self.cached_conflict = self
                .clause_database
                .relocate_clause(self.cached_conflict, new_data);
        }

        // learnt clauses
        let (mut i, mut j) = (0, 0);
        while i < self.learnts.len() {
            let header = self.clause_database.get_header(self.learnts[i]);
            if header.get_mark() != 1 {
                self.learnts[i] = self
                    .clause_database
                    .relocate_clause(self.learnts[i], new_data);
                self.learnts[j] = self.learnts[i];
                j += 1;
            }
            i += 1;
        }
        self.learnts.truncate(j);

        // original clauses
        let (mut i, mut j) = (0, 0);
        while i < self.clauses.len() {
            let header = self.clause_database.get_header(self.clauses[i]);
            if header.get_mark() != 1 {
                self.clauses[i] = self
                    .clause_database
                    .relocate_clause(self.clauses[i], new_data);
                self.clauses[j] = self.clauses[i];
                j += 1;
            }
            i += 1;
        }
        self.clauses.truncate(j);
    }

    fn remove_satisfied(&mut self, clauses: &mut Vec<ClauseHeaderOffset>) {
        let (mut i, mut j) = (0, 0);
        while i < clauses.len() {
            let cref = clauses[i];
            let header = self.clause_database.get_header(cref);
            let size = header.get_size() as usize;
            if Self::assigns_satisfied(&self.assigns, self.clause_database.get_lits(cref, size)) {
                self.remove_clause(cref);
            } else {
                // strip literals false at level 0
                let assigns = &self.assigns;
                let lits = self.clause_database.get_lits_mut(cref, size);
                debug_assert!(
                    Self::assigns_lit_value(assigns, lits[0]) == LBOOL_UNDEF
                        || Self::assigns_lit_value(assigns, lits[1]) == LBOOL_UNDEF
                );
                let mut k: usize = 2;
                let mut new_len = size;
                while k < new_len {
                    if Self::assigns_lit_value(assigns, lits[k]) == LBOOL_FALSE {
                        new_len -= 1;
                        lits[k] = lits[new_len];
                    } else {
                        k += 1;
                    }
                }
                if new_len != size {
                    if header.get_learnt() {
                        self.stats.learnts_literals -= size - new_len;
                    } else {
                        self.stats.clauses_literals -= size - new_len;
                    }
                    self.clause_database.update_size(cref, new_len);
                }

                clauses[j] = clauses[i];
                j += 1;
            }
            i += 1;
        }
        clauses.truncate(j);
    }

    fn clean_all_watches(&mut self) {
        let dirties = std::mem::replace(&mut self.watch_dirties, Vec::new());
        for l in dirties {
            self.clean_watch(l);
        }
    }

    fn clean_watch(&mut self, lit: Lit) {
        if self.watch_dirty[lit.0 as usize] == 0 {
            return;
        }
        let db = &self.clause_database;
        self.watch_occs[lit.0 as usize].retain(|w| db.get_header(w.cref).get_mark() != 1);
        self.watch_dirty[lit.0 as usize] = 0;
    }

    /// Simplify the clause database according to the top-level assignment:
    /// remove satisfied clauses, strip falsified literals, retire released
    /// variables. Only legal at decision level 0.
    pub fn simplify(&mut self) -> bool {
        assert!(self.trail_lim.is_empty());
        if !self.ok || self.propagate() != CLAUSE_NONE {
            self.ok = false;
            return false;
        }

        if (self.trail.len() as i32) == self.simp_db_assigns || self.simp_db_props > 0 {
            return true;
        }

        debug!(
            "simplify at trail length {} ({} clauses, {} learnts)",
            self.trail.len(),
            self.clauses.len(),
            self.learnts.len()
        );
        if let Some(f) = self.tracelog_file.as_mut() {
            let _ = writeln!(f, "simp");
        }

        let mut learnts = std::mem::replace(&mut self.learnts, Vec::new());
        self.remove_satisfied(&mut learnts);
        self.learnts = learnts;
        if self.remove_satisfied {
            let mut clauses = std::mem::replace(&mut self.clauses, Vec::new());
            self.remove_satisfied(&mut clauses);
            self.clauses = clauses;

            // remove released variables from the trail
            for v in self.released_vars.iter() {
                debug_assert!(self.seen[v.idx()] == 0);
                self.seen[v.idx()] = 1;
            }

            let seen = &self.seen;
            debug_assert!(self.qhead == self.trail.len());
            self.trail.retain(|l| seen[l.var().idx()] == 0);
            self.qhead = self.trail.len();
            for v in self.released_vars.iter() {
                self.seen[v.idx()] = 0;
            }
            self.free_vars.extend(self.released_vars.drain(..));
        }

        self.check_garbage();
        self.rebuild_order_heap();

        self.simp_db_assigns = self.trail.len() as i32;
        self.simp_db_props =
            self.stats.clauses_literals as i64 + self.stats.learnts_literals as i64;

        true
    }

    fn rebuild_order_heap(&mut self) {
        let mut vs = Vec::new();
        for v in 0..self.decision.len() {
            if self.decision[v] == 1 && self.var_value(Var(v as i32)) == LBOOL_UNDEF {
                vs.push(v as i32);
            }
        }
        self.order_heap.build(&vs, &self.activity);
    }

    // ------
    // Dynamic clause ingestion
    // ------

    /// Add a clause at an arbitrary decision level, reconciling it with
    /// the current trail. Depending on how the clause relates to the
    /// assignment this is a plain attachment, a rewind-and-enqueue, or a
    /// full conflict analysis. Returns `false` iff the clause is falsified
    /// at the root (the formula is UNSAT).
    pub fn add_clause_during_search(&mut self, lits: &[Lit]) -> bool {
        if !self.ok || lits.is_empty() {
            return false;
        }

        let mut clause: SmallVec<[Lit; 8]> = SmallVec::from_slice(lits);

        // undefined literals first, then assigned ones by descending level
        {
            let assigns = &self.assigns;
            let vardata = &self.vardata;
            clause.sort_by(|x, y| {
                use std::cmp::Ordering;
                let xu = Self::assigns_lit_value(assigns, *x) == LBOOL_UNDEF;
                let yu = Self::assigns_lit_value(assigns, *y) == LBOOL_UNDEF;
                match (xu, yu) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => vardata[y.var().idx()]
                        .level
                        .cmp(&vardata[x.var().idx()].level),
                }
            });
        }

        trace!("ingest {:?}", clause);

        // ingested lemmas negate the assignment they were derived from, so
        // no literal can be true here
        if let Some(ti) = clause
            .iter()
            .position(|l| self.lit_value(*l) == LBOOL_TRUE)
        {
            debug_assert!(false, "satisfied clause handed to ingestion");
            if clause.len() > 1 {
                clause.swap(0, ti);
                let cref = self.clause_database.add_clause(&clause, false);
                self.clauses.push(cref);
                self.attach_clause(cref);
            }
            return true;
        }

        let num_unassigned = clause
            .iter()
            .take_while(|l| self.lit_value(**l) == LBOOL_UNDEF)
            .count();

        if num_unassigned == clause.len() {
            // nothing assigned: only a unit forces anything
            if clause.len() == 1 {
                self.cancel_until(0);
                self.unchecked_enqueue(clause[0], CLAUSE_NONE);
            } else {
                let cref = self.clause_database.add_clause(&clause, false);
                self.clauses.push(cref);
                self.attach_clause(cref);
            }
            return true;
        }

        let highest_dl = self.vardata[clause[num_unassigned].var().idx()].level;

        if num_unassigned == 0 && highest_dl == 0 {
            // falsified at the root
            return false;
        }

        if num_unassigned >= 2 {
            // two non-false watches available; attach and move on
            let cref = self.clause_database.add_clause(&clause, false);
            self.clauses.push(cref);
            self.attach_clause(cref);
            return true;
        }

        if num_unassigned == 1 {
            // asserting once the trail is rewound to the highest level
            self.cancel_until(highest_dl);
            let cref = self.clause_database.add_clause(&clause, false);
            self.bump_clause_vars(&clause);
            self.clauses.push(cref);
            self.attach_clause(cref);
            self.unchecked_enqueue(clause[0], cref);
            return true;
        }

        // every literal is false
        let num_highest_dl = clause
            .iter()
            .take_while(|l| self.vardata[l.var().idx()].level == highest_dl)
            .count();

        if num_highest_dl > 1 {
            // conflicting at highest_dl: install as an original clause (so
            // reduce_db cannot evict the asserting literal's antecedent)
            // and learn from the conflict
            self.cancel_until(highest_dl);
            let cref = self.clause_database.add_clause(&clause, false);
            self.clauses.push(cref);
            self.attach_clause(cref);

            let mut learnt_clause = std::mem::replace(&mut self.learnt_tmp, Vec::new());
            learnt_clause.clear();
            let backtrack_level = self.analyze(cref, &mut learnt_clause);
            self.cancel_until(backtrack_level);
            if learnt_clause.len() == 1 {
                self.unchecked_enqueue(learnt_clause[0], CLAUSE_NONE);
            } else {
                let lref = self.clause_database.add_clause(&learnt_clause, true);
                self.learnts.push(lref);
                self.attach_clause(lref);
                self.clause_bump_activity(lref);
                self.unchecked_enqueue(learnt_clause[0], lref);
            }
            self.learnt_tmp = learnt_clause;
        } else if clause.len() > 1 {
            // already asserting after a backjump to the second-highest level
            let second_highest_dl = self.vardata[clause[1].var().idx()].level;
            self.cancel_until(second_highest_dl);
            let cref = self.clause_database.add_clause(&clause, false);
            self.bump_clause_vars(&clause);
            self.clauses.push(cref);
            self.attach_clause(cref);
            self.unchecked_enqueue(clause[0], cref);
        } else {
            // falsified unit above the root
            self.cancel_until(0);
            self.unchecked_enqueue(clause[0], CLAUSE_NONE);
        }
        true
    }

    fn bump_clause_vars(&mut self, clause: &[Lit]) {
        for l in clause {
            let inc = self.var_inc;
            Self::var_bump_activity(
                &mut self.activity,
                &mut self.order_heap,
                &mut self.var_inc,
                l.var(),
                inc,
            );
        }
    }

    // ------
    // External-propagator integration
    // ------

    /// Snapshot of the edge-variable assignment as a symmetric matrix.
    pub fn adjacency_matrix(&self) -> AdjacencyMatrix {
        let n = self.graph.vertices();
        let mut matrix = vec![vec![TruthValue::Unknown; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let tv = match self.var_value(self.graph.edge_var(i, j)).as_bool() {
                    Some(true) => TruthValue::True,
                    Some(false) => TruthValue::False,
                    None => TruthValue::Unknown,
                };
                matrix[i][j] = tv;
                matrix[j][i] = tv;
            }
        }
        matrix
    }

    fn all_edges_assigned(&self) -> bool {
        (0..self.graph.num_edges()).all(|v| self.var_value(Var(v as i32)) != LBOOL_UNDEF)
    }

    /// Consult the oracle at a stabilized node. Returns `1` when the
    /// assignment is accepted, `0` when a lemma was absorbed (propagation
    /// must be retried), `-1` when the formula became UNSAT.
    fn check_oracle(&mut self) -> i32 {
        if !self.oracle_enabled {
            return 1;
        }

        let is_full = self.all_edges_assigned();
        if !is_full {
            self.oracle_node_counter += 1;
            let freq = self.params.oracle_check_frequency.max(1) as u64;
            if self.oracle_node_counter % freq != 0 {
                return 1;
            }
        }

        self.stats.oracle_checks += 1;
        let matrix = self.adjacency_matrix();
        match self.oracle.check(&matrix, is_full) {
            Verdict::Ok => 1,
            Verdict::ForbiddenGraph(fg) => {
                self.stats.oracle_lemmas += 1;
                let clause = self.graph.forbidden_graph_clause(&fg);
                if self.add_clause_during_search(&clause) {
                    0
                } else {
                    -1
                }
            }
            Verdict::Clauses(clauses) => {
                if clauses.is_empty() {
                    return 1;
                }
                // one clause at a time: the first absorbed lemma already
                // reshapes the trail, so the rest wait for the next check
                self.stats.oracle_lemmas += 1;
                let lits: SmallVec<[Lit; 8]> =
                    clauses[0].iter().map(|i| Lit::from_dimacs(*i)).collect();
                if self.add_clause_during_search(&lits) {
                    0
                } else {
                    -1
                }
            }
        }
    }

    /// Assignment-cutoff cube blocking: once past the prerun time with
    /// enough edge variables pinned down, trace the partial assignment as
    /// an `a ... 0` cube line and block it.
    fn try_block_cube(&mut self) -> Option<bool> {
        let cutoff = self.params.assignment_cutoff? as usize;
        if self.solve_time < self.params.assignment_cutoff_prerun_secs
            || self.trail_lim.is_empty()
        {
            return None;
        }

        let assigned: Vec<Lit> = (0..self.graph.num_edges())
            .filter_map(|v| {
                let var = Var(v as i32);
                self.var_value(var).as_bool().map(|b| Lit::new(var, !b))
            })
            .collect();
        if assigned.len() < cutoff {
            return None;
        }

        if let Some(f) = self.tracelog_file.as_mut() {
            let _ = write!(f, "a");
            for l in assigned.iter() {
                let _ = write!(f, " {}", l.to_dimacs());
            }
            let _ = writeln!(f, " 0");
        }

        let blocking: Vec<Lit> = assigned.iter().map(|l| l.inverse()).collect();
        Some(self.add_clause_during_search(&blocking))
    }

    // ------
    // Search
    // ------

    /// Search for a model for at most `nof_conflicts` conflicts (negative
    /// means no bound).
    fn search(&mut self, nof_conflicts: i32) -> LBool {
        debug!("-> SEARCH(nof_conflicts={})", nof_conflicts);
        assert!(self.ok);
        let mut conflict_c = 0;
        let mut learnt_clause: Vec<Lit> = Vec::new();
        self.stats.starts += 1;
        let mut tick = cpu_time::ProcessTime::now();

        loop {
            let now = cpu_time::ProcessTime::now();
            self.solve_time += now.duration_since(tick).as_secs_f64();
            tick = now;

            let conflict_clause = self.propagate();
            if conflict_clause != CLAUSE_NONE {
                // CONFLICT
                self.stats.conflicts += 1;
                conflict_c += 1;
                if self.trail_lim.is_empty() {
                    return LBOOL_FALSE;
                }

                learnt_clause.clear();
                let backtrack_level = self.analyze(conflict_clause, &mut learnt_clause);

                if let Some(f) = self.tracelog_file.as_mut() {
                    let _ = write!(f, "a2");
                    for x in &learnt_clause {
                        let _ = write!(f, " {}", x.to_dimacs());
                    }
                    let _ = writeln!(f, " 0\nbacktrack_level {}", backtrack_level);
                }

                self.cancel_until(backtrack_level);

                if learnt_clause.len() == 1 {
                    self.unchecked_enqueue(learnt_clause[0], CLAUSE_NONE);
                } else {
                    let cref = self.clause_database.add_clause(&learnt_clause, true);
                    self.learnts.push(cref);
                    self.attach_clause(cref);
                    self.clause_bump_activity(cref);
                    self.unchecked_enqueue(learnt_clause[0], cref);
                }

                self.var_decay_activity();
                self.clause_decay_activity();

                self.learntsize_adjust_cnt -= 1;
                if self.learntsize_adjust_cnt == 0 {
                    self.learntsize_adjust_confl *= self.params.learntsize_adjust_inc;
                    self.learntsize_adjust_cnt = self.learntsize_adjust_confl as i32;
                    self.max_learnts *= self.params.learntsize_inc;

                    if self.verbosity >= 1 {
                        info!(
                            " > cfl{:>9} | vars {:>6} clauses {:>7} lits {:>6} | limit {:>7} learnts {:>7}",
                            self.stats.conflicts,
                            (self.stats.dec_vars as isize)
                                - if self.trail_lim.is_empty() {
                                    self.trail.len() as isize
                                } else {
                                    self.trail_lim[0] as isize
                                },
                            self.clauses.len(),
                            self.stats.clauses_literals,
                            self.max_learnts as isize,
                            self.learnts.len(),
                        );
                    }
                }
            } else {
                // NO CONFLICT
                if (nof_conflicts >= 0 && conflict_c >= nof_conflicts) || !self.within_budget() {
                    self.cancel_until(0);
                    return LBOOL_UNDEF;
                }

                // simplify the set of problem clauses
                if self.trail_lim.is_empty() && !self.simplify() {
                    return LBOOL_FALSE;
                }

                // reduce the set of learnt clauses
                if self.learnts.len() as f64 - self.trail.len() as f64 >= self.max_learnts {
                    self.reduce_db();
                }

                // the trail is stable: hand the graph to the oracle
                match self.check_oracle() {
                    0 => continue,
                    -1 => return LBOOL_FALSE,
                    _ => {}
                }

                match self.try_block_cube() {
                    Some(true) => continue,
                    Some(false) => return LBOOL_FALSE,
                    None => {}
                }

                let mut next = LIT_UNDEF;
                while self.trail_lim.len() < self.assumptions.len() {
                    // perform user provided assumption
                    let p = self.assumptions[self.trail_lim.len()];
                    if self.lit_value(p) == LBOOL_TRUE {
                        // dummy decision level
                        self.trail_lim.push(self.trail.len() as i32);
                    } else if self.lit_value(p) == LBOOL_FALSE {
                        self.analyze_final(p.inverse());
                        return LBOOL_FALSE;
                    } else {
                        next = p;
                        break;
                    }
                }

                if next == LIT_UNDEF {
                    self.stats.decisions += 1;
                    next = self.pick_branch_lit();
                    if next == LIT_UNDEF {
                        // model found
                        return LBOOL_TRUE;
                    }
                }

                trace!("decision {:?}", next);
                self.trail_lim.push(self.trail.len() as i32);
                self.unchecked_enqueue(next, CLAUSE_NONE);
            }
        }
    }

    fn within_budget(&self) -> bool {
        !self.asynch_interrupt
            && (self.conflict_budget < 0 || (self.stats.conflicts as i64) < self.conflict_budget)
            && (self.propagation_budget < 0
                || (self.stats.propagations as i64) < self.propagation_budget)
            && (self.time_budget < 0.0 || self.solve_time < self.time_budget)
    }

    fn luby(y: f64, mut x: i32) -> f64 {
        // find the finite subsequence that contains index 'x', and the
        // size of that subsequence
        let mut size = 1;
        let mut seq = 0;
        while size < x + 1 {
            seq += 1;
            size = 2 * size + 1;
        }

        while size - 1 != x {
            size = (size - 1) >> 1;
            seq -= 1;
            x %= size;
        }

        y.powf(seq as f64)
    }

    pub fn solve(&mut self) -> LBool {
        debug!("-> SOLVE");
        self.model.clear();
        self.conflict.clear();
        if !self.ok {
            return LBOOL_FALSE;
        }

        self.stats.solves += 1;
        // successive time-limited calls each get the full budget; conflict
        // and propagation counters are cumulative
        self.solve_time = 0.0;

        self.max_learnts = ((self.clauses.len() as f64) * self.params.learntsize_factor)
            .max(self.params.min_learnts_lim as f64);

        self.learntsize_adjust_confl = self.params.learntsize_adjust_start_confl as f64;
        self.learntsize_adjust_cnt = self.learntsize_adjust_confl as i32;
        let mut status = LBOOL_UNDEF;

        let mut curr_restarts = 0;
        while status == LBOOL_UNDEF {
            let rest_base = if self.params.luby_restart {
                Self::luby(self.params.restart_inc, curr_restarts)
            } else {
                self.params.restart_inc.powf(curr_restarts as f64)
            };

            status = self.search((rest_base * self.params.restart_first as f64) as i32);
            if !self.within_budget() {
                break;
            }
            curr_restarts += 1;
        }

        if status == LBOOL_TRUE {
            self.model.resize(self.next_var as usize, LBOOL_UNDEF);
            for v in (0..self.next_var).map(Var) {
                self.model[v.idx()] = self.var_value(v);
            }
        } else if status == LBOOL_FALSE && self.conflict.is_empty() {
            self.ok = false;
        }

        self.cancel_until(0);
        debug!("<- SOLVE {:?}", status.as_bool());
        status
    }

    /// Solve under assumptions, consumed by this single call. On failure
    /// caused by the assumptions, `self.conflict` holds the subset that
    /// was responsible.
    pub fn solve_with_assumptions(&mut self, assumps: &[Lit]) -> LBool {
        self.assumptions.clear();
        self.assumptions.extend_from_slice(assumps);
        let status = self.solve();
        self.assumptions.clear();
        status
    }

    pub fn set_conflict_budget(&mut self, budget: i64) {
        self.conflict_budget = budget;
    }
    pub fn set_propagation_budget(&mut self, budget: i64) {
        self.propagation_budget = budget;
    }
    pub fn set_time_budget(&mut self, secs: f64) {
        self.time_budget = secs;
    }
    pub fn interrupt(&mut self) {
        self.asynch_interrupt = true;
    }
    pub fn clear_interrupt(&mut self) {
        self.asynch_interrupt = false;
    }
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    // ------
    // DIMACS output
    // ------

    fn map_var(x: Var, map: &mut Vec<i32>, max: &mut i32) -> i32 {
        if map.len() <= x.idx() {
            map.resize(x.idx() + 1, -1);
        }
        if map[x.idx()] == -1 {
            map[x.idx()] = *max;
            *max += 1;
        }
        map[x.idx()]
    }

    fn dimacs_clause<W: Write>(
        &self,
        w: &mut W,
        lits: &[Lit],
        map: &mut Vec<i32>,
        max: &mut i32,
    ) -> std::io::Result<()> {
        for l in lits {
            if self.lit_value(*l) != LBOOL_FALSE {
                let v = Self::map_var(l.var(), map, max) + 1;
                write!(w, "{}{} ", if l.sign() { "-" } else { "" }, v)?;
            }
        }
        writeln!(w, "0")
    }

    /// Write the current clause set in DIMACS form: satisfied clauses are
    /// omitted, falsified literals stripped, assumptions emitted as unit
    /// clauses. A solver in the contradictory state writes a trivially
    /// unsatisfiable formula.
    pub fn to_dimacs<W: Write>(&self, w: &mut W, assumps: &[Lit]) -> std::io::Result<()> {
        if !self.ok {
            return write!(w, "p cnf 1 2\n1 0\n-1 0\n");
        }

        let mut map: Vec<i32> = Vec::new();
        let mut max = 0i32;

        let mut cnt = 0;
        for cref in self.clauses.iter() {
            let (_, lits) = self.clause_database.get_clause(*cref);
            if !Self::assigns_satisfied(&self.assigns, lits) {
                cnt += 1;
                for l in lits {
                    if self.lit_value(*l) != LBOOL_FALSE {
                        Self::map_var(l.var(), &mut map, &mut max);
                    }
                }
            }
        }

        // assumptions are added as unit clauses
        cnt += assumps.len();
        for a in assumps {
            Self::map_var(a.var(), &mut map, &mut max);
        }

        writeln!(w, "p cnf {} {}", max, cnt)?;

        for a in assumps {
            debug_assert!(self.lit_value(*a) != LBOOL_FALSE);
            let v = Self::map_var(a.var(), &mut map, &mut max) + 1;
            writeln!(w, "{}{} 0", if a.sign() { "-" } else { "" }, v)?;
        }

        for cref in self.clauses.iter() {
            let (_, lits) = self.clause_database.get_clause(*cref);
            if !Self::assigns_satisfied(&self.assigns, lits) {
                self.dimacs_clause(w, lits, &mut map, &mut max)?;
            }
        }

        Ok(())
    }

    pub fn stats_info(&self, solve_start: cpu_time::ProcessTime) {
        let duration = cpu_time::ProcessTime::now()
            .duration_since(solve_start)
            .as_millis() as f64
            / 1000.0;
        info!("* stats:");
        info!("  - restarts: {}", self.stats.starts);
        info!(
            "  - conflicts: {}  ({:.0} /sec)",
            self.stats.conflicts,
            self.stats.conflicts as f64 / duration
        );
        info!(
            "  - decisions: {}  ({:.2}% random)  ({:.0} /sec)",
            self.stats.decisions,
            self.stats.rnd_decisions as f64 * 100.0 / self.stats.decisions as f64,
            self.stats.decisions as f64 / duration
        );
        info!(
            "  - propagations: {}  ({:.0} /sec)",
            self.stats.propagations,
            self.stats.propagations as f64 / duration
        );
        info!(
            "  - conflict literals: {}  ({:.2} % deleted)",
            self.stats.tot_literals,
            (self.stats.max_literals as f64 - self.stats.tot_literals as f64) * 100.0
                / self.stats.max_literals as f64
        );
        info!(
            "  - oracle: {} checks, {} lemmas",
            self.stats.oracle_checks, self.stats.oracle_lemmas
        );
        info!("  - cpu time: {:.2}s", duration);
    }
}

fn var_map_insert<T: Clone>(map: &mut Vec<T>, Var(idx): Var, value: T, default: T) {
    map_insert(map, idx as usize, value, default)
}

fn map_insert<T: Clone>(map: &mut Vec<T>, idx: usize, value: T, default: T) {
    map.resize((idx + 1).max(map.len()), default);
    map[idx] = value;
}

pub fn drand(seed: &mut f64) -> f64 {
    let n: f64 = 2147483647.0;
    *seed *= 1389796.0;
    let q = (*seed / n) as i32;
    *seed -= q as f64 * n;
    *seed / n
}

pub fn irand(seed: &mut f64, size: i32) -> i32 {
    (drand(seed) * size as f64) as i32
}
