//! Handle-based C ABI over the stepwise driver surface.
//!
//! The solver is an opaque pointer; literals cross the boundary as
//! nonzero signed integers `+-(var+1)`, and a zero terminates a clause in
//! the append API. Result structs carry an explicit kind plus counters.

use std::os::raw::{c_double, c_int, c_void};

use crate::bools::*;
use crate::oracle::NullOracle;
use crate::stepwise::EnumerationTermination;
use crate::SmsSolver;

pub const SMSAT_TERMINATION_DONE: c_int = 0;
pub const SMSAT_TERMINATION_TIME: c_int = 1;
pub const SMSAT_TERMINATION_LIMIT: c_int = 2;

#[repr(C)]
pub struct PropLits {
    pub result: c_int,
    pub num_prop_lits: c_int,
}

#[repr(C)]
pub struct SwitchResult {
    pub result: c_int,
    pub num_decisions_executed: c_int,
    pub num_prop_lits: c_int,
}

#[repr(C)]
pub struct EnumResult {
    pub num_solutions: c_int,
    pub termination: c_int,
}

struct Handle {
    solver: SmsSolver<NullOracle>,
    tmp_clause: Vec<Lit>,
}

unsafe fn handle<'a>(ptr: *mut c_void) -> &'a mut Handle {
    &mut *(ptr as *mut Handle)
}

fn prop_lits(r: crate::stepwise::StepResult) -> PropLits {
    PropLits {
        result: r.result as c_int,
        num_prop_lits: r.num_prop_lits,
    }
}

#[no_mangle]
pub extern "C" fn smsat_create_solver(vertices: c_int) -> *mut c_void {
    let vertices = vertices.max(2) as usize;
    let handle = Box::new(Handle {
        solver: SmsSolver::new(vertices, NullOracle),
        tmp_clause: Vec::new(),
    });
    Box::into_raw(handle) as *mut c_void
}

/// # Safety
/// `ptr` must come from [`smsat_create_solver`] and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn smsat_destroy_solver(ptr: *mut c_void) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr as *mut Handle));
    }
}

/// Append a literal to the pending clause; zero terminates the clause and
/// adds it to the solver. Variables are created on demand.
#[no_mangle]
pub unsafe extern "C" fn smsat_add(ptr: *mut c_void, lit: c_int) {
    let h = handle(ptr);
    if lit != 0 {
        let var = lit.abs() - 1;
        while (h.solver.num_vars() as c_int) <= var {
            h.solver.new_var(LBOOL_UNDEF, true);
        }
        h.tmp_clause.push(Lit::from_dimacs(lit));
    } else {
        let clause = std::mem::replace(&mut h.tmp_clause, Vec::new());
        h.solver.add_clause(clause.iter().cloned());
        h.tmp_clause = clause;
        h.tmp_clause.clear();
    }
}

#[no_mangle]
pub unsafe extern "C" fn smsat_propagate(ptr: *mut c_void) -> PropLits {
    prop_lits(handle(ptr).solver.step_propagate())
}

#[no_mangle]
pub unsafe extern "C" fn smsat_assign_literal(ptr: *mut c_void, literal: c_int) -> PropLits {
    prop_lits(handle(ptr).solver.assign_literal(Lit::from_dimacs(literal)))
}

#[no_mangle]
pub unsafe extern "C" fn smsat_backtrack(ptr: *mut c_void, num_dec_levels: c_int) -> c_int {
    if num_dec_levels >= 0 && handle(ptr).solver.backtrack(num_dec_levels as u32) {
        1
    } else {
        0
    }
}

#[no_mangle]
pub unsafe extern "C" fn smsat_learn_clause(ptr: *mut c_void) -> PropLits {
    prop_lits(handle(ptr).solver.learn_clause())
}

#[no_mangle]
pub unsafe extern "C" fn smsat_request_propagation_scope(
    ptr: *mut c_void,
    level: c_int,
) -> c_int {
    if level >= 0 && handle(ptr).solver.request_propagation_scope(level as u32) {
        1
    } else {
        0
    }
}

/// Next literal of a running trail iteration; zero when exhausted.
#[no_mangle]
pub unsafe extern "C" fn smsat_next_prop_lit(ptr: *mut c_void) -> c_int {
    match handle(ptr).solver.next_prop_lit() {
        Some(l) => l.to_dimacs(),
        None => 0,
    }
}

/// # Safety
/// `literals` must point to `length` readable ints.
#[no_mangle]
pub unsafe extern "C" fn smsat_fast_switch_assignment(
    ptr: *mut c_void,
    length: c_int,
    literals: *const c_int,
) -> SwitchResult {
    let target = if length > 0 && !literals.is_null() {
        std::slice::from_raw_parts(literals, length as usize)
    } else {
        &[]
    };
    let r = handle(ptr).solver.fast_switch_assignment(target);
    SwitchResult {
        result: r.result as c_int,
        num_decisions_executed: r.num_decisions_executed,
        num_prop_lits: r.num_prop_lits,
    }
}

/// DIMACS-style exit codes: 10 for SAT, 20 for UNSAT, 0 for undecided.
#[no_mangle]
pub unsafe extern "C" fn smsat_run_solver(ptr: *mut c_void, secs: c_double) -> c_int {
    match handle(ptr).solver.run_solver(secs).as_bool() {
        Some(true) => 10,
        Some(false) => 20,
        None => 0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn smsat_run_solver_enumerate(
    ptr: *mut c_void,
    secs: c_double,
    max_sol: c_int,
) -> EnumResult {
    let max = if max_sol <= 0 {
        usize::max_value()
    } else {
        max_sol as usize
    };
    let r = handle(ptr).solver.run_solver_enumerate(secs, max);
    EnumResult {
        num_solutions: r.num_solutions as c_int,
        termination: match r.termination {
            EnumerationTermination::Done => SMSAT_TERMINATION_DONE,
            EnumerationTermination::Time => SMSAT_TERMINATION_TIME,
            EnumerationTermination::Limit => SMSAT_TERMINATION_LIMIT,
        },
    }
}

/// 1 when the literal is true in the most recent model, 0 otherwise.
#[no_mangle]
pub unsafe extern "C" fn smsat_model_value(ptr: *mut c_void, literal: c_int) -> c_int {
    let h = handle(ptr);
    if h.solver.get_model().is_none() {
        return 0;
    }
    (h.solver.model_value(Lit::from_dimacs(literal)) == LBOOL_TRUE) as c_int
}

#[no_mangle]
pub unsafe extern "C" fn smsat_n_vars(ptr: *mut c_void) -> c_int {
    handle(ptr).solver.num_vars() as c_int
}
