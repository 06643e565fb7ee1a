/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Real-time scheduler: selection loop and admission controller.
//!
//! ```text
//! scheduler/
//! ├── priority.rs    – RM rate → priority mapping
//! ├── feasibility.rs – EDF / Liu-Layland admission math
//! └── error.rs       – SchedError, AdmissionReason
//! ```
//!
//! The selection algorithm itself ([`select_candidate`]) is a pure function
//! over a descriptor slice so it can be unit tested without any locking,
//! context switching, or simulated time — [`Scheduler::select_next`] is the
//! thin, side-effecting wrapper that actually holds `table_lock` while
//! calling it.

pub mod error;
pub mod feasibility;
pub mod priority;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{KernelConfig, RmCountMode};
use crate::proc::{PidType, Policy, ProcDescriptor, ProcState, ProcTable, TableInner, WaitOutcome};
use error::{AdmissionReason, SchedError};

/// Pid that orphaned children are reparented to, mirroring the source
/// kernel's convention that `init` is always the first process forked.
pub const INIT_PID: PidType = 1;

/// Abstraction over the untestable per-CPU infinite loop's handoff point.
///
/// In the host kernel this is `swtch()` plus the saved/restored `context`
/// pointers. Here it is a callback invoked with `table_lock` already
/// released: the implementation runs one tick of `pid`'s work and is
/// responsible for calling back into the [`ProcTable`] (`sleep`, `zombify`,
/// `kill`) if that tick causes a state change other than "keep running".
pub trait ContextSwitch: Send + Sync {
    fn run_tick(&self, pid: PidType);
}

/// Abstraction over the scheduler's notion of the current tick, used to
/// stamp `arrival_time` on RM admission. Deliberately not wall-clock time —
/// this is a teaching kernel's tick counter, not a hosted OS's clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Selects the `Runnable` descriptor the scheduler would run next, per the
/// policy carried by the first `Runnable` slot found:
///
/// * `Edf`: minimum `(deadline, pid)`.
/// * `Rm`: minimum `(priority, pid)`.
/// * `None` (or anything else): the first `Runnable` slot found, i.e.
///   round-robin.
///
/// Returns `None` if no slot is `Runnable`.
pub fn select_candidate(procs: &[ProcDescriptor]) -> Option<PidType> {
    let first = procs.iter().position(|p| p.state == ProcState::Runnable)?;
    let policy = procs[first].policy;
    let mut best = first;

    match policy {
        Policy::Edf => {
            for (i, p) in procs.iter().enumerate() {
                if p.state != ProcState::Runnable {
                    continue;
                }
                let b = &procs[best];
                if p.deadline < b.deadline || (p.deadline == b.deadline && p.pid < b.pid) {
                    best = i;
                }
            }
        }
        Policy::Rm => {
            for (i, p) in procs.iter().enumerate() {
                if p.state != ProcState::Runnable {
                    continue;
                }
                let b = &procs[best];
                if p.priority < b.priority || (p.priority == b.priority && p.pid < b.pid) {
                    best = i;
                }
            }
        }
        Policy::None => {}
    }

    Some(procs[best].pid)
}

/// Owns the shared process table and drives both the admission controller
/// and the selection loop against it.
pub struct Scheduler {
    table: Arc<ProcTable>,
    config: KernelConfig,
}

impl Scheduler {
    pub fn new(config: KernelConfig) -> Self {
        let table = Arc::new(ProcTable::new(config.n_proc));
        Self { table, config }
    }

    pub fn table(&self) -> &Arc<ProcTable> {
        &self.table
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Allocates a new process and makes it `Runnable`, as the fork path
    /// does once the child's address space is ready. RT parameters are left
    /// at their defaults — the caller configures them afterward.
    pub fn fork(&self, parent: PidType, name: impl Into<String>) -> Result<PidType, SchedError> {
        let pid = self.table.alloc(parent, name).ok_or(SchedError::TableFull)?;
        self.table.make_runnable(pid);
        info!(pid, parent, "forked process");
        Ok(pid)
    }

    /// Terminates `pid`: reparents its children to [`INIT_PID`], wakes its
    /// parent if sleeping in [`Scheduler::wait`], and zombifies `pid`.
    pub fn exit(&self, pid: PidType) {
        self.table.exit(pid, INIT_PID);
        info!(pid, "process exited");
    }

    /// Reaps the first zombie child of `pid`, blocks `pid` until one
    /// appears, or reports that `pid` has no children. See
    /// [`crate::proc::WaitOutcome`].
    pub fn wait(&self, pid: PidType) -> WaitOutcome {
        let outcome = self.table.wait(pid);
        debug!(pid, ?outcome, "wait");
        outcome
    }

    pub fn set_deadline(&self, pid: PidType, deadline: u64) -> Result<(), SchedError> {
        if self.table.set_deadline(pid, deadline) {
            Ok(())
        } else {
            Err(SchedError::ProcNotFound(pid))
        }
    }

    pub fn set_exec_time(&self, pid: PidType, exec_time: u64) -> Result<(), SchedError> {
        if self.table.set_exec_time(pid, exec_time) {
            Ok(())
        } else {
            Err(SchedError::ProcNotFound(pid))
        }
    }

    pub fn set_rate(&self, pid: PidType, rate: u64) -> Result<(), SchedError> {
        if self.table.set_rate(pid, rate) {
            Ok(())
        } else {
            Err(SchedError::ProcNotFound(pid))
        }
    }

    /// Runs admission control for `pid` under `policy` and, on success,
    /// commits the utilization update and sets `descriptor.policy`. On
    /// rejection, kills and zombifies the process — it is never scheduled.
    ///
    /// `now` stamps `arrival_time` for an RM admission; ignored for EDF.
    pub fn set_policy(&self, pid: PidType, policy: Policy, now: u64) -> Result<(), SchedError> {
        let mut guard = self.table.lock();
        let idx = guard
            .procs()
            .iter()
            .position(|p| p.pid == pid && p.state != ProcState::Unused)
            .ok_or(SchedError::ProcNotFound(pid))?;

        match policy {
            Policy::Edf => self.admit_edf(&mut guard, idx, pid),
            Policy::Rm => self.admit_rm(&mut guard, idx, pid, now),
            Policy::None => Err(SchedError::UnknownPolicy(-1)),
        }
    }

    fn admit_edf(&self, guard: &mut TableInner, idx: usize, pid: PidType) -> Result<(), SchedError> {
        let (exec_time, deadline) = {
            let p = &guard.procs()[idx];
            (p.exec_time, p.deadline)
        };
        let u = match feasibility::edf_utilization(exec_time, deadline) {
            Some(u) => u,
            None => {
                let p = &mut guard.procs_mut()[idx];
                p.killed = true;
                p.state = ProcState::Zombie;
                warn!(pid, "EDF admission rejected: zero deadline");
                return Err(SchedError::AdmissionRejected {
                    pid,
                    reason: AdmissionReason::EdfZeroDeadline,
                });
            }
        };
        let projected = *guard.util_edf_mut() + u;

        if projected >= 100 {
            let p = &mut guard.procs_mut()[idx];
            p.killed = true;
            p.state = ProcState::Zombie;
            warn!(pid, projected, "EDF admission rejected");
            return Err(SchedError::AdmissionRejected {
                pid,
                reason: AdmissionReason::EdfUtilizationExceeded { projected },
            });
        }

        *guard.util_edf_mut() = projected;
        guard.procs_mut()[idx].policy = Policy::Edf;
        info!(pid, projected, "EDF admission accepted");
        Ok(())
    }

    fn admit_rm(
        &self,
        guard: &mut TableInner,
        idx: usize,
        pid: PidType,
        now: u64,
    ) -> Result<(), SchedError> {
        let (exec_time, rate) = {
            let p = &guard.procs()[idx];
            (p.exec_time, p.rate)
        };
        let u = feasibility::rm_utilization(exec_time, rate);
        let projected = *guard.util_rm_mut() + u;
        let n = self.rm_count(guard, idx);
        let bound = feasibility::ll_bound(n);

        if projected > bound as u64 {
            let p = &mut guard.procs_mut()[idx];
            p.killed = true;
            p.state = ProcState::Zombie;
            warn!(pid, projected, bound, n, "RM admission rejected");
            return Err(SchedError::AdmissionRejected {
                pid,
                reason: AdmissionReason::RmBoundExceeded { projected, bound, n },
            });
        }

        *guard.util_rm_mut() = projected;
        let p = &mut guard.procs_mut()[idx];
        p.policy = Policy::Rm;
        p.arrival_time = now;
        info!(pid, projected, bound, n, "RM admission accepted");
        Ok(())
    }

    /// Number of admitted RM processes to use in the Liu-Layland lookup.
    /// See `DESIGN.md` Open Question O1: `PidProxy` reproduces a known
    /// source limitation (using `pid - 2` as a stand-in for the count);
    /// `Accurate` counts the processes actually carrying `Policy::Rm`.
    fn rm_count(&self, guard: &TableInner, idx: usize) -> i64 {
        match self.config.rm_count_mode {
            RmCountMode::PidProxy => guard.procs()[idx].pid as i64 - 2,
            RmCountMode::Accurate => {
                let existing = guard.procs().iter().filter(|p| p.policy == Policy::Rm).count();
                existing as i64 + 1
            }
        }
    }

    /// Selects the next process to run and grants it one tick, without
    /// performing the actual context switch. Returns the selected pid, or
    /// `None` if nothing is runnable.
    ///
    /// If `config.enforce_exec_time` is set and the granted tick would push
    /// `elapsed_time` to or past `exec_time`, the process is killed instead
    /// of scheduled (see `DESIGN.md` Open Question O3) and this call returns
    /// `None` for this tick — the source kernel never enforces this, so it
    /// is off by default.
    pub fn select_next(&self) -> Option<PidType> {
        let mut guard = self.table.lock();
        let pid = select_candidate(guard.procs())?;
        let p = guard.find_mut(pid)?;
        p.elapsed_time += 1;

        if self.config.enforce_exec_time && p.elapsed_time >= p.exec_time {
            p.killed = true;
            p.state = ProcState::Zombie;
            warn!(pid, "exec time budget exhausted, killed");
            return None;
        }

        p.state = ProcState::Running;
        debug!(pid, "selected for this tick");
        Some(pid)
    }

    /// Selects the next process, hands it to `ctx` for one tick of work,
    /// and demotes it back to `Runnable` unless the tick itself changed its
    /// state (slept, exited, was killed).
    pub fn tick(&self, ctx: &dyn ContextSwitch) -> Option<PidType> {
        let pid = self.select_next()?;
        ctx.run_tick(pid);

        let mut guard = self.table.lock();
        if let Some(p) = guard.find_mut(pid) {
            if p.state == ProcState::Running {
                p.state = ProcState::Runnable;
            }
        }
        Some(pid)
    }
}
