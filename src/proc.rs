/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Process descriptor and the fixed-size process table.
//!
//! One [`ProcDescriptor`] per table slot. The table itself, plus the two
//! aggregate utilization counters, live behind a single [`std::sync::Mutex`]
//! ([`ProcTable::inner`]) — the hosted stand-in for the kernel's
//! interrupt-disabling spinlock. Every read or write of a descriptor's
//! scheduling fields happens with that lock held.

use std::sync::Mutex;

use tracing::{debug, trace};

/// Process identifier. A plain alias, not a newtype — the kernel's own pid
/// arithmetic (`pid - 2` in the RM admission count, see `DESIGN.md` O1)
/// relies on ordinary integer semantics.
pub type PidType = i32;

/// Lifecycle state of a process table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

/// Outcome of a [`ProcTable::wait`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A zombie child was found, reaped, and its slot released. Carries
    /// the reaped child's pid.
    Reaped(i32),
    /// `pid` has live children but none are zombies yet; `pid` itself has
    /// been put to sleep on its own pid as the wait channel.
    Blocked,
    /// `pid` has no children at all.
    NoChildren,
}

/// Scheduling policy assigned to a process once admission succeeds.
///
/// `None` is the initial value and is also what every non-real-time process
/// keeps forever; such processes are still scheduled, just round-robin
/// (first `Runnable` slot found wins, see [`crate::scheduler`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    None,
    Edf,
    Rm,
}

/// One process table slot.
///
/// Fields not relevant to real-time scheduling (address space, open files,
/// kernel stack, trap frame, saved context) are intentionally omitted —
/// they belong to collaborators this crate does not model.
#[derive(Debug, Clone)]
pub struct ProcDescriptor {
    pub pid: i32,
    pub state: ProcState,
    pub policy: Policy,

    pub deadline: u64,
    pub exec_time: u64,
    pub elapsed_time: u64,
    pub rate: u64,
    pub priority: u32,
    pub arrival_time: u64,

    pub killed: bool,
    pub parent: i32,
    pub chan: u64,
    pub name: String,
}

impl Default for ProcDescriptor {
    fn default() -> Self {
        Self {
            pid: 0,
            state: ProcState::Unused,
            policy: Policy::None,
            deadline: 0,
            exec_time: 1,
            elapsed_time: 0,
            rate: 0,
            priority: 1,
            arrival_time: 0,
            killed: false,
            parent: 0,
            chan: 0,
            name: String::new(),
        }
    }
}

impl ProcDescriptor {
    /// EDF utilization this descriptor would contribute, in percent units.
    /// `None` if `deadline == 0` — utilization is undefined.
    pub fn edf_utilization(&self) -> Option<u64> {
        crate::scheduler::feasibility::edf_utilization(self.exec_time, self.deadline)
    }

    /// RM utilization this descriptor would contribute, in milli-utilization
    /// units (`exec_time · rate · 10`).
    pub fn rm_utilization(&self) -> u64 {
        crate::scheduler::feasibility::rm_utilization(self.exec_time, self.rate)
    }
}

/// Aggregate state shared by every CPU's selection loop: the table plus the
/// two running utilization totals.
///
/// `util_edf` and `util_rm` are **not** decremented when a process exits —
/// this mirrors the source kernel's accounting and is intentional (see
/// `DESIGN.md`, Open Question O2). A long-running kernel that admits and
/// retires many real-time processes will see these totals climb without
/// bound; this is a known characteristic, not a bug to silently fix.
#[derive(Debug)]
pub(crate) struct TableInner {
    procs: Vec<ProcDescriptor>,
    next_pid: i32,
    util_edf: u64,
    util_rm: u64,
}

pub struct ProcTable {
    inner: Mutex<TableInner>,
}

impl ProcTable {
    /// Builds a table with `n_proc` `Unused` slots. Backing storage is
    /// allocated once here; no slot is ever pushed or popped afterward.
    pub fn new(n_proc: usize) -> Self {
        let procs = (0..n_proc).map(|_| ProcDescriptor::default()).collect();
        Self {
            inner: Mutex::new(TableInner {
                procs,
                next_pid: 1,
                util_edf: 0,
                util_rm: 0,
            }),
        }
    }

    /// Allocates the first `Unused` slot, assigns it the next pid, and
    /// transitions it to `Embryo`. Returns the slot's pid, or `None` if the
    /// table is full.
    pub fn alloc(&self, parent: i32, name: impl Into<String>) -> Option<i32> {
        let mut guard = self.inner.lock().unwrap();
        let pid = guard.next_pid;
        let slot = guard.procs.iter_mut().find(|p| p.state == ProcState::Unused)?;
        *slot = ProcDescriptor {
            pid,
            state: ProcState::Embryo,
            parent,
            name: name.into(),
            ..Default::default()
        };
        guard.next_pid += 1;
        debug!(pid, "allocated process slot");
        Some(pid)
    }

    /// Finalizes an `Embryo` into `Runnable`, as the fork path does once the
    /// child's address space and trap frame are ready.
    pub fn make_runnable(&self, pid: i32) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(p) = find_mut(&mut guard.procs, pid) {
            p.state = ProcState::Runnable;
        }
    }

    /// Marks `pid` killed; if currently `Sleeping`, promotes it to
    /// `Runnable` so the kill is observed on its next scheduling decision.
    pub fn kill(&self, pid: i32) -> bool {
        let mut guard = self.inner.lock().unwrap();
        match find_mut(&mut guard.procs, pid) {
            Some(p) => {
                p.killed = true;
                if p.state == ProcState::Sleeping {
                    p.state = ProcState::Runnable;
                }
                true
            }
            None => false,
        }
    }

    /// Puts `pid` to sleep on `chan`.
    pub fn sleep(&self, pid: i32, chan: u64) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(p) = find_mut(&mut guard.procs, pid) {
            p.chan = chan;
            p.state = ProcState::Sleeping;
        }
    }

    /// Wakes every `Sleeping` process waiting on `chan`.
    pub fn wakeup(&self, chan: u64) {
        let mut guard = self.inner.lock().unwrap();
        for p in guard.procs.iter_mut() {
            if p.state == ProcState::Sleeping && p.chan == chan {
                p.state = ProcState::Runnable;
                trace!(pid = p.pid, chan, "woke process");
            }
        }
    }

    /// Transitions `pid` to `Zombie`. Does not reparent children or touch
    /// utilization counters — that bookkeeping belongs to [`ProcTable::exit`],
    /// not to this primitive.
    pub fn zombify(&self, pid: i32) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(p) = find_mut(&mut guard.procs, pid) {
            p.state = ProcState::Zombie;
        }
    }

    /// Terminates `pid`: reparents its live children to `init_pid`, wakes
    /// `pid`'s parent if it is sleeping in [`ProcTable::wait`], and
    /// transitions `pid` itself to `Zombie`.
    ///
    /// Mirrors the source kernel's `exit()` — a process is never released
    /// back to `Unused` here, only zombified; the parent (or `init`, once
    /// reparented) must call [`ProcTable::wait`] to reap it.
    pub fn exit(&self, pid: i32, init_pid: i32) {
        let mut guard = self.inner.lock().unwrap();

        let parent = find(&guard.procs, pid).map(|p| p.parent);

        for p in guard.procs.iter_mut() {
            if p.parent == pid && p.state != ProcState::Unused {
                p.parent = init_pid;
            }
        }

        if let Some(parent_pid) = parent {
            for p in guard.procs.iter_mut() {
                if p.state == ProcState::Sleeping && p.chan == parent_pid as u64 {
                    p.state = ProcState::Runnable;
                    trace!(pid = p.pid, parent_pid, "woke parent waiting on exit");
                }
            }
        }

        if let Some(p) = find_mut(&mut guard.procs, pid) {
            p.state = ProcState::Zombie;
            debug!(pid, "exited");
        }
    }

    /// Scans `pid`'s children for the first `Zombie`, reaps it (frees its
    /// slot), and returns its pid. If children exist but none are zombies
    /// yet, puts `pid` to sleep on its own pid — `exit()` wakes it when a
    /// child exits. Returns `NoChildren` if `pid` has no children.
    pub fn wait(&self, pid: i32) -> WaitOutcome {
        let mut guard = self.inner.lock().unwrap();

        let has_children = guard.procs.iter().any(|p| p.parent == pid && p.state != ProcState::Unused);
        if !has_children {
            return WaitOutcome::NoChildren;
        }

        if let Some(child) = guard
            .procs
            .iter_mut()
            .find(|p| p.parent == pid && p.state == ProcState::Zombie)
        {
            let child_pid = child.pid;
            *child = ProcDescriptor::default();
            debug!(pid, child_pid, "reaped zombie child");
            return WaitOutcome::Reaped(child_pid);
        }

        if let Some(p) = find_mut(&mut guard.procs, pid) {
            p.chan = pid as u64;
            p.state = ProcState::Sleeping;
        }
        WaitOutcome::Blocked
    }

    /// Frees a reaped `Zombie` slot back to `Unused`.
    pub fn release(&self, pid: i32) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(p) = find_mut(&mut guard.procs, pid) {
            *p = ProcDescriptor::default();
        }
    }

    pub fn set_deadline(&self, pid: i32, deadline: u64) -> bool {
        let mut guard = self.inner.lock().unwrap();
        match find_mut(&mut guard.procs, pid) {
            Some(p) => {
                p.deadline = deadline;
                true
            }
            None => false,
        }
    }

    pub fn set_exec_time(&self, pid: i32, exec_time: u64) -> bool {
        let mut guard = self.inner.lock().unwrap();
        match find_mut(&mut guard.procs, pid) {
            Some(p) => {
                p.exec_time = exec_time;
                true
            }
            None => false,
        }
    }

    /// Overwrites `rate` and recomputes `priority` via
    /// [`crate::scheduler::priority::rate_to_priority`].
    pub fn set_rate(&self, pid: i32, rate: u64) -> bool {
        let mut guard = self.inner.lock().unwrap();
        match find_mut(&mut guard.procs, pid) {
            Some(p) => {
                p.rate = rate;
                p.priority = crate::scheduler::priority::rate_to_priority(rate);
                true
            }
            None => false,
        }
    }

    /// Reads a snapshot of the descriptor for `pid`, if present.
    pub fn get(&self, pid: i32) -> Option<ProcDescriptor> {
        let guard = self.inner.lock().unwrap();
        find(&guard.procs, pid).cloned()
    }

    /// Snapshot of every non-`Unused` descriptor, for `printinfo` and the
    /// workload harness summary.
    pub fn snapshot_live(&self) -> Vec<ProcDescriptor> {
        let guard = self.inner.lock().unwrap();
        guard
            .procs
            .iter()
            .filter(|p| p.state != ProcState::Unused)
            .cloned()
            .collect()
    }

    pub fn util_edf(&self) -> u64 {
        self.inner.lock().unwrap().util_edf
    }

    pub fn util_rm(&self) -> u64 {
        self.inner.lock().unwrap().util_rm
    }

    /// Number of slots currently carrying `Policy::Rm`.
    pub fn rm_admitted_count(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.procs.iter().filter(|p| p.policy == Policy::Rm).count()
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap()
    }
}

impl TableInner {
    pub(crate) fn find_mut(&mut self, pid: i32) -> Option<&mut ProcDescriptor> {
        find_mut(&mut self.procs, pid)
    }

    pub(crate) fn procs(&self) -> &[ProcDescriptor] {
        &self.procs
    }

    pub(crate) fn procs_mut(&mut self) -> &mut [ProcDescriptor] {
        &mut self.procs
    }

    pub(crate) fn util_edf_mut(&mut self) -> &mut u64 {
        &mut self.util_edf
    }

    pub(crate) fn util_rm_mut(&mut self) -> &mut u64 {
        &mut self.util_rm
    }
}

fn find(procs: &[ProcDescriptor], pid: i32) -> Option<&ProcDescriptor> {
    procs.iter().find(|p| p.pid == pid && p.state != ProcState::Unused)
}

fn find_mut(procs: &mut [ProcDescriptor], pid: i32) -> Option<&mut ProcDescriptor> {
    procs.iter_mut().find(|p| p.pid == pid && p.state != ProcState::Unused)
}
