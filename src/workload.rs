//! Scripted workload replay for the CLI harness.
//!
//! A [`WorkloadSpec`] is the declarative equivalent of the scripted
//! parent/children test program this scheduler was built against: fork a
//! sequence of processes, configure each with `set_exec_time` /
//! `set_deadline` / `set_rate`, admit it with `set_policy` last, then let
//! the scheduler run for a fixed number of ticks.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::proc::{PidType, Policy};
use crate::scheduler::{ContextSwitch, Scheduler};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPolicy {
    None,
    Edf,
    Rm,
}

impl From<WorkloadPolicy> for Policy {
    fn from(p: WorkloadPolicy) -> Self {
        match p {
            WorkloadPolicy::None => Policy::None,
            WorkloadPolicy::Edf => Policy::Edf,
            WorkloadPolicy::Rm => Policy::Rm,
        }
    }
}

/// One scripted process. `parent` names another entry earlier in the list,
/// or is omitted to fork from the implicit root (pid 0).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadProcess {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub deadline: u64,
    #[serde(default = "default_exec_time")]
    pub exec_time: u64,
    #[serde(default)]
    pub rate: u64,
    pub policy: WorkloadPolicy,
}

fn default_exec_time() -> u64 {
    1
}

/// A full scripted workload: the process list plus how many scheduler
/// ticks to simulate once every process has been admitted.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadSpec {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    pub processes: Vec<WorkloadProcess>,
}

fn default_ticks() -> u64 {
    10
}

impl WorkloadSpec {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open workload file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse workload YAML: {}", path.display()))
    }
}

/// Outcome of admitting one scripted process.
#[derive(Debug, Clone)]
pub struct AdmissionOutcome {
    pub name: String,
    pub pid: PidType,
    pub admitted: bool,
    pub detail: String,
}

/// Summary produced by [`replay`].
#[derive(Debug, Clone)]
pub struct WorkloadReport {
    pub admissions: Vec<AdmissionOutcome>,
    pub schedule: Vec<(u64, PidType)>,
    pub util_edf: u64,
    pub util_rm: u64,
}

struct NoopCtx;
impl ContextSwitch for NoopCtx {
    fn run_tick(&self, _pid: PidType) {}
}

/// Replays `spec` against `scheduler`: forks each process (in list order,
/// resolving `parent` by name), applies its setters, admits it last, then
/// drives `spec.ticks` scheduling decisions.
pub fn replay(spec: &WorkloadSpec, scheduler: &Scheduler) -> WorkloadReport {
    let mut pids: HashMap<String, PidType> = HashMap::new();
    let mut admissions = Vec::new();

    for proc in &spec.processes {
        let parent_pid = proc
            .parent
            .as_ref()
            .and_then(|p| pids.get(p).copied())
            .unwrap_or(0);

        let pid = match scheduler.fork(parent_pid, proc.name.clone()) {
            Ok(pid) => pid,
            Err(e) => {
                warn!(process = %proc.name, error = %e, "fork failed");
                continue;
            }
        };
        pids.insert(proc.name.clone(), pid);

        let _ = scheduler.set_exec_time(pid, proc.exec_time);
        let _ = scheduler.set_deadline(pid, proc.deadline);
        let _ = scheduler.set_rate(pid, proc.rate);

        if proc.policy == WorkloadPolicy::None {
            admissions.push(AdmissionOutcome {
                name: proc.name.clone(),
                pid,
                admitted: true,
                detail: "no real-time policy requested".to_string(),
            });
            continue;
        }

        match scheduler.set_policy(pid, proc.policy.into(), 0) {
            Ok(()) => {
                info!(process = %proc.name, pid, "admitted");
                admissions.push(AdmissionOutcome {
                    name: proc.name.clone(),
                    pid,
                    admitted: true,
                    detail: "admitted".to_string(),
                });
            }
            Err(e) => {
                warn!(process = %proc.name, pid, error = %e, "rejected");
                admissions.push(AdmissionOutcome {
                    name: proc.name.clone(),
                    pid,
                    admitted: false,
                    detail: e.to_string(),
                });
            }
        }
    }

    let mut schedule = Vec::new();
    let ctx = NoopCtx;
    for tick in 0..spec.ticks {
        if let Some(pid) = scheduler.tick(&ctx) {
            schedule.push((tick, pid));
        }
    }

    WorkloadReport {
        admissions,
        schedule,
        util_edf: scheduler.table().util_edf(),
        util_rm: scheduler.table().util_rm(),
    }
}
