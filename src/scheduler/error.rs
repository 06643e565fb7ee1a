/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the real-time scheduler.
//!
//! [`SchedError`] is the typed error returned by the syscall-shaped API
//! (`set_deadline`, `set_exec_time`, `set_rate`, `set_policy`, fork). Every
//! variant maps to the integer errno contract user space expects via
//! [`SchedError::to_errno`]:
//!
//! | Variant | errno |
//! |---|---|
//! | `ProcNotFound` | -22 (`EINVAL`) |
//! | `AdmissionRejected` | -22 (`EINVAL`) |
//! | `TableFull` | -1 |

use thiserror::Error;

/// Why an admission attempt was rejected. Carried inside
/// [`SchedError::AdmissionRejected`] so the caller has the exact numbers
/// that drove the decision, for logging or reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionReason {
    /// EDF: adding this process would bring `util_edf` to or past 100.
    EdfUtilizationExceeded { projected: u64 },

    /// EDF: `deadline` is zero, so utilization is undefined. Treated as an
    /// automatic rejection rather than a division by zero.
    EdfZeroDeadline,

    /// RM: adding this process would bring `util_rm` past the Liu-Layland
    /// bound for `n` admitted RM processes.
    RmBoundExceeded { projected: u64, bound: u32, n: i64 },
}

impl std::fmt::Display for AdmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionReason::EdfUtilizationExceeded { projected } => write!(
                f,
                "EDF utilization would reach {projected}% (limit 100%)"
            ),
            AdmissionReason::EdfZeroDeadline => {
                write!(f, "deadline is zero — EDF utilization is undefined")
            }
            AdmissionReason::RmBoundExceeded { projected, bound, n } => write!(
                f,
                "RM utilization would reach {projected} (bound {bound} for n={n})"
            ),
        }
    }
}

/// Top-level error type for the real-time scheduler's syscall-shaped API.
#[derive(Debug, Error)]
pub enum SchedError {
    /// The pid does not name a live process table slot.
    #[error("pid {0} not found")]
    ProcNotFound(i32),

    /// Admission control rejected the process; it has been killed and
    /// zombified as a side effect.
    #[error("pid {pid} rejected by admission control: {reason}")]
    AdmissionRejected { pid: i32, reason: AdmissionReason },

    /// The process table has no free slot for a new fork.
    #[error("process table full")]
    TableFull,

    /// `set_policy` was called with a policy value other than EDF or RM.
    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(i32),
}

impl SchedError {
    /// Maps this error to the kernel's `0`/`-1`/`-22` integer return
    /// contract (see the external interface table).
    pub fn to_errno(&self) -> i32 {
        match self {
            SchedError::ProcNotFound(_) => -22,
            SchedError::AdmissionRejected { .. } => -22,
            SchedError::UnknownPolicy(_) => -22,
            SchedError::TableFull => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_not_found_maps_to_einval() {
        assert_eq!(SchedError::ProcNotFound(9).to_errno(), -22);
    }

    #[test]
    fn table_full_maps_to_minus_one() {
        assert_eq!(SchedError::TableFull.to_errno(), -1);
    }

    #[test]
    fn admission_rejected_maps_to_einval() {
        let e = SchedError::AdmissionRejected {
            pid: 3,
            reason: AdmissionReason::EdfUtilizationExceeded { projected: 136 },
        };
        assert_eq!(e.to_errno(), -22);
        assert!(e.to_string().contains("pid 3"));
    }
}
