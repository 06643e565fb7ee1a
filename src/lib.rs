/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Real-time process scheduler for a small teaching kernel.
//!
//! ```text
//! lib.rs
//! ├── proc.rs         – process descriptor & fixed-size process table
//! ├── scheduler/      – RM priority mapping, EDF/RM admission, selection loop
//! ├── config/         – kernel configuration (table size, admission mode)
//! └── workload.rs      – scripted workload replay for the CLI harness
//! ```

pub mod config;
pub mod proc;
pub mod scheduler;
pub mod workload;
