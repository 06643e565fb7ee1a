/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rtsched_kernel::config::KernelConfigManager;
use rtsched_kernel::scheduler::Scheduler;
use rtsched_kernel::workload::{replay, WorkloadSpec};

/// Replays a scripted real-time workload against the scheduler and reports
/// admission decisions and the resulting tick-by-tick schedule.
#[derive(Debug, Parser)]
#[command(name = "rtsched-kernel", version, about)]
struct Args {
    /// YAML workload script describing processes and how many ticks to run.
    #[arg(long)]
    workload: PathBuf,

    /// Optional kernel configuration file (table size, admission mode).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump every live process descriptor after the run, mirroring the
    /// `printinfo` syscall.
    #[arg(long)]
    printinfo: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config_mgr = KernelConfigManager::new();
    if let Some(path) = &args.config {
        config_mgr
            .load_from_file(path)
            .with_context(|| format!("loading kernel config from {}", path.display()))?;
    }

    let spec = WorkloadSpec::load_from_file(&args.workload)
        .with_context(|| format!("loading workload from {}", args.workload.display()))?;

    let scheduler = Scheduler::new(config_mgr.get().clone());
    let report = replay(&spec, &scheduler);

    info!(ticks = spec.ticks, "workload replay complete");
    println!("Admissions:");
    for a in &report.admissions {
        println!(
            "  {:<12} pid={:<4} {} ({})",
            a.name,
            a.pid,
            if a.admitted { "admitted" } else { "rejected" },
            a.detail
        );
    }

    println!("\nSchedule:");
    for (tick, pid) in &report.schedule {
        println!("  tick {tick:>3}: pid {pid}");
    }

    println!(
        "\nFinal utilization: util_edf={} util_rm={}",
        report.util_edf, report.util_rm
    );

    if args.printinfo {
        println!("\nprocess table (printinfo):");
        for p in scheduler.table().snapshot_live() {
            println!(
                "  pid={:<4} state={:?} policy={:?} deadline={} exec_time={} priority={}",
                p.pid, p.state, p.policy, p.deadline, p.exec_time, p.priority
            );
        }
        println!("22");
    }

    Ok(())
}
