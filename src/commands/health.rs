//! Health command - probes the sweep hardware without starting a sweep

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use crate::config::SweepdConfig;
use crate::models::HealthReport;
use crate::orchestrator::SweepService;
use crate::process::ProcessManager;

pub fn execute(config: SweepdConfig, json: bool) -> Result<()> {
    let control = Arc::new(ProcessManager::new(&config.sweep, config.process.clone()));
    let mut service = SweepService::start(config, control).context("Failed to start sweep service")?;
    let report = service.check_health().context("Health check failed")?;
    service.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &HealthReport) {
    if report.connected {
        println!("{} Sweep hardware connected", "✓".green().bold());
    } else {
        println!("{} Sweep hardware not available", "✗".red().bold());
    }

    if let Some(error) = &report.error {
        println!("  {} {}", "─".dimmed(), error);
    }

    if let Some(info) = &report.device_info {
        let rows = [
            ("Serial", &info.serial),
            ("Board ID", &info.board_id),
            ("Firmware", &info.firmware),
            ("Part ID", &info.part_id),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                println!("  {:<10} {}", label.bold(), value);
            }
        }
    }

    println!(
        "  {}",
        format!("checked {}", report.last_update.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
    );
}
