//! Start command: activate every enabled extension

use std::path::Path;

use colored::Colorize;

use crate::context::PlatformContext;
use crate::error::{CliError, Result};

/// Run the start command
pub fn run_start(cwd: &Path, installer: bool) -> Result<()> {
    let mut context = PlatformContext::open(cwd, installer)?;
    let report = context.registry.start_all()?;

    println!("{}", "Activation Order".bold());
    println!();
    if report.order.is_empty() {
        println!("  {}", "Nothing enabled".dimmed());
    }
    for (position, id) in report.order.iter().enumerate() {
        let marker = if report.started.contains(id) {
            "+".green()
        } else {
            "x".red()
        };
        println!("  {:>3}. {} {}", position + 1, marker, id.canonical().cyan());
    }

    let handles = context.router.handles();
    if !handles.is_empty() {
        println!();
        println!("{}:", "Handles".bold());
        for (handle, bundle) in handles {
            println!("  {:<16} {}", handle.green(), bundle);
        }
    }

    for id in &report.dropped {
        eprintln!(
            "{} {} dropped: overrides an extension that is not enabled",
            "warning:".yellow().bold(),
            id.canonical()
        );
    }
    for failure in &report.failed {
        eprintln!(
            "{} {} failed to start: {}",
            "error:".red().bold(),
            failure.id.canonical(),
            failure.error
        );
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} extension(s) failed to start",
            report.failed.len()
        )))
    }
}
