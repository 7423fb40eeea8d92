//! Read-only commands: list, info and order

use std::path::Path;

use colored::Colorize;
use ext_registry::{ExtensionId, ExtensionRegistry};
use serde::Serialize;

use crate::context::PlatformContext;
use crate::error::Result;

/// One extension as printed by `list --json` and `info --json`.
#[derive(Debug, Serialize)]
pub struct ExtensionSummary {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub installed_version: Option<String>,
    pub installed: bool,
    pub enabled: bool,
    pub core: bool,
    pub has_update: bool,
}

impl ExtensionSummary {
    fn collect(registry: &mut ExtensionRegistry, id: &ExtensionId) -> Result<Self> {
        let info = registry.get(id)?;
        Ok(Self {
            slug: info.slug(),
            name: info.descriptor.name.clone(),
            version: info.descriptor.version.clone(),
            installed_version: info.installed_version.clone(),
            installed: info.is_installed,
            enabled: info.is_enabled,
            core: info.is_core(),
            has_update: registry.has_update(id)?,
        })
    }

    fn state(&self) -> colored::ColoredString {
        match (self.installed, self.enabled) {
            (true, true) => "enabled".green(),
            (true, false) => "disabled".yellow(),
            _ => "not installed".dimmed(),
        }
    }
}

/// Run the list command
pub fn run_list(cwd: &Path, installer: bool, json: bool) -> Result<()> {
    let mut context = PlatformContext::open(cwd, installer)?;
    let mut summaries = Vec::new();
    for id in context.registry.extensions()? {
        summaries.push(ExtensionSummary::collect(&mut context.registry, &id)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{}", "Extensions".bold());
    println!(
        "{}: {}",
        "Path".dimmed(),
        context.config.extensions_root(&context.root)
    );
    println!();

    if summaries.is_empty() {
        println!("  {}", "None found".dimmed());
        return Ok(());
    }

    for summary in &summaries {
        let mut line = format!(
            "  {:<28} {:<10} {}",
            summary.slug.cyan(),
            summary.version,
            summary.state()
        );
        if summary.core {
            line.push_str(&format!(" {}", "(core)".dimmed()));
        }
        if summary.has_update {
            line.push_str(&format!(" {}", "update available".magenta()));
        }
        println!("{line}");
    }
    println!();
    println!("{} {} extensions", "Total:".dimmed(), summaries.len());

    Ok(())
}

/// Run the info command
pub fn run_info(cwd: &Path, installer: bool, slug: &str, json: bool) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    let registry = &mut context.registry;
    let summary = ExtensionSummary::collect(registry, &id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let descriptor = registry.descriptor(&id)?;
    println!("{} {}", summary.name.bold(), summary.slug.dimmed());
    println!();
    println!("{}:      {}", "Version".dimmed(), summary.version);
    if let Some(installed) = &summary.installed_version {
        println!("{}:    {}", "Installed".dimmed(), installed);
    }
    println!("{}:        {}", "State".dimmed(), summary.state());
    if let Some(author) = &descriptor.author {
        println!("{}:       {}", "Author".dimmed(), author);
    }
    if let Some(description) = &descriptor.description {
        println!("{}:  {}", "Description".dimmed(), description);
    }
    println!("{}:       {}", "Handle".dimmed(), descriptor.bundle.handles.as_deref().unwrap_or("-"));

    print_ids("Dependencies", &registry.dependencies(&id)?);
    print_ids("Dependents", &registry.dependents(&id)?);
    print_ids("Overrides", &registry.overrides(&id)?);
    print_ids("Overridden by", &registry.overridden(&id)?);

    let required = registry.required_extensions(&id)?;
    if !summary.installed && !required.is_empty() {
        println!();
        println!(
            "{} install and enable first: {}",
            "note:".yellow().bold(),
            join(&required)
        );
    }

    Ok(())
}

/// Run the order command
pub fn run_order(cwd: &Path, installer: bool) -> Result<()> {
    let mut context = PlatformContext::open(cwd, installer)?;
    let outcome = context.registry.dependency_order()?;

    println!("{}", "Dependency Order".bold());
    println!();
    for (position, id) in outcome.sorted.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, id.canonical().cyan());
    }

    if !outcome.is_complete() {
        println!();
        println!(
            "{} unresolved (missing dependency or cycle): {}",
            "warning:".yellow().bold(),
            join(&outcome.unresolved)
        );
    }

    Ok(())
}

fn print_ids(label: &str, ids: &[ExtensionId]) {
    if ids.is_empty() {
        return;
    }
    println!();
    println!("{}:", label.bold());
    for id in ids {
        println!("  {} {}", "-".dimmed(), id.canonical().cyan());
    }
}

pub(crate) fn join(ids: &[ExtensionId]) -> String {
    ids.iter()
        .map(ExtensionId::canonical)
        .collect::<Vec<_>>()
        .join(", ")
}
