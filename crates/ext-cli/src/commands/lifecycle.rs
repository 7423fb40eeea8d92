//! State-changing commands: install, uninstall, enable, disable and update

use std::path::Path;

use colored::Colorize;
use ext_registry::{Error, ExtensionId, ExtensionRegistry, Transition};

use super::list::join;
use crate::context::PlatformContext;
use crate::error::{CliError, Result};

/// Run the install command
pub fn run_install(cwd: &Path, installer: bool, slug: &str, enable: bool) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    let record = context
        .registry
        .install(&id, enable)
        .map_err(|e| explain(&mut context.registry, &id, e))?;

    let state = if record.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!(
        "{} Installed {} {} ({})",
        "OK".green().bold(),
        id.canonical().cyan(),
        record.version,
        state
    );
    Ok(())
}

/// Run the uninstall command
pub fn run_uninstall(cwd: &Path, installer: bool, slug: &str) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    context
        .registry
        .uninstall(&id)
        .map_err(|e| explain(&mut context.registry, &id, e))?;

    println!("{} Uninstalled {}", "OK".green().bold(), id.canonical().cyan());
    Ok(())
}

/// Run the enable command
pub fn run_enable(cwd: &Path, installer: bool, slug: &str) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    context
        .registry
        .enable(&id)
        .map_err(|e| explain(&mut context.registry, &id, e))?;

    println!("{} Enabled {}", "OK".green().bold(), id.canonical().cyan());
    Ok(())
}

/// Run the disable command
pub fn run_disable(cwd: &Path, installer: bool, slug: &str) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    context
        .registry
        .disable(&id)
        .map_err(|e| explain(&mut context.registry, &id, e))?;

    println!("{} Disabled {}", "OK".green().bold(), id.canonical().cyan());
    Ok(())
}

/// Run the update command
pub fn run_update(cwd: &Path, installer: bool, slug: &str) -> Result<()> {
    let id = ExtensionId::parse(slug)?;
    let mut context = PlatformContext::open(cwd, installer)?;
    let previous = context.registry.current_version(&id)?;
    let record = context.registry.update(&id)?;

    println!(
        "{} Updated {} {} -> {}",
        "OK".green().bold(),
        id.canonical().cyan(),
        previous.dimmed(),
        record.version
    );
    Ok(())
}

/// Turn a guard violation into a message naming what blocks the transition.
fn explain(registry: &mut ExtensionRegistry, id: &ExtensionId, error: Error) -> CliError {
    let transition = match &error {
        Error::GuardViolation { transition, .. } => Some(*transition),
        _ => None,
    };
    let Some(transition) = transition else {
        return error.into();
    };
    let blockers = match transition {
        Transition::Install | Transition::Enable => registry
            .required_extensions(id)
            .ok()
            .filter(|required| !required.is_empty())
            .map(|required| format!("requires {}", join(&required))),
        Transition::Uninstall | Transition::Disable => {
            if registry.is_core(id).unwrap_or(false) {
                Some("core extensions cannot be removed".to_string())
            } else {
                installed_dependents(registry, id)
                    .filter(|dependents| !dependents.is_empty())
                    .map(|dependents| format!("required by {}", join(&dependents)))
            }
        }
    };
    match blockers {
        Some(reason) => CliError::user(format!("{error}: {reason}")),
        None => error.into(),
    }
}

fn installed_dependents(
    registry: &mut ExtensionRegistry,
    id: &ExtensionId,
) -> Option<Vec<ExtensionId>> {
    let dependents = registry.dependents(id).ok()?;
    let mut installed = Vec::new();
    for dependent in dependents {
        if registry.is_installed(&dependent).ok()? {
            installed.push(dependent);
        }
    }
    Some(installed)
}
