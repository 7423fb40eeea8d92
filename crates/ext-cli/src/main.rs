//! Extension manager CLI
//!
//! Drives the extension registry of the platform rooted at (or above) the
//! current directory.

mod cli;
mod commands;
mod context;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd, cli.installer),
        None => {
            println!("{} Extension manager", "ext".green().bold());
            println!();
            println!("Run {} for available commands.", "ext --help".cyan());
            Ok(())
        }
    }
}

// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).map_err(|e| e.to_string())
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| e.to_string())
    };
    if let Err(e) = result {
        eprintln!("{} could not install logger: {e}", "warning:".yellow().bold());
    }
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands, installer: bool) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match cmd {
        Commands::List { json } => commands::run_list(&cwd, installer, json),
        Commands::Info { slug, json } => commands::run_info(&cwd, installer, &slug, json),
        Commands::Install { slug, enable } => {
            commands::run_install(&cwd, installer, &slug, enable)
        }
        Commands::Uninstall { slug } => commands::run_uninstall(&cwd, installer, &slug),
        Commands::Enable { slug } => commands::run_enable(&cwd, installer, &slug),
        Commands::Disable { slug } => commands::run_disable(&cwd, installer, &slug),
        Commands::Update { slug } => commands::run_update(&cwd, installer, &slug),
        Commands::Start => commands::run_start(&cwd, installer),
        Commands::Order => commands::run_order(&cwd, installer),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ext", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ext_test_utils::{DescriptorBuilder, TestPlatform};

    fn platform() -> TestPlatform {
        let platform = TestPlatform::new();
        platform.add_extension("platform.users", &DescriptorBuilder::new("Users", "1.0").core());
        platform.add_extension(
            "acme.blog",
            &DescriptorBuilder::new("Blog", "1.0").dependency("platform.users"),
        );
        platform
    }

    #[test]
    fn install_then_enable_with_temp_platform() {
        let platform = platform();
        commands::run_install(platform.root(), true, "platform.users", false).unwrap();
        commands::run_install(platform.root(), false, "acme.blog", false).unwrap();
        commands::run_enable(platform.root(), false, "acme.blog").unwrap();

        platform.assert_file_exists(".platform/extensions.toml");
        assert!(platform.read(".platform/extensions.toml").contains("blog"));
    }

    #[test]
    fn guard_violation_names_the_blocker() {
        let platform = platform();
        let error = commands::run_install(platform.root(), false, "acme.blog", false).unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot install extension 'acme.blog': requires platform.users"
        );
    }

    #[test]
    fn start_with_nothing_enabled_succeeds() {
        let platform = platform();
        assert!(commands::run_start(platform.root(), false).is_ok());
    }

    #[test]
    fn invalid_slug_is_rejected() {
        let platform = platform();
        let error = commands::run_info(platform.root(), false, "a.b.c", false).unwrap_err();
        assert!(matches!(error, error::CliError::Registry(_)));
    }

    #[test]
    fn test_cli_error_user() {
        let error = error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
