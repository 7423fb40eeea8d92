//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Extension manager - install, enable and start platform extensions
#[derive(Parser, Debug)]
#[command(name = "ext")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Bypass dependency and enablement guards (bootstrap)
    #[arg(long, global = true, env = "EXT_INSTALLER_MODE")]
    pub installer: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List every discovered extension with its state
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show details for one extension
    ///
    /// Examples:
    ///   ext info platform.users
    ///   ext info blog              # default vendor
    Info {
        /// Extension slug (vendor.name)
        slug: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Install an extension and run its migrations
    Install {
        /// Extension slug (vendor.name)
        slug: String,

        /// Enable the extension right away
        #[arg(short, long)]
        enable: bool,
    },

    /// Roll back migrations and remove an extension
    Uninstall {
        /// Extension slug (vendor.name)
        slug: String,
    },

    /// Enable an installed extension
    Enable {
        /// Extension slug (vendor.name)
        slug: String,
    },

    /// Disable an installed extension
    Disable {
        /// Extension slug (vendor.name)
        slug: String,
    },

    /// Upgrade an installed extension to its descriptor version
    Update {
        /// Extension slug (vendor.name)
        slug: String,
    },

    /// Start all enabled extensions and report the activation order
    Start,

    /// Print the dependency order of all discovered extensions
    Order,

    /// Generate shell completions
    ///
    /// Outputs completion script for your shell.
    ///
    /// Examples:
    ///   ext completions bash > ~/.local/share/bash-completion/completions/ext
    ///   ext completions zsh > ~/.zfunc/_ext
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_with_enable() {
        let cli = Cli::parse_from(["ext", "install", "acme.blog", "--enable"]);
        assert_eq!(
            cli.command,
            Some(Commands::Install {
                slug: "acme.blog".to_string(),
                enable: true,
            })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ext", "list", "--json", "--installer", "-v"]);
        assert!(cli.installer);
        assert!(cli.verbose);
        assert_eq!(cli.command, Some(Commands::List { json: true }));
    }

    #[test]
    fn no_command_is_allowed() {
        let cli = Cli::parse_from(["ext"]);
        assert!(cli.command.is_none());
    }
}
