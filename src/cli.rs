use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "berth")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative local container fleet for web development", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Specification file (default: ~/.berth/berth.toml)
    #[arg(short, long, global = true, env = "BERTH_FILE")]
    pub file: Option<PathBuf>,

    /// Use locally built development images
    #[arg(long, global = true, env = fleet::config::ENV_DEVELOPMENT)]
    pub development: bool,

    /// Proxy control API endpoint
    #[arg(long, global = true, env = "BERTH_PROXY_ENDPOINT")]
    pub proxy_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge running containers to the specification
    Apply(ApplyArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Show every declared resource and its current state
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only check; report what would change
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Remove managed containers that are no longer declared
    #[arg(long)]
    pub prune: bool,

    /// Limit to one kind or resource (e.g. `site`, `site:demo.test`)
    #[arg(long, value_name = "TARGET")]
    pub only: Option<String>,

    /// Don't touch the hosts file
    #[arg(long)]
    pub skip_hosts: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Include undeclared containers that `apply --prune` would remove
    #[arg(long)]
    pub prune: bool,

    /// Limit to one kind or resource (e.g. `database`, `custom:elastic`)
    #[arg(long, value_name = "TARGET")]
    pub only: Option<String>,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Limit to one kind or resource
    #[arg(long, value_name = "TARGET")]
    pub only: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::parse_from([
            "berth", "-vv", "apply", "--dry-run", "--prune", "--only", "site:demo.test",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.dry_run);
        assert!(args.prune);
        assert!(!args.skip_hosts);
        assert_eq!(args.only.as_deref(), Some("site:demo.test"));
    }

    #[test]
    fn test_global_file_after_subcommand() {
        let cli = Cli::parse_from(["berth", "status", "--file", "/tmp/berth.toml"]);
        assert_eq!(cli.file, Some(PathBuf::from("/tmp/berth.toml")));
    }
}
