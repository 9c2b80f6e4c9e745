//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Resolve relative project paths against this directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--jobs <N>`: Maximum concurrent copy tasks
//! - `--log-backend <name>`: Version log backend

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ipvl - Publish versioned snapshots of a project directory
#[derive(Parser, Debug)]
#[command(name = "ipvl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Resolve relative project paths against this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; only the log keys are printed
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum number of entries copied concurrently
    #[arg(long, global = true, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Version log backend (file, memory)
    #[arg(long, global = true, value_name = "NAME")]
    pub log_backend: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish the first version of a project
    #[command(
        name = "publish",
        long_about = "Publish the first version of a project.\n\n\
            Creates the .ipvl control directory inside PATH, copies every entry \
            not excluded by .ipvlignore (or .gitignore when there is no \
            .ipvlignore) into .ipvl/data/VERSION, and appends the version to a \
            new log. The log keys are printed on success.",
        after_help = "\
WORKFLOW EXAMPLES:
    # First release
    ipvl publish ./my-app 1.0.0

    # Start over, discarding every version and the log keys
    ipvl publish ./my-app 1.0.0 --force"
    )]
    Publish {
        /// Project directory
        path: PathBuf,

        /// Version label
        version: String,

        /// Discard an existing publication and start a new log
        #[arg(short, long)]
        force: bool,
    },

    /// Add a version to a published project
    #[command(
        name = "update",
        long_about = "Add a version to a published project.\n\n\
            Snapshots PATH into .ipvl/data/VERSION and appends it to the existing \
            log. Earlier versions are kept. Reusing a version label replaces that \
            version's snapshot.",
        after_help = "\
WORKFLOW EXAMPLES:
    ipvl update ./my-app 1.1.0"
    )]
    Update {
        /// Project directory
        path: PathBuf,

        /// Version label
        version: String,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for ipvl commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    ipvl completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    ipvl completion zsh >> ~/.zshrc

    # Fish
    ipvl completion fish > ~/.config/fish/completions/ipvl.fish

    # PowerShell
    ipvl completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
