//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use relay_domain::ToolKind;
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Which backend(s) `serve` starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServeTarget {
    Shell,
    Sql,
    Eval,
    Fetch,
    All,
}

impl ServeTarget {
    pub fn kinds(&self) -> Vec<ToolKind> {
        match self {
            ServeTarget::Shell => vec![ToolKind::Shell],
            ServeTarget::Sql => vec![ToolKind::Sql],
            ServeTarget::Eval => vec![ToolKind::Eval],
            ServeTarget::Fetch => vec![ToolKind::Fetch],
            ServeTarget::All => ToolKind::ALL.to_vec(),
        }
    }
}

/// CLI arguments for plan-relay
#[derive(Parser, Debug)]
#[command(name = "plan-relay")]
#[command(author, version, about = "Turn a model's plan into exactly one executed action")]
#[command(long_about = r#"
plan-relay takes plan text written by a language model, extracts the single
PRIMARY ACTION from it, and sends that action to the backend service for its
tool (shell, sql, eval, fetch). Fallback steps are shown but never executed.

Plan text is read from --plan-file, or from stdin when no file is given.

Configuration files are loaded from (in priority order):
1. PLAN_RELAY_* environment variables (e.g. PLAN_RELAY_DISPATCHER__TIMEOUT_SECS=5)
2. --config <path>     Explicit config file
3. ./relay.toml        Project-level config
4. ~/.config/plan-relay/config.toml   Global config

Example:
  plan-relay serve all
  plan-relay run --plan-file plan.md
  echo "$PLAN" | plan-relay extract --output json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the primary action from a plan without dispatching it
    Extract {
        /// Read the plan from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        plan_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Extract the primary action and dispatch it to its backend
    Run {
        /// Read the plan from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        plan_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Start backend services until Ctrl-C
    Serve {
        #[arg(value_enum)]
        target: ServeTarget,
    },

    /// List registered tools, endpoints and aliases
    Tools {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the system prompt that describes the plan format and tools
    Prompt,
}
