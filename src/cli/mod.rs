//! CLI entry point for the MCP bridge.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_PATH_ENV;

/// MCP bridge CLI
#[derive(Parser, Debug)]
#[command(name = "mcp-bridge", version, about = "Bridge MCP servers into host tools")]
pub struct Cli {
    /// Path to the bridge config file (TOML or JSON)
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to every configured server and print its status
    Status,
    /// List the tools bridged from every connected server
    Tools(ToolsArgs),
    /// Call a bridged tool
    Call(CallArgs),
    /// Evaluate a shell command against the safety gate
    Check(CheckArgs),
}

/// Arguments for `mcp-bridge tools`.
#[derive(Parser, Debug)]
pub struct ToolsArgs {
    /// Print full tool definitions as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `mcp-bridge call`.
#[derive(Parser, Debug)]
pub struct CallArgs {
    /// Namespaced tool name, e.g. mcp__files__read
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub args: String,
}

/// Arguments for `mcp-bridge check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Command line to evaluate
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_status() {
        let cli = Cli::try_parse_from(["mcp-bridge", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn parse_tools_with_json_flag() {
        let cli = Cli::try_parse_from(["mcp-bridge", "tools", "--json"]).unwrap();
        match cli.command {
            Commands::Tools(args) => assert!(args.json),
            other => panic!("expected Tools, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_with_defaults() {
        let cli = Cli::try_parse_from(["mcp-bridge", "call", "mcp__files__read"]).unwrap();
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.tool, "mcp__files__read");
                assert_eq!(args.args, "{}");
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_with_args_and_config() {
        let cli = Cli::try_parse_from([
            "mcp-bridge",
            "call",
            "mcp__files__read",
            "--args",
            r#"{"path":"a.txt"}"#,
            "--config",
            "/tmp/bridge.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bridge.toml")));
        match cli.command {
            Commands::Call(args) => assert_eq!(args.args, r#"{"path":"a.txt"}"#),
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parse_check_keeps_hyphenated_words() {
        let cli = Cli::try_parse_from(["mcp-bridge", "check", "taskkill", "/f", "-im", "chrome.exe"])
            .unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.command, vec!["taskkill", "/f", "-im", "chrome.exe"]);
            }
            other => panic!("expected Check, got {other:?}"),
        }
    }

    #[test]
    fn check_requires_a_command() {
        assert!(Cli::try_parse_from(["mcp-bridge", "check"]).is_err());
    }
}
