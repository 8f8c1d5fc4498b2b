//! Command-line interface

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Default configuration file
pub const DEFAULT_CONFIG: &str = "aegis.toml";

/// What the daemon was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// Start detection and remediation
    Run,
    /// Arm the demo sentinel
    Trigger,
    /// Clear the demo sentinel
    Clear,
    /// Print the effective configuration
    CheckConfig,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    /// Configuration file
    pub config: PathBuf,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Subcommand; `run` when omitted
    pub command: CliCommand,
}

/// The `aegisd` command definition
#[must_use]
pub fn command() -> Command {
    Command::new("aegisd")
        .version(aegis_core::VERSION)
        .about("Aegis autonomous incident remediation daemon")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .default_value(DEFAULT_CONFIG)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (missing file means defaults)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("run").about("Detect, remediate and verify until Ctrl-C"))
        .subcommand(Command::new("trigger").about("Arm the demo sentinel to simulate a breach"))
        .subcommand(Command::new("clear").about("Clear the demo sentinel"))
        .subcommand(
            Command::new("check-config").about("Validate and print the effective configuration"),
        )
}

impl Cli {
    /// Parse from process arguments, exiting on `--help` or errors
    #[must_use]
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parse from an explicit argument list
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let command = match matches.subcommand_name() {
            Some("trigger") => CliCommand::Trigger,
            Some("clear") => CliCommand::Clear,
            Some("check-config") => CliCommand::CheckConfig,
            _ => CliCommand::Run,
        };
        Self {
            config: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
            log_json: matches.get_flag("log-json"),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }
}
