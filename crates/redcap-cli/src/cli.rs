//! CLI argument definitions for the REDCap ETL.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

use redcap_cli::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(
    name = "redcap-etl",
    version,
    about = "REDCap ETL - Extract, de-identify, and deliver REDCap records",
    long_about = "Extract records from a REDCap project, release only the fields the\n\
                  field map allows, de-identify dates, and deliver the result to the\n\
                  data lake in chunks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr (overrides [logging] log_dir).
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract, transform, filter, and deliver one project.
    Run(RunArgs),

    /// Validate the configuration and load every local table without
    /// contacting REDCap.
    Check(ConfigArg),

    /// Write a shuffled pool of secondary ids.
    GeneratePool(GeneratePoolArgs),
}

#[derive(Parser)]
pub struct ConfigArg {
    /// Path to the TOML configuration file.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Run everything but deliver nothing to the data lake.
    #[arg(short = 'f', long = "fake")]
    pub fake: bool,

    /// With --fake, write each payload as a JSON line to a new file.
    #[arg(short = 'w', long = "writeout", value_name = "PATH", requires = "fake")]
    pub writeout: Option<PathBuf>,

    /// Allow raw record values in logs.
    ///
    /// WARNING: logs written with this flag may contain PHI.
    #[arg(long = "log-data")]
    pub log_data: bool,
}

#[derive(Parser)]
pub struct GeneratePoolArgs {
    /// First id of the range.
    #[arg(long)]
    pub start: u64,

    /// Number of consecutive ids.
    #[arg(long)]
    pub count: u64,

    /// Seed for a reproducible order (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pool file to create; an existing file is never overwritten.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn writeout_requires_fake() {
        let result = Cli::try_parse_from(["redcap-etl", "run", "-w", "out.jsonl"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["redcap-etl", "run", "--fake", "-w", "out.jsonl"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.fake);
        assert_eq!(args.writeout, Some(PathBuf::from("out.jsonl")));
        assert_eq!(args.config.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn generate_pool_arguments() {
        let cli = Cli::try_parse_from([
            "redcap-etl",
            "generate-pool",
            "--start",
            "1000",
            "--count",
            "50",
            "--seed",
            "7",
            "--output",
            "pool.txt",
        ])
        .unwrap();
        let Command::GeneratePool(args) = cli.command else {
            panic!("expected generate-pool");
        };
        assert_eq!((args.start, args.count, args.seed), (1000, 50, Some(7)));
    }
}
