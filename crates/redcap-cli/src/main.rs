//! REDCap ETL CLI.

use std::io::{self, IsTerminal};

use chrono::{Local, NaiveDateTime};
use clap::{ColorChoice, Parser};
use redcap_cli::config::{Config, Purpose};
use redcap_cli::logging::{LogConfig, LogFormat, init_logging, log_file_in};
use tracing::error;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let started_at = Local::now().naive_local();

    let (config, purpose) = match &cli.command {
        Command::Run(args) => {
            let purpose = if args.fake {
                Purpose::FakeRun
            } else {
                Purpose::Run
            };
            (Some(Config::load(&args.config.config)), purpose)
        }
        Command::Check(args) => (Some(Config::load(&args.config)), Purpose::Check),
        Command::GeneratePool(_) => (None, Purpose::Check),
    };
    // Without a parsed config there is no log_dir, so this only reaches stderr.
    let config = match config.transpose() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let log_config = log_config_from_cli(&cli, config.as_ref(), started_at);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    if let Some(config) = &config
        && let Err(error) = config.validate(purpose)
    {
        eprintln!("error: {error}");
        std::process::exit(1);
    }

    let result = match (&cli.command, &config) {
        (Command::Run(args), Some(config)) => commands::run(args, config, started_at)
            .map(|report| print_summary(&report, purpose == Purpose::Run)),
        (Command::Check(_), Some(config)) => commands::check(config),
        (Command::GeneratePool(args), _) => commands::generate(args),
        (_, None) => Err(anyhow::anyhow!("configuration was not loaded")),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli, config: Option<&Config>, started_at: NaiveDateTime) -> LogConfig {
    let mut log_config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    log_config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        log_config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    log_config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    log_config.log_file = cli.log_file.clone().or_else(|| {
        config
            .and_then(|config| config.logging.log_dir.as_deref())
            .map(|dir| log_file_in(dir, started_at))
    });
    log_config.with_timestamps = log_config.log_file.is_some();
    log_config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => log_config.log_file.is_none() && io::stderr().is_terminal(),
    };
    log_config.log_data = matches!(&cli.command, Command::Run(args) if args.log_data);
    log_config
}
