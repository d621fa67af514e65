use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Generate the TLS certificates configured in [certificate]
    Certificate,

    /// Install nginx and deploy the mail stack's sites
    Webfront,

    /// Generate certificates, then deploy the web front end
    Run,

    /// Print the certificate paths that would be used, without generating
    ShowPaths,
}

#[derive(Parser, Debug)]
#[command(name = "mailgate", version, about, long_about = None)]
pub struct Cli {
    /// Installer settings file (INI, or TOML with a .toml extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The log level for the application
    #[arg(short, long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Overwrite existing certificates without asking
    #[arg(long)]
    pub force: bool,

    /// nginx configuration root
    #[arg(long)]
    pub nginx_dir: Option<PathBuf>,

    /// Directory holding the <app>.conf.tpl site templates
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Write the effective settings as TOML to this file before running
    #[arg(long, value_name = "PATH")]
    pub dump_settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn new() -> Self {
        let cli = Cli::parse();
        env_logger::Builder::new()
            .filter_level(cli.log_level.to_level_filter())
            .init();
        cli
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "mailgate",
            "--config",
            "/etc/mailgate/installer.cfg",
            "--force",
            "--log-level",
            "debug",
            "run",
        ])
        .unwrap();
        assert_eq!(cli.command, Commands::Run);
        assert!(cli.force);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(
            cli.config,
            Some(PathBuf::from("/etc/mailgate/installer.cfg"))
        );
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mailgate", "show-paths"]).unwrap();
        assert_eq!(cli.command, Commands::ShowPaths);
        assert_eq!(cli.log_level.to_level_filter(), log::LevelFilter::Info);
        assert!(!cli.force);
        assert!(cli.config.is_none());
        assert!(cli.dump_settings.is_none());
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["mailgate"]).is_err());
    }
}
