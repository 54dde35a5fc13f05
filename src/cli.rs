//! Command-line interface for connect_n.

use clap::{Args, Parser, Subcommand};
use connect_n::{ConfigError, Settings, SettingsOverrides};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Connect N - two-player disc-dropping game server
#[derive(Parser, Debug)]
#[command(name = "connect_n")]
#[command(about = "Two-player connect-N game server over WebSockets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket game server
    Serve(SettingsArgs),

    /// Print the effective configuration as TOML
    Config(SettingsArgs),
}

/// Settings shared by every command. Flags win over the config file.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Path to a TOML config file
    #[arg(short, long, env = "INAROW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of rows in the grid
    #[arg(long, env = "INAROW_NUMROWS")]
    pub rows: Option<NonZeroUsize>,

    /// Number of columns in the grid
    #[arg(long, env = "INAROW_NUMCOLS")]
    pub columns: Option<NonZeroUsize>,

    /// Discs in a row needed to win
    #[arg(long, env = "INAROW_INAROW")]
    pub win_length: Option<NonZeroUsize>,

    /// Host to bind to
    #[arg(long, env = "INAROW_HOST")]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "INAROW_PORT")]
    pub port: Option<u16>,
}

impl SettingsArgs {
    /// Loads the config file (if any) and applies the flags on top.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let overrides = SettingsOverrides::new(
            self.rows,
            self.columns,
            self.win_length,
            self.host.clone(),
            self.port,
        );
        Ok(Settings::load(self.config.as_deref())?.with_overrides(overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "connect_n",
            "serve",
            "--rows",
            "3",
            "--columns",
            "4",
            "--win-length",
            "3",
            "--port",
            "0",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let settings = args.load().unwrap();
        assert_eq!(settings.game().rows().get(), 3);
        assert_eq!(settings.game().columns().get(), 4);
        assert_eq!(settings.server().port(), &0);
    }

    #[test]
    fn test_zero_rows_rejected() {
        let result = Cli::try_parse_from(["connect_n", "serve", "--rows", "0"]);
        assert!(result.is_err());
    }
}
