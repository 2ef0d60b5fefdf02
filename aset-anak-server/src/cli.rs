use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5151 or config.listen_port)

Command-line flags take precedence over the environment.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "aset-anak-server",
    version,
    about = "Aset Anak: track children's savings, gold and other assets",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Path to the SQLite database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Listen port
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_subcommand() {
        let cli = Cli::parse_from(["aset-anak-server", "--db", "/tmp/a.db", "migrate"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
        assert!(matches!(cli.command, Some(Command::Migrate)));

        let cli = Cli::parse_from(["aset-anak-server", "--port", "8080"]);
        assert_eq!(cli.port, Some(8080));
        assert!(cli.command.is_none());
    }
}
