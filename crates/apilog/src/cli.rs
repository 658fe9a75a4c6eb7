use apilog_proxy::{
    ProxyConfig, DEFAULT_DB_PATH, DEFAULT_PORT, DEFAULT_TARGET_URL, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "apilog")]
#[command(version)]
#[command(about = "Logging reverse proxy for JSON-over-HTTPS APIs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending migrations, then start proxying
    Serve(ServeArgs),

    /// Apply pending migrations
    Migrate {
        #[command(flatten)]
        db: DbArgs,

        /// List every migration and when it was applied instead of running
        #[arg(long)]
        status: bool,
    },

    /// Compact a captured event-stream body (stdin if no file given)
    Compact {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the most recently logged requests
    Recent {
        #[command(flatten)]
        db: DbArgs,

        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Print version information
    Version,
}

#[derive(Args)]
pub struct DbArgs {
    /// SQLite database holding request logs
    #[arg(long = "db", env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(short, long, env = "PROXY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "PROXY_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Base URL calls are forwarded to
    #[arg(long, env = "TARGET_API_URL", default_value = DEFAULT_TARGET_URL)]
    pub target: String,

    #[command(flatten)]
    pub db: DbArgs,

    /// Give up on an upstream exchange after this many seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl ServeArgs {
    pub fn into_config(self) -> ProxyConfig {
        ProxyConfig {
            bind: self.bind,
            port: self.port,
            target_url: self.target,
            db_path: self.db.path,
            upstream_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["apilog", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    #[serial]
    fn test_cli_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "apilog",
            "serve",
            "--port",
            "9090",
            "--target",
            "http://localhost:3000",
            "--db",
            "/tmp/x.db",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("Expected Serve command");
        };
        let config = args.into_config();
        assert_eq!(config.port, 9090);
        assert_eq!(config.target_url, "http://localhost:3000");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    #[serial]
    fn test_cli_serve_reads_environment() {
        unsafe {
            std::env::set_var("PROXY_PORT", "7070");
            std::env::set_var("TARGET_API_URL", "http://upstream.test");
        }
        let cli = Cli::try_parse_from(["apilog", "serve"]);
        unsafe {
            std::env::remove_var("PROXY_PORT");
            std::env::remove_var("TARGET_API_URL");
        }

        let Commands::Serve(args) = cli.unwrap().command else {
            panic!("Expected Serve command");
        };
        assert_eq!(args.port, 7070);
        assert_eq!(args.target, "http://upstream.test");
        assert_eq!(args.timeout_secs, DEFAULT_UPSTREAM_TIMEOUT_SECS);
    }

    #[test]
    fn test_cli_parse_migrate_status() {
        let cli = Cli::try_parse_from(["apilog", "migrate", "--status", "--db", "a.db"]).unwrap();
        if let Commands::Migrate { db, status } = cli.command {
            assert!(status);
            assert_eq!(db.path, PathBuf::from("a.db"));
        } else {
            panic!("Expected Migrate command");
        }
    }

    #[test]
    fn test_cli_parse_compact_file() {
        let cli = Cli::try_parse_from(["apilog", "compact", "--file", "capture.sse"]).unwrap();
        if let Commands::Compact { file } = cli.command {
            assert_eq!(file, Some(PathBuf::from("capture.sse")));
        } else {
            panic!("Expected Compact command");
        }
    }
}
