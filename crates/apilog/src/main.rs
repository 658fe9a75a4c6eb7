mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args.into_config()),
        Commands::Migrate { db, status } => commands::migrate::run(&db.path, status),
        Commands::Compact { file } => commands::compact::run(file.as_deref()),
        Commands::Recent { db, limit } => commands::recent::run(&db.path, limit),
        Commands::Version => commands::version::run(),
    }
}
