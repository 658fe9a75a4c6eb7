use anyhow::Context;
use apilog_proxy::ProxyConfig;
use apilog_store::RequestLogDb;
use tracing::info;

pub fn run(config: ProxyConfig) -> anyhow::Result<()> {
    // A store that cannot be brought up to date must not accept traffic
    prepare_store(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(apilog_proxy::serve(config))
}

fn prepare_store(config: &ProxyConfig) -> anyhow::Result<()> {
    let mut db = RequestLogDb::connect(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    let report = db.migrate().context("database migration failed, refusing to start")?;

    if report.is_noop() {
        info!("database schema is up to date");
    } else {
        info!(
            applied = report.applied.len(),
            baselined = report.baselined.len(),
            "database migrated"
        );
    }
    Ok(())
}
