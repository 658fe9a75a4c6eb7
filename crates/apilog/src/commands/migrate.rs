use anyhow::Context;
use apilog_store::RequestLogDb;
use std::path::Path;

pub fn run(db_path: &Path, status: bool) -> anyhow::Result<()> {
    let mut db = RequestLogDb::connect(db_path)
        .with_context(|| format!("cannot open database {}", db_path.display()))?;

    if status {
        for entry in db.migration_status()? {
            let applied = entry.applied_at.as_deref().unwrap_or("pending");
            println!("{:<36} {:<11} {}", entry.id, entry.kind, applied);
        }
        return Ok(());
    }

    let report = db.migrate()?;
    if report.is_noop() && report.skipped.is_empty() {
        println!("Database is up to date");
        return Ok(());
    }
    for id in &report.baselined {
        println!("baselined {id}");
    }
    for id in &report.applied {
        println!("applied   {id}");
    }
    for id in &report.skipped {
        println!("skipped   {id} (no routine)");
    }
    Ok(())
}
