pub fn run() -> anyhow::Result<()> {
    println!("apilog {}", env!("CARGO_PKG_VERSION"));
    println!("Logging reverse proxy with self-migrating SQLite storage");
    Ok(())
}
