use anyhow::Context;
use apilog_stream::{compact, CompactionStats};
use std::io::Read;
use std::path::Path;

/// Compact a captured event stream and print the stored form to stdout
pub fn run(file: Option<&Path>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let (body, stats) = compact_text(&raw);
    println!("{body}");
    match stats {
        Some(stats) => eprintln!("{stats}"),
        None => eprintln!("input is not an event stream, left unchanged"),
    }
    Ok(())
}

fn compact_text(raw: &str) -> (String, Option<CompactionStats>) {
    match compact(raw) {
        Some(compaction) => (compaction.body, Some(compaction.stats)),
        None => (raw.to_string(), None),
    }
}
