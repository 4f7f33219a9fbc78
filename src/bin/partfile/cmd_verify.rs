use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use partfile::{verify_index, PartConfig};

pub fn exec(cfg: &PartConfig, index: PathBuf, json: bool) -> Result<()> {
    let report = verify_index(&index, cfg)
        .with_context(|| format!("verify index {}", index.display()))?;

    if json {
        let s = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
        println!("{s}");
    } else {
        println!("Index {} (v{})", index.display(), report.version);
        println!("  filename = {}", report.filename);
        println!("  parts    = {}", report.parts);
        println!("  bytes    = {}", report.bytes);
        if !report.ordinal_problems.missing.is_empty() {
            println!("  ordinal gaps       = {:?}", report.ordinal_problems.missing);
        }
        if !report.ordinal_problems.duplicated.is_empty() {
            println!("  ordinal duplicates = {:?}", report.ordinal_problems.duplicated);
        }
        for m in &report.missing {
            println!("  MISSING #{} {}", m.ordinal, m.path.display());
        }
        for c in &report.corrupt {
            println!(
                "  CORRUPT #{} {} (content hash {})",
                c.ordinal,
                c.path.display(),
                c.actual.as_deref().unwrap_or("?")
            );
        }
    }

    if !report.is_ok() {
        return Err(anyhow!(
            "index {} failed verification: {} missing, {} corrupt, {} ordinal gap(s), {} duplicate ordinal(s)",
            index.display(),
            report.missing.len(),
            report.corrupt.len(),
            report.ordinal_problems.missing.len(),
            report.ordinal_problems.duplicated.len()
        ));
    }
    Ok(())
}
