use anyhow::{Context, Result};
use std::path::PathBuf;

use partfile::{split_file, PartConfig};

pub fn exec(cfg: &PartConfig, file: PathBuf, parts: u64, json: bool) -> Result<()> {
    let report = split_file(&file, parts, cfg)
        .with_context(|| format!("split {} into {} part(s)", file.display(), parts))?;

    if json {
        let s = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
        println!("{s}");
        return Ok(());
    }

    println!(
        "File '{}' split into {} parts. Index saved as {}",
        report.source,
        report.parts.len(),
        report.index_path.display()
    );
    Ok(())
}
