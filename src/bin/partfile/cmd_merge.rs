use anyhow::{Context, Result};
use std::path::PathBuf;

use partfile::{merge_index, MergeOptions, PartConfig};

pub fn exec(
    cfg: &PartConfig,
    index: PathBuf,
    verify: bool,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    // --verify only turns strict mode on; PARTFILE_VERIFY=1 stays in effect without it.
    let opts = MergeOptions::from_config(cfg)
        .with_verify(cfg.verify_on_merge || verify)
        .with_output(output);

    let report = merge_index(&index, &opts, cfg)
        .with_context(|| format!("merge from index {}", index.display()))?;

    if json {
        let s = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
        println!("{s}");
        return Ok(());
    }

    println!("Files merged into '{}'", report.output.display());
    Ok(())
}
