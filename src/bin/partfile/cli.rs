use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Split a file into content-addressed parts and merge them back
#[derive(Parser, Debug)]
#[command(
    name = "partfile",
    version,
    about = "File splitter and merger (SHA-256 named parts + index.txt)",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Part store directory (default: PARTFILE_DIR or ".")
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Print the operation report as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Split a file into N parts
    ///
    /// Examples:
    ///   partfile split ./video.mp4 8
    ///   partfile split ./video.mp4 8 --dir ./parts --index ./parts/video.idx
    Split {
        /// The file to split
        file: PathBuf,
        /// Number of parts to split the file into
        parts: u64,
        /// Where to write the index (default: <dir>/index.txt)
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Merge parts back based on an index file
    Merge {
        /// The index file (index.txt)
        index: PathBuf,
        /// Re-hash every part and reject ordinal gaps/duplicates
        #[arg(long, default_value_t = false)]
        verify: bool,
        /// Write here instead of the filename recorded in the index
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check that every part referenced by an index exists and is intact
    Verify {
        /// The index file (index.txt)
        index: PathBuf,
    },
}
