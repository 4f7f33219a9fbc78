// Core
pub mod consts;
pub mod error;
pub mod config;
pub mod hash;

// Part store and index format
pub mod store;
pub mod index;

// Operations
pub mod split;
pub mod merge;
pub mod verify;

// Re-exports
pub use config::PartConfig;
pub use error::{PartError, Result};
pub use index::{parse_index, read_index, write_index, Index, IndexEntry};
pub use merge::{merge_index, MergeOptions, MergeReport};
pub use split::{plan_part_sizes, split_file, SplitReport};
pub use store::PartStore;
pub use verify::{verify_index, VerifyReport};
