//! # ndsplit - ndjson partitioning
//!
//! Splits a newline-delimited JSON file into one file per distinct value of a
//! nested routing field (`inparams.target` by default), in a single streaming
//! pass.
//!
//! ## Modules
//!
//! - **split**: decoder, key extraction, output sink pool, partition engine and
//!   progress reporting
//! - **error**: error types shared by all of the above
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndsplit::{KeyPath, SplitConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = SplitConfig {
//!     out_dir: "by_target".into(),
//!     key_path: KeyPath::new(["inparams", "target"])?,
//!     ..SplitConfig::default()
//! };
//!
//! let summary = ndsplit::split_file("runs.ndjson", config)?;
//! for output in &summary.outputs {
//!     println!("{} -> {}", output.key, output.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod error;
pub mod split;

pub use error::{DecodeError, KeyError, SplitError};
pub use split::{
    DecoderKind, EngineState, ErrorPolicy, KeyPath, KeyPolicy, NoopReporter, PartitionEngine,
    ProgressReporter, RunSummary, SinkInfo, SinkPool, SplitConfig, TerminalReporter,
};

/// Main entry point: split `input` into per-key files without progress output
pub fn split_file<P: AsRef<Path>>(input: P, config: SplitConfig) -> Result<RunSummary, SplitError> {
    let mut engine = PartitionEngine::new(input, config)?;
    engine.run(&mut NoopReporter)
}
