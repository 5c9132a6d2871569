//! ndjson splitting - route each record to a per-key output file
//!
//! A run reads the input once, line by line. Each line is decoded, its routing
//! key is resolved through a fixed [`KeyPath`], and the record is appended to
//! `<out_dir>/<key>.json`. Output files are opened lazily and kept open until
//! the run ends.

pub mod types;
pub mod decoder;
pub mod key;
pub mod sink;
pub mod engine;
pub mod progress;

pub use types::{DecoderKind, ErrorPolicy, KeyPolicy, RunSummary, SinkInfo, SplitConfig};
pub use decoder::RecordDecoder;
pub use key::{extract_key, KeyPath};
pub use sink::{file_name_for, Sink, SinkPool};
pub use engine::{partition, EngineState, PartitionEngine};
pub use progress::{estimate, Estimate, NoopReporter, ProgressReporter, ProgressUpdate, TerminalReporter};
