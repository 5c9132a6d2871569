use crate::split::key::KeyPath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How routing keys are turned into output file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyPolicy {
    /// Refuse empty keys, `.`/`..`, and keys containing path separators, control
    /// characters or any of `:*?"<>|`
    #[default]
    Reject,

    /// Replace every character outside `[A-Za-z0-9._-]` with `_`
    Sanitize,

    /// Use the key verbatim as the file stem
    PassThrough,
}

/// What to do with a record that cannot be decoded or routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Stop the run at the first bad record
    #[default]
    Abort,

    /// Log the record, count it and keep going
    Skip,
}

/// JSON parser used for each input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecoderKind {
    #[default]
    Serde,

    /// SIMD-accelerated parsing via simd-json
    Simd,
}

/// Configuration for a split run
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Directory receiving one `<key>.json` file per routing key
    pub out_dir: PathBuf,

    /// Field names walked through nested objects to find the routing key
    pub key_path: KeyPath,

    pub key_policy: KeyPolicy,

    pub error_policy: ErrorPolicy,

    pub decoder: DecoderKind,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            out_dir: PathBuf::from("."),
            key_path: KeyPath::default(),
            key_policy: KeyPolicy::default(),
            error_policy: ErrorPolicy::default(),
            decoder: DecoderKind::default(),
        }
    }
}

/// One output file produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkInfo {
    pub key: String,
    pub path: PathBuf,
    pub records: u64,
}

/// Counters and outputs of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Lines read from the input, blank ones included
    pub lines_read: u64,

    pub bytes_read: u64,

    pub records_written: u64,

    pub blank_lines: u64,

    /// Records dropped under [`ErrorPolicy::Skip`]
    pub records_skipped: u64,

    /// Output files in the order their keys were first seen
    pub outputs: Vec<SinkInfo>,
}
