use crate::error::SplitError;
use crate::split::types::{KeyPolicy, SinkInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static UNSAFE_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// An open output file bound to one routing key
pub struct Sink {
    key: String,
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl Sink {
    /// Append one record, as the exact bytes it was read from, followed by a newline
    pub fn append(&mut self, record: &[u8]) -> Result<(), SplitError> {
        self.writer
            .write_all(record)
            .and_then(|()| self.writer.write_all(b"\n"))
            .map_err(|e| SplitError::io(format!("failed to write {}", self.path.display()), e))?;
        self.records += 1;
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    fn info(&self) -> SinkInfo {
        SinkInfo {
            key: self.key.clone(),
            path: self.path.clone(),
            records: self.records,
        }
    }

    fn flush(&mut self) -> Result<(), SplitError> {
        self.writer
            .flush()
            .map_err(|e| SplitError::io(format!("failed to flush {}", self.path.display()), e))
    }
}

/// Owns one output file per routing key, opened on first use
pub struct SinkPool {
    out_dir: PathBuf,
    policy: KeyPolicy,
    sinks: Vec<Sink>,
    by_key: HashMap<String, usize>,
    // file name -> key that claimed it
    by_file: HashMap<String, String>,
}

impl SinkPool {
    /// Create a pool writing into `out_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(out_dir: P, policy: KeyPolicy) -> Result<Self, SplitError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir).map_err(|e| {
            SplitError::io(
                format!("failed to create output directory {}", out_dir.display()),
                e,
            )
        })?;

        Ok(SinkPool {
            out_dir,
            policy,
            sinks: Vec::new(),
            by_key: HashMap::new(),
            by_file: HashMap::new(),
        })
    }

    /// Return the sink for `key`, creating `<out_dir>/<key>.json` if this is its first use.
    ///
    /// A newly created file is truncated, so output never accumulates across runs.
    pub fn get_or_create(&mut self, key: &str) -> Result<&mut Sink, SplitError> {
        if let Some(&idx) = self.by_key.get(key) {
            return Ok(&mut self.sinks[idx]);
        }

        let file_name = file_name_for(key, self.policy)?;
        if let Some(existing) = self.by_file.get(&file_name) {
            return Err(SplitError::KeyCollision {
                key: key.to_string(),
                existing: existing.clone(),
                file_name,
            });
        }

        let path = self.out_dir.join(&file_name);
        let file = File::create(&path)
            .map_err(|e| SplitError::io(format!("failed to create {}", path.display()), e))?;
        debug!(key, path = %path.display(), "opened sink");

        self.by_file.insert(file_name, key.to_string());
        self.by_key.insert(key.to_string(), self.sinks.len());
        self.sinks.push(Sink {
            key: key.to_string(),
            path,
            writer: BufWriter::new(file),
            records: 0,
        });

        let idx = self.sinks.len() - 1;
        Ok(&mut self.sinks[idx])
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Open sinks in the order their keys were first seen
    pub fn outputs(&self) -> Vec<SinkInfo> {
        self.sinks.iter().map(Sink::info).collect()
    }

    /// Flush and release every sink.
    ///
    /// All sinks are flushed even if one fails; the first failure is returned.
    pub fn close_all(&mut self) -> Result<(), SplitError> {
        let mut first_err = None;
        for mut sink in self.sinks.drain(..) {
            if let Err(err) = sink.flush() {
                warn!(key = sink.key.as_str(), error = %err, "failed to close sink");
                first_err.get_or_insert(err);
            }
        }
        self.by_key.clear();
        self.by_file.clear();

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for SinkPool {
    fn drop(&mut self) {
        if !self.sinks.is_empty() {
            let _ = self.close_all();
        }
    }
}

/// Map a routing key to its output file name under `policy`
pub fn file_name_for(key: &str, policy: KeyPolicy) -> Result<String, SplitError> {
    let stem = match policy {
        KeyPolicy::PassThrough => key.to_string(),
        KeyPolicy::Reject => {
            if !is_safe_stem(key) {
                return Err(SplitError::UnsafeKey {
                    key: key.to_string(),
                });
            }
            key.to_string()
        }
        KeyPolicy::Sanitize => {
            let cleaned = UNSAFE_FILE_CHARS.replace_all(key, "_").into_owned();
            if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
                "_".to_string()
            } else {
                cleaned
            }
        }
    };
    Ok(format!("{}.json", stem))
}

fn is_safe_stem(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.chars().any(|c| {
            matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
        })
}
