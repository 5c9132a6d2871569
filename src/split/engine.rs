use crate::error::SplitError;
use crate::split::decoder::RecordDecoder;
use crate::split::progress::{ProgressReporter, ProgressUpdate};
use crate::split::sink::SinkPool;
use crate::split::types::{ErrorPolicy, RunSummary, SplitConfig};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle of a [`PartitionEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Splits one ndjson file into per-key output files in a single pass
pub struct PartitionEngine {
    input: PathBuf,
    config: SplitConfig,
    state: EngineState,
}

impl PartitionEngine {
    /// Validate the input path and prepare a run; no file is opened yet
    pub fn new<P: AsRef<Path>>(input: P, config: SplitConfig) -> Result<Self, SplitError> {
        let input = input.as_ref().to_path_buf();
        let meta = match std::fs::metadata(&input) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SplitError::InputNotFound(input));
            }
            Err(e) => {
                return Err(SplitError::io(format!("failed to stat {}", input.display()), e));
            }
        };
        if !meta.is_file() {
            return Err(SplitError::InputNotRegularFile(input));
        }

        Ok(PartitionEngine {
            input,
            config,
            state: EngineState::Idle,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Run the split. An engine runs at most once.
    ///
    /// Every output file is flushed and closed before this returns, including when
    /// the run aborts.
    pub fn run<P>(&mut self, reporter: &mut P) -> Result<RunSummary, SplitError>
    where
        P: ProgressReporter + ?Sized,
    {
        if self.state != EngineState::Idle {
            return Err(SplitError::AlreadyRun);
        }
        self.state = EngineState::Running;
        info!(
            input = %self.input.display(),
            out_dir = %self.config.out_dir.display(),
            key_path = %self.config.key_path,
            "starting split"
        );

        let result = self.execute(reporter);
        reporter.finish();

        match &result {
            Ok(summary) => {
                self.state = EngineState::Completed;
                info!(
                    records = summary.records_written,
                    files = summary.outputs.len(),
                    skipped = summary.records_skipped,
                    "split completed"
                );
            }
            Err(err) => {
                self.state = EngineState::Aborted;
                warn!(error = %err, "split aborted");
            }
        }
        result
    }

    fn execute<P>(&self, reporter: &mut P) -> Result<RunSummary, SplitError>
    where
        P: ProgressReporter + ?Sized,
    {
        let file = File::open(&self.input)
            .map_err(|e| SplitError::io(format!("failed to open {}", self.input.display()), e))?;
        let bytes_total = file
            .metadata()
            .map_err(|e| SplitError::io(format!("failed to stat {}", self.input.display()), e))?
            .len();

        let mut pool = SinkPool::new(&self.config.out_dir, self.config.key_policy)?;
        let outcome = partition(
            BufReader::new(file),
            bytes_total,
            &self.config,
            &mut pool,
            reporter,
        );

        let outputs = pool.outputs();
        let closed = pool.close_all();
        // the error that stopped the pass wins over a close failure
        let mut summary = outcome?;
        closed?;
        summary.outputs = outputs;
        Ok(summary)
    }
}

/// Stream `reader` line by line into `pool`.
///
/// `bytes_total` is only used for progress. The caller owns `pool` and is
/// responsible for closing it; `summary.outputs` is left empty.
pub fn partition<R, P>(
    mut reader: R,
    bytes_total: u64,
    config: &SplitConfig,
    pool: &mut SinkPool,
    reporter: &mut P,
) -> Result<RunSummary, SplitError>
where
    R: BufRead,
    P: ProgressReporter + ?Sized,
{
    let started_at = Instant::now();
    let mut decoder = RecordDecoder::new(config.decoder);
    let mut summary = RunSummary::default();
    let mut current_key = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| SplitError::io(format!("failed to read line {}", summary.lines_read + 1), e))?;
        if read == 0 {
            break;
        }
        summary.lines_read += 1;
        summary.bytes_read += read as u64;
        let line_no = summary.lines_read;

        let text = strip_terminator(&line);
        if text.iter().all(u8::is_ascii_whitespace) {
            summary.blank_lines += 1;
        } else {
            match route(&mut decoder, config, pool, text, line_no) {
                Ok(key) => {
                    summary.records_written += 1;
                    current_key = key;
                }
                Err(err) if config.error_policy == ErrorPolicy::Skip && err.is_record_error() => {
                    warn!(line = line_no, error = %err, "skipping record");
                    summary.records_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        reporter.report(&ProgressUpdate {
            bytes_done: summary.bytes_read,
            bytes_total,
            started_at,
            current_key: &current_key,
        });
    }

    Ok(summary)
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Decode, extract and write one non-blank line, returning its routing key.
///
/// The decoded value is only used for routing; the line itself is written out.
fn route(
    decoder: &mut RecordDecoder,
    config: &SplitConfig,
    pool: &mut SinkPool,
    text: &[u8],
    line: u64,
) -> Result<String, SplitError> {
    let record: Value = decoder
        .decode(text)
        .map_err(|source| SplitError::Decode { line, source })?;
    let key = config
        .key_path
        .extract(&record)
        .map_err(|source| SplitError::Key { line, source })?;
    pool.get_or_create(&key)?.append(text)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::progress::NoopReporter;
    use crate::split::types::KeyPolicy;
    use std::io::Cursor;

    struct Recorder {
        updates: Vec<(u64, u64, String)>,
        finished: bool,
    }

    impl ProgressReporter for Recorder {
        fn report(&mut self, update: &ProgressUpdate<'_>) {
            self.updates
                .push((update.bytes_done, update.bytes_total, update.current_key.to_string()));
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn config_for(dir: &Path) -> SplitConfig {
        SplitConfig {
            out_dir: dir.to_path_buf(),
            ..SplitConfig::default()
        }
    }

    #[test]
    fn test_partition_reports_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let input = "{\"inparams\":{\"target\":\"a\"}}\n\n{\"inparams\":{\"target\":\"b\"}}";
        let mut recorder = Recorder {
            updates: Vec::new(),
            finished: false,
        };

        let summary = partition(
            Cursor::new(input),
            input.len() as u64,
            &config,
            &mut pool,
            &mut recorder,
        )
        .unwrap();

        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.blank_lines, 1);
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.bytes_read, input.len() as u64);

        let total = input.len() as u64;
        assert_eq!(
            recorder.updates,
            vec![
                (28, total, "a".to_string()),
                (29, total, "a".to_string()),
                (total, total, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_partition_strips_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let input = "{\"inparams\":{\"target\":\"a\"}}\r\n";

        partition(Cursor::new(input), 0, &config, &mut pool, &mut NoopReporter).unwrap();
        pool.close_all().unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.json")).unwrap(),
            "{\"inparams\":{\"target\":\"a\"}}\n"
        );
    }

    #[test]
    fn test_skip_policy_counts_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = SplitConfig {
            error_policy: ErrorPolicy::Skip,
            ..config_for(dir.path())
        };
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let input = concat!(
            "{\"inparams\":{\"target\":\"a\"}}\n",
            "not json\n",
            "{\"other\":1}\n",
            "{\"inparams\":{\"target\":\"../escape\"}}\n",
            "{\"inparams\":{\"target\":\"a\"},\"n\":2}\n",
        );

        let summary =
            partition(Cursor::new(input), 0, &config, &mut pool, &mut NoopReporter).unwrap();
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.records_skipped, 3);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_skip_policy_covers_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let config = SplitConfig {
            error_policy: ErrorPolicy::Skip,
            ..config_for(dir.path())
        };
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let mut input = b"{\"inparams\":{\"target\":\"a\"}}\n".to_vec();
        input.extend_from_slice(b"{\"inparams\":{\"target\":\"\xff\xfe\"}}\n");
        input.extend_from_slice(b"{\"inparams\":{\"target\":\"a\"}}\n");

        let summary =
            partition(Cursor::new(input), 0, &config, &mut pool, &mut NoopReporter).unwrap();
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.records_skipped, 1);
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let input = b"\xff\xfe\n".to_vec();

        let err = partition(Cursor::new(input), 0, &config, &mut pool, &mut NoopReporter)
            .unwrap_err();
        assert!(matches!(err, SplitError::Decode { line: 1, .. }));
    }

    #[test]
    fn test_abort_policy_names_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let mut pool = SinkPool::new(dir.path(), KeyPolicy::Reject).unwrap();
        let input = "{\"inparams\":{\"target\":\"a\"}}\n{\"id\":1}\n";

        let err = partition(Cursor::new(input), 0, &config, &mut pool, &mut NoopReporter)
            .unwrap_err();
        match err {
            SplitError::Key { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_engine_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ndjson");
        std::fs::write(&input, "{\"inparams\":{\"target\":\"x\"}}\n").unwrap();
        let out = dir.path().join("out");

        let mut engine = PartitionEngine::new(&input, config_for(&out)).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);

        let mut recorder = Recorder {
            updates: Vec::new(),
            finished: false,
        };
        let summary = engine.run(&mut recorder).unwrap();
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(recorder.finished);
        assert_eq!(summary.outputs.len(), 1);
        assert_eq!(summary.outputs[0].path, out.join("x.json"));

        assert!(matches!(
            engine.run(&mut NoopReporter),
            Err(SplitError::AlreadyRun)
        ));
    }

    #[test]
    fn test_engine_aborts_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ndjson");
        std::fs::write(&input, "{\"inparams\":{\"target\":\"x\"}}\n{broken\n").unwrap();

        let mut engine = PartitionEngine::new(&input, config_for(dir.path())).unwrap();
        let err = engine.run(&mut NoopReporter).unwrap_err();
        assert!(matches!(err, SplitError::Decode { line: 2, .. }));
        assert_eq!(engine.state(), EngineState::Aborted);
    }

    #[test]
    fn test_new_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PartitionEngine::new(dir.path().join("missing"), SplitConfig::default()),
            Err(SplitError::InputNotFound(_))
        ));
        assert!(matches!(
            PartitionEngine::new(dir.path(), SplitConfig::default()),
            Err(SplitError::InputNotRegularFile(_))
        ));
    }
}
