//! Benchmark comparing serde_json vs simd-json line decoding for splitting
//!
//! Generates a synthetic ndjson file, then splits it once with each decoder.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Context;
use ndsplit::{split_file, DecoderKind, SplitConfig};
use serde_json::json;
use std::io::{BufWriter, Write};
use std::time::Instant;

const RECORDS: usize = 200_000;
const TARGETS: usize = 16;

fn main() -> anyhow::Result<()> {
    println!("=== ndsplit Decoder Benchmark ===\n");

    let work_dir = std::env::temp_dir().join(format!("ndsplit-bench-{}", std::process::id()));
    std::fs::create_dir_all(&work_dir).context("Failed to create benchmark directory")?;
    let input = work_dir.join("input.ndjson");

    // Generate test data
    {
        let mut out = BufWriter::new(std::fs::File::create(&input)?);
        for i in 0..RECORDS {
            let record = json!({
                "id": i,
                "inparams": {
                    "target": format!("target{}", i % TARGETS),
                    "threshold": (i % 100) as f64 / 10.0,
                    "flags": ["fast", "verbose"]
                },
                "result": {
                    "status": if i % 7 == 0 { "failed" } else { "ok" },
                    "elapsed_ms": i % 5000,
                    "log": format!("run {} finished", i)
                }
            });
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }
        out.flush()?;
    }
    let size = std::fs::metadata(&input)?.len();
    println!(
        "Input: {} records, {} targets, {:.1} MiB\n",
        RECORDS,
        TARGETS,
        size as f64 / (1024.0 * 1024.0)
    );

    for decoder in [DecoderKind::Serde, DecoderKind::Simd] {
        let config = SplitConfig {
            out_dir: work_dir.join(format!("{:?}", decoder).to_lowercase()),
            decoder,
            ..SplitConfig::default()
        };

        let start = Instant::now();
        let summary = split_file(&input, config)?;
        let duration = start.elapsed();

        println!("=== {:?} ===", decoder);
        println!("Time: {:?}", duration);
        println!("Records written: {}", summary.records_written);
        println!("Files: {}", summary.outputs.len());
        println!(
            "Throughput: {:.1} MiB/s\n",
            size as f64 / (1024.0 * 1024.0) / duration.as_secs_f64()
        );
    }

    std::fs::remove_dir_all(&work_dir).context("Failed to clean up benchmark directory")?;
    Ok(())
}
