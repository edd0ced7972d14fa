/// Replay a recorded candidate stream through the fixed-lag tracker
///
/// Reads `frame,timestamp,x,y,weight` rows and prints `frame,timestamp,x,y`
/// for every frame once it leaves the output latency (empty `x,y` when the
/// ball was not found).
///
/// Usage:
///   balltrack-replay [--config tracker.json] [--latency N] <candidates.csv | ->
///
/// Examples:
///   balltrack-replay rally.csv > rally_track.csv
///   RUST_LOG=debug balltrack-replay --latency 30 - < rally.csv
use anyhow::{bail, Context};
use balltrack_stream::{format_estimate, FrameReader, StreamConfig, TrackingWorker, OUTPUT_HEADER};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let mut config = StreamConfig::default();
    let mut latency: Option<usize> = None;
    let mut input_path: Option<String> = None;

    let mut arg_idx = 1;
    while arg_idx < args.len() {
        match args[arg_idx].as_str() {
            "--config" => {
                arg_idx += 1;
                let path = args.get(arg_idx).context("--config needs a path")?;
                config = StreamConfig::from_json_file(path)
                    .with_context(|| format!("loading config {}", path))?;
            }
            "--latency" => {
                arg_idx += 1;
                let value = args.get(arg_idx).context("--latency needs a value")?;
                latency = Some(value.parse().with_context(|| format!("bad latency '{}'", value))?);
            }
            other if input_path.is_none() => input_path = Some(other.to_string()),
            other => bail!("unexpected argument '{}'", other),
        }
        arg_idx += 1;
    }

    // --latency applies on top of --config regardless of order
    if let Some(latency) = latency {
        config.tracker.output_latency = latency;
        config.tracker.dynamic_depth = config.tracker.dynamic_depth.max(latency);
    }

    let Some(input_path) = input_path else {
        bail!("usage: balltrack-replay [--config tracker.json] [--latency N] <candidates.csv | ->");
    };
    let reader: Box<dyn BufRead> = if input_path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file =
            File::open(&input_path).with_context(|| format!("opening {}", input_path))?;
        Box::new(BufReader::new(file))
    };

    log::info!(
        "Replaying {} (depth={}, latency={})",
        input_path,
        config.tracker.dynamic_depth,
        config.tracker.output_latency
    );

    let worker = TrackingWorker::spawn(config)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{}", OUTPUT_HEADER)?;

    let start = Instant::now();
    for input in FrameReader::new(reader) {
        // A stopped worker reports its own error from finish()
        if worker.submit(input?).is_err() {
            break;
        }
        while let Some(estimate) = worker.try_recv() {
            writeln!(out, "{}", format_estimate(&estimate))?;
        }
    }

    let (remaining, stats) = worker.finish()?;
    for estimate in &remaining {
        writeln!(out, "{}", format_estimate(estimate))?;
    }
    out.flush()?;

    log::info!(
        "Replayed {} frames in {:.2}s, ball found in {}/{}",
        stats.frames_processed,
        start.elapsed().as_secs_f64(),
        stats.frames_found,
        stats.frames_emitted
    );
    Ok(())
}
