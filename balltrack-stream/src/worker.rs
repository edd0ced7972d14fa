/// Tracking worker - a dedicated thread owning one fixed-lag tracker
///
/// Candidate lists go in through a bounded command channel and estimates come
/// out through a result channel, so producers and consumers on other threads
/// never share the timeline:
/// - Frames are processed strictly in submission order
/// - `submit` blocks once `channel_capacity` frames are queued
/// - A tracker contract violation stops the worker; `finish` reports it
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use balltrack::{Candidate, FrameEstimate, FrameIndex, SpotsTracker, TrackerError};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use std::thread;
use std::time::Instant;

/// Candidates of one frame
#[derive(Debug, Clone)]
pub struct FrameInput {
    pub frame: FrameIndex,
    pub timestamp: f64,
    pub candidates: Vec<Candidate>,
}

/// A command to be processed by the tracking worker
pub enum TrackerCommand {
    /// Ingest a frame and emit whatever leaves the output latency
    Frame(FrameInput),
    /// Emit every frame still in the window (end of stream)
    Flush,
    /// Stop the worker
    Shutdown,
}

/// Counters reported when the worker stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub frames_processed: u64,
    pub frames_emitted: u64,
    pub frames_found: u64,
    pub busy_secs: f64,
}

pub struct TrackingWorker {
    command_tx: Sender<TrackerCommand>,
    result_rx: Receiver<FrameEstimate>,
    handle: Option<thread::JoinHandle<std::result::Result<WorkerStats, TrackerError>>>,
}

impl TrackingWorker {
    /// Validate the configuration and spawn the worker thread
    pub fn spawn(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let tracker = SpotsTracker::new(config.tracker.clone())?;

        let (command_tx, command_rx) = bounded::<TrackerCommand>(config.channel_capacity);
        // Unbounded so a slow consumer can never stall the tracker while it flushes
        let (result_tx, result_rx) = unbounded::<FrameEstimate>();

        let log_every = config.log_every;
        let handle = thread::Builder::new()
            .name("balltrack-worker".to_string())
            .spawn(move || Self::worker_loop(tracker, command_rx, result_tx, log_every))?;

        Ok(Self {
            command_tx,
            result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a frame (blocks while the command channel is full)
    pub fn submit(&self, input: FrameInput) -> Result<()> {
        self.command_tx
            .send(TrackerCommand::Frame(input))
            .map_err(|_| StreamError::Disconnected)
    }

    /// Queue a frame without blocking; returns `false` when the channel is full
    pub fn try_submit(&self, input: FrameInput) -> Result<bool> {
        match self.command_tx.try_send(TrackerCommand::Frame(input)) {
            Ok(()) => Ok(true),
            Err(crossbeam::channel::TrySendError::Full(_)) => Ok(false),
            Err(crossbeam::channel::TrySendError::Disconnected(_)) => {
                Err(StreamError::Disconnected)
            }
        }
    }

    /// Ask the worker to emit every frame still in its window
    pub fn flush(&self) -> Result<()> {
        self.command_tx
            .send(TrackerCommand::Flush)
            .map_err(|_| StreamError::Disconnected)
    }

    /// Get next estimate (non-blocking)
    pub fn try_recv(&self) -> Option<FrameEstimate> {
        self.result_rx.try_recv().ok()
    }

    /// Wait for the next estimate; `None` once the worker has stopped and
    /// every estimate was consumed
    pub fn recv(&self) -> Option<FrameEstimate> {
        self.result_rx.recv().ok()
    }

    /// Receiver side of the estimate channel, for `select!` or iteration
    pub fn results(&self) -> &Receiver<FrameEstimate> {
        &self.result_rx
    }

    /// Number of frames waiting to be processed
    pub fn pending(&self) -> usize {
        self.command_tx.len()
    }

    /// Flush, stop the worker and collect the remaining estimates
    pub fn finish(mut self) -> Result<(Vec<FrameEstimate>, WorkerStats)> {
        // The worker may already be gone after a contract violation
        let _ = self.command_tx.send(TrackerCommand::Flush);
        let _ = self.command_tx.send(TrackerCommand::Shutdown);

        let stats = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| StreamError::WorkerPanicked)??,
            None => WorkerStats::default(),
        };
        let remaining = self.result_rx.try_iter().collect();
        Ok((remaining, stats))
    }

    fn emit(
        estimates: Vec<FrameEstimate>,
        result_tx: &Sender<FrameEstimate>,
        stats: &mut WorkerStats,
    ) -> bool {
        for estimate in estimates {
            stats.frames_emitted += 1;
            if estimate.is_found() {
                stats.frames_found += 1;
            }
            if result_tx.send(estimate).is_err() {
                return false;
            }
        }
        true
    }

    fn worker_loop(
        mut tracker: SpotsTracker,
        command_rx: Receiver<TrackerCommand>,
        result_tx: Sender<FrameEstimate>,
        log_every: u64,
    ) -> std::result::Result<WorkerStats, TrackerError> {
        log::info!("Tracking worker started");
        let mut stats = WorkerStats::default();

        while let Ok(command) = command_rx.recv() {
            match command {
                TrackerCommand::Frame(input) => {
                    let start = Instant::now();
                    let ready = tracker
                        .push_and_drain(input.frame, input.timestamp, input.candidates)
                        .map_err(|e| {
                            log::error!("Tracking worker stopping on frame {}: {}", input.frame, e);
                            e
                        })?;
                    stats.busy_secs += start.elapsed().as_secs_f64();
                    stats.frames_processed += 1;

                    if !Self::emit(ready, &result_tx, &mut stats) {
                        log::warn!("Estimate receiver dropped, stopping worker");
                        break;
                    }

                    if log_every > 0 && stats.frames_processed % log_every == 0 {
                        log::info!(
                            "Tracking worker: {} processed, {} emitted, {} found ({:.1} us/frame)",
                            stats.frames_processed,
                            stats.frames_emitted,
                            stats.frames_found,
                            1e6 * stats.busy_secs / stats.frames_processed as f64
                        );
                    }
                }
                TrackerCommand::Flush => {
                    let ready = tracker.drain_all()?;
                    log::debug!("Tracking worker flushed {} frames", ready.len());
                    if !Self::emit(ready, &result_tx, &mut stats) {
                        break;
                    }
                }
                TrackerCommand::Shutdown => {
                    log::info!(
                        "Tracking worker shutting down: {} processed, {} emitted",
                        stats.frames_processed,
                        stats.frames_emitted
                    );
                    break;
                }
            }
        }

        log::info!("Tracking worker stopped");
        Ok(stats)
    }
}

impl Drop for TrackingWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(TrackerCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use balltrack::TrackerConfig;

    fn stream_config(latency: usize) -> StreamConfig {
        StreamConfig {
            tracker: TrackerConfig {
                dynamic_depth: latency,
                output_latency: latency,
                absence_cost: 1.0,
                appearance_cost: 10.0,
                disappearance_cost: 10.0,
                ..Default::default()
            },
            channel_capacity: 4,
            log_every: 0,
        }
    }

    fn steady_frame(frame: FrameIndex) -> FrameInput {
        FrameInput {
            frame,
            timestamp: frame as f64 / 120.0,
            candidates: vec![Candidate::new(0.5, 0.25, 2.0)],
        }
    }

    #[test]
    fn test_worker_emits_every_frame_in_order() {
        let worker = TrackingWorker::spawn(stream_config(8)).unwrap();
        for frame in 0..30 {
            worker.submit(steady_frame(frame)).unwrap();
        }

        let mut estimates = Vec::new();
        for _ in 0..22 {
            estimates.push(worker.recv().unwrap());
        }
        let (remaining, stats) = worker.finish().unwrap();
        estimates.extend(remaining);

        assert_eq!(estimates.len(), 30);
        for (i, estimate) in estimates.iter().enumerate() {
            assert_eq!(estimate.frame, i as FrameIndex);
            let position = estimate.position.unwrap();
            assert_abs_diff_eq!(position.x, 0.5, epsilon = 1e-12);
        }
        assert_eq!(stats.frames_processed, 30);
        assert_eq!(stats.frames_emitted, 30);
        assert_eq!(stats.frames_found, 30);
    }

    #[test]
    fn test_worker_reports_contract_violation() {
        let worker = TrackingWorker::spawn(stream_config(4)).unwrap();
        worker.submit(steady_frame(0)).unwrap();
        worker.submit(steady_frame(2)).unwrap();

        let err = worker.finish().unwrap_err();
        assert!(matches!(
            err,
            StreamError::Tracker(TrackerError::OutOfSequence {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_flush_emits_window() {
        let worker = TrackingWorker::spawn(stream_config(16)).unwrap();
        for frame in 0..5 {
            worker.submit(steady_frame(frame)).unwrap();
        }
        worker.flush().unwrap();
        let frames: Vec<FrameIndex> = (0..5).map(|_| worker.recv().unwrap().frame).collect();
        assert_eq!(frames, vec![0, 1, 2, 3, 4]);

        let (remaining, stats) = worker.finish().unwrap();
        assert!(remaining.is_empty());
        assert_eq!(stats.frames_emitted, 5);
    }
}
