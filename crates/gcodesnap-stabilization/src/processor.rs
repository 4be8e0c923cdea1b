//! File processing loop
//!
//! One pass over the input: every line is tokenized, fed to the state
//! tracker, and every position produced by a command is offered to the
//! stabilization. The host gets control back through a wall-clock gated
//! progress callback whose return value can cancel the run.

use crate::config::StabilizationConfig;
use crate::file_io::GcodeFileReader;
use crate::issues::{ProcessingIssue, QualityIssue};
use crate::plan::SnapshotPlan;
use crate::strategy::Stabilization;
use gcodesnap_core::logging::SNAPSHOT_PLAN_TARGET;
use gcodesnap_core::{ProgressReport, TargetCallback};
use gcodesnap_parser::parse;
use gcodesnap_tracker::{StateTracker, TrackerConfig};
use serde::Serialize;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

/// Default time between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of processing one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessResult {
    /// The whole input was processed
    pub success: bool,
    /// The progress callback stopped the run
    pub cancelled: bool,
    pub error_message: Option<String>,
    pub snapshot_plans: Vec<SnapshotPlan>,
    pub seconds_elapsed: f64,
    pub gcodes_processed: i64,
    pub lines_processed: i64,
    pub quality_issues: Vec<QualityIssue>,
    pub processing_issues: Vec<ProcessingIssue>,
}

impl ProcessResult {
    /// A run that could not start
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Drives tokenizer, tracker and stabilization over one input
#[derive(Debug)]
pub struct GcodeProcessor {
    tracker: StateTracker,
    stabilization: Stabilization,
    progress_interval: Duration,
}

impl GcodeProcessor {
    /// Build a processor. The stabilization's height increment and bounds
    /// are applied to the tracker when the tracker sets neither.
    pub fn new(
        tracker_config: &TrackerConfig,
        stabilization_config: &StabilizationConfig,
    ) -> gcodesnap_core::Result<Self> {
        let stabilization = Stabilization::new(stabilization_config)?;
        Self::build(tracker_config, stabilization_config, stabilization)
    }

    /// Build a processor whose stabilization target comes from `callback`
    pub fn with_target_callback(
        tracker_config: &TrackerConfig,
        stabilization_config: &StabilizationConfig,
        callback: TargetCallback,
    ) -> gcodesnap_core::Result<Self> {
        let stabilization = Stabilization::with_target_callback(stabilization_config, callback)?;
        Self::build(tracker_config, stabilization_config, stabilization)
    }

    fn build(
        tracker_config: &TrackerConfig,
        stabilization_config: &StabilizationConfig,
        stabilization: Stabilization,
    ) -> gcodesnap_core::Result<Self> {
        let mut tracker_config = tracker_config.clone();
        if tracker_config.height_increment <= 0.0 {
            tracker_config.height_increment = stabilization_config.height_increment;
        }
        if tracker_config.bounds.is_none() {
            tracker_config.bounds = stabilization_config.bounds;
        }
        tracker_config.validate()?;

        Ok(Self {
            tracker: StateTracker::new(tracker_config),
            stabilization,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Set the minimum time between progress reports
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn stabilization(&self) -> &Stabilization {
        &self.stabilization
    }

    /// Process a file from disk
    pub fn process_file<F>(self, path: impl AsRef<Path>, progress: F) -> ProcessResult
    where
        F: FnMut(&ProgressReport) -> bool,
    {
        let reader = match GcodeFileReader::new(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::error!("{}", e);
                return ProcessResult::failed(e.to_string());
            }
        };
        let lines = match reader.lines() {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("{}", e);
                return ProcessResult::failed(e.to_string());
            }
        };

        tracing::info!(
            path = %reader.path().display(),
            bytes = reader.file_size(),
            "processing gcode file"
        );
        self.process_lines(lines, Some(reader.file_size()), progress)
    }

    /// Process in-memory G-code text
    pub fn process_str<F>(self, text: &str, progress: F) -> ProcessResult
    where
        F: FnMut(&ProgressReport) -> bool,
    {
        let lines = text.lines().map(|line| Ok(line.to_string()));
        self.process_lines(lines, Some(text.len() as u64), progress)
    }

    /// Process a stream of lines.
    ///
    /// `total_bytes` is only used for the progress percentage. A read error
    /// ends the run unsuccessfully but keeps the plans built before it.
    pub fn process_lines<I, F>(
        mut self,
        lines: I,
        total_bytes: Option<u64>,
        mut progress: F,
    ) -> ProcessResult
    where
        I: IntoIterator<Item = io::Result<String>>,
        F: FnMut(&ProgressReport) -> bool,
    {
        let start = Instant::now();
        let mut last_report = start;
        let mut bytes_read = 0u64;
        let mut lines_processed = 0i64;
        let mut gcodes_processed = 0i64;
        let mut cancelled = false;
        let mut error_message = None;

        for line in lines {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(line = lines_processed + 1, "failed to read gcode: {}", e);
                    error_message = Some(format!(
                        "Failed to read line {}: {}",
                        lines_processed + 1,
                        e
                    ));
                    break;
                }
            };
            bytes_read += line.len() as u64 + 1; // +1 for newline
            lines_processed += 1;

            let command = parse(&line);
            if command.is_empty() {
                // Comment-only lines still drive the feature classifier.
                if !command.comment.is_empty() {
                    self.tracker
                        .update(&command, lines_processed, gcodes_processed);
                }
            } else {
                gcodes_processed += 1;
                self.tracker
                    .update(&command, lines_processed, gcodes_processed);
                self.stabilization
                    .process_position(self.tracker.current(), self.tracker.previous());
            }

            let now = Instant::now();
            if now.duration_since(last_report) >= self.progress_interval {
                last_report = now;
                let report = ProgressReport::new(
                    bytes_read,
                    total_bytes,
                    now.duration_since(start),
                    gcodes_processed,
                    lines_processed,
                );
                if !progress(&report) {
                    tracing::info!(line = lines_processed, "processing cancelled");
                    cancelled = true;
                    break;
                }
            }
        }

        let complete = !cancelled && error_message.is_none();
        let snapshot_plans = if complete {
            self.stabilization.finalize()
        } else {
            self.stabilization.take_plans()
        };

        let mut processing_issues = Vec::new();
        if complete {
            processing_issues = ProcessingIssue::from_final_position(self.tracker.current());
            processing_issues.extend_from_slice(self.stabilization.processing_issues());
        }

        let seconds_elapsed = start.elapsed().as_secs_f64();
        tracing::info!(
            target: SNAPSHOT_PLAN_TARGET,
            plans = snapshot_plans.len(),
            lines = lines_processed,
            gcodes = gcodes_processed,
            seconds = seconds_elapsed,
            "processing finished"
        );

        ProcessResult {
            success: complete,
            cancelled,
            error_message,
            snapshot_plans,
            seconds_elapsed,
            gcodes_processed,
            lines_processed,
            quality_issues: self.stabilization.quality_issues().to_vec(),
            processing_issues,
        }
    }
}
