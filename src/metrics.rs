use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::constants::install::PROGRESS_BATCH_SIZE;

/// Throughput snapshot emitted every `every` records.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressStatus {
    /// Records processed so far (1-based running index).
    pub processed: u64,
    /// Seconds since the reporter started.
    pub elapsed_secs: f64,
    /// `processed / total`, or `None` when no total is known.
    pub fraction: Option<f64>,
    /// Average seconds spent per record.
    pub secs_per_record: f64,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fraction = match self.fraction {
            Some(fraction) => format!("{:.2}%", fraction * 100.0),
            None => "n/a".to_string(),
        };
        write!(
            f,
            "{} in {:.2} s ({}, {:.1e} s / term)",
            format_u64_with_commas(self.processed),
            self.elapsed_secs,
            fraction,
            self.secs_per_record
        )
    }
}

/// Periodic progress observer for long single-pass runs.
///
/// Purely advisory: an inaccurate `total` only skews the completion fraction.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    total: u64,
    every: u64,
    start: Instant,
}

impl ProgressReporter {
    /// Report every `every` records against a precomputed `total`.
    pub fn new(total: u64, every: u64) -> Self {
        Self {
            total,
            every: every.max(1),
            start: Instant::now(),
        }
    }

    /// Reporter using the default batch size.
    pub fn with_total(total: u64) -> Self {
        Self::new(total, PROGRESS_BATCH_SIZE)
    }

    /// Override the start timestamp.
    pub fn with_start(mut self, start: Instant) -> Self {
        self.start = start;
        self
    }

    /// Status for running index `index` observed at `now`, if `index` is on a batch boundary.
    pub fn status_at(&self, index: u64, now: Instant) -> Option<ProgressStatus> {
        if index == 0 || index % self.every != 0 {
            return None;
        }
        let elapsed_secs = now.saturating_duration_since(self.start).as_secs_f64();
        let fraction = if self.total == 0 {
            None
        } else {
            Some(index as f64 / self.total as f64)
        };
        Some(ProgressStatus {
            processed: index,
            elapsed_secs,
            fraction,
            secs_per_record: elapsed_secs / index as f64,
        })
    }

    /// Log a status line when `index` is on a batch boundary.
    pub fn observe(&self, index: u64) -> Option<ProgressStatus> {
        let status = self.status_at(index, Instant::now())?;
        info!("[umls:install] {status}");
        Some(status)
    }
}

/// Format an integer with thousands separators (`1234567` -> `1,234,567`).
pub fn format_u64_with_commas(value: u64) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}
