//! Re-aggregates the step series into overlapping calendar windows.

use crate::error::Result;
use crate::sampler::StepRecord;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The shape of the window pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowParams {
    /// Window length in simulated seconds.
    pub size: u64,
    /// Spacing between window starts in simulated seconds.
    pub step: u64,
    /// The calendar instant simulated second zero maps to.
    pub epoch: NaiveDateTime,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            size: 1800,
            step: 600,
            epoch: default_epoch(),
        }
    }
}

fn default_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid epoch")
}

/// A step record with its timestamp rendered on the calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedStep {
    pub timestamp: String,
    pub vehicles: Vec<Vec<u32>>,
}

/// One aggregation window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub starttime: String,
    pub endtime: String,
    pub values: Vec<RenderedStep>,
}

/// The windowed dataset as written to disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowedDataset {
    pub data: Vec<WindowRecord>,
}

impl WindowedDataset {
    /// Writes the dataset as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// Cuts the series into overlapping windows.
///
/// Window starts lie on the step grid anchored at the first record, and
/// a window is kept only when it ends at or before the last record, so
/// the output never contains a partially covered window. A record
/// stamped before the first is off the grid and never starts a window,
/// which makes a series loaded from disk safe even when it is not
/// sorted. An empty series produces no windows.
pub fn aggregate(series: &[StepRecord], params: &WindowParams) -> Vec<WindowRecord> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return vec![],
    };

    let mut spans = vec![];
    for record in series {
        let start = record.timestamp;
        let offset = match start.checked_sub(first) {
            Some(offset) => offset,
            None => continue,
        };
        if offset % params.step != 0 {
            continue;
        }
        if start + params.size > last {
            continue;
        }
        spans.push((start, start + params.size));
    }

    spans
        .into_iter()
        .map(|(start, end)| WindowRecord {
            starttime: render_time(params.epoch, start),
            endtime: render_time(params.epoch, end),
            values: series
                .iter()
                .filter(|record| record.timestamp >= start && record.timestamp < end)
                .map(|record| RenderedStep {
                    timestamp: render_time(params.epoch, record.timestamp),
                    vehicles: record.vehicles.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Renders a simulated second on the configured calendar.
fn render_time(epoch: NaiveDateTime, seconds: u64) -> String {
    (epoch + Duration::seconds(seconds as i64))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
