//! Accumulates exit counts and flushes them on the sampling grid.

use crate::error::Result;
use crate::registry::LaneRegistry;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Exit counts for one sampling period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Simulation time of the flush, in whole seconds.
    pub timestamp: u64,
    /// Counts per light in registry order, one slot per lane.
    pub vehicles: Vec<Vec<u32>>,
}

/// The step records produced by a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSeries {
    pub data: Vec<StepRecord>,
}

impl StepSeries {
    /// Writes the series as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Reads a series back from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// Collects exit counts between flushes and projects them onto the
/// registry at every sampling boundary.
pub struct StepSampler {
    /// Seconds of simulated time between flushes.
    period: u64,
    /// Exits per lane since the last flush.
    counts: HashMap<String, u32>,
    /// The time of the last flush. A boundary flushes once even if
    /// several ticks land on the same whole second.
    last_flush: u64,
    series: StepSeries,
}

impl StepSampler {
    pub fn new(period: u64) -> Self {
        Self {
            period,
            counts: HashMap::new(),
            last_flush: 0,
            series: StepSeries::default(),
        }
    }

    /// Records one exit on a lane.
    pub fn record_exit(&mut self, lane: &str) {
        *self.counts.entry(lane.to_string()).or_insert(0) += 1;
    }

    /// Flushes a record if `now` sits on the sampling grid. Time zero
    /// never flushes, and counts carry over until a boundary is hit.
    pub fn sample(&mut self, now: u64, registry: &LaneRegistry) {
        if now == 0 || now % self.period != 0 || now == self.last_flush {
            return;
        }
        let vehicles = registry
            .iter_lights()
            .map(|light| {
                light
                    .lanes
                    .iter()
                    .map(|lane| self.counts.get(lane).copied().unwrap_or(0))
                    .collect()
            })
            .collect();
        debug!("flushed a record at t={now}");
        self.series.data.push(StepRecord {
            timestamp: now,
            vehicles,
        });
        self.counts.clear();
        self.last_flush = now;
    }

    /// The records flushed so far.
    pub fn series(&self) -> &StepSeries {
        &self.series
    }

    /// Consumes the sampler, keeping only the flushed records. Counts
    /// from an unfinished period are discarded.
    pub fn into_series(self) -> StepSeries {
        self.series
    }
}
