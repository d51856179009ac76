use crate::error::Result;
use crate::registry::LaneRegistry;
use crate::sampler::{StepSampler, StepSeries};
use crate::session::Simulator;
use crate::tracker::VehicleTracker;
use log::info;

/// Runs the observation loop against a session.
pub struct Collector {
    registry: LaneRegistry,
    tracker: VehicleTracker,
    sampler: StepSampler,
    /// Stop once the simulation clock passes this many seconds.
    budget: u64,
}

impl Collector {
    pub fn new(registry: LaneRegistry, period: u64, budget: u64) -> Self {
        Self {
            registry,
            tracker: VehicleTracker::new(),
            sampler: StepSampler::new(period),
            budget,
        }
    }

    /// Observes the simulation until the clock passes the budget.
    ///
    /// The budget is checked before each tick is processed, so the
    /// series never extends past it and an unfinished sampling period
    /// is dropped rather than flushed short.
    ///
    /// On an error the records flushed so far remain available through
    /// [Self::series], so a dead session still yields what it produced.
    pub fn run(&mut self, sim: &mut dyn Simulator) -> Result<()> {
        loop {
            let now = sim.time()?.floor() as u64;
            if now > self.budget {
                break;
            }
            let exits = self.tracker.observe(sim, &self.registry)?;
            for exit in &exits {
                self.sampler.record_exit(&exit.lane);
            }
            self.sampler.sample(now, &self.registry);
            sim.step()?;
        }
        info!(
            "run complete: {} records, {} vehicles still inside",
            self.sampler.series().data.len(),
            self.tracker.len()
        );
        Ok(())
    }

    /// The records flushed so far.
    pub fn series(&self) -> &StepSeries {
        self.sampler.series()
    }

    /// Consumes the collector, returning the step series.
    pub fn into_series(self) -> StepSeries {
        self.sampler.into_series()
    }
}
