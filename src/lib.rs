//! Drives a SUMO traffic simulation over the TraCI protocol and turns
//! vehicle movements at controlled intersections into time-windowed
//! traffic flow datasets.

pub use collector::Collector;
pub use config::{Config, TrafficLightPlan};
pub use error::{Error, Result};
pub use launcher::{launch, LaunchOptions, SumoProcess};
pub use phases::{expand_durations, retime_network_file, rewrite_network};
pub use registry::{LaneRegistry, NO_LANE, TrafficLight};
pub use sampler::{StepRecord, StepSampler, StepSeries};
pub use session::Simulator;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use traci::TraciClient;
pub use tracker::{LaneExit, VehicleTracker};
pub use window::{aggregate, RenderedStep, WindowedDataset, WindowParams, WindowRecord};

mod collector;
mod config;
mod error;
mod launcher;
mod phases;
mod registry;
mod sampler;
mod session;
mod traci;
mod tracker;
mod window;

new_key_type! {
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type LightSet = SlotMap<TrafficLightId, TrafficLight>;
