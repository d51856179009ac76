use crate::error::{Error, Result};
use crate::launcher::LaunchOptions;
use crate::window::WindowParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A traffic light to watch, with the number of phases its program
/// cycles through.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrafficLightPlan {
    /// The traffic light id in the SUMO network.
    pub id: String,
    /// The number of phases in its program.
    pub phases: usize,
}

/// Everything a collection run needs, loaded from one JSON document so
/// a run can be reproduced from its configuration file alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The traffic lights to watch, in the order their counts appear
    /// in the output records.
    pub traffic_lights: Vec<TrafficLightPlan>,
    /// Seconds of simulated time between flushed records.
    #[serde(default = "default_sample_period")]
    pub sample_period: u64,
    /// Stop once the simulation clock passes this many seconds.
    #[serde(default = "default_step_budget")]
    pub step_budget: u64,
    /// The shape of the window aggregation pass.
    #[serde(default)]
    pub window: WindowParams,
    /// How to start the simulator.
    pub launch: LaunchOptions,
    /// How long the simulator gets to open its TraCI port.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Where to write the step series.
    #[serde(default = "default_series_path")]
    pub series_path: PathBuf,
    /// Where to write the windowed dataset.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// The network file to retime before launching, if any.
    #[serde(default)]
    pub net_file: Option<PathBuf>,
    /// Green phase durations applied to the configured lights.
    #[serde(default)]
    pub phase_durations: Option<Vec<f64>>,
}

fn default_sample_period() -> u64 {
    30
}

fn default_step_budget() -> u64 {
    75_000
}

fn default_connect_timeout_secs() -> u64 {
    60
}

fn default_series_path() -> PathBuf {
    "State.json".into()
}

fn default_dataset_path() -> PathBuf {
    "State_SKLearn.json".into()
}

impl Config {
    /// Reads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The ids of the watched lights, in configuration order.
    pub fn light_ids(&self) -> Vec<String> {
        self.traffic_lights.iter().map(|plan| plan.id.clone()).collect()
    }

    fn validate(&self) -> Result<()> {
        if self.sample_period == 0 {
            return Err(Error::Config("sample_period must be positive".to_string()));
        }
        if self.window.size == 0 || self.window.step == 0 {
            return Err(Error::Config(
                "window size and step must be positive".to_string(),
            ));
        }
        if self.traffic_lights.is_empty() {
            return Err(Error::Config(
                "at least one traffic light must be configured".to_string(),
            ));
        }
        Ok(())
    }
}
