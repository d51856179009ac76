//! The table of watched traffic lights and the lanes they control.

use crate::error::{Error, Result};
use crate::session::Simulator;
use crate::{LightSet, TrafficLightId};
use itertools::Itertools;
use log::{info, warn};
use slotmap::SlotMap;
use std::collections::HashMap;

/// Slot value for lanes that exist only as padding.
pub const NO_LANE: &str = "-";

/// A watched traffic light.
pub struct TrafficLight {
    /// The id in the SUMO network.
    pub id: String,
    /// The controlled lanes, padded to the registry width.
    pub lanes: Vec<String>,
}

/// The traffic lights under observation.
///
/// Built once per run. Every light's lane list is padded to the width
/// of the widest so downstream records have a rectangular shape; the
/// padding slots hold [NO_LANE] and never resolve to a light.
pub struct LaneRegistry {
    lights: LightSet,
    /// Lights in configuration order.
    order: Vec<TrafficLightId>,
    /// Reverse lookup from lane id, excluding padding. A lane shared
    /// by two lights resolves to the one configured first.
    by_lane: HashMap<String, TrafficLightId>,
}

impl LaneRegistry {
    /// Queries the controlled lanes of every given light.
    ///
    /// A light the simulator cannot answer for is skipped with a
    /// warning; the build fails only if that leaves nothing to watch.
    pub fn build(sim: &mut dyn Simulator, light_ids: &[String]) -> Result<Self> {
        let mut lights = vec![];
        for light_id in light_ids {
            match sim.controlled_lanes(light_id)? {
                Some(lanes) if !lanes.is_empty() => lights.push((light_id.clone(), lanes)),
                _ => warn!("traffic light {light_id} reported no controlled lanes, skipping it"),
            }
        }
        let registry = Self::from_lights(lights)?;
        info!(
            "watching {} traffic lights, {} lanes each after padding",
            registry.len(),
            registry.width()
        );
        Ok(registry)
    }

    /// Builds the registry from explicit lane lists.
    pub fn from_lights(lights: Vec<(String, Vec<String>)>) -> Result<Self> {
        if lights.is_empty() {
            return Err(Error::EmptyRegistry);
        }
        let mut set: LightSet = SlotMap::with_key();
        let mut order = vec![];
        for (id, lanes) in lights {
            let lanes = lanes.into_iter().unique().collect();
            order.push(set.insert(TrafficLight { id, lanes }));
        }
        let mut registry = Self {
            lights: set,
            order,
            by_lane: HashMap::new(),
        };
        registry.normalize();
        Ok(registry)
    }

    /// Pads every lane list to the widest and fills the reverse lookup.
    fn normalize(&mut self) {
        let width = self
            .order
            .iter()
            .map(|id| self.lights[*id].lanes.len())
            .max()
            .unwrap_or(0);
        self.by_lane.clear();
        for id in &self.order {
            let light = &mut self.lights[*id];
            for lane in light.lanes.iter().filter(|lane| lane.as_str() != NO_LANE) {
                self.by_lane.entry(lane.clone()).or_insert(*id);
            }
            light.lanes.resize(width, NO_LANE.to_string());
        }
    }

    /// The number of lane slots every light is padded to.
    pub fn width(&self) -> usize {
        self.order
            .first()
            .map(|id| self.lights[*id].lanes.len())
            .unwrap_or(0)
    }

    /// The number of watched lights.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The lights in configuration order.
    pub fn iter_lights(&self) -> impl Iterator<Item = &TrafficLight> {
        self.order.iter().map(|id| &self.lights[*id])
    }

    /// Gets a watched light.
    pub fn light(&self, id: TrafficLightId) -> &TrafficLight {
        &self.lights[id]
    }

    /// Looks up the light controlling a lane. Padding never resolves.
    pub fn light_of_lane(&self, lane: &str) -> Option<TrafficLightId> {
        self.by_lane.get(lane).copied()
    }
}
