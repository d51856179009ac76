//! Watches vehicles move through controlled lanes and turns their
//! movements into exit events.

use crate::error::Result;
use crate::registry::{LaneRegistry, NO_LANE};
use crate::session::Simulator;
use crate::TrafficLightId;
use log::{debug, log_enabled, Level};
use smallvec::SmallVec;
use std::collections::HashMap;

/// A vehicle currently inside a watched lane.
struct TrackedVehicle {
    /// The light whose lane the vehicle was last seen on.
    light: TrafficLightId,
    /// The lane it was last seen on.
    lane: String,
}

/// A vehicle leaving a watched lane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneExit {
    /// The vehicle that left.
    pub vehicle: String,
    /// The controlled lane it left.
    pub lane: String,
}

/// Remembers which vehicle sits on which watched lane between ticks.
///
/// Polling cannot see the crossing itself, only the before and after,
/// so exits are inferred: a tracked vehicle whose lane this tick is no
/// longer one of its light's lanes has left through the intersection.
#[derive(Default)]
pub struct VehicleTracker {
    tracked: HashMap<String, TrackedVehicle>,
}

impl VehicleTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of vehicles currently tracked.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Observes one tick.
    ///
    /// Runs the exit pass over the tracked vehicles, then the admission
    /// pass over everything in the network. A vehicle that hops from
    /// one watched light straight to another exits the first and is
    /// admitted at the second within the same call.
    pub fn observe(
        &mut self,
        sim: &mut dyn Simulator,
        registry: &LaneRegistry,
    ) -> Result<Vec<LaneExit>> {
        let exits = self.detect_exits(sim, registry)?;
        self.admit(sim, registry)?;
        Ok(exits)
    }

    /// First pass: every tracked vehicle either stays put, moves within
    /// its light, or exits on the lane it was last seen on.
    fn detect_exits(
        &mut self,
        sim: &mut dyn Simulator,
        registry: &LaneRegistry,
    ) -> Result<Vec<LaneExit>> {
        let mut moved: SmallVec<[(String, String); 8]> = SmallVec::new();
        let mut exits = vec![];

        for (vehicle, tracked) in &self.tracked {
            // A vehicle the simulator no longer answers for has left
            // the network; treat its lane as the empty sentinel.
            let lane = sim
                .vehicle_lane(vehicle)?
                .filter(|lane| !lane.is_empty())
                .unwrap_or_else(|| NO_LANE.to_string());

            if lane == tracked.lane {
                continue;
            }
            if registry.light_of_lane(&lane) == Some(tracked.light) {
                // A lane change within the same intersection.
                moved.push((vehicle.clone(), lane));
            } else {
                exits.push(LaneExit {
                    vehicle: vehicle.clone(),
                    lane: tracked.lane.clone(),
                });
            }
        }

        for (vehicle, lane) in moved {
            if let Some(tracked) = self.tracked.get_mut(&vehicle) {
                tracked.lane = lane;
            }
        }
        for exit in &exits {
            self.tracked.remove(&exit.vehicle);
        }
        Ok(exits)
    }

    /// Second pass: any vehicle on a watched lane that has made some
    /// progress along it is admitted, or has its lane refreshed when it
    /// is already tracked at the same light.
    fn admit(&mut self, sim: &mut dyn Simulator, registry: &LaneRegistry) -> Result<()> {
        for vehicle in sim.vehicle_ids()? {
            let position = sim.vehicle_lane_position(&vehicle)?.unwrap_or(0.0);
            if position <= 0.0 {
                continue;
            }
            let lane = match sim.vehicle_lane(&vehicle)? {
                Some(lane) => lane,
                None => continue,
            };
            let light = match registry.light_of_lane(&lane) {
                Some(light) => light,
                None => continue,
            };
            match self.tracked.get_mut(&vehicle) {
                None => {
                    if log_enabled!(Level::Debug) {
                        debug!(
                            "{vehicle} entered {lane} heading for {}",
                            next_edge(sim, &vehicle)?
                        );
                    }
                    self.tracked.insert(vehicle, TrackedVehicle { light, lane });
                }
                Some(tracked) if tracked.light == light => {
                    tracked.lane = lane;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// The edge the vehicle will take after its current one, or `END` when
/// its route finishes there or the session leaves the index unanswered.
pub(crate) fn next_edge(sim: &mut dyn Simulator, vehicle: &str) -> Result<String> {
    let route = sim.vehicle_route(vehicle)?.unwrap_or_default();
    let next = sim
        .vehicle_route_index(vehicle)?
        .and_then(|index| usize::try_from(index + 1).ok())
        .and_then(|next| route.get(next));
    Ok(next.cloned().unwrap_or_else(|| "END".to_string()))
}
