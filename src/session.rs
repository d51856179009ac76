use crate::error::Result;

/// The operations a live traffic simulation exposes to the collector.
///
/// Lookup methods return `Ok(None)` when the simulator answers but has no
/// value for the subject, such as a vehicle that left the network between
/// the id-list query and this call. Callers treat that as an ordinary
/// observation. `Err` means the session itself broke and is fatal.
pub trait Simulator {
    /// Gets the current simulation time in seconds.
    fn time(&mut self) -> Result<f64>;

    /// Advances the simulation by one step.
    fn step(&mut self) -> Result<()>;

    /// Gets the ids of all vehicles currently in the network.
    fn vehicle_ids(&mut self) -> Result<Vec<String>>;

    /// Gets the id of the lane the vehicle is on.
    fn vehicle_lane(&mut self, vehicle: &str) -> Result<Option<String>>;

    /// Gets the vehicle's progress along its lane in m.
    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<Option<f64>>;

    /// Gets the edges of the vehicle's route.
    fn vehicle_route(&mut self, vehicle: &str) -> Result<Option<Vec<String>>>;

    /// Gets the index into the route of the edge the vehicle is on.
    fn vehicle_route_index(&mut self, vehicle: &str) -> Result<Option<i32>>;

    /// Gets the ids of the lanes controlled by a traffic light.
    fn controlled_lanes(&mut self, light: &str) -> Result<Option<Vec<String>>>;

    /// Tells the simulator to finish up and shut down.
    fn close(&mut self) -> Result<()>;
}
