//! End-to-end runs of the collection loop against a scripted session.

use std::collections::HashMap;
use std::io;
use sumo_flow::{
    aggregate, Collector, Error, LaneRegistry, Result, Simulator, StepRecord, WindowParams,
};

/// A scripted stand-in for a live SUMO session.
///
/// Each frame lists the vehicles in the network as (id, lane, lane
/// position); stepping advances to the next frame.
struct ScriptedSim {
    tick: usize,
    frames: Vec<Vec<(&'static str, &'static str, f64)>>,
    controlled: HashMap<&'static str, Vec<String>>,
    /// Cut the connection when the clock reaches this tick.
    fail_at: Option<usize>,
}

impl ScriptedSim {
    fn new(frames: Vec<Vec<(&'static str, &'static str, f64)>>) -> Self {
        let controlled = HashMap::from([
            ("A", vec!["a_0".to_string(), "a_1".to_string()]),
            ("B", vec!["b_0".to_string()]),
        ]);
        Self {
            tick: 0,
            frames,
            controlled,
            fail_at: None,
        }
    }

    fn frame(&self) -> &[(&'static str, &'static str, f64)] {
        self.frames.get(self.tick).expect("script ran out of frames")
    }
}

impl Simulator for ScriptedSim {
    fn time(&mut self) -> Result<f64> {
        if self.fail_at == Some(self.tick) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "the script cut the connection",
            )
            .into());
        }
        Ok(self.tick as f64)
    }

    fn step(&mut self) -> Result<()> {
        self.tick += 1;
        Ok(())
    }

    fn vehicle_ids(&mut self) -> Result<Vec<String>> {
        Ok(self.frame().iter().map(|(id, _, _)| id.to_string()).collect())
    }

    fn vehicle_lane(&mut self, vehicle: &str) -> Result<Option<String>> {
        Ok(self
            .frame()
            .iter()
            .find(|(id, _, _)| *id == vehicle)
            .map(|(_, lane, _)| lane.to_string()))
    }

    fn vehicle_lane_position(&mut self, vehicle: &str) -> Result<Option<f64>> {
        Ok(self
            .frame()
            .iter()
            .find(|(id, _, _)| *id == vehicle)
            .map(|(_, _, position)| *position))
    }

    fn vehicle_route(&mut self, _vehicle: &str) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    fn vehicle_route_index(&mut self, _vehicle: &str) -> Result<Option<i32>> {
        Ok(None)
    }

    fn controlled_lanes(&mut self, light: &str) -> Result<Option<Vec<String>>> {
        Ok(self.controlled.get(light).cloned())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Ten ticks of traffic around two lights, with a light that fails the
/// controlled-lanes query thrown in.
fn script() -> ScriptedSim {
    ScriptedSim::new(vec![
        // t0: the network is still empty.
        vec![("v2", "out_0", 5.0)],
        // t1: v1 appears at the stop line but has not moved yet.
        vec![("v1", "a_0", 0.0), ("v2", "out_0", 9.0)],
        // t2: v1 makes progress, v2 arrives at the other light.
        vec![("v1", "a_0", 3.0), ("v2", "b_0", 1.0)],
        // t3: v1 changes lanes inside its intersection.
        vec![("v1", "a_1", 7.0), ("v2", "b_0", 4.0)],
        // t4: v1 crosses over and leaves the watched lanes.
        vec![("v1", "out_1", 2.0), ("v2", "b_0", 8.0)],
        // t5: v2 finishes its trip and leaves the network.
        vec![("v1", "out_1", 6.0)],
        // t6: quiet.
        vec![],
        // t7: v3 arrives at the first light.
        vec![("v3", "a_0", 2.0)],
        // t8: v3 hops straight from one light to the other.
        vec![("v3", "b_0", 1.0)],
        // t9: still on b_0 when the run ends.
        vec![("v3", "b_0", 5.0)],
    ])
}

fn build_collector(sim: &mut ScriptedSim) -> Collector {
    let lights = [
        "A".to_string(),
        "broken".to_string(),
        "B".to_string(),
    ];
    let registry = LaneRegistry::build(sim, &lights).unwrap();
    Collector::new(registry, 3, 9)
}

/// Runs the whole script and checks every flushed record.
#[test]
fn collects_a_step_series() {
    let mut sim = script();
    let mut collector = build_collector(&mut sim);
    collector.run(&mut sim).unwrap();
    let series = collector.into_series();

    assert_eq!(
        series.data,
        vec![
            // Nothing has crossed yet.
            StepRecord {
                timestamp: 3,
                vehicles: vec![vec![0, 0], vec![0, 0]],
            },
            // v1 left through a_1 at t4, v2 departed from b_0 at t5.
            StepRecord {
                timestamp: 6,
                vehicles: vec![vec![0, 1], vec![1, 0]],
            },
            // v3 hopped from a_0 to the other light at t8.
            StepRecord {
                timestamp: 9,
                vehicles: vec![vec![1, 0], vec![0, 0]],
            },
        ]
    );
}

/// The aggregation step turns the collected series into calendar
/// windows that never reach past the last record.
#[test]
fn aggregates_the_collected_series() {
    let mut sim = script();
    let mut collector = build_collector(&mut sim);
    collector.run(&mut sim).unwrap();
    let series = collector.into_series();

    let params = WindowParams {
        size: 6,
        step: 3,
        ..Default::default()
    };
    let windows = aggregate(&series.data, &params);

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].starttime, "2025-01-01 00:00:03");
    assert_eq!(windows[0].endtime, "2025-01-01 00:00:09");
    let stamps: Vec<_> = windows[0]
        .values
        .iter()
        .map(|value| value.timestamp.as_str())
        .collect();
    assert_eq!(stamps, vec!["2025-01-01 00:00:03", "2025-01-01 00:00:06"]);
    assert_eq!(windows[0].values[1].vehicles, vec![vec![0, 1], vec![1, 0]]);
}

/// A connection lost mid-run is fatal, but the records flushed before
/// the failure survive.
#[test]
fn a_lost_connection_keeps_the_flushed_records() {
    let mut sim = script();
    sim.fail_at = Some(7);
    let mut collector = build_collector(&mut sim);

    let outcome = collector.run(&mut sim);
    assert!(matches!(outcome, Err(Error::Io(_))));

    let series = collector.series();
    assert_eq!(series.data.len(), 2);
    assert_eq!(series.data[0].timestamp, 3);
    assert_eq!(series.data[1].timestamp, 6);
}
