use anyhow::Context;
use log::{error, info};
use std::net::SocketAddr;
use sumo_flow::{
    aggregate, launch, retime_network_file, Collector, Config, LaneRegistry, Simulator,
    TraciClient, WindowedDataset,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sumo-flow.json".to_string());
    let config = Config::load(&path).with_context(|| format!("reading {path}"))?;

    if let (Some(net_file), Some(durations)) = (&config.net_file, &config.phase_durations) {
        retime_network_file(net_file, &config.traffic_lights, durations)
            .context("retiming the traffic lights")?;
    }

    let sumo = launch(&config.launch)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.launch.port));
    let mut sim = TraciClient::connect(addr, config.connect_timeout())?;

    let registry = LaneRegistry::build(&mut sim, &config.light_ids())?;
    let mut collector = Collector::new(registry, config.sample_period, config.step_budget);

    let outcome = collector.run(&mut sim);

    // Whatever happened, keep the records that were flushed.
    let series = collector.into_series();
    series
        .save(&config.series_path)
        .with_context(|| format!("writing {}", config.series_path.display()))?;
    info!(
        "wrote {} step records to {}",
        series.data.len(),
        config.series_path.display()
    );

    if let Err(err) = outcome {
        error!("run aborted: {err}");
        let _ = sim.close();
        return Err(err.into());
    }

    let dataset = WindowedDataset {
        data: aggregate(&series.data, &config.window),
    };
    dataset
        .save(&config.dataset_path)
        .with_context(|| format!("writing {}", config.dataset_path.display()))?;
    info!(
        "wrote {} windows to {}",
        dataset.data.len(),
        config.dataset_path.display()
    );

    sim.close()?;
    sumo.wait()?;
    Ok(())
}
