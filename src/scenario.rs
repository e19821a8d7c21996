// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use rand::SeedableRng;

use crate::event::{Event, EventData};
use crate::output::Sample;
use std::io::Write;

/// A single simulation scenario: a ring network with one entanglement
/// request between endpoints drawn at the beginning of the run.
pub struct Scenario {
    // internal data structures
    network: crate::network::Network,
    /// Names of the three selected endpoint repeaters.
    endpoints: (String, String, String),

    // configuration
    config: crate::config::Config,
}

fn save_to_dot_file<
    T: petgraph::visit::Data
        + petgraph::visit::IntoNodeReferences
        + petgraph::visit::IntoEdgeReferences
        + petgraph::visit::NodeIndexable
        + petgraph::visit::GraphProp,
>(
    graph: T,
    full_path: &str,
) -> anyhow::Result<()>
where
    <T as petgraph::visit::Data>::EdgeWeight: std::fmt::Display,
    <T as petgraph::visit::Data>::NodeWeight: std::fmt::Display,
{
    let mut dotfile = std::fs::OpenOptions::new()
        .write(true)
        .append(false)
        .create(true)
        .truncate(true)
        .open(full_path)?;
    let _ = writeln!(
        dotfile,
        "{}",
        petgraph::dot::Dot::with_config(&graph, &[petgraph::dot::Config::NodeIndexLabel])
    );
    Ok(())
}

impl Scenario {
    pub fn new(config: crate::config::Config, save_to_dot: bool) -> anyhow::Result<Self> {
        let conf = &config.user_config;
        anyhow::ensure!(conf.duration > 0.0, "vanishing duration");

        // Convert the configuration units to those of the topology.
        let ring_params = crate::topology::RingParams {
            num_repeaters: conf.num_repeaters,
            classical_delay: crate::utils::to_picoseconds(conf.classical_delay),
            classical_distance: conf.classical_distance,
            quantum_attenuation: conf.quantum_attenuation,
            quantum_distance: crate::utils::to_meters(conf.quantum_distance),
        };
        let repeater_weight = crate::topology::NodeWeight {
            memory_qubits: conf.memory_qubits,
            coherence_time: conf.coherence_time,
            raw_fidelity: conf.raw_fidelity,
            swapping_success_prob: conf.swapping_success_prob,
            ..crate::topology::NodeWeight::default_repeater()
        };
        let topology = crate::topology::RingTopology::from_ring_static(
            ring_params,
            repeater_weight,
            crate::topology::NodeWeight::default_relay(),
        )?;

        if save_to_dot {
            save_to_dot_file(topology.graph(), "ring_topology.dot")?;
            anyhow::bail!("saved to Dot files");
        }

        let mut network = crate::network::Network::new(topology, config.seed)?;
        crate::routing::install(&mut network);

        // Draw the three endpoint repeaters.
        let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        let names = network.topology().repeater_names();
        let endpoints =
            crate::selector::select_endpoints(&names, conf.fixed_endpoint, &mut rng)?;

        Ok(Self {
            network,
            endpoints,
            config,
        })
    }

    pub fn endpoints(&self) -> &(String, String, String) {
        &self.endpoints
    }

    /// Run the scenario to completion.
    pub fn run(&mut self) -> anyhow::Result<crate::output::Output> {
        let conf = &self.config.user_config;

        // outputs
        let mut scalar = crate::output::OutputScalar::default();
        scalar.init("latency", crate::output::ScalarMetricType::Avg);
        scalar.init("event_queue_len", crate::output::ScalarMetricType::TimeAvg);
        for name in [
            "bsm_attempts",
            "bsm_successes",
            "swap_successes",
            "swap_failures",
            "purify_rounds",
            "completed_pairs",
        ] {
            scalar.init(name, crate::output::ScalarMetricType::Count);
        }
        let mut series = crate::output::OutputSeries::new(std::collections::HashSet::new());
        series.set_headers("entangled_memories", &["node"]);
        series.set_headers("memory_fidelity", &["node"]);

        // create the event queue and push initial events
        let horizon = crate::utils::to_picoseconds(conf.duration);
        let mut events = crate::event_queue::EventQueue::default();
        events.push(Event::new(horizon, EventData::ExperimentEnd));
        for i in 1..100_u16 {
            events.push(Event::new(
                crate::utils::to_picoseconds(i as f64 * conf.duration / 100.0),
                EventData::Progress(i),
            ));
        }

        // submit the entanglement request between the outer endpoints
        let source = self.network.topology().repeater_index(&self.endpoints.0)?;
        let destination = self.network.topology().repeater_index(&self.endpoints.2)?;
        let request = crate::register::EntanglementRequest {
            source,
            destination,
            start: crate::utils::to_picoseconds(conf.request_start),
            end: crate::utils::to_picoseconds(conf.request_end),
            num_memories: conf.num_memories,
            target_fidelity: conf.target_fidelity,
        };
        for event in self.network.request(0, request)? {
            events.push(event);
        }

        // metrics
        let mut num_events = 0;

        // simulation loop
        let real_now = std::time::Instant::now();
        let mut last_time = 0;
        'main_loop: loop {
            if let Some(event) = events.pop() {
                let now = event.time();

                // make sure we never go back in time
                assert!(now >= last_time);
                last_time = now;

                // count the number of events
                num_events += 1;

                // handle the current event
                match event.data {
                    EventData::ExperimentEnd => {
                        log::debug!("E {}", now);
                        break 'main_loop;
                    }
                    EventData::Progress(percentage) => {
                        log::info!("completed {}%", percentage);
                    }
                    _ => {
                        let (new_events, samples) = self.network.handle(event)?;
                        for event in new_events {
                            events.push(event);
                        }
                        for sample in samples {
                            match sample {
                                Sample::ScalarOneTime(name, value) => {
                                    scalar.one_time(&name, value)
                                }
                                Sample::ScalarAvg(name, value) => scalar.avg(&name, value),
                                Sample::ScalarTimeAvg(name, value) => {
                                    scalar.time_avg(&name, now, value)
                                }
                                Sample::ScalarCount(name) => scalar.count(&name),
                            }
                        }
                    }
                }

                scalar.time_avg("event_queue_len", now, events.len() as f64);
            }
        }
        scalar.finish(last_time);

        // save final metrics
        scalar.one_time("num_events", num_events as f64);
        scalar.one_time("execution_time", real_now.elapsed().as_secs_f64());

        // harvest the memory records of the three endpoints
        for name in [&self.endpoints.0, &self.endpoints.1, &self.endpoints.2] {
            let ndx = self.network.topology().repeater_index(name)?;
            let memories = self.network.memories(ndx);
            for (cnt, time) in crate::metrics::completion_times(memories)
                .iter()
                .enumerate()
            {
                series.add(
                    "entangled_memories",
                    vec![name.clone()],
                    *time,
                    (cnt + 1) as f64,
                );
            }
            for (slot, fidelity) in crate::metrics::memory_fidelities(memories)
                .iter()
                .enumerate()
            {
                series.add("memory_fidelity", vec![name.clone()], slot as f64, *fidelity);
            }
        }

        // return the scenario output
        Ok(crate::output::Output {
            scalar,
            series,
            config_csv: self.config.to_csv(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::user_config::UserConfig;

    fn test_config(seed: u64) -> Config {
        Config {
            seed,
            user_config: UserConfig {
                num_memories: 10,
                fixed_endpoint: Some(0),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_scenario_invalid_config() {
        let mut config = test_config(42);
        config.user_config.duration = 0.0;
        assert!(Scenario::new(config, false).is_err());

        let mut config = test_config(42);
        config.user_config.num_repeaters = 2;
        assert!(Scenario::new(config, false).is_err());

        let mut config = test_config(42);
        config.user_config.fixed_endpoint = Some(4);
        assert!(Scenario::new(config, false).is_err());
    }

    #[test]
    fn test_scenario_endpoints() -> anyhow::Result<()> {
        let scenario = Scenario::new(test_config(42), false)?;
        assert_eq!(
            ("r0".to_string(), "r1".to_string(), "r2".to_string()),
            *scenario.endpoints()
        );

        // Random endpoints are reproducible for a fixed seed.
        let mut config = test_config(42);
        config.user_config.fixed_endpoint = None;
        let first = Scenario::new(config, false)?.endpoints().clone();
        let mut config = test_config(42);
        config.user_config.fixed_endpoint = None;
        let second = Scenario::new(config, false)?.endpoints().clone();
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_scenario_run() -> anyhow::Result<()> {
        let mut scenario = Scenario::new(test_config(42), false)?;
        let output = scenario.run()?;

        // The endpoints must have entangled some of their memories within
        // the reservation window.
        let completions = &output
            .series
            .series
            .get("entangled_memories")
            .unwrap()
            .values;
        assert!(!completions.is_empty());

        let source_times = completions
            .iter()
            .filter(|(labels, _, _)| labels[0] == "r0")
            .map(|(_, time, _)| *time)
            .collect::<Vec<f64>>();
        assert!(!source_times.is_empty());
        assert!(source_times.len() <= 10);
        assert!(source_times.windows(2).all(|w| w[0] <= w[1]));
        let horizon = 3.0;
        assert!(source_times.iter().all(|t| *t >= 1.0 && *t <= horizon));

        // The source and destination records match.
        let destination_times = completions
            .iter()
            .filter(|(labels, _, _)| labels[0] == "r2")
            .map(|(_, time, _)| *time)
            .collect::<Vec<f64>>();
        assert_eq!(source_times, destination_times);

        // One fidelity record per memory qubit, all within [0.25, 1].
        let fidelities = &output.series.series.get("memory_fidelity").unwrap().values;
        assert_eq!(3 * 50, fidelities.len());
        assert!(fidelities
            .iter()
            .all(|(_, _, value)| *value >= 0.25 && *value <= 1.0));

        Ok(())
    }

    #[test]
    fn test_scenario_reproducible() -> anyhow::Result<()> {
        let first = Scenario::new(test_config(42), false)?.run()?;
        let second = Scenario::new(test_config(42), false)?.run()?;
        assert_eq!(
            first.series.series.get("entangled_memories").unwrap().values,
            second.series.series.get("entangled_memories").unwrap().values
        );
        Ok(())
    }
}
