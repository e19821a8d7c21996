// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NodeType {
    /// Quantum repeater holding a pool of quantum memories.
    Repeater,
    /// Bell-state-measurement node mediating two adjacent repeaters.
    Relay,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeType::Repeater => "REP",
                NodeType::Relay => "BSM",
            }
        )
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeWeight {
    /// Node type.
    pub node_type: NodeType,
    /// Node name, unique within the topology.
    pub name: String,
    /// Seed for the node's internal randomness.
    pub seed: u64,
    /// Number of memory qubits.
    pub memory_qubits: u32,
    /// Coherence time of a qubit in memory, in s.
    pub coherence_time: f64,
    /// Fidelity of a freshly entangled memory pair.
    pub raw_fidelity: f64,
    /// Entanglement swapping success probability.
    pub swapping_success_prob: f64,
}

impl std::fmt::Display for NodeWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.node_type)
    }
}

impl Default for NodeWeight {
    fn default() -> Self {
        NodeWeight::default_repeater()
    }
}

impl NodeWeight {
    pub fn default_repeater() -> Self {
        Self {
            node_type: NodeType::Repeater,
            name: String::default(),
            seed: 0,
            memory_qubits: 50,
            coherence_time: 10.0,
            raw_fidelity: 0.85,
            swapping_success_prob: 0.5,
        }
    }

    pub fn default_relay() -> Self {
        Self {
            node_type: NodeType::Relay,
            name: String::default(),
            seed: 0,
            memory_qubits: 0,
            coherence_time: 0.0,
            raw_fidelity: 0.0,
            swapping_success_prob: 0.0,
        }
    }

    fn valid(&self) -> anyhow::Result<()> {
        let mut errors = vec![];
        if matches!(self.node_type, NodeType::Repeater) && self.memory_qubits == 0 {
            errors.push(String::from("vanishing memory qubits on a repeater"));
        }
        if matches!(self.node_type, NodeType::Repeater) && self.coherence_time <= 0.0 {
            errors.push(format!("coherence time ({}) <= 0", self.coherence_time));
        }
        if self.raw_fidelity < 0.0 || self.raw_fidelity > 1.0 {
            errors.push(format!("invalid raw fidelity ({})", self.raw_fidelity));
        }
        if self.swapping_success_prob < 0.0 || self.swapping_success_prob > 1.0 {
            errors.push(format!(
                "invalid swapping success probability ({})",
                self.swapping_success_prob
            ));
        }

        if !errors.is_empty() {
            anyhow::bail!("invalid node parameters: {}", errors.join(","))
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeWeight {
    /// Classical channel, with one-way delay in ps and length in m.
    Classical { delay: u64, distance: f64 },
    /// Quantum channel, with attenuation in dB/m and length in m.
    Quantum { attenuation: f64, distance: f64 },
}

impl std::fmt::Display for EdgeWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeWeight::Classical { delay, distance } => {
                write!(f, "cc delay {} ps length {} m", delay, distance)
            }
            EdgeWeight::Quantum {
                attenuation,
                distance,
            } => write!(f, "qc atten {} dB/m length {} m", attenuation, distance),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RingParams {
    /// Number of repeaters in the ring.
    pub num_repeaters: u32,
    /// One-way delay of every classical channel, in ps.
    pub classical_delay: u64,
    /// Length of every classical channel, in m.
    pub classical_distance: f64,
    /// Attenuation of every quantum channel, in dB/m.
    pub quantum_attenuation: f64,
    /// Length of every quantum channel, in m.
    pub quantum_distance: f64,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            num_repeaters: 4,
            classical_delay: 100_000_000,
            classical_distance: 1000.0,
            quantum_attenuation: 3e-5,
            quantum_distance: 1000.0,
        }
    }
}

impl RingParams {
    fn valid(&self) -> anyhow::Result<()> {
        let mut errors = vec![];
        if self.num_repeaters < 3 {
            errors.push(format!(
                "a ring of {} repeaters is ill-defined, at least 3 required",
                self.num_repeaters
            ));
        }
        if self.classical_distance < 0.0 {
            errors.push(format!(
                "classical channel length ({}) < 0",
                self.classical_distance
            ));
        }
        if self.quantum_attenuation < 0.0 {
            errors.push(format!(
                "quantum channel attenuation ({}) < 0",
                self.quantum_attenuation
            ));
        }
        if self.quantum_distance < 0.0 {
            errors.push(format!(
                "quantum channel length ({}) < 0",
                self.quantum_distance
            ));
        }
        if !errors.is_empty() {
            anyhow::bail!("invalid ring topology parameters: {}", errors.join(","))
        }
        Ok(())
    }
}

type Graph = petgraph::Graph<NodeWeight, EdgeWeight, petgraph::Undirected, u32>;

/// Undirected graph representing a ring of quantum repeaters.
///
/// Repeaters `r0..r{n-1}` occupy indices `0..n` and BSM relays `m0..m{n-1}`
/// occupy indices `n..2n`, with relay `i` mediating repeaters `i` and
/// `(i+1) mod n`. Every pair of distinct nodes shares a classical edge and
/// each relay has one quantum edge per mediated repeater.
#[derive(Debug, Default)]
pub struct RingTopology {
    graph: Graph,
    params: RingParams,
}

impl RingTopology {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn params(&self) -> &RingParams {
        &self.params
    }

    /// Build a ring topology where all the repeaters share the same given
    /// characteristics and all the channels the same given parameters.
    ///
    /// Each node gets a distinct deterministic seed equal to its index, so
    /// that two topologies built from the same parameters behave identically.
    pub fn from_ring_static(
        params: RingParams,
        repeater_weight: NodeWeight,
        relay_weight: NodeWeight,
    ) -> anyhow::Result<Self> {
        params.valid()?;
        repeater_weight.valid()?;
        assert!(repeater_weight.node_type == NodeType::Repeater);
        relay_weight.valid()?;
        assert!(relay_weight.node_type == NodeType::Relay);

        let mut graph = petgraph::Graph::new_undirected();
        let n = params.num_repeaters;

        // Add the repeaters.
        for i in 0..n {
            let mut weight = repeater_weight.clone();
            weight.name = format!("r{}", i);
            weight.seed = i as u64;
            graph.add_node(weight);
        }

        // Add the relays, one per adjacent repeater pair in ring order.
        for i in 0..n {
            let mut weight = relay_weight.clone();
            weight.name = format!("m{}", i);
            weight.seed = (n + i) as u64;
            graph.add_node(weight);
        }

        // Add the all-to-all classical edges.
        let classical = EdgeWeight::Classical {
            delay: params.classical_delay,
            distance: params.classical_distance,
        };
        for u in 0..(2 * n) {
            for v in (u + 1)..(2 * n) {
                graph.add_edge(u.into(), v.into(), classical);
            }
        }

        // Add the two quantum edges of each relay.
        let quantum = EdgeWeight::Quantum {
            attenuation: params.quantum_attenuation,
            distance: params.quantum_distance,
        };
        for i in 0..n {
            graph.add_edge((n + i).into(), i.into(), quantum);
            graph.add_edge((n + i).into(), ((i + 1) % n).into(), quantum);
        }

        Ok(Self { graph, params })
    }

    pub fn num_repeaters(&self) -> u32 {
        self.params.num_repeaters
    }

    /// Return the indices of the repeaters, in ring order.
    pub fn repeater_indices(&self) -> Vec<u32> {
        (0..self.params.num_repeaters).collect()
    }

    /// Return the indices of the BSM relays, in ring order.
    pub fn relay_indices(&self) -> Vec<u32> {
        (self.params.num_repeaters..2 * self.params.num_repeaters).collect()
    }

    /// Return the names of the repeaters, in ring order.
    pub fn repeater_names(&self) -> Vec<String> {
        self.repeater_indices()
            .iter()
            .map(|ndx| self.weight(*ndx).name.clone())
            .collect()
    }

    pub fn weight(&self, ndx: u32) -> &NodeWeight {
        self.graph
            .node_weight(ndx.into())
            .unwrap_or_else(|| panic!("there's no node {} in the graph", ndx))
    }

    /// Return the index of the repeater with the given name.
    pub fn repeater_index(&self, name: &str) -> anyhow::Result<u32> {
        for ndx in self.repeater_indices() {
            if self.weight(ndx).name == name {
                return Ok(ndx);
            }
        }
        anyhow::bail!("there's no repeater named {} in the topology", name)
    }

    /// Return the indices of the two repeaters mediated by the given relay.
    pub fn mediated(&self, relay: u32) -> anyhow::Result<(u32, u32)> {
        let n = self.params.num_repeaters;
        anyhow::ensure!(
            relay >= n && relay < 2 * n,
            "node {} is not a relay",
            relay
        );
        let i = relay - n;
        Ok((i, (i + 1) % n))
    }

    /// Return the relay mediating two ring-adjacent repeaters.
    pub fn relay_between(&self, u: u32, v: u32) -> anyhow::Result<u32> {
        let n = self.params.num_repeaters;
        anyhow::ensure!(u < n && v < n, "nodes {} and {} are not repeaters", u, v);
        if (u + 1) % n == v {
            Ok(n + u)
        } else if (v + 1) % n == u {
            Ok(n + v)
        } else {
            anyhow::bail!("repeaters {} and {} are not ring-adjacent", u, v)
        }
    }

    /// Return the one-way delay of the classical channel between two nodes, in ps.
    pub fn classical_delay(&self, u: u32, v: u32) -> anyhow::Result<u64> {
        for edge in self.graph.edges_connecting(u.into(), v.into()) {
            if let EdgeWeight::Classical { delay, .. } = petgraph::visit::EdgeRef::weight(&edge) {
                return Ok(*delay);
            }
        }
        anyhow::bail!("there's no classical channel between {} and {}", u, v)
    }

    /// Return the attenuation (dB/m) and length (m) of the quantum channel
    /// between a repeater and a relay.
    pub fn quantum_channel(&self, repeater: u32, relay: u32) -> anyhow::Result<(f64, f64)> {
        for edge in self.graph.edges_connecting(repeater.into(), relay.into()) {
            if let EdgeWeight::Quantum {
                attenuation,
                distance,
            } = petgraph::visit::EdgeRef::weight(&edge)
            {
                return Ok((*attenuation, *distance));
            }
        }
        anyhow::bail!(
            "there's no quantum channel between {} and {}",
            repeater,
            relay
        )
    }

    pub fn to_dot(&self) -> String {
        format!("{}", petgraph::dot::Dot::new(&self.graph))
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeWeight, RingParams, RingTopology};

    fn test_ring(num_repeaters: u32) -> anyhow::Result<RingTopology> {
        RingTopology::from_ring_static(
            RingParams {
                num_repeaters,
                ..Default::default()
            },
            NodeWeight::default_repeater(),
            NodeWeight::default_relay(),
        )
    }

    #[test]
    fn test_ring_topology_invalid_params() {
        for num_repeaters in 0..3 {
            assert!(test_ring(num_repeaters).is_err());
        }

        assert!(RingTopology::from_ring_static(
            RingParams {
                quantum_distance: -1.0,
                ..Default::default()
            },
            NodeWeight::default_repeater(),
            NodeWeight::default_relay(),
        )
        .is_err());

        assert!(RingTopology::from_ring_static(
            RingParams::default(),
            NodeWeight {
                raw_fidelity: 1.5,
                ..NodeWeight::default_repeater()
            },
            NodeWeight::default_relay(),
        )
        .is_err());
    }

    #[test]
    fn test_ring_topology_shape() -> anyhow::Result<()> {
        for n in 3..=8 {
            let topo = test_ring(n)?;

            assert_eq!((0..n).collect::<Vec<u32>>(), topo.repeater_indices());
            assert_eq!((n..2 * n).collect::<Vec<u32>>(), topo.relay_indices());
            assert_eq!(2 * n as usize, topo.graph().node_count());

            // All-to-all classical mesh plus two quantum edges per relay.
            let expected_edges = (2 * n) * (2 * n - 1) / 2 + 2 * n;
            assert_eq!(expected_edges as usize, topo.graph().edge_count());

            // Every relay mediates exactly two distinct, ring-adjacent repeaters.
            for relay in topo.relay_indices() {
                let (u, v) = topo.mediated(relay)?;
                assert_ne!(u, v);
                assert_eq!((u + 1) % n, v);
                assert_eq!(relay, topo.relay_between(u, v)?);
                assert_eq!(relay, topo.relay_between(v, u)?);
                topo.quantum_channel(u, relay)?;
                topo.quantum_channel(v, relay)?;
            }
        }
        Ok(())
    }

    #[test]
    fn test_ring_topology_names_and_seeds() -> anyhow::Result<()> {
        let topo = test_ring(4)?;

        assert_eq!(vec!["r0", "r1", "r2", "r3"], topo.repeater_names());
        assert_eq!("m2", topo.weight(6).name);
        assert_eq!(2, topo.repeater_index("r2")?);
        assert!(topo.repeater_index("r9").is_err());
        assert!(topo.repeater_index("m0").is_err());

        for ndx in 0..8 {
            assert_eq!(ndx as u64, topo.weight(ndx).seed);
        }
        Ok(())
    }

    #[test]
    fn test_ring_topology_channels() -> anyhow::Result<()> {
        let topo = test_ring(4)?;

        assert_eq!(100_000_000, topo.classical_delay(0, 7)?);
        assert_eq!(100_000_000, topo.classical_delay(2, 3)?);
        assert!(topo.classical_delay(1, 1).is_err());

        let (attenuation, distance) = topo.quantum_channel(0, 4)?;
        assert_float_eq::assert_f64_near!(3e-5, attenuation);
        assert_float_eq::assert_f64_near!(1000.0, distance);

        // No quantum channel between non-mediated pairs.
        assert!(topo.quantum_channel(2, 4).is_err());
        assert!(topo.relay_between(0, 2).is_err());

        println!("{}", topo.to_dot());
        Ok(())
    }
}
