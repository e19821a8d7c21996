// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use rand::Rng;
use rand::SeedableRng;
use rand_distr::Distribution;

use crate::memory::MemoryArray;
use crate::routing::ForwardingTable;

#[derive(Debug)]
pub enum NodeKind {
    /// Quantum repeater: owns the memory pool and the static routing table.
    Repeater {
        memories: MemoryArray,
        routing: ForwardingTable,
        /// R.v. for entanglement swapping outcomes.
        rv_swap: rand_distr::Bernoulli,
    },
    /// BSM relay mediating two repeaters.
    Relay {
        left: u32,
        right: u32,
        /// R.v. for Bell-state measurement outcomes.
        rv_bsm: rand_distr::Bernoulli,
    },
}

/// A runtime network node.
pub struct Node {
    /// Node's identifier.
    node_id: u32,
    /// Node's name.
    name: String,
    kind: NodeKind,
    /// Pseudo-random number generator, seeded deterministically per node.
    rng: rand::rngs::StdRng,
}

impl Node {
    pub fn new_repeater(
        node_id: u32,
        name: &str,
        seed: u64,
        memories: MemoryArray,
        swapping_success_prob: f64,
    ) -> Self {
        let rv_swap = rand_distr::Bernoulli::new(swapping_success_prob)
            .expect("could not create a Bernoulli rv");
        Self {
            node_id,
            name: name.to_string(),
            kind: NodeKind::Repeater {
                memories,
                routing: ForwardingTable::new(node_id),
                rv_swap,
            },
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn new_relay(
        node_id: u32,
        name: &str,
        seed: u64,
        left: u32,
        right: u32,
        bsm_success_prob: f64,
    ) -> Self {
        let rv_bsm =
            rand_distr::Bernoulli::new(bsm_success_prob).expect("could not create a Bernoulli rv");
        Self {
            node_id,
            name: name.to_string(),
            kind: NodeKind::Relay {
                left,
                right,
                rv_bsm,
            },
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_repeater(&self) -> bool {
        matches!(self.kind, NodeKind::Repeater { .. })
    }

    /// Return the memory pool. Panic if the node is a relay.
    pub fn memories(&self) -> &MemoryArray {
        match &self.kind {
            NodeKind::Repeater { memories, .. } => memories,
            NodeKind::Relay { .. } => panic!("node {} is a relay and has no memories", self.name),
        }
    }

    pub fn memories_mut(&mut self) -> &mut MemoryArray {
        match &mut self.kind {
            NodeKind::Repeater { memories, .. } => memories,
            NodeKind::Relay { .. } => panic!("node {} is a relay and has no memories", self.name),
        }
    }

    /// Return the routing table. Panic if the node is a relay.
    pub fn routing(&self) -> &ForwardingTable {
        match &self.kind {
            NodeKind::Repeater { routing, .. } => routing,
            NodeKind::Relay { .. } => {
                panic!("node {} is a relay and does not forward", self.name)
            }
        }
    }

    pub fn routing_mut(&mut self) -> &mut ForwardingTable {
        match &mut self.kind {
            NodeKind::Repeater { routing, .. } => routing,
            NodeKind::Relay { .. } => {
                panic!("node {} is a relay and does not forward", self.name)
            }
        }
    }

    /// The two repeaters this relay mediates. Panic if the node is a repeater.
    pub fn mediated(&self) -> (u32, u32) {
        match &self.kind {
            NodeKind::Relay { left, right, .. } => (*left, *right),
            NodeKind::Repeater { .. } => {
                panic!("node {} is a repeater and mediates nothing", self.name)
            }
        }
    }

    /// Draw a Bell-state measurement outcome. Panic if the node is a repeater.
    pub fn draw_bsm(&mut self) -> bool {
        match &self.kind {
            NodeKind::Relay { rv_bsm, .. } => rv_bsm.sample(&mut self.rng),
            NodeKind::Repeater { .. } => {
                panic!("node {} is a repeater and performs no BSM", self.name)
            }
        }
    }

    /// Draw an entanglement swapping outcome. Panic if the node is a relay.
    pub fn draw_swap(&mut self) -> bool {
        match &self.kind {
            NodeKind::Repeater { rv_swap, .. } => rv_swap.sample(&mut self.rng),
            NodeKind::Relay { .. } => panic!("node {} is a relay and does not swap", self.name),
        }
    }

    /// Draw a Boolean with the given probability from the node's generator.
    pub fn draw_bool(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArray;

    #[test]
    fn test_node_accessors() {
        let repeater = Node::new_repeater(0, "r0", 0, MemoryArray::new(10), 0.5);
        assert!(repeater.is_repeater());
        assert_eq!(10, repeater.memories().len());
        assert!(repeater.routing().is_empty());

        let relay = Node::new_relay(4, "m0", 4, 0, 1, 0.5);
        assert!(!relay.is_repeater());
        assert_eq!((0, 1), relay.mediated());
    }

    #[test]
    fn test_node_deterministic_draws() {
        let mut a = Node::new_relay(4, "m0", 42, 0, 1, 0.5);
        let mut b = Node::new_relay(4, "m0", 42, 0, 1, 0.5);
        for _ in 0..100 {
            assert_eq!(a.draw_bsm(), b.draw_bsm());
        }

        // Degenerate probabilities are deterministic.
        let mut never = Node::new_repeater(0, "r0", 0, MemoryArray::new(1), 0.0);
        let mut always = Node::new_repeater(0, "r0", 0, MemoryArray::new(1), 1.0);
        for _ in 0..10 {
            assert!(!never.draw_swap());
            assert!(always.draw_swap());
        }
    }

    #[test]
    #[should_panic]
    fn test_node_relay_has_no_memories() {
        Node::new_relay(4, "m0", 4, 0, 1, 0.5).memories();
    }
}
