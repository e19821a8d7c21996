// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Static next-hop forwarding table of a single repeater.
#[derive(Debug, Default)]
pub struct ForwardingTable {
    /// Owner repeater index.
    owner: u32,
    /// Next hop keyed by destination repeater index.
    rules: std::collections::HashMap<u32, u32>,
}

impl ForwardingTable {
    pub fn new(owner: u32) -> Self {
        Self {
            owner,
            rules: std::collections::HashMap::new(),
        }
    }

    /// Add a rule toward a destination. Rules are write-once: re-adding a
    /// destination is a logic error.
    pub fn add_forwarding_rule(&mut self, destination: u32, next_hop: u32) {
        if self.rules.insert(destination, next_hop).is_some() {
            panic!(
                "duplicate forwarding rule for destination {} at repeater {}",
                destination, self.owner
            );
        }
    }

    /// Return the next hop toward a destination, or an error if the table
    /// was never (fully) installed.
    pub fn next_hop(&self, destination: u32) -> anyhow::Result<u32> {
        self.rules.get(&destination).copied().ok_or(anyhow::anyhow!(
            "incomplete routing at repeater {}: no forwarding rule toward {}",
            self.owner,
            destination
        ))
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Next hop from repeater `i` toward repeater `j` on a ring of size `n`:
/// the ring neighbor on the shorter arc, preferring the forward direction
/// (increasing index mod n) on ties.
pub fn ring_next_hop(i: u32, j: u32, n: u32) -> u32 {
    assert!(i != j && i < n && j < n, "invalid repeater pair ({i}, {j})");
    let forward = (n + j - i) % n;
    let backward = n - forward;
    if forward <= backward {
        (i + 1) % n
    } else {
        (i + n - 1) % n
    }
}

/// Build the full set of ring forwarding tables, one per repeater, with
/// exactly one rule per ordered pair of distinct repeaters.
pub fn ring_tables(n: u32) -> Vec<ForwardingTable> {
    let mut tables = vec![];
    for i in 0..n {
        let mut table = ForwardingTable::new(i);
        for j in 0..n {
            if i != j {
                table.add_forwarding_rule(j, ring_next_hop(i, j, n));
            }
        }
        tables.push(table);
    }
    tables
}

/// Write the ring forwarding rules into every repeater of the network.
/// Must be called exactly once per network, before any request is submitted.
pub fn install(network: &mut crate::network::Network) {
    let n = network.topology().num_repeaters();
    for table in ring_tables(n) {
        network.install_forwarding_table(table);
    }
    log::debug!("installed ring forwarding tables for {} repeaters", n);
}
