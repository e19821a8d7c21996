// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::event::{Event, EventData, Message};
use crate::memory::{MemoryArray, MemoryParam};
use crate::output::Sample;
use crate::register::{EntanglementRequest, Reservation, Segment, SlotState};
use crate::topology::{NodeType, RingTopology};

/// Stride mixed into the scenario seed to derive per-node seeds. For the
/// default scenario seed the node seed reduces to the node index.
static SEED_STRIDE: u64 = 0x9E3779B97F4A7C15;

fn node_seed(scenario_seed: u64, node_index: u64) -> u64 {
    scenario_seed.wrapping_mul(SEED_STRIDE).wrapping_add(node_index)
}

/// The runtime quantum network: node instances built from the topology, the
/// reservation register, and the event handlers of the entanglement
/// distribution protocol.
pub struct Network {
    topology: RingTopology,
    /// The network nodes, with compact identifiers from 0 matching the
    /// topology indices.
    nodes: Vec<crate::node::Node>,
    /// One-way classical channel delay, in ps, uniform across the mesh.
    cc_delay: u64,
    /// Request submitted and traveling toward its destination.
    pending_request: Option<EntanglementRequest>,
    /// The accepted reservation, if any.
    reservation: Option<Reservation>,
}

impl Network {
    /// Create a network from the ring topology. Repeaters get their memory
    /// pool configured with the topology's tunables, relays get their BSM
    /// success probability from the two quantum channels feeding them.
    pub fn new(topology: RingTopology, scenario_seed: u64) -> anyhow::Result<Self> {
        let mut nodes = vec![];
        for ndx in 0..topology.graph().node_count() as u32 {
            let weight = topology.weight(ndx);
            let seed = node_seed(scenario_seed, weight.seed);
            match weight.node_type {
                NodeType::Repeater => {
                    let mut memories = MemoryArray::new(weight.memory_qubits);
                    memories.update_params(MemoryParam::CoherenceTime(weight.coherence_time));
                    memories.update_params(MemoryParam::RawFidelity(weight.raw_fidelity));
                    nodes.push(crate::node::Node::new_repeater(
                        ndx,
                        &weight.name,
                        seed,
                        memories,
                        weight.swapping_success_prob,
                    ));
                }
                NodeType::Relay => {
                    let (left, right) = topology.mediated(ndx)?;
                    let (attenuation, distance_a) = topology.quantum_channel(left, ndx)?;
                    let (_, distance_b) = topology.quantum_channel(right, ndx)?;
                    let bsm_success_prob =
                        crate::fidelity::bsm_success(attenuation, distance_a, distance_b);
                    nodes.push(crate::node::Node::new_relay(
                        ndx,
                        &weight.name,
                        seed,
                        left,
                        right,
                        bsm_success_prob,
                    ));
                }
            }
        }

        let cc_delay = topology.params().classical_delay;
        Ok(Self {
            topology,
            nodes,
            cc_delay,
            pending_request: None,
            reservation: None,
        })
    }

    pub fn topology(&self) -> &RingTopology {
        &self.topology
    }

    pub fn node(&self, node_id: u32) -> &crate::node::Node {
        &self.nodes[node_id as usize]
    }

    pub fn memories(&self, node_id: u32) -> &MemoryArray {
        self.nodes[node_id as usize].memories()
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Install a repeater's forwarding table. Installing twice on the same
    /// repeater is a logic error.
    pub fn install_forwarding_table(&mut self, table: crate::routing::ForwardingTable) {
        let routing = self.nodes[table.owner() as usize].routing_mut();
        assert!(
            routing.is_empty(),
            "forwarding table already installed at repeater {}",
            table.owner()
        );
        *routing = table;
    }

    /// Submit the entanglement request on behalf of its source repeater.
    /// Fire-and-forget: the effects are observed after the run through the
    /// memory records. Return the initial signaling event.
    pub fn request(&mut self, now: u64, request: EntanglementRequest) -> anyhow::Result<Vec<Event>> {
        let num_repeaters = self.topology.num_repeaters();
        let memory_qubits = if request.source < num_repeaters {
            self.nodes[request.source as usize].memories().len() as u32
        } else {
            0
        };
        request.valid(num_repeaters, memory_qubits)?;
        anyhow::ensure!(
            self.pending_request.is_none() && self.reservation.is_none(),
            "a reservation is already in place"
        );

        log::info!(
            "requesting {} pairs at fidelity {} from {} to {}",
            request.num_memories,
            request.target_fidelity,
            self.nodes[request.source as usize].name(),
            self.nodes[request.destination as usize].name()
        );

        let events = vec![Event::new(
            now,
            EventData::Message(request.source, Message::Reserve(vec![])),
        )];
        self.pending_request = Some(request);
        Ok(events)
    }

    /// Handle a protocol event, returning the events it triggers and the
    /// metric samples it produces.
    pub fn handle(&mut self, event: Event) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let now = event.time();
        match event.data {
            EventData::Message(to, msg) => match msg {
                Message::Reserve(path) => self.handle_reserve(now, to, path),
                Message::Accept(path, hop) => self.handle_accept(now, to, path, hop),
            },
            EventData::StartGeneration => self.handle_start_generation(now),
            EventData::Photons { slot, segment } => self.handle_photons(now, slot, segment),
            EventData::Herald {
                slot,
                segment,
                success,
            } => self.handle_herald(now, slot, segment, success),
            EventData::SwapRound { slot } => self.handle_swap_round(now, slot),
            EventData::PurifyRound { slot } => self.handle_purify_round(now, slot),
            _ => panic!("invalid event {:?} received by the network", event.data),
        }
    }

    /// A reservation request reaches a repeater: append it to the path and
    /// either forward toward the destination or answer back.
    fn handle_reserve(
        &mut self,
        now: u64,
        at: u32,
        mut path: Vec<u32>,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let request = self
            .pending_request
            .as_ref()
            .expect("reservation signaling without a pending request");
        path.push(at);

        if at == request.destination {
            log::debug!(
                "reservation reached {} over path {:?}",
                self.nodes[at as usize].name(),
                path
            );
            let hop = path.len() - 2;
            let to = path[hop];
            let delay = self.topology.classical_delay(at, to)?;
            Ok((
                vec![Event::new(
                    now + delay,
                    EventData::Message(to, Message::Accept(path, hop)),
                )],
                vec![],
            ))
        } else {
            let next = self.nodes[at as usize].routing().next_hop(request.destination)?;
            let delay = self.topology.classical_delay(at, next)?;
            Ok((
                vec![Event::new(
                    now + delay,
                    EventData::Message(next, Message::Reserve(path)),
                )],
                vec![],
            ))
        }
    }

    /// The acceptance retraces the path; at the source the reservation is
    /// created and generation scheduled.
    fn handle_accept(
        &mut self,
        now: u64,
        at: u32,
        path: Vec<u32>,
        hop: usize,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        assert_eq!(at, path[hop]);

        if hop > 0 {
            let to = path[hop - 1];
            let delay = self.topology.classical_delay(at, to)?;
            return Ok((
                vec![Event::new(
                    now + delay,
                    EventData::Message(to, Message::Accept(path, hop - 1)),
                )],
                vec![],
            ));
        }

        let request = self
            .pending_request
            .take()
            .expect("acceptance without a pending request");
        assert_eq!(request.source, at);

        let mut segments = vec![];
        for pair in path.windows(2) {
            let relay = self.topology.relay_between(pair[0], pair[1])?;
            let (_, distance_a) = self.topology.quantum_channel(pair[0], relay)?;
            let (_, distance_b) = self.topology.quantum_channel(pair[1], relay)?;
            segments.push(Segment {
                relay,
                flight: std::cmp::max(
                    crate::utils::flight_time(distance_a),
                    crate::utils::flight_time(distance_b),
                ),
            });
        }

        let start = std::cmp::max(request.start, now);
        log::debug!(
            "reservation accepted over path {:?}, generation starts at {}",
            path,
            start
        );
        self.reservation = Some(Reservation::new(request, path, segments));
        Ok((vec![Event::new(start, EventData::StartGeneration)], vec![]))
    }

    /// Kick off one generation attempt per slot and segment.
    fn handle_start_generation(&mut self, now: u64) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let res = self
            .reservation
            .as_mut()
            .expect("generation without a reservation");
        res.started = Some(now);

        let mut events = vec![];
        for slot in 0..res.num_slots() {
            for (segment, seg) in res.segments.iter().enumerate() {
                events.push(Event::new(
                    now + seg.flight,
                    EventData::Photons { slot, segment },
                ));
            }
        }
        log::debug!(
            "generation started at {} for {} slots over {} segments",
            now,
            res.num_slots(),
            res.num_segments()
        );
        Ok((events, vec![]))
    }

    /// Photons from both repeaters of a segment reach the mediating relay,
    /// which draws the measurement outcome and heralds it back.
    fn handle_photons(
        &mut self,
        now: u64,
        slot: usize,
        segment: usize,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let relay = self
            .reservation
            .as_ref()
            .expect("generation without a reservation")
            .segments[segment]
            .relay;
        let success = self.nodes[relay as usize].draw_bsm();

        let mut samples = vec![Sample::ScalarCount("bsm_attempts".to_string())];
        if success {
            samples.push(Sample::ScalarCount("bsm_successes".to_string()));
        }
        Ok((
            vec![Event::new(
                now + self.cc_delay,
                EventData::Herald {
                    slot,
                    segment,
                    success,
                },
            )],
            samples,
        ))
    }

    /// The measurement outcome reaches the segment's repeaters: on success
    /// the end memories are stamped, on failure the attempt is repeated
    /// while the reservation window allows.
    fn handle_herald(
        &mut self,
        now: u64,
        slot: usize,
        segment: usize,
        success: bool,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        if !success {
            let res = self
                .reservation
                .as_ref()
                .expect("generation without a reservation");
            if now < res.request.end {
                return Ok((
                    vec![Event::new(
                        now + res.segments[segment].flight,
                        EventData::Photons { slot, segment },
                    )],
                    vec![],
                ));
            }
            log::debug!("reservation window expired, slot {} gives up", slot);
            return Ok((vec![], vec![]));
        }

        let (a, b) = {
            let res = self
                .reservation
                .as_ref()
                .expect("generation without a reservation");
            (res.path[segment], res.path[segment + 1])
        };
        let raw_fidelity = self.nodes[a as usize].memories().raw_fidelity();
        self.nodes[a as usize].memories_mut().stamp(slot, now, raw_fidelity);
        self.nodes[b as usize].memories_mut().stamp(slot, now, raw_fidelity);

        let res = self.reservation.as_mut().unwrap();
        if !res.segment_generated(slot, segment, now, raw_fidelity) {
            return Ok((vec![], vec![]));
        }

        if res.num_segments() == 1 {
            // Nothing to swap, the segment pair is already end-to-end.
            res.set_purifying(slot, raw_fidelity, now);
            return self.advance_purification(now, slot);
        }

        res.begin_swapping(slot);
        Ok((
            vec![Event::new(
                now + self.cc_delay,
                EventData::SwapRound { slot },
            )],
            vec![],
        ))
    }

    /// All segments of a slot hold a pair: every intermediate repeater
    /// attempts its swap. On success the decayed segment fidelities combine
    /// into one end-to-end pair, on failure the slot regenerates.
    fn handle_swap_round(
        &mut self,
        now: u64,
        slot: usize,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let (pairs, intermediates, source) = {
            let res = self
                .reservation
                .as_ref()
                .expect("swap round without a reservation");
            assert_eq!(SlotState::Swapping, *res.state(slot));
            let pairs = (0..res.num_segments())
                .map(|segment| res.segment_pair(slot, segment).clone().unwrap())
                .collect::<Vec<_>>();
            let intermediates = res.path[1..res.path.len() - 1].to_vec();
            (pairs, intermediates, res.path[0])
        };

        let mut success = true;
        for repeater in &intermediates {
            if !self.nodes[*repeater as usize].draw_swap() {
                success = false;
            }
        }

        if !success {
            let events = self.reset_slot(now, slot);
            return Ok((events, vec![Sample::ScalarCount("swap_failures".to_string())]));
        }

        let coherence_time = self.nodes[source as usize].memories().coherence_time();
        let decay = |pair: &crate::register::SegmentPair| {
            crate::fidelity::decayed(
                pair.fidelity,
                crate::utils::to_seconds(now - pair.created),
                coherence_time,
            )
        };
        let mut fidelity = decay(&pairs[0]);
        for pair in &pairs[1..] {
            fidelity = crate::fidelity::swapped(fidelity, decay(pair));
        }

        self.reservation
            .as_mut()
            .unwrap()
            .set_purifying(slot, fidelity, now);
        let (events, mut samples) = self.advance_purification(now, slot)?;
        samples.push(Sample::ScalarCount("swap_successes".to_string()));
        Ok((events, samples))
    }

    /// One BBPSSW round on the end-to-end pair of a slot: success raises the
    /// fidelity, failure destroys the pair and the slot regenerates.
    fn handle_purify_round(
        &mut self,
        now: u64,
        slot: usize,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let (fidelity, updated, source) = {
            let res = self
                .reservation
                .as_ref()
                .expect("purification without a reservation");
            match res.state(slot) {
                SlotState::Purifying { fidelity, updated } => (*fidelity, *updated, res.path[0]),
                state => panic!("purification round on a slot in state {:?}", state),
            }
        };

        let coherence_time = self.nodes[source as usize].memories().coherence_time();
        let fidelity = crate::fidelity::decayed(
            fidelity,
            crate::utils::to_seconds(now - updated),
            coherence_time,
        );
        let success_prob = crate::fidelity::purify_success(fidelity, fidelity);
        let success = self.nodes[source as usize].draw_bool(success_prob);

        let mut samples = vec![Sample::ScalarCount("purify_rounds".to_string())];
        if success {
            let purified = crate::fidelity::purified(fidelity, fidelity);
            self.reservation
                .as_mut()
                .unwrap()
                .set_purifying(slot, purified, now);
            let (events, more_samples) = self.advance_purification(now, slot)?;
            samples.extend(more_samples);
            Ok((events, samples))
        } else {
            let events = self.reset_slot(now, slot);
            Ok((events, samples))
        }
    }

    /// Complete the slot if its end-to-end fidelity reached the target,
    /// otherwise schedule the next purification round.
    fn advance_purification(
        &mut self,
        now: u64,
        slot: usize,
    ) -> anyhow::Result<(Vec<Event>, Vec<Sample>)> {
        let (fidelity, target, source, destination, started, end) = {
            let res = self
                .reservation
                .as_ref()
                .expect("purification without a reservation");
            let fidelity = match res.state(slot) {
                SlotState::Purifying { fidelity, .. } => *fidelity,
                state => panic!("cannot advance purification in state {:?}", state),
            };
            (
                fidelity,
                res.request.target_fidelity,
                res.path[0],
                *res.path.last().unwrap(),
                res.started.expect("purification before generation started"),
                res.request.end,
            )
        };

        if fidelity >= target {
            self.nodes[source as usize].memories_mut().stamp(slot, now, fidelity);
            self.nodes[destination as usize]
                .memories_mut()
                .stamp(slot, now, fidelity);
            self.reservation.as_mut().unwrap().done(slot);
            log::debug!("slot {} completed at {} with fidelity {}", slot, now, fidelity);
            return Ok((
                vec![],
                vec![
                    Sample::ScalarCount("completed_pairs".to_string()),
                    Sample::ScalarAvg(
                        "latency".to_string(),
                        crate::utils::to_seconds(now - started),
                    ),
                ],
            ));
        }

        if now < end {
            // One two-way classical exchange per round.
            return Ok((
                vec![Event::new(
                    now + 2 * self.cc_delay,
                    EventData::PurifyRound { slot },
                )],
                vec![],
            ));
        }
        log::debug!("reservation window expired, slot {} gives up", slot);
        Ok((vec![], vec![]))
    }

    /// Throw away the pairs of a slot and restart its generation, if the
    /// reservation window allows.
    fn reset_slot(&mut self, now: u64, slot: usize) -> Vec<Event> {
        let res = self
            .reservation
            .as_mut()
            .expect("reset without a reservation");
        res.reset(slot);
        if now < res.request.end {
            res.segments
                .iter()
                .enumerate()
                .map(|(segment, seg)| {
                    Event::new(now + seg.flight, EventData::Photons { slot, segment })
                })
                .collect()
        } else {
            log::debug!("reservation window expired, slot {} gives up", slot);
            vec![]
        }
    }
}
