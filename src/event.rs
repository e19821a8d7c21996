// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Classical messages exchanged between repeaters along the forwarding path.
#[derive(Debug, Clone)]
pub enum Message {
    /// Reservation request traveling toward the destination, accumulating
    /// the repeater path hop by hop.
    Reserve(Vec<u32>),
    /// Acceptance retracing the path toward the source. The second field is
    /// the position along the path of the repeater receiving it.
    Accept(Vec<u32>, usize),
}

/// What happens when an event fires.
#[derive(Debug, Clone)]
pub enum EventData {
    /// The simulation ends.
    ExperimentEnd,
    /// Print progress.
    Progress(u16),
    /// A classical message is delivered to a node.
    Message(u32, Message),
    /// Entanglement generation starts for the accepted reservation.
    StartGeneration,
    /// The photons of a generation attempt reach the mediating relay.
    Photons { slot: usize, segment: usize },
    /// The relay's measurement outcome reaches the segment's repeaters.
    Herald {
        slot: usize,
        segment: usize,
        success: bool,
    },
    /// All segments of a slot are entangled and the swap is attempted.
    SwapRound { slot: usize },
    /// One purification round is attempted on an end-to-end pair.
    PurifyRound { slot: usize },
}

/// An event scheduled to occur at an absolute simulated time, in ps.
#[derive(Debug)]
pub struct Event {
    time: u64,
    pub data: EventData,
}

impl Event {
    pub fn new(time: u64, data: EventData) -> Self {
        Self { time, data }
    }

    pub fn time(&self) -> u64 {
        self.time
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for Event {}

#[allow(clippy::non_canonical_partial_ord_impl)]
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        other.time.partial_cmp(&self.time)
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}
