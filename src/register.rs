// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// A time-windowed demand for entangled memory pairs between two repeaters.
#[derive(Debug, Clone, PartialEq)]
pub struct EntanglementRequest {
    /// Source repeater index.
    pub source: u32,
    /// Destination repeater index.
    pub destination: u32,
    /// Earliest start of entanglement generation, in ps.
    pub start: u64,
    /// End of the reservation window, in ps.
    pub end: u64,
    /// Number of memory pairs requested.
    pub num_memories: usize,
    /// Minimum end-to-end fidelity.
    pub target_fidelity: f64,
}

impl EntanglementRequest {
    pub fn valid(&self, num_repeaters: u32, memory_qubits: u32) -> anyhow::Result<()> {
        let mut errors = vec![];
        if self.source >= num_repeaters {
            errors.push(format!("unknown source repeater ({})", self.source));
        }
        if self.destination >= num_repeaters {
            errors.push(format!(
                "unknown destination repeater ({})",
                self.destination
            ));
        }
        if self.source == self.destination {
            errors.push(format!(
                "source and destination coincide ({})",
                self.source
            ));
        }
        if self.start >= self.end {
            errors.push(format!(
                "empty reservation window [{}, {}]",
                self.start, self.end
            ));
        }
        if self.num_memories == 0 || self.num_memories > memory_qubits as usize {
            errors.push(format!(
                "requested memories ({}) outside [1, {}]",
                self.num_memories, memory_qubits
            ));
        }
        if self.target_fidelity < 0.0 || self.target_fidelity > 1.0 {
            errors.push(format!(
                "invalid target fidelity ({})",
                self.target_fidelity
            ));
        }
        if !errors.is_empty() {
            anyhow::bail!("invalid entanglement request: {}", errors.join(","))
        }
        Ok(())
    }
}

/// One ring segment of the reservation path.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Index of the mediating relay.
    pub relay: u32,
    /// Photon flight time from the repeaters to the relay, in ps.
    pub flight: u64,
}

/// An elementary pair held by the two repeaters of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPair {
    /// Time when the pair was heralded, in ps.
    pub created: u64,
    /// Fidelity at creation.
    pub fidelity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    /// Elementary pairs are being generated segment by segment.
    Generating,
    /// All segments hold a pair and a swap round is pending.
    Swapping,
    /// An end-to-end pair exists with the given fidelity, last updated at
    /// the given time.
    Purifying { fidelity: f64, updated: u64 },
    /// The end-to-end pair reached the target fidelity.
    Done,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    segments: Vec<Option<SegmentPair>>,
}

/// Bookkeeping of the single reservation driven through the network: the
/// repeater path, its segments, and the per-slot generation state.
#[derive(Debug)]
pub struct Reservation {
    pub request: EntanglementRequest,
    /// Repeater indices from source to destination.
    pub path: Vec<u32>,
    /// One segment per consecutive repeater pair along the path.
    pub segments: Vec<Segment>,
    /// Time when generation started, in ps.
    pub started: Option<u64>,
    slots: Vec<Slot>,
}

impl Reservation {
    pub fn new(request: EntanglementRequest, path: Vec<u32>, segments: Vec<Segment>) -> Self {
        assert!(path.len() >= 2, "reservation path too short: {:?}", path);
        assert_eq!(path.len() - 1, segments.len());
        assert_eq!(request.source, path[0]);
        assert_eq!(request.destination, *path.last().unwrap());

        let num_memories = request.num_memories;
        let num_segments = segments.len();
        Self {
            request,
            path,
            segments,
            started: None,
            slots: (0..num_memories)
                .map(|_| Slot {
                    state: SlotState::Generating,
                    segments: vec![None; num_segments],
                })
                .collect(),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn state(&self, slot: usize) -> &SlotState {
        &self.slots[slot].state
    }

    pub fn segment_pair(&self, slot: usize, segment: usize) -> &Option<SegmentPair> {
        &self.slots[slot].segments[segment]
    }

    /// Record a freshly generated pair on a segment. Return true if the slot
    /// now holds a pair on every segment.
    pub fn segment_generated(
        &mut self,
        slot: usize,
        segment: usize,
        now: u64,
        fidelity: f64,
    ) -> bool {
        let slot = &mut self.slots[slot];
        assert_eq!(
            SlotState::Generating,
            slot.state,
            "pair generated on a slot that is not generating"
        );
        assert!(
            slot.segments[segment].is_none(),
            "duplicate pair generated on segment {}",
            segment
        );
        slot.segments[segment] = Some(SegmentPair {
            created: now,
            fidelity,
        });
        slot.segments.iter().all(|pair| pair.is_some())
    }

    /// Move a fully generated slot to the swapping state.
    pub fn begin_swapping(&mut self, slot: usize) {
        let slot = &mut self.slots[slot];
        assert_eq!(SlotState::Generating, slot.state);
        assert!(slot.segments.iter().all(|pair| pair.is_some()));
        slot.state = SlotState::Swapping;
    }

    /// Record an end-to-end pair, entering (or updating) the purifying state.
    pub fn set_purifying(&mut self, slot: usize, fidelity: f64, now: u64) {
        let slot = &mut self.slots[slot];
        match slot.state {
            SlotState::Generating => {
                // Direct entry is only legal for single-segment paths.
                assert_eq!(1, slot.segments.len());
                assert!(slot.segments[0].is_some());
            }
            SlotState::Swapping | SlotState::Purifying { .. } => {}
            SlotState::Done => panic!("purifying a completed slot"),
        }
        slot.state = SlotState::Purifying {
            fidelity,
            updated: now,
        };
    }

    /// Mark a slot as completed.
    pub fn done(&mut self, slot: usize) {
        let slot = &mut self.slots[slot];
        assert!(matches!(slot.state, SlotState::Purifying { .. }));
        slot.state = SlotState::Done;
    }

    /// Throw away all the pairs of a slot and restart generation.
    pub fn reset(&mut self, slot: usize) {
        let slot = &mut self.slots[slot];
        assert!(
            !matches!(slot.state, SlotState::Done),
            "resetting a completed slot"
        );
        slot.state = SlotState::Generating;
        for pair in &mut slot.segments {
            *pair = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> EntanglementRequest {
        EntanglementRequest {
            source: 0,
            destination: 2,
            start: 1_000_000_000_000,
            end: 10_000_000_000_000,
            num_memories: 2,
            target_fidelity: 0.9,
        }
    }

    fn test_reservation() -> Reservation {
        Reservation::new(
            test_request(),
            vec![0, 1, 2],
            vec![
                Segment {
                    relay: 4,
                    flight: 5_000_000,
                },
                Segment {
                    relay: 5,
                    flight: 5_000_000,
                },
            ],
        )
    }

    #[test]
    fn test_request_valid() {
        assert!(test_request().valid(4, 50).is_ok());

        let mut request = test_request();
        request.destination = 9;
        assert!(request.valid(4, 50).is_err());

        let mut request = test_request();
        request.destination = request.source;
        assert!(request.valid(4, 50).is_err());

        let mut request = test_request();
        request.end = request.start;
        assert!(request.valid(4, 50).is_err());

        let mut request = test_request();
        request.num_memories = 51;
        assert!(request.valid(4, 50).is_err());

        let mut request = test_request();
        request.target_fidelity = 1.1;
        assert!(request.valid(4, 50).is_err());
    }

    #[test]
    fn test_reservation_lifecycle() {
        let mut res = test_reservation();
        assert_eq!(2, res.num_slots());
        assert_eq!(2, res.num_segments());
        assert_eq!(SlotState::Generating, *res.state(0));

        assert!(!res.segment_generated(0, 0, 100, 0.85));
        assert!(res.segment_generated(0, 1, 200, 0.85));
        assert_eq!(
            Some(SegmentPair {
                created: 100,
                fidelity: 0.85
            }),
            *res.segment_pair(0, 0)
        );

        res.begin_swapping(0);
        assert_eq!(SlotState::Swapping, *res.state(0));

        res.set_purifying(0, 0.73, 300);
        assert_eq!(
            SlotState::Purifying {
                fidelity: 0.73,
                updated: 300
            },
            *res.state(0)
        );

        res.set_purifying(0, 0.78, 400);
        res.done(0);
        assert_eq!(SlotState::Done, *res.state(0));

        // The other slot is untouched.
        assert_eq!(SlotState::Generating, *res.state(1));
    }

    #[test]
    fn test_reservation_reset() {
        let mut res = test_reservation();
        res.segment_generated(0, 0, 100, 0.85);
        res.segment_generated(0, 1, 200, 0.85);
        res.begin_swapping(0);

        res.reset(0);
        assert_eq!(SlotState::Generating, *res.state(0));
        assert!(res.segment_pair(0, 0).is_none());
        assert!(res.segment_pair(0, 1).is_none());

        // Generation can start over.
        assert!(!res.segment_generated(0, 0, 300, 0.85));
    }

    #[test]
    #[should_panic]
    fn test_reservation_duplicate_pair() {
        let mut res = test_reservation();
        res.segment_generated(0, 0, 100, 0.85);
        res.segment_generated(0, 0, 200, 0.85);
    }

    #[test]
    #[should_panic]
    fn test_reservation_swap_before_complete() {
        let mut res = test_reservation();
        res.segment_generated(0, 0, 100, 0.85);
        res.begin_swapping(0);
    }

    #[test]
    #[should_panic]
    fn test_reservation_reset_done() {
        let mut res = test_reservation();
        res.segment_generated(0, 0, 100, 0.85);
        res.segment_generated(0, 1, 200, 0.85);
        res.begin_swapping(0);
        res.set_purifying(0, 0.95, 300);
        res.done(0);
        res.reset(0);
    }
}
