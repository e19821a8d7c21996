// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// The two memory parameters that can be tuned scenario-wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryParam {
    /// Coherence time, in s.
    CoherenceTime(f64),
    /// Fidelity of a freshly entangled pair, also reported by slots that
    /// never entangled.
    RawFidelity(f64),
}

/// Per-slot entanglement record.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    /// Time when the slot was last entangled, in ps. None if never entangled.
    pub entangle_time: Option<u64>,
    /// Fidelity of the slot's pair, or the raw fidelity if never entangled.
    pub fidelity: f64,
}

/// Bounded pool of quantum memories of a single repeater.
#[derive(Debug)]
pub struct MemoryArray {
    records: Vec<MemoryRecord>,
    coherence_time: f64,
    raw_fidelity: f64,
}

impl MemoryArray {
    /// Create an array of pristine memories. The memories are ideal until
    /// configured through `update_params`.
    pub fn new(num_memories: u32) -> Self {
        Self {
            records: vec![
                MemoryRecord {
                    entangle_time: None,
                    fidelity: 1.0,
                };
                num_memories as usize
            ],
            coherence_time: f64::INFINITY,
            raw_fidelity: 1.0,
        }
    }

    /// Apply one of the tunable parameters to the whole array. Updating the
    /// raw fidelity resets the fidelity reported by every slot.
    pub fn update_params(&mut self, param: MemoryParam) {
        match param {
            MemoryParam::CoherenceTime(value) => {
                assert!(value > 0.0, "coherence time ({}) <= 0", value);
                self.coherence_time = value;
            }
            MemoryParam::RawFidelity(value) => {
                assert!(
                    (0.0..=1.0).contains(&value),
                    "invalid raw fidelity ({})",
                    value
                );
                self.raw_fidelity = value;
                for record in &mut self.records {
                    record.fidelity = value;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.iter()
    }

    pub fn record(&self, index: usize) -> &MemoryRecord {
        &self.records[index]
    }

    /// Record that the slot holds a pair entangled at `now` with the given fidelity.
    pub fn stamp(&mut self, index: usize, now: u64, fidelity: f64) {
        let record = &mut self.records[index];
        record.entangle_time = Some(now);
        record.fidelity = fidelity;
    }

    pub fn coherence_time(&self) -> f64 {
        self.coherence_time
    }

    pub fn raw_fidelity(&self) -> f64 {
        self.raw_fidelity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_array_update_params() {
        let mut memories = MemoryArray::new(3);
        assert_eq!(3, memories.len());
        assert!(memories.iter().all(|record| record.entangle_time.is_none()));

        memories.update_params(MemoryParam::CoherenceTime(10.0));
        memories.update_params(MemoryParam::RawFidelity(0.85));
        assert_float_eq::assert_f64_near!(10.0, memories.coherence_time());
        assert_float_eq::assert_f64_near!(0.85, memories.raw_fidelity());
        for record in memories.iter() {
            assert_float_eq::assert_f64_near!(0.85, record.fidelity);
        }
    }

    #[test]
    fn test_memory_array_stamp() {
        let mut memories = MemoryArray::new(2);
        memories.update_params(MemoryParam::RawFidelity(0.85));

        memories.stamp(1, 1_000_000, 0.92);
        assert_eq!(None, memories.record(0).entangle_time);
        assert_eq!(Some(1_000_000), memories.record(1).entangle_time);
        assert_float_eq::assert_f64_near!(0.92, memories.record(1).fidelity);
        assert_float_eq::assert_f64_near!(0.85, memories.record(0).fidelity);
    }

    #[test]
    #[should_panic]
    fn test_memory_array_invalid_raw_fidelity() {
        MemoryArray::new(1).update_params(MemoryParam::RawFidelity(1.5));
    }
}
