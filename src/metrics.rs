// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::memory::MemoryArray;

/// Entanglement completion times of a repeater's memories, in s, sorted
/// ascending. Slots that never entangled are excluded.
pub fn completion_times(memories: &MemoryArray) -> Vec<f64> {
    let mut data = memories
        .iter()
        .filter_map(|record| record.entangle_time.map(crate::utils::to_seconds))
        .collect::<Vec<f64>>();
    data.sort_by(|a, b| a.partial_cmp(b).unwrap());
    data
}

/// Fidelity of every memory slot, in memory-index order. Slots that never
/// entangled report the array's raw fidelity.
pub fn memory_fidelities(memories: &MemoryArray) -> Vec<f64> {
    memories.iter().map(|record| record.fidelity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryParam;

    #[test]
    fn test_completion_times_sorted_and_filtered() {
        let mut memories = MemoryArray::new(4);
        memories.update_params(MemoryParam::RawFidelity(0.85));
        memories.stamp(0, 3_000_000_000_000, 0.9);
        memories.stamp(2, 1_000_000_000_000, 0.92);
        // Slots 1 and 3 never entangle.

        let times = completion_times(&memories);
        assert_eq!(vec![1.0, 3.0], times);
    }

    #[test]
    fn test_memory_fidelities_in_index_order() {
        let mut memories = MemoryArray::new(3);
        memories.update_params(MemoryParam::RawFidelity(0.85));
        memories.stamp(1, 1_000_000, 0.95);

        assert_eq!(vec![0.85, 0.95, 0.85], memory_fidelities(&memories));
    }

    #[test]
    fn test_metrics_empty_array() {
        let memories = MemoryArray::new(0);
        assert!(completion_times(&memories).is_empty());
        assert!(memory_fidelities(&memories).is_empty());
    }
}
