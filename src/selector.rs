// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use rand::Rng;

/// Select a contiguous (source, intermediate, destination) triple from an
/// ordered list of repeater names, with circular wraparound.
///
/// If `fixed_index` is given the selection is deterministic, otherwise the
/// source index is drawn uniformly from the given generator. The intermediate
/// and destination follow the source at offsets +1 and +2 mod n.
pub fn select_endpoints<R: Rng>(
    nodes: &[String],
    fixed_index: Option<usize>,
    rng: &mut R,
) -> anyhow::Result<(String, String, String)> {
    anyhow::ensure!(
        nodes.len() >= 3,
        "cannot select an endpoint triple from {} nodes, at least 3 required",
        nodes.len()
    );

    let index = match fixed_index {
        Some(index) => {
            anyhow::ensure!(
                index < nodes.len(),
                "endpoint index {} out of range [0, {}]",
                index,
                nodes.len() - 1
            );
            index
        }
        None => rng.gen_range(0..nodes.len()),
    };

    let triple = if nodes.len() - index == 2 {
        log::debug!("endpoint selection wrapped around once at index {}", index);
        (
            nodes[index].clone(),
            nodes[index + 1].clone(),
            nodes[0].clone(),
        )
    } else if nodes.len() - index == 1 {
        log::debug!("endpoint selection wrapped around twice at index {}", index);
        (nodes[index].clone(), nodes[0].clone(), nodes[1].clone())
    } else {
        log::debug!("endpoint selection did not wrap at index {}", index);
        (
            nodes[index].clone(),
            nodes[index + 1].clone(),
            nodes[index + 2].clone(),
        )
    };

    log::info!(
        "selected endpoints: {} -> {} -> {}",
        triple.0,
        triple.1,
        triple.2
    );
    Ok(triple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("r{}", i)).collect()
    }

    #[test]
    fn test_select_endpoints_fixed() -> anyhow::Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        // Generic case.
        assert_eq!(
            ("r1".to_string(), "r2".to_string(), "r3".to_string()),
            select_endpoints(&names(5), Some(1), &mut rng)?
        );

        // Single wraparound.
        assert_eq!(
            ("r2".to_string(), "r3".to_string(), "r0".to_string()),
            select_endpoints(&names(4), Some(2), &mut rng)?
        );

        // Double wraparound.
        assert_eq!(
            ("r3".to_string(), "r0".to_string(), "r1".to_string()),
            select_endpoints(&names(4), Some(3), &mut rng)?
        );

        Ok(())
    }

    #[test]
    fn test_select_endpoints_distinct() -> anyhow::Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for n in 3..=8 {
            for index in 0..n {
                let (src, mid, dst) = select_endpoints(&names(n), Some(index), &mut rng)?;
                assert_ne!(src, mid);
                assert_ne!(src, dst);
                assert_ne!(mid, dst);
            }
        }
        Ok(())
    }

    #[test]
    fn test_select_endpoints_random_reproducible() -> anyhow::Result<()> {
        let mut rng1 = rand::rngs::StdRng::seed_from_u64(7);
        let mut rng2 = rand::rngs::StdRng::seed_from_u64(7);
        for n in 3..=8 {
            assert_eq!(
                select_endpoints(&names(n), None, &mut rng1)?,
                select_endpoints(&names(n), None, &mut rng2)?
            );
        }
        Ok(())
    }

    #[test]
    fn test_select_endpoints_invalid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(select_endpoints(&names(2), None, &mut rng).is_err());
        assert!(select_endpoints(&[], None, &mut rng).is_err());
        assert!(select_endpoints(&names(4), Some(4), &mut rng).is_err());
        assert!(select_endpoints(&names(4), Some(99), &mut rng).is_err());
    }
}
