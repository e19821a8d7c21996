// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

//! Closed-form fidelity models for Werner-state pairs: exponential decay in
//! memory, entanglement swapping, and one round of BBPSSW purification.

/// Fidelity of a pair after sitting in memory for `dwell` s, decaying toward
/// the maximally mixed state with the given coherence time (s).
pub fn decayed(fidelity: f64, dwell: f64, coherence_time: f64) -> f64 {
    0.25 + (fidelity - 0.25) * (-dwell / coherence_time).exp()
}

/// Fidelity of the pair obtained by swapping two pairs of fidelity `f1` and `f2`.
pub fn swapped(f1: f64, f2: f64) -> f64 {
    f1 * f2 + (1.0 - f1) * (1.0 - f2) / 3.0
}

/// Success probability of one BBPSSW round consuming pairs of fidelity `f1` and `f2`.
pub fn purify_success(f1: f64, f2: f64) -> f64 {
    f1 * f2 + f1 * (1.0 - f2) / 3.0 + (1.0 - f1) * f2 / 3.0 + 5.0 * (1.0 - f1) * (1.0 - f2) / 9.0
}

/// Fidelity of the surviving pair after a successful BBPSSW round.
pub fn purified(f1: f64, f2: f64) -> f64 {
    (f1 * f2 + (1.0 - f1) * (1.0 - f2) / 9.0) / purify_success(f1, f2)
}

/// Probability that a Bell-state measurement succeeds at a relay fed by two
/// fiber arms of the given attenuation (dB/m) and lengths (m): both photons
/// must survive and the linear-optics BSM distinguishes half the outcomes.
pub fn bsm_success(attenuation: f64, distance_a: f64, distance_b: f64) -> f64 {
    0.5 * 10f64.powf(-attenuation * distance_a / 10.0) * 10f64.powf(-attenuation * distance_b / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decayed() {
        // No dwell time, no decay.
        assert_float_eq::assert_f64_near!(0.85, decayed(0.85, 0.0, 10.0));

        // Decay is monotone toward 1/4.
        let mut last = 1.0;
        for dwell in [0.1, 1.0, 10.0, 100.0, 1000.0] {
            let f = decayed(1.0, dwell, 10.0);
            assert!(f < last);
            assert!(f > 0.25);
            last = f;
        }
        assert_float_eq::assert_float_absolute_eq!(0.25, decayed(1.0, 1e6, 10.0), 1e-9);
    }

    #[test]
    fn test_swapped() {
        assert_float_eq::assert_f64_near!(1.0, swapped(1.0, 1.0));
        assert_float_eq::assert_f64_near!(0.73, swapped(0.85, 0.85));

        // Swapping never improves fidelity of imperfect pairs.
        for f in [0.5, 0.7, 0.85, 0.99] {
            assert!(swapped(f, f) <= f);
        }
    }

    #[test]
    fn test_purify() {
        // Perfect pairs always pass and stay perfect.
        assert_float_eq::assert_f64_near!(1.0, purify_success(1.0, 1.0));
        assert_float_eq::assert_f64_near!(1.0, purified(1.0, 1.0));

        // Above the 1/2 threshold a round increases fidelity.
        for f in [0.6, 0.73, 0.85, 0.95] {
            let p = purify_success(f, f);
            assert!(p > 0.0 && p <= 1.0);
            assert!(purified(f, f) > f);
        }

        // Two rounds from the raw fidelity of the reference scenario reach 0.9.
        let f1 = purified(0.85, 0.85);
        let f2 = purified(f1, f1);
        assert!(f1 > 0.85 && f1 < 0.9);
        assert!(f2 >= 0.9);
    }

    #[test]
    fn test_bsm_success() {
        // Lossless fibers leave only the intrinsic 1/2 of a linear-optics BSM.
        assert_float_eq::assert_f64_near!(0.5, bsm_success(0.0, 1000.0, 1000.0));

        let p = bsm_success(3e-5, 1000.0, 1000.0);
        assert!(p < 0.5 && p > 0.49);

        // More attenuation, less success.
        assert!(bsm_success(2e-4, 1000.0, 1000.0) < p);
    }
}
