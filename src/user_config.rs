// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// User-specified configuration of a scenario.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserConfig {
    /// The duration of the simulation, in ms.
    pub duration: f64,
    /// Number of repeaters in the ring.
    pub num_repeaters: u32,
    /// Number of memory qubits per repeater.
    pub memory_qubits: u32,
    /// Memory coherence time, in s.
    pub coherence_time: f64,
    /// Fidelity of a freshly entangled memory pair.
    pub raw_fidelity: f64,
    /// One-way delay of every classical channel, in ms.
    pub classical_delay: f64,
    /// Length of every classical channel, in m.
    pub classical_distance: f64,
    /// Attenuation of every quantum channel, in dB/m.
    pub quantum_attenuation: f64,
    /// Length of every quantum channel, in km.
    pub quantum_distance: f64,
    /// Entanglement swapping success probability.
    pub swapping_success_prob: f64,
    /// Earliest start of entanglement generation, in ms.
    pub request_start: f64,
    /// End of the reservation window, in ms.
    pub request_end: f64,
    /// Number of memory pairs requested.
    pub num_memories: usize,
    /// Minimum end-to-end fidelity requested.
    pub target_fidelity: f64,
    /// Ring index of the first endpoint repeater; drawn at random if absent.
    pub fixed_endpoint: Option<usize>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            duration: 3000.0,
            num_repeaters: 4,
            memory_qubits: 50,
            coherence_time: 10.0,
            raw_fidelity: 0.85,
            classical_delay: 0.1,
            classical_distance: 1000.0,
            quantum_attenuation: 3e-5,
            quantum_distance: 1.0,
            swapping_success_prob: 0.5,
            request_start: 1000.0,
            request_end: 10000.0,
            num_memories: 50,
            target_fidelity: 0.9,
            fixed_endpoint: None,
        }
    }
}

impl UserConfig {
    pub fn header() -> String {
        String::from(
            "duration,num_repeaters,memory_qubits,coherence_time,raw_fidelity,\
             classical_delay,classical_distance,quantum_attenuation,quantum_distance,\
             swapping_success_prob,request_start,request_end,num_memories,\
             target_fidelity,fixed_endpoint",
        )
    }
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.duration,
            self.num_repeaters,
            self.memory_qubits,
            self.coherence_time,
            self.raw_fidelity,
            self.classical_delay,
            self.classical_distance,
            self.quantum_attenuation,
            self.quantum_distance,
            self.swapping_success_prob,
            self.request_start,
            self.request_end,
            self.num_memories,
            self.target_fidelity,
            self.fixed_endpoint
                .map_or(String::from("random"), |x| x.to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_csv() {
        let config = UserConfig::default();
        assert_eq!(
            UserConfig::header().split(',').count(),
            config.to_csv().split(',').count()
        );
        assert!(config.to_csv().ends_with(",random"));

        let config = UserConfig {
            fixed_endpoint: Some(2),
            ..Default::default()
        };
        assert!(config.to_csv().ends_with(",2"));
    }

    #[test]
    fn test_user_config_serialization() -> anyhow::Result<()> {
        let config = UserConfig::default();
        let deserialized: UserConfig = serde_json::from_str(&serde_json::to_string(&config)?)?;
        assert_float_eq::assert_f64_near!(config.duration, deserialized.duration);
        assert_eq!(config.num_repeaters, deserialized.num_repeaters);
        assert_eq!(config.fixed_endpoint, deserialized.fixed_endpoint);
        Ok(())
    }
}
