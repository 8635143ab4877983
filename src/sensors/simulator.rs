// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Simulated SPS30 for demo/testing

use rand::prelude::*;
use rand_distr::StandardNormal;

use super::{BusError, Measurement, ParticleBus};

/// Simulates a particle sensor in a room with slowly drifting air quality
pub struct SimulatedSps30 {
    rng: StdRng,
    measuring: bool,

    // Simulation state
    baseline_pm2_5: f64,
    drift: f64,
    spike_remaining: u32,
    not_ready_probability: f64,
    spike_probability: f64,
    noise_std: f64,
}

impl SimulatedSps30 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic simulator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            measuring: false,
            baseline_pm2_5: 12.0,
            drift: 0.0,
            spike_remaining: 0,
            not_ready_probability: 0.2,
            spike_probability: 0.03,
            noise_std: 1.5,
        }
    }

    /// Probability that a data-ready poll reports "not ready"
    pub fn with_not_ready_probability(mut self, p: f64) -> Self {
        self.not_ready_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability that a measurement starts a pollution episode
    pub fn with_spike_probability(mut self, p: f64) -> Self {
        self.spike_probability = p.clamp(0.0, 1.0);
        self
    }

    fn generate(&mut self) -> Measurement {
        self.drift = (self.drift + self.rng.gen_range(-0.5..0.5)).clamp(-8.0, 20.0);

        if self.spike_remaining == 0 && self.rng.gen::<f64>() < self.spike_probability {
            self.spike_remaining = self.rng.gen_range(3..10);
        }

        let noise: f64 = self.rng.sample(StandardNormal);
        let mut pm2_5 = self.baseline_pm2_5 + self.drift + noise * self.noise_std;
        if self.spike_remaining > 0 {
            self.spike_remaining -= 1;
            pm2_5 += self.rng.gen_range(40.0..90.0);
        }
        let pm2_5 = pm2_5.max(0.0);

        // Coarse fraction on top of fine particles
        let pm1 = pm2_5 * 0.7;
        let pm4 = pm2_5 * 1.15;
        let pm10 = pm2_5 * self.rng.gen_range(1.2..1.5);

        Measurement {
            mc_1p0: pm1 as f32,
            mc_2p5: pm2_5 as f32,
            mc_4p0: pm4 as f32,
            mc_10p0: pm10 as f32,
            nc_0p5: (pm1 * 6.5) as f32,
            nc_1p0: (pm1 * 7.5) as f32,
            nc_2p5: (pm2_5 * 7.8) as f32,
            nc_4p0: (pm4 * 7.9) as f32,
            nc_10p0: (pm10 * 7.9) as f32,
            typical_particle_size: self.rng.gen_range(0.4..0.9) as f32,
        }
    }
}

impl Default for SimulatedSps30 {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleBus for SimulatedSps30 {
    fn probe(&mut self) -> Result<String, BusError> {
        Ok("SIM-SPS30-0001".to_string())
    }

    fn set_auto_cleaning_interval(&mut self, _days: u8) -> Result<(), BusError> {
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), BusError> {
        self.measuring = true;
        Ok(())
    }

    fn stop_measurement(&mut self) -> Result<(), BusError> {
        self.measuring = false;
        Ok(())
    }

    fn read_data_ready(&mut self) -> Result<bool, BusError> {
        Ok(self.measuring && self.rng.gen::<f64>() >= self.not_ready_probability)
    }

    fn read_measurement(&mut self) -> Result<Measurement, BusError> {
        if !self.measuring {
            return Err(BusError::Nack);
        }
        Ok(self.generate())
    }
}
