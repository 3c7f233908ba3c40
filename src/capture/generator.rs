use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::processor::Detector;
use crate::types::{RawFeatures, Statistics};

pub const DEFAULT_BENCHMARK_ITERATIONS: usize = 1000;

/// Draws one standard-normal value per feature name.
pub struct RandomFeatures {
    names: Vec<String>,
    rng: StdRng,
}

impl RandomFeatures {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, rng: StdRng::from_entropy() }
    }

    pub fn seeded(names: Vec<String>, seed: u64) -> Self {
        Self { names, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn sample(&mut self) -> RawFeatures {
        let rng = &mut self.rng;
        self.names
            .iter()
            .map(|name| (name.clone(), rng.sample::<f64, _>(StandardNormal)))
            .collect()
    }
}

impl Iterator for RandomFeatures {
    type Item = RawFeatures;

    fn next(&mut self) -> Option<RawFeatures> {
        Some(self.sample())
    }
}

/// Runs `iterations` predictions of one random sample straight through the detector.
pub fn benchmark(detector: &mut Detector, iterations: usize) -> Result<Statistics> {
    let mut generator = RandomFeatures::new(detector.feature_names().to_vec());
    let features = generator.sample();

    log::info!("Running benchmark with {} iterations", iterations);
    for _ in 0..iterations {
        detector.predict(&features)?;
    }
    Ok(detector.statistics())
}
