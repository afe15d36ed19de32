use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::models::montecarlomodel::{BrownianOrdering, SequenceType};
use crate::utils::errors::{AmcError, Result};

/// # GaussianSequence
/// Deterministic, seeded source of standard-normal variates laid out as
/// `[sample][step][factor]`. Pseudo-random draws come from a seeded
/// `StdRng`; low-discrepancy draws from an Owen-scrambled Sobol sequence
/// mapped through the inverse normal CDF. The Brownian ordering controls
/// which Sobol dimension serves which (step, factor) pair.
pub struct GaussianSequence {
    samples: usize,
    steps: usize,
    factors: usize,
    seed: u64,
    sequence_type: SequenceType,
    ordering: BrownianOrdering,
}

impl GaussianSequence {
    pub fn new(samples: usize, steps: usize, factors: usize, seed: u64) -> GaussianSequence {
        GaussianSequence {
            samples,
            steps,
            factors,
            seed,
            sequence_type: SequenceType::PseudoRandom,
            ordering: BrownianOrdering::Steps,
        }
    }

    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> GaussianSequence {
        self.sequence_type = sequence_type;
        self
    }

    pub fn with_ordering(mut self, ordering: BrownianOrdering) -> GaussianSequence {
        self.ordering = ordering;
        self
    }

    /// Generates the full batch of variates, `samples * steps * factors`
    /// values in sample-major order.
    pub fn generate(&self) -> Result<Vec<f64>> {
        match self.sequence_type {
            SequenceType::PseudoRandom => Ok(self.generate_pseudo()),
            SequenceType::LowDiscrepancy => self.generate_sobol(),
        }
    }

    fn generate_pseudo(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.samples * self.steps * self.factors)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect()
    }

    fn generate_sobol(&self) -> Result<Vec<f64>> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AmcError::EvaluationError(e.to_string()))?;
        // the scrambler takes a 32-bit seed; fold the high bits in so the
        // full 64-bit seed stays significant
        let seed = (self.seed ^ (self.seed >> 32)) as u32;
        let mut out = Vec::with_capacity(self.samples * self.steps * self.factors);
        for sample in 0..self.samples {
            for step in 0..self.steps {
                for factor in 0..self.factors {
                    let dimension = match self.ordering {
                        BrownianOrdering::Steps => step * self.factors + factor,
                        BrownianOrdering::Factors => factor * self.steps + step,
                    };
                    let u = sobol_burley::sample(sample as u32, dimension as u32, seed) as f64;
                    // keep the inverse CDF away from the open-interval edges
                    let u = u.clamp(1e-12, 1.0 - 1e-12);
                    out.push(normal.inverse_cdf(u));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_is_deterministic() {
        let a = GaussianSequence::new(16, 4, 2, 42).generate().unwrap();
        let b = GaussianSequence::new(16, 4, 2, 42).generate().unwrap();
        assert_eq!(a, b);
        let c = GaussianSequence::new(16, 4, 2, 43).generate().unwrap();
        assert!(a != c);
    }

    #[test]
    fn test_sobol_is_deterministic() {
        let a = GaussianSequence::new(32, 3, 2, 7)
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .generate()
            .unwrap();
        let b = GaussianSequence::new(32, 3, 2, 7)
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .generate()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sobol_distinguishes_high_seed_bits() {
        let low = GaussianSequence::new(16, 2, 1, 1)
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .generate()
            .unwrap();
        let high = GaussianSequence::new(16, 2, 1, 1 + (1u64 << 32))
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .generate()
            .unwrap();
        assert!(low != high);
    }

    #[test]
    fn test_ordering_permutes_dimensions() {
        let steps = GaussianSequence::new(8, 3, 2, 1)
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .with_ordering(BrownianOrdering::Steps)
            .generate()
            .unwrap();
        let factors = GaussianSequence::new(8, 3, 2, 1)
            .with_sequence_type(SequenceType::LowDiscrepancy)
            .with_ordering(BrownianOrdering::Factors)
            .generate()
            .unwrap();
        assert_eq!(steps.len(), factors.len());
        assert!(steps != factors);
    }

    #[test]
    fn test_pseudo_moments() {
        let draws = GaussianSequence::new(2000, 5, 1, 99).generate().unwrap();
        let n = draws.len() as f64;
        let mean = draws.iter().sum::<f64>() / n;
        let var = draws.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
