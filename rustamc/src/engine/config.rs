use serde::{Deserialize, Serialize};

use crate::math::basis::PolynomialType;
use crate::models::montecarlomodel::{BrownianOrdering, DirectionIntegers, SequenceType};

/// # McEngineConfig
/// Calibration configuration of the Monte Carlo multi-leg engine.
///
/// `pricing_samples` greater than zero triggers an independent re-pricing
/// batch for the reported result value; zero reuses the calibration-batch
/// estimate. `external_state_indices` restricts the regression state to a
/// subset of model components and is what the calculator declares to the
/// outer driver; `None` uses the full state vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McEngineConfig {
    calibration_samples: usize,
    pricing_samples: usize,
    calibration_seed: u64,
    pricing_seed: u64,
    polynom_order: usize,
    polynomial_type: PolynomialType,
    sequence_type: SequenceType,
    ordering: BrownianOrdering,
    direction_integers: DirectionIntegers,
    external_state_indices: Option<Vec<usize>>,
}

impl Default for McEngineConfig {
    fn default() -> McEngineConfig {
        McEngineConfig {
            calibration_samples: 5000,
            pricing_samples: 0,
            calibration_seed: 42,
            pricing_seed: 43,
            polynom_order: 2,
            polynomial_type: PolynomialType::Monomial,
            sequence_type: SequenceType::PseudoRandom,
            ordering: BrownianOrdering::Steps,
            direction_integers: DirectionIntegers::JoeKuo,
            external_state_indices: None,
        }
    }
}

impl McEngineConfig {
    pub fn new() -> McEngineConfig {
        McEngineConfig::default()
    }

    pub fn with_calibration_samples(mut self, samples: usize) -> McEngineConfig {
        self.calibration_samples = samples;
        self
    }

    pub fn with_pricing_samples(mut self, samples: usize) -> McEngineConfig {
        self.pricing_samples = samples;
        self
    }

    pub fn with_calibration_seed(mut self, seed: u64) -> McEngineConfig {
        self.calibration_seed = seed;
        self
    }

    pub fn with_pricing_seed(mut self, seed: u64) -> McEngineConfig {
        self.pricing_seed = seed;
        self
    }

    pub fn with_polynom_order(mut self, order: usize) -> McEngineConfig {
        self.polynom_order = order;
        self
    }

    pub fn with_polynomial_type(mut self, polynomial_type: PolynomialType) -> McEngineConfig {
        self.polynomial_type = polynomial_type;
        self
    }

    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> McEngineConfig {
        self.sequence_type = sequence_type;
        self
    }

    pub fn with_ordering(mut self, ordering: BrownianOrdering) -> McEngineConfig {
        self.ordering = ordering;
        self
    }

    pub fn with_direction_integers(mut self, direction_integers: DirectionIntegers) -> McEngineConfig {
        self.direction_integers = direction_integers;
        self
    }

    pub fn with_external_state_indices(mut self, indices: Vec<usize>) -> McEngineConfig {
        self.external_state_indices = Some(indices);
        self
    }

    pub fn calibration_samples(&self) -> usize {
        self.calibration_samples
    }

    pub fn pricing_samples(&self) -> usize {
        self.pricing_samples
    }

    pub fn calibration_seed(&self) -> u64 {
        self.calibration_seed
    }

    pub fn pricing_seed(&self) -> u64 {
        self.pricing_seed
    }

    pub fn polynom_order(&self) -> usize {
        self.polynom_order
    }

    pub fn polynomial_type(&self) -> PolynomialType {
        self.polynomial_type
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    pub fn ordering(&self) -> BrownianOrdering {
        self.ordering
    }

    pub fn direction_integers(&self) -> DirectionIntegers {
        self.direction_integers
    }

    pub fn external_state_indices(&self) -> Option<&Vec<usize>> {
        self.external_state_indices.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = McEngineConfig::new()
            .with_calibration_samples(1000)
            .with_calibration_seed(7)
            .with_polynom_order(3)
            .with_sequence_type(SequenceType::LowDiscrepancy);
        assert_eq!(config.calibration_samples(), 1000);
        assert_eq!(config.calibration_seed(), 7);
        assert_eq!(config.polynom_order(), 3);
        assert_eq!(config.sequence_type(), SequenceType::LowDiscrepancy);
        assert_eq!(config.pricing_samples(), 0);
    }
}
