use serde::{Deserialize, Serialize};

use crate::data::currency::Currency;
use crate::utils::errors::{AmcError, Result};
use crate::utils::num::Time;

/// Random sequence family used for path construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceType {
    PseudoRandom,
    LowDiscrepancy,
}

/// Assignment of (step, factor) pairs to low-discrepancy dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrownianOrdering {
    Steps,
    Factors,
}

/// Direction-number set for the Sobol generator. Passed through to the
/// model; the bundled generator ships a single direction-number table, so
/// this is a configuration surface kept for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionIntegers {
    JoeKuo,
    SobolLevitan,
}

/// # PathBatch
/// A batch of simulated joint-factor paths stored as one flat arena indexed
/// by `(sample, time, component)`. Slices are borrowed out of the arena so
/// per-path evaluation never allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct PathBatch {
    samples: usize,
    times: Vec<Time>,
    state_dimension: usize,
    data: Vec<f64>,
}

impl PathBatch {
    pub fn new(samples: usize, times: Vec<Time>, state_dimension: usize, data: Vec<f64>) -> PathBatch {
        debug_assert_eq!(data.len(), samples * times.len() * state_dimension);
        PathBatch {
            samples,
            times,
            state_dimension,
            data,
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn state_dimension(&self) -> usize {
        self.state_dimension
    }

    /// State vector of one sample at one grid position.
    pub fn state(&self, sample: usize, time_index: usize) -> &[f64] {
        let stride = self.state_dimension;
        let offset = (sample * self.times.len() + time_index) * stride;
        &self.data[offset..offset + stride]
    }
}

/// # StochasticModel
/// The opaque multi-currency path-generation and observation service the
/// engine consumes. Implementations must be deterministic given a seed and
/// expose every simulated quantity as a pure function of time and state:
/// the engine never re-discounts and never stores model internals.
pub trait StochasticModel: Send + Sync {
    fn base_currency(&self) -> Currency;

    fn currencies(&self) -> &[Currency];

    /// Number of components in the joint state vector.
    fn state_dimension(&self) -> usize;

    /// State at the valuation date.
    fn initial_state(&self) -> Vec<f64>;

    fn currency_index(&self, currency: Currency) -> Result<usize> {
        self.currencies()
            .iter()
            .position(|&c| c == currency)
            .ok_or(AmcError::NotFoundError(format!(
                "currency {} is not simulated by the model",
                currency
            )))
    }

    /// Generates a batch of joint-factor paths on the given time grid.
    fn generate_paths(
        &self,
        times: &[Time],
        samples: usize,
        seed: u64,
        sequence_type: SequenceType,
        ordering: BrownianOrdering,
        direction_integers: DirectionIntegers,
    ) -> Result<PathBatch>;

    /// Base-currency numeraire at `t`, normalised to one at the valuation
    /// date. Dividing a time-`t` amount by it yields the value discounted
    /// to the valuation date.
    fn numeraire(&self, t: Time, state: &[f64]) -> Result<f64>;

    /// Conversion factor from one unit of the indexed currency into base
    /// currency at `t`.
    fn fx_to_base(&self, ccy_index: usize, t: Time, state: &[f64]) -> Result<f64>;

    /// Simply compounded forward rate for `[start, end]` with year fraction
    /// `accrual`, observed at `fixing` from the state there.
    fn forward_rate(
        &self,
        ccy_index: usize,
        fixing: Time,
        start: Time,
        end: Time,
        accrual: f64,
        state: &[f64],
    ) -> Result<f64>;
}
