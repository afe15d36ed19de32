use crate::data::currency::Currency;
use crate::models::montecarlomodel::{
    BrownianOrdering, DirectionIntegers, PathBatch, SequenceType, StochasticModel,
};
use crate::models::sequences::GaussianSequence;
use crate::utils::errors::{AmcError, Result};
use crate::utils::num::Time;

/// # MultiCcyGaussianModel
/// Reference multi-currency model: one Gaussian short-rate factor per
/// currency (LGM parametrisation with H(t) = t, constant volatility, flat
/// initial curve) plus a lognormal FX factor per non-base currency. The
/// numeraire and zero bonds are analytic in the state, so deflated bond
/// prices are martingales by construction.
///
/// The joint state vector is `[z_0 .. z_{n-1}, w_1 .. w_{n-1}]`: one rate
/// factor per currency followed by one FX Brownian per non-base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCcyGaussianModel {
    currencies: Vec<Currency>,
    rates: Vec<f64>,
    rate_vols: Vec<f64>,
    fx_spots: Vec<f64>,
    fx_vols: Vec<f64>,
}

impl MultiCcyGaussianModel {
    /// Model with only the base currency: flat zero rate and rate factor
    /// volatility.
    pub fn new(base_currency: Currency, rate: f64, rate_vol: f64) -> MultiCcyGaussianModel {
        MultiCcyGaussianModel {
            currencies: vec![base_currency],
            rates: vec![rate],
            rate_vols: vec![rate_vol],
            fx_spots: vec![1.0],
            fx_vols: vec![0.0],
        }
    }

    /// Adds a foreign currency with its flat rate, rate volatility, FX spot
    /// (base units per foreign unit) and lognormal FX volatility.
    pub fn with_currency(
        mut self,
        currency: Currency,
        rate: f64,
        rate_vol: f64,
        fx_spot: f64,
        fx_vol: f64,
    ) -> MultiCcyGaussianModel {
        self.currencies.push(currency);
        self.rates.push(rate);
        self.rate_vols.push(rate_vol);
        self.fx_spots.push(fx_spot);
        self.fx_vols.push(fx_vol);
        self
    }

    pub fn discount(&self, ccy_index: usize, t: Time) -> f64 {
        (-self.rates[ccy_index] * t).exp()
    }

    fn zeta(&self, ccy_index: usize, t: Time) -> f64 {
        let a = self.rate_vols[ccy_index];
        a * a * t
    }

    /// Zero bond `P(t, maturity)` in the indexed currency, conditional on
    /// the rate factor `z` at `t`.
    pub fn zerobond(&self, ccy_index: usize, t: Time, maturity: Time, z: f64) -> f64 {
        let dt = maturity - t;
        let variance_term = 0.5 * (maturity * maturity - t * t) * self.zeta(ccy_index, t);
        (self.discount(ccy_index, maturity) / self.discount(ccy_index, t)
            * (-dt * z - variance_term).exp())
        .max(f64::MIN_POSITIVE)
    }

    fn rate_factor(&self, ccy_index: usize, state: &[f64]) -> Result<f64> {
        state
            .get(ccy_index)
            .copied()
            .ok_or(AmcError::EvaluationError(format!(
                "state vector too short for currency index {}",
                ccy_index
            )))
    }

    fn fx_factor(&self, ccy_index: usize, state: &[f64]) -> Result<f64> {
        let n = self.currencies.len();
        state
            .get(n + ccy_index - 1)
            .copied()
            .ok_or(AmcError::EvaluationError(format!(
                "state vector too short for fx factor of currency index {}",
                ccy_index
            )))
    }
}

impl StochasticModel for MultiCcyGaussianModel {
    fn base_currency(&self) -> Currency {
        self.currencies[0]
    }

    fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    fn state_dimension(&self) -> usize {
        2 * self.currencies.len() - 1
    }

    fn initial_state(&self) -> Vec<f64> {
        vec![0.0; self.state_dimension()]
    }

    fn generate_paths(
        &self,
        times: &[Time],
        samples: usize,
        seed: u64,
        sequence_type: SequenceType,
        ordering: BrownianOrdering,
        _direction_integers: DirectionIntegers,
    ) -> Result<PathBatch> {
        let n = self.currencies.len();
        let dim = self.state_dimension();
        let steps = times.len();
        let gaussians = GaussianSequence::new(samples, steps, dim, seed)
            .with_sequence_type(sequence_type)
            .with_ordering(ordering)
            .generate()?;

        let mut data = vec![0.0; samples * steps * dim];
        for sample in 0..samples {
            let mut state = vec![0.0; dim];
            let mut previous = 0.0;
            for (k, &t) in times.iter().enumerate() {
                let dt = (t - previous).max(0.0);
                let sqrt_dt = dt.sqrt();
                let draw = &gaussians[(sample * steps + k) * dim..(sample * steps + k + 1) * dim];
                for i in 0..n {
                    state[i] += self.rate_vols[i] * sqrt_dt * draw[i];
                }
                for j in 1..n {
                    state[n + j - 1] += sqrt_dt * draw[n + j - 1];
                }
                let offset = (sample * steps + k) * dim;
                data[offset..offset + dim].copy_from_slice(&state);
                previous = t;
            }
        }
        Ok(PathBatch::new(samples, times.to_vec(), dim, data))
    }

    fn numeraire(&self, t: Time, state: &[f64]) -> Result<f64> {
        let z = self.rate_factor(0, state)?;
        Ok((t * z + 0.5 * t * t * self.zeta(0, t)).exp() / self.discount(0, t))
    }

    fn fx_to_base(&self, ccy_index: usize, t: Time, state: &[f64]) -> Result<f64> {
        if ccy_index == 0 {
            return Ok(1.0);
        }
        if ccy_index >= self.currencies.len() {
            return Err(AmcError::NotFoundError(format!(
                "currency index {} out of range",
                ccy_index
            )));
        }
        let w = self.fx_factor(ccy_index, state)?;
        let sigma = self.fx_vols[ccy_index];
        let drift = (self.rates[0] - self.rates[ccy_index]) * t;
        Ok(self.fx_spots[ccy_index] * (drift + sigma * w - 0.5 * sigma * sigma * t).exp())
    }

    fn forward_rate(
        &self,
        ccy_index: usize,
        fixing: Time,
        start: Time,
        end: Time,
        accrual: f64,
        state: &[f64],
    ) -> Result<f64> {
        if accrual <= 0.0 {
            return Err(AmcError::InvalidOperation(format!(
                "non-positive accrual {} for forward rate",
                accrual
            )));
        }
        let z = self.rate_factor(ccy_index, state)?;
        let p_start = self.zerobond(ccy_index, fixing, start.max(fixing), z);
        let p_end = self.zerobond(ccy_index, fixing, end, z);
        Ok((p_start / p_end - 1.0) / accrual)
    }
}
