use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::math::basis::BasisSystem;

/// Relative singular-value cutoff below which the regression matrix is
/// treated as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// # RegressionFit
/// Least-squares fit of a value against a polynomial basis of the state.
/// Degenerate fits (rank-deficient design matrix, e.g. a constant state
/// across the batch) fall back to the constant batch-mean approximation
/// instead of failing; the fallback is flagged and logged as a quality
/// warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    coeffs: Vec<f64>,
    degenerate: bool,
}

impl RegressionFit {
    /// Fits `values` against the basis evaluated on `states`, a row-major
    /// `values.len() x basis.dimension()` matrix of state observations.
    pub fn fit(basis: &BasisSystem, states: &[f64], values: &[f64]) -> RegressionFit {
        let n = values.len();
        let m = basis.len();
        let dim = basis.dimension();
        debug_assert_eq!(states.len(), n * dim);

        let mut design = DMatrix::<f64>::zeros(n, m);
        let mut row = vec![0.0; m];
        for i in 0..n {
            basis.eval_into(&states[i * dim..(i + 1) * dim], &mut row);
            for (j, &v) in row.iter().enumerate() {
                design[(i, j)] = v;
            }
        }
        let y = DVector::from_column_slice(values);

        let svd = design.svd(true, true);
        let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let cutoff = max_sv * RANK_TOLERANCE;
        let rank = svd.singular_values.iter().filter(|&&s| s > cutoff).count();

        if rank < m || max_sv == 0.0 {
            warn!(
                "degenerate regression (rank {} of {}), falling back to constant fit",
                rank, m
            );
            return RegressionFit::constant(mean(values), m);
        }

        match svd.solve(&y, cutoff) {
            Ok(solution) => RegressionFit {
                coeffs: solution.iter().cloned().collect(),
                degenerate: false,
            },
            Err(e) => {
                warn!("regression solve failed ({}), falling back to constant fit", e);
                RegressionFit::constant(mean(values), m)
            }
        }
    }

    /// Constant approximation: intercept only.
    pub fn constant(value: f64, basis_size: usize) -> RegressionFit {
        let mut coeffs = vec![0.0; basis_size];
        if !coeffs.is_empty() {
            coeffs[0] = value;
        }
        RegressionFit {
            coeffs,
            degenerate: true,
        }
    }

    /// Evaluates the fitted polynomial at one state observation.
    pub fn value(&self, basis: &BasisSystem, state: &[f64]) -> f64 {
        let mut row = vec![0.0; self.coeffs.len()];
        basis.eval_into(state, &mut row);
        row.iter().zip(self.coeffs.iter()).map(|(b, c)| b * c).sum()
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
