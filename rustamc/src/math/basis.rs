use serde::{Deserialize, Serialize};
use tracing::warn;

/// Polynomial family used for the regression basis. Only `Monomial` has an
/// implementation; other configured families fall back to monomials with a
/// warning, matching the documented restriction of the reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolynomialType {
    Monomial,
    Chebyshev,
    Legendre,
}

/// # BasisSystem
/// Multivariate polynomial basis over the regression state: all monomials
/// with total degree up to `order` in `dimension` variables, ordered by
/// total degree and then lexicographically. The first function is the
/// constant term. Size is C(dimension + order, order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisSystem {
    dimension: usize,
    order: usize,
    exponents: Vec<Vec<u32>>,
}

impl BasisSystem {
    pub fn new(dimension: usize, order: usize, polynomial_type: PolynomialType) -> BasisSystem {
        if polynomial_type != PolynomialType::Monomial {
            warn!(
                "polynomial type {:?} is not implemented, falling back to monomials",
                polynomial_type
            );
        }
        let mut exponents = Vec::new();
        for total in 0..=order as u32 {
            push_compositions(dimension, total, &mut Vec::new(), &mut exponents);
        }
        BasisSystem {
            dimension,
            order,
            exponents,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Evaluates every basis function at `state` into `out`. `state` must
    /// have length `dimension`, `out` length `len()`.
    pub fn eval_into(&self, state: &[f64], out: &mut [f64]) {
        for (slot, exps) in out.iter_mut().zip(self.exponents.iter()) {
            let mut v = 1.0;
            for (x, &e) in state.iter().zip(exps.iter()) {
                v *= x.powi(e as i32);
            }
            *slot = v;
        }
    }

    pub fn eval(&self, state: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.len()];
        self.eval_into(state, &mut out);
        out
    }
}

fn push_compositions(
    dimension: usize,
    remaining: u32,
    current: &mut Vec<u32>,
    out: &mut Vec<Vec<u32>>,
) {
    if current.len() == dimension {
        if remaining == 0 {
            out.push(current.clone());
        }
        return;
    }
    // last position takes whatever degree is left
    if current.len() + 1 == dimension {
        current.push(remaining);
        out.push(current.clone());
        current.pop();
        return;
    }
    for e in (0..=remaining).rev() {
        current.push(e);
        push_compositions(dimension, remaining - e, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binomial(n: usize, k: usize) -> usize {
        let mut r = 1usize;
        for i in 0..k {
            r = r * (n - i) / (i + 1);
        }
        r
    }

    #[test]
    fn test_basis_size() {
        for dim in 1..4 {
            for order in 0..4 {
                let basis = BasisSystem::new(dim, order, PolynomialType::Monomial);
                assert_eq!(basis.len(), binomial(dim + order, order));
            }
        }
    }

    #[test]
    fn test_constant_term_first() {
        let basis = BasisSystem::new(2, 2, PolynomialType::Monomial);
        let values = basis.eval(&[3.0, 5.0]);
        assert_eq!(values[0], 1.0);
    }

    #[test]
    fn test_univariate_monomials() {
        let basis = BasisSystem::new(1, 3, PolynomialType::Monomial);
        let values = basis.eval(&[2.0]);
        assert_eq!(values, vec![1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_bivariate_order_two() {
        let basis = BasisSystem::new(2, 2, PolynomialType::Monomial);
        assert_eq!(basis.len(), 6);
        let values = basis.eval(&[2.0, 3.0]);
        // degree 0: 1; degree 1: x, y; degree 2: x^2, x*y, y^2
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_non_monomial_falls_back() {
        let a = BasisSystem::new(2, 2, PolynomialType::Chebyshev);
        let b = BasisSystem::new(2, 2, PolynomialType::Monomial);
        assert_eq!(a.eval(&[1.5, -0.5]), b.eval(&[1.5, -0.5]));
    }
}
