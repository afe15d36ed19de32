//! American Monte Carlo pricing of multi-leg instruments with optionality.
//!
//! The crate runs an expensive calibration phase once per instrument
//! (internal Monte Carlo batch plus Longstaff-Schwartz regressions) and hands
//! out a cheap, reusable [`engine::amccalculator::AmcCalculator`] that an
//! outer exposure simulation can invoke once per scenario path.

pub mod data;
pub mod engine;
pub mod math;
pub mod models;
pub mod prelude;
pub mod utils;
