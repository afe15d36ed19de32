use serde::{Deserialize, Serialize};
use std::fmt;

/// # Currency
/// Currencies known to the engine. The stochastic model owns the list of
/// simulated currencies; cashflows carry a `Currency` that is resolved to a
/// model currency index when the descriptors are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CHF,
    CLP,
    BRL,
    MXN,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
            Currency::CLP => "CLP",
            Currency::BRL => "BRL",
            Currency::MXN => "MXN",
        };
        write!(f, "{}", code)
    }
}
