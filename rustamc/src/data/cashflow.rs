use serde::{Deserialize, Serialize};

use crate::data::currency::Currency;
use crate::utils::num::Time;

/// # Side
/// Whether a leg is paid or received, seen from the party running the
/// valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Pay,
    Receive,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Pay => -1.0,
            Side::Receive => 1.0,
        }
    }
}

/// Rate averaging convention of a floating coupon. Compounded coupons have
/// no implemented amount formula and are rejected at descriptor build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateAveraging {
    Simple,
    Compounded,
}

/// # CashflowKind
/// Closed set of cashflow amount formulas. Evaluation is an exhaustive
/// match; adding a kind requires a new variant and a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CashflowKind {
    /// Known amount in the leg currency.
    Fixed { amount: f64 },
    /// Floating-rate coupon on a forward rate observed at `fixing_time` for
    /// the accrual period `[period_start, period_end]`. `past_fixing` must
    /// be supplied when the fixing time lies before the valuation date.
    Floating {
        fixing_time: Time,
        period_start: Time,
        period_end: Time,
        accrual: f64,
        notional: f64,
        gearing: f64,
        spread: f64,
        past_fixing: Option<f64>,
        averaging: RateAveraging,
    },
    /// Floating-rate coupon with a cap and/or floor applied to the
    /// all-in rate.
    CappedFloored {
        fixing_time: Time,
        period_start: Time,
        period_end: Time,
        accrual: f64,
        notional: f64,
        gearing: f64,
        spread: f64,
        past_fixing: Option<f64>,
        averaging: RateAveraging,
        cap: Option<f64>,
        floor: Option<f64>,
    },
    /// Amount fixed in a foreign currency and converted into the leg
    /// currency at the FX rate observed at `fixing_time`.
    FxLinked {
        fixing_time: Time,
        foreign_currency: Currency,
        foreign_amount: f64,
    },
}

/// # Cashflow
/// A single schedule entry with resolved pay time and amount formula data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cashflow {
    pay_time: Time,
    kind: CashflowKind,
}

impl Cashflow {
    pub fn new(pay_time: Time, kind: CashflowKind) -> Cashflow {
        Cashflow { pay_time, kind }
    }

    pub fn pay_time(&self) -> Time {
        self.pay_time
    }

    pub fn kind(&self) -> &CashflowKind {
        &self.kind
    }
}

/// # Leg
/// An ordered list of cashflows sharing a currency and a payer side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    currency: Currency,
    side: Side,
    cashflows: Vec<Cashflow>,
}

impl Leg {
    pub fn new(currency: Currency, side: Side) -> Leg {
        Leg {
            currency,
            side,
            cashflows: Vec::new(),
        }
    }

    pub fn with_cashflows(mut self, cashflows: Vec<Cashflow>) -> Leg {
        self.cashflows = cashflows;
        self
    }

    pub fn add_cashflow(&mut self, cashflow: Cashflow) {
        self.cashflows.push(cashflow);
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn cashflows(&self) -> &Vec<Cashflow> {
        &self.cashflows
    }
}

/// Settlement convention of the exercise right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Physical,
    Cash,
}

/// # ExerciseSchedule
/// Decision times of the embedded option, ascending, plus the settlement
/// convention. Times at or before the valuation date are ignored by the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSchedule {
    times: Vec<Time>,
    settlement: Settlement,
}

impl ExerciseSchedule {
    pub fn new(times: Vec<Time>, settlement: Settlement) -> ExerciseSchedule {
        ExerciseSchedule { times, settlement }
    }

    pub fn times(&self) -> &Vec<Time> {
        &self.times
    }

    pub fn settlement(&self) -> Settlement {
        self.settlement
    }
}
