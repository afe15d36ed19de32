use crate::data::cashflow::{Cashflow, CashflowKind, Leg, RateAveraging};
use crate::models::montecarlomodel::StochasticModel;
use crate::utils::errors::{AmcError, Result};
use crate::utils::num::{Time, TIME_TOLERANCE};

/// How a floating coupon observes its rate: either already fixed (past
/// fixing or plain fixed resolution) or forward-looking from model state at
/// the fixing time.
#[derive(Debug, Clone, PartialEq)]
pub enum RateObservation {
    Fixed(f64),
    Forward { slot: usize, fixing_time: Time },
}

/// # AmountFormula
/// Resolved amount formula of one simulated cashflow. `slot` values index
/// into the descriptor's `required_times`; the evaluator maps them to
/// simulation-grid positions once per batch. Evaluation is an exhaustive
/// match, side-effect free and safe to invoke out of order.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountFormula {
    Fixed {
        amount: f64,
    },
    Floating {
        observation: RateObservation,
        period_start: Time,
        period_end: Time,
        accrual: f64,
        notional: f64,
        gearing: f64,
        spread: f64,
        cap: Option<f64>,
        floor: Option<f64>,
    },
    FxLinked {
        slot: usize,
        fixing_time: Time,
        foreign_ccy_index: usize,
        foreign_amount: f64,
    },
}

/// # CashflowInfo
/// Flat, time-indexed description of one simulated cashflow: where it came
/// from, when it pays, which currency and payer sign apply, which simulation
/// times its amount needs and the formula itself.
///
/// Invariants: `pay_time` is strictly positive and not smaller than any
/// required time; `exercise_into_time`, when present, does not exceed
/// `pay_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowInfo {
    leg_index: usize,
    cashflow_index: usize,
    pay_time: Time,
    exercise_into_time: Option<Time>,
    pay_ccy_index: usize,
    payer_sign: f64,
    required_times: Vec<Time>,
    formula: AmountFormula,
}

impl CashflowInfo {
    /// Builds the descriptor for one leg cashflow, or `None` when the flow
    /// settled at or before the valuation date. Fails fast with
    /// [`AmcError::UnsupportedCashflowKind`] when no amount formula exists
    /// for the flow's configuration; silent omission would corrupt the
    /// valuation.
    pub fn build<M: StochasticModel>(
        model: &M,
        leg: &Leg,
        cashflow: &Cashflow,
        leg_index: usize,
        cashflow_index: usize,
        under_exercise: bool,
    ) -> Result<Option<CashflowInfo>> {
        let pay_time = cashflow.pay_time();
        if pay_time <= TIME_TOLERANCE {
            return Ok(None);
        }
        let pay_ccy_index = model.currency_index(leg.currency())?;

        // observation times the amount formula needs, excluding the pay time
        let mut observation_times: Vec<Time> = Vec::new();
        let mut lock_in_time = pay_time;

        let formula = match cashflow.kind() {
            CashflowKind::Fixed { amount } => AmountFormula::Fixed { amount: *amount },
            CashflowKind::Floating {
                fixing_time,
                period_start,
                period_end,
                accrual,
                notional,
                gearing,
                spread,
                past_fixing,
                averaging,
            }
            | CashflowKind::CappedFloored {
                fixing_time,
                period_start,
                period_end,
                accrual,
                notional,
                gearing,
                spread,
                past_fixing,
                averaging,
                ..
            } => {
                if *averaging == RateAveraging::Compounded {
                    return Err(AmcError::UnsupportedCashflowKind(format!(
                        "compounded floating coupon (leg {}, cashflow {})",
                        leg_index, cashflow_index
                    )));
                }
                let observation = if *fixing_time <= TIME_TOLERANCE {
                    match past_fixing {
                        Some(rate) => RateObservation::Fixed(*rate),
                        None => {
                            return Err(AmcError::UnsupportedCashflowKind(format!(
                                "floating coupon fixing at {} without past fixing (leg {}, cashflow {})",
                                fixing_time, leg_index, cashflow_index
                            )))
                        }
                    }
                } else {
                    observation_times.push(*fixing_time);
                    RateObservation::Forward {
                        slot: 0,
                        fixing_time: *fixing_time,
                    }
                };
                let (cap, floor) = match cashflow.kind() {
                    CashflowKind::CappedFloored { cap, floor, .. } => (*cap, *floor),
                    _ => (None, None),
                };
                lock_in_time = period_start.max(0.0).min(pay_time);
                AmountFormula::Floating {
                    observation,
                    period_start: *period_start,
                    period_end: *period_end,
                    accrual: *accrual,
                    notional: *notional,
                    gearing: *gearing,
                    spread: *spread,
                    cap,
                    floor,
                }
            }
            CashflowKind::FxLinked {
                fixing_time,
                foreign_currency,
                foreign_amount,
            } => {
                let foreign_ccy_index = model.currency_index(*foreign_currency)?;
                let fixing = fixing_time.max(0.0).min(pay_time);
                observation_times.push(fixing);
                lock_in_time = fixing;
                AmountFormula::FxLinked {
                    slot: 0,
                    fixing_time: fixing,
                    foreign_ccy_index,
                    foreign_amount: *foreign_amount,
                }
            }
        };

        // the pay time is always required: numeraire and FX conversion are
        // observed there
        let mut required_times = observation_times.clone();
        required_times.push(pay_time);
        required_times
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        required_times.dedup_by(|a, b| (*a - *b).abs() < TIME_TOLERANCE);

        // resolve observation slots against the final ordered set
        let formula = match formula {
            AmountFormula::Floating {
                observation: RateObservation::Forward { fixing_time, .. },
                period_start,
                period_end,
                accrual,
                notional,
                gearing,
                spread,
                cap,
                floor,
            } => AmountFormula::Floating {
                observation: RateObservation::Forward {
                    slot: slot_of(&required_times, fixing_time),
                    fixing_time,
                },
                period_start,
                period_end,
                accrual,
                notional,
                gearing,
                spread,
                cap,
                floor,
            },
            AmountFormula::FxLinked {
                fixing_time,
                foreign_ccy_index,
                foreign_amount,
                ..
            } => AmountFormula::FxLinked {
                slot: slot_of(&required_times, fixing_time),
                fixing_time,
                foreign_ccy_index,
                foreign_amount,
            },
            other => other,
        };

        let exercise_into_time = if under_exercise {
            Some(lock_in_time)
        } else {
            None
        };

        Ok(Some(CashflowInfo {
            leg_index,
            cashflow_index,
            pay_time,
            exercise_into_time,
            pay_ccy_index,
            payer_sign: leg.side().sign(),
            required_times,
            formula,
        }))
    }

    pub fn leg_index(&self) -> usize {
        self.leg_index
    }

    pub fn cashflow_index(&self) -> usize {
        self.cashflow_index
    }

    pub fn pay_time(&self) -> Time {
        self.pay_time
    }

    pub fn exercise_into_time(&self) -> Option<Time> {
        self.exercise_into_time
    }

    pub fn pay_ccy_index(&self) -> usize {
        self.pay_ccy_index
    }

    pub fn payer_sign(&self) -> f64 {
        self.payer_sign
    }

    pub fn required_times(&self) -> &[Time] {
        &self.required_times
    }

    pub fn formula(&self) -> &AmountFormula {
        &self.formula
    }
}

fn slot_of(times: &[Time], t: Time) -> usize {
    times
        .iter()
        .position(|&x| (x - t).abs() < TIME_TOLERANCE)
        .unwrap_or(0)
}
