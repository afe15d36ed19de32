use crate::data::cashflowinfo::{AmountFormula, CashflowInfo, RateObservation};
use crate::data::timegrid::TimeGrid;
use crate::models::montecarlomodel::{PathBatch, StochasticModel};
use crate::utils::errors::Result;

/// # PathValuator
/// Evaluates single cashflows along simulated paths: applies the amount
/// formula on the state slices at the required times, converts into base
/// currency with the simulated FX factor at the pay time, deflates by the
/// numeraire there and applies the payer sign. Amounts are deflated exactly
/// once; the result is the value discounted to the valuation date.
///
/// Grid positions of every required time are resolved once at construction
/// so per-sample evaluation is pure lookups; evaluation is side-effect free
/// and safe to run out of order and in parallel.
pub struct PathValuator<'a, M: StochasticModel> {
    model: &'a M,
    batch: &'a PathBatch,
    infos: &'a [CashflowInfo],
    slots: Vec<Vec<usize>>,
    pay_positions: Vec<usize>,
}

impl<'a, M: StochasticModel> PathValuator<'a, M> {
    pub fn new(
        model: &'a M,
        grid: &TimeGrid,
        batch: &'a PathBatch,
        infos: &'a [CashflowInfo],
    ) -> Result<PathValuator<'a, M>> {
        let mut slots = Vec::with_capacity(infos.len());
        let mut pay_positions = Vec::with_capacity(infos.len());
        for info in infos {
            let positions = info
                .required_times()
                .iter()
                .map(|&t| grid.index_of(t))
                .collect::<Result<Vec<usize>>>()?;
            slots.push(positions);
            pay_positions.push(grid.index_of(info.pay_time())?);
        }
        Ok(PathValuator {
            model,
            batch,
            infos,
            slots,
            pay_positions,
        })
    }

    /// Base-currency value of one cashflow on one path, discounted to the
    /// valuation date.
    pub fn value(&self, cashflow_index: usize, sample: usize) -> Result<f64> {
        let info = &self.infos[cashflow_index];
        let slots = &self.slots[cashflow_index];

        let amount = match info.formula() {
            AmountFormula::Fixed { amount } => *amount,
            AmountFormula::Floating {
                observation,
                period_start,
                period_end,
                accrual,
                notional,
                gearing,
                spread,
                cap,
                floor,
            } => {
                let raw = match observation {
                    RateObservation::Fixed(rate) => *rate,
                    RateObservation::Forward { slot, fixing_time } => {
                        let state = self.batch.state(sample, slots[*slot]);
                        self.model.forward_rate(
                            info.pay_ccy_index(),
                            *fixing_time,
                            *period_start,
                            *period_end,
                            *accrual,
                            state,
                        )?
                    }
                };
                let mut rate = gearing * raw + spread;
                if let Some(c) = cap {
                    rate = rate.min(*c);
                }
                if let Some(f) = floor {
                    rate = rate.max(*f);
                }
                rate * accrual * notional
            }
            AmountFormula::FxLinked {
                slot,
                fixing_time,
                foreign_ccy_index,
                foreign_amount,
            } => {
                let state = self.batch.state(sample, slots[*slot]);
                let foreign = self
                    .model
                    .fx_to_base(*foreign_ccy_index, *fixing_time, state)?;
                let pay = self
                    .model
                    .fx_to_base(info.pay_ccy_index(), *fixing_time, state)?;
                foreign_amount * foreign / pay
            }
        };

        let pay_state = self.batch.state(sample, self.pay_positions[cashflow_index]);
        let fx = self
            .model
            .fx_to_base(info.pay_ccy_index(), info.pay_time(), pay_state)?;
        let numeraire = self.model.numeraire(info.pay_time(), pay_state)?;
        Ok(info.payer_sign() * amount * fx / numeraire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cashflow::{Cashflow, CashflowKind, Leg, RateAveraging, Side};
    use crate::data::currency::Currency;
    use crate::models::gaussianmodel::MultiCcyGaussianModel;
    use crate::models::montecarlomodel::{BrownianOrdering, DirectionIntegers, SequenceType};

    fn deterministic_model() -> MultiCcyGaussianModel {
        MultiCcyGaussianModel::new(Currency::USD, 0.02, 0.0).with_currency(
            Currency::EUR,
            0.01,
            0.0,
            1.1,
            0.0,
        )
    }

    fn build_infos(model: &MultiCcyGaussianModel, legs: &[Leg]) -> Vec<CashflowInfo> {
        let mut infos = Vec::new();
        for (li, leg) in legs.iter().enumerate() {
            for (ci, cf) in leg.cashflows().iter().enumerate() {
                if let Some(info) = CashflowInfo::build(model, leg, cf, li, ci, false).unwrap() {
                    infos.push(info);
                }
            }
        }
        infos
    }

    #[test]
    fn test_fixed_flow_discounts_to_valuation_date() {
        let model = deterministic_model();
        let leg = Leg::new(Currency::USD, Side::Receive).with_cashflows(vec![Cashflow::new(
            2.0,
            CashflowKind::Fixed { amount: 100.0 },
        )]);
        let infos = build_infos(&model, &[leg]);
        let grid = TimeGrid::new(infos.iter().flat_map(|i| i.required_times().to_vec()));
        let batch = model
            .generate_paths(
                grid.times(),
                4,
                1,
                SequenceType::PseudoRandom,
                BrownianOrdering::Steps,
                DirectionIntegers::JoeKuo,
            )
            .unwrap();
        let valuator = PathValuator::new(&model, &grid, &batch, &infos).unwrap();
        let v = valuator.value(0, 0).unwrap();
        assert!((v - 100.0 * (-0.02f64 * 2.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_foreign_currency_round_trip() {
        let model = deterministic_model();
        let leg = Leg::new(Currency::EUR, Side::Receive).with_cashflows(vec![Cashflow::new(
            1.0,
            CashflowKind::Fixed { amount: 200.0 },
        )]);
        let infos = build_infos(&model, &[leg]);
        let grid = TimeGrid::new(vec![1.0]);
        let batch = model
            .generate_paths(
                grid.times(),
                1,
                1,
                SequenceType::PseudoRandom,
                BrownianOrdering::Steps,
                DirectionIntegers::JoeKuo,
            )
            .unwrap();
        let valuator = PathValuator::new(&model, &grid, &batch, &infos).unwrap();
        let v = valuator.value(0, 0).unwrap();
        // undo the conversion and the deflation: the original amount returns
        let state = batch.state(0, 0);
        let fx = model.fx_to_base(1, 1.0, state).unwrap();
        let numeraire = model.numeraire(1.0, state).unwrap();
        assert!((v / fx * numeraire - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_floating_flow_zero_vol_matches_curve() {
        let model = deterministic_model();
        let leg = Leg::new(Currency::USD, Side::Receive).with_cashflows(vec![Cashflow::new(
            1.5,
            CashflowKind::Floating {
                fixing_time: 1.0,
                period_start: 1.0,
                period_end: 1.5,
                accrual: 0.5,
                notional: 1000.0,
                gearing: 1.0,
                spread: 0.0,
                past_fixing: None,
                averaging: RateAveraging::Simple,
            },
        )]);
        let infos = build_infos(&model, &[leg]);
        let grid = TimeGrid::new(vec![1.0, 1.5]);
        let batch = model
            .generate_paths(
                grid.times(),
                1,
                1,
                SequenceType::PseudoRandom,
                BrownianOrdering::Steps,
                DirectionIntegers::JoeKuo,
            )
            .unwrap();
        let valuator = PathValuator::new(&model, &grid, &batch, &infos).unwrap();
        let v = valuator.value(0, 0).unwrap();
        // flat curve: discounted forward coupon equals P(0,S) - P(0,E)
        let expected = 1000.0 * ((-0.02f64 * 1.0).exp() - (-0.02f64 * 1.5).exp());
        assert!((v - expected).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_is_repeatable_and_order_free() {
        let model = MultiCcyGaussianModel::new(Currency::USD, 0.02, 0.01);
        let leg = Leg::new(Currency::USD, Side::Pay).with_cashflows(vec![
            Cashflow::new(1.0, CashflowKind::Fixed { amount: 10.0 }),
            Cashflow::new(2.0, CashflowKind::Fixed { amount: 20.0 }),
        ]);
        let infos = build_infos(&model, &[leg]);
        let grid = TimeGrid::new(vec![1.0, 2.0]);
        let batch = model
            .generate_paths(
                grid.times(),
                8,
                3,
                SequenceType::PseudoRandom,
                BrownianOrdering::Steps,
                DirectionIntegers::JoeKuo,
            )
            .unwrap();
        let valuator = PathValuator::new(&model, &grid, &batch, &infos).unwrap();
        let forward: Vec<f64> = (0..8).map(|s| valuator.value(1, s).unwrap()).collect();
        let backward: Vec<f64> = (0..8).rev().map(|s| valuator.value(1, s).unwrap()).collect();
        let backward: Vec<f64> = backward.into_iter().rev().collect();
        assert_eq!(forward, backward);
    }
}
