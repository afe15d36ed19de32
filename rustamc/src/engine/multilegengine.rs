use rayon::prelude::*;
use tracing::debug;

use crate::data::cashflow::{ExerciseSchedule, Leg, Settlement};
use crate::data::cashflowinfo::CashflowInfo;
use crate::data::timegrid::TimeGrid;
use crate::engine::amccalculator::{merge_event_times, AmcCalculator};
use crate::engine::config::McEngineConfig;
use crate::engine::pathvalue::PathValuator;
use crate::math::basis::BasisSystem;
use crate::math::regression::RegressionFit;
use crate::models::montecarlomodel::{PathBatch, StochasticModel};
use crate::utils::errors::{AmcError, Result};
use crate::utils::num::{Time, TIME_TOLERANCE};

/// # McMultiLegEngine
/// Longstaff-Schwartz calibration of a multi-leg instrument with an optional
/// embedded exercise right. One internal Monte Carlo batch is simulated, the
/// cashflows are valued pathwise, and a backward induction over the merged
/// exercise/exposure schedule fits the regression surfaces the reusable
/// [`AmcCalculator`] carries.
///
/// Backward induction per time, latest first: fold in the cashflows that
/// become live, regress the exercise-into value and the continuation value
/// at exercise times and update the realized option value where the fitted
/// exercise value wins strictly, regress the dirty underlying and the option
/// value at exposure times. Ties prefer continuation; a never-positive
/// exercise value never exercises.
pub struct McMultiLegEngine<'a, M: StochasticModel> {
    model: &'a M,
    legs: Vec<Leg>,
    exercise: Option<ExerciseSchedule>,
    exposure_times: Vec<Time>,
    config: McEngineConfig,
}

/// Output of a calibration run: the valuation-date results plus the
/// calculator an outer simulation can take ownership of.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    result_value: f64,
    underlying_npv: f64,
    calculator: AmcCalculator,
}

impl Calibration {
    /// Value of the instrument at the valuation date, optionality included.
    pub fn result_value(&self) -> f64 {
        self.result_value
    }

    /// Value of the bare underlying legs at the valuation date, ignoring
    /// any exercise right.
    pub fn underlying_npv(&self) -> f64 {
        self.underlying_npv
    }

    pub fn calculator(&self) -> &AmcCalculator {
        &self.calculator
    }

    pub fn into_calculator(self) -> AmcCalculator {
        self.calculator
    }
}

impl<'a, M: StochasticModel> McMultiLegEngine<'a, M> {
    pub fn new(
        model: &'a M,
        legs: Vec<Leg>,
        exercise: Option<ExerciseSchedule>,
        exposure_times: Vec<Time>,
        config: McEngineConfig,
    ) -> McMultiLegEngine<'a, M> {
        McMultiLegEngine {
            model,
            legs,
            exercise,
            exposure_times,
            config,
        }
    }

    /// Runs the expensive phase once: simulation, pathwise cashflow
    /// valuation and the regression backward induction.
    pub fn calibrate(&self) -> Result<Calibration> {
        // exercise rights at or before the valuation date are gone; an
        // exercise schedule with no future dates degenerates to the bare
        // underlying
        let mut exercise_times: Vec<Time> = self
            .exercise
            .as_ref()
            .map(|e| e.times().iter().copied().filter(|&t| t > TIME_TOLERANCE).collect())
            .unwrap_or_default();
        sort_times(&mut exercise_times);
        let settlement: Option<Settlement> = if exercise_times.is_empty() {
            None
        } else {
            self.exercise.as_ref().map(|e| e.settlement())
        };
        let has_exercise = settlement.is_some();

        let mut exposure_times: Vec<Time> = self
            .exposure_times
            .iter()
            .copied()
            .filter(|&t| t > TIME_TOLERANCE)
            .collect();
        sort_times(&mut exposure_times);

        let mut infos: Vec<CashflowInfo> = Vec::new();
        for (leg_index, leg) in self.legs.iter().enumerate() {
            for (cashflow_index, cashflow) in leg.cashflows().iter().enumerate() {
                if let Some(info) = CashflowInfo::build(
                    self.model,
                    leg,
                    cashflow,
                    leg_index,
                    cashflow_index,
                    has_exercise,
                )? {
                    infos.push(info);
                }
            }
        }

        let state_indices: Vec<usize> = match self.config.external_state_indices() {
            Some(indices) => indices.clone(),
            None => (0..self.model.state_dimension()).collect(),
        };
        if let Some(&bad) = state_indices
            .iter()
            .find(|&&i| i >= self.model.state_dimension())
        {
            return Err(AmcError::InvalidOperation(format!(
                "state index {} exceeds the model state dimension {}",
                bad,
                self.model.state_dimension()
            )));
        }
        let basis = BasisSystem::new(
            state_indices.len(),
            self.config.polynom_order(),
            self.config.polynomial_type(),
        );
        let samples = self.config.calibration_samples();
        if samples < basis.len() {
            return Err(AmcError::InsufficientSamples(format!(
                "{} calibration samples cannot identify a basis of size {}",
                samples,
                basis.len()
            )));
        }

        let grid = TimeGrid::new(
            infos
                .iter()
                .flat_map(|i| i.required_times().iter().copied())
                .chain(exercise_times.iter().copied())
                .chain(exposure_times.iter().copied()),
        );

        let batch = self.model.generate_paths(
            grid.times(),
            samples,
            self.config.calibration_seed(),
            self.config.sequence_type(),
            self.config.ordering(),
            self.config.direction_integers(),
        )?;
        let cf_values = self.path_values(&grid, &batch, &infos)?;
        let ncf = infos.len();

        let underlying_npv = mean(
            &(0..samples)
                .map(|s| cf_values[s * ncf..(s + 1) * ncf].iter().sum())
                .collect::<Vec<f64>>(),
        );

        // running pathwise sums folded in as times pass below the triggers
        let mut und_dirty = vec![0.0; samples];
        let mut und_ex_into = vec![0.0; samples];
        let mut option_value = vec![0.0; samples];

        let mut by_pay: Vec<usize> = (0..ncf).collect();
        by_pay.sort_by(|&a, &b| {
            infos[b]
                .pay_time()
                .partial_cmp(&infos[a].pay_time())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut by_lock_in: Vec<(usize, Time)> = infos
            .iter()
            .enumerate()
            .filter_map(|(i, info)| info.exercise_into_time().map(|t| (i, t)))
            .collect();
        by_lock_in.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let mut pay_cursor = 0;
        let mut lock_cursor = 0;

        let dim = state_indices.len();
        let events = merge_event_times(&exercise_times, &exposure_times);
        let mut coeffs_und_dirty: Vec<RegressionFit> = Vec::with_capacity(exposure_times.len());
        let mut coeffs_option: Vec<RegressionFit> = Vec::with_capacity(exposure_times.len());
        let mut coeffs_und_ex_into: Vec<RegressionFit> = Vec::with_capacity(exercise_times.len());
        let mut coeffs_continuation: Vec<RegressionFit> = Vec::with_capacity(exercise_times.len());

        for event in events.iter().rev() {
            let t = event.time;
            while pay_cursor < by_pay.len()
                && infos[by_pay[pay_cursor]].pay_time() >= t - TIME_TOLERANCE
            {
                let i = by_pay[pay_cursor];
                for (s, value) in und_dirty.iter_mut().enumerate() {
                    *value += cf_values[s * ncf + i];
                }
                pay_cursor += 1;
            }
            while lock_cursor < by_lock_in.len() && by_lock_in[lock_cursor].1 >= t - TIME_TOLERANCE
            {
                let i = by_lock_in[lock_cursor].0;
                for (s, value) in und_ex_into.iter_mut().enumerate() {
                    *value += cf_values[s * ncf + i];
                }
                lock_cursor += 1;
            }

            let states = projected_states(&batch, grid.index_of(t)?, &state_indices);

            if event.exercise.is_some() {
                let fit_exercise = RegressionFit::fit(&basis, &states, &und_ex_into);
                let fit_continuation = RegressionFit::fit(&basis, &states, &option_value);
                for (s, option) in option_value.iter_mut().enumerate() {
                    let state = &states[s * dim..(s + 1) * dim];
                    let exercise = fit_exercise.value(&basis, state);
                    let continuation = fit_continuation.value(&basis, state);
                    if exercise > continuation && exercise > 0.0 {
                        *option = und_ex_into[s];
                    }
                }
                coeffs_und_ex_into.push(fit_exercise);
                coeffs_continuation.push(fit_continuation);
            }
            if event.exposure.is_some() {
                coeffs_und_dirty.push(RegressionFit::fit(&basis, &states, &und_dirty));
                coeffs_option.push(RegressionFit::fit(&basis, &states, &option_value));
            }
        }
        coeffs_und_dirty.reverse();
        coeffs_option.reverse();
        coeffs_und_ex_into.reverse();
        coeffs_continuation.reverse();

        let calibration_estimate = if has_exercise {
            mean(&option_value)
        } else {
            underlying_npv
        };
        let result_value = if self.config.pricing_samples() > 0 {
            self.reprice(
                &grid,
                &infos,
                &exercise_times,
                &basis,
                &state_indices,
                &coeffs_und_ex_into,
                &coeffs_continuation,
            )?
        } else {
            calibration_estimate
        };

        debug!(
            "calibration done: result {}, underlying {}, {} cashflows, {} grid times",
            result_value,
            underlying_npv,
            ncf,
            grid.len()
        );

        let calculator = AmcCalculator::new(
            result_value,
            self.model.base_currency(),
            settlement,
            exercise_times,
            exposure_times,
            basis,
            state_indices,
            self.model.initial_state(),
            coeffs_und_dirty,
            coeffs_und_ex_into,
            coeffs_continuation,
            coeffs_option,
        )?;

        Ok(Calibration {
            result_value,
            underlying_npv,
            calculator,
        })
    }

    /// Pathwise cashflow values for one batch, sample-major. Samples are
    /// valued in parallel and collected in index order, so the layout is
    /// independent of scheduling.
    fn path_values(
        &self,
        grid: &TimeGrid,
        batch: &PathBatch,
        infos: &[CashflowInfo],
    ) -> Result<Vec<f64>> {
        let valuator = PathValuator::new(self.model, grid, batch, infos)?;
        let rows: Vec<Vec<f64>> = (0..batch.samples())
            .into_par_iter()
            .map(|sample| {
                (0..infos.len())
                    .map(|i| valuator.value(i, sample))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Independent re-pricing batch: fresh paths, fitted exercise decisions,
    /// realized payoffs.
    #[allow(clippy::too_many_arguments)]
    fn reprice(
        &self,
        grid: &TimeGrid,
        infos: &[CashflowInfo],
        exercise_times: &[Time],
        basis: &BasisSystem,
        state_indices: &[usize],
        coeffs_und_ex_into: &[RegressionFit],
        coeffs_continuation: &[RegressionFit],
    ) -> Result<f64> {
        let samples = self.config.pricing_samples();
        let batch = self.model.generate_paths(
            grid.times(),
            samples,
            self.config.pricing_seed(),
            self.config.sequence_type(),
            self.config.ordering(),
            self.config.direction_integers(),
        )?;
        let cf_values = self.path_values(grid, &batch, infos)?;
        let ncf = infos.len();

        if exercise_times.is_empty() {
            return Ok(mean(
                &(0..samples)
                    .map(|s| cf_values[s * ncf..(s + 1) * ncf].iter().sum())
                    .collect::<Vec<f64>>(),
            ));
        }

        let positions = exercise_times
            .iter()
            .map(|&t| grid.index_of(t))
            .collect::<Result<Vec<usize>>>()?;
        let mut projected = vec![0.0; state_indices.len()];
        let mut total = 0.0;
        for s in 0..samples {
            let mut payoff = 0.0;
            for (k, &t) in exercise_times.iter().enumerate() {
                let state = batch.state(s, positions[k]);
                for (slot, &index) in projected.iter_mut().zip(state_indices.iter()) {
                    *slot = state[index];
                }
                let exercise = coeffs_und_ex_into[k].value(basis, &projected);
                let continuation = coeffs_continuation[k].value(basis, &projected);
                if exercise > continuation && exercise > 0.0 {
                    payoff = infos
                        .iter()
                        .enumerate()
                        .filter(|(_, info)| {
                            info.exercise_into_time()
                                .map(|lock| lock >= t - TIME_TOLERANCE)
                                .unwrap_or(false)
                        })
                        .map(|(i, _)| cf_values[s * ncf + i])
                        .sum();
                    break;
                }
            }
            total += payoff;
        }
        Ok(total / samples as f64)
    }
}

fn sort_times(times: &mut Vec<Time>) {
    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    times.dedup_by(|a, b| (*a - *b).abs() < TIME_TOLERANCE);
}

fn projected_states(batch: &PathBatch, grid_position: usize, state_indices: &[usize]) -> Vec<f64> {
    let mut out = Vec::with_capacity(batch.samples() * state_indices.len());
    for sample in 0..batch.samples() {
        let state = batch.state(sample, grid_position);
        for &index in state_indices {
            out.push(state[index]);
        }
    }
    out
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
