use serde::{Deserialize, Serialize};

use crate::data::cashflow::Settlement;
use crate::data::currency::Currency;
use crate::math::basis::BasisSystem;
use crate::math::regression::RegressionFit;
use crate::utils::errors::{AmcError, Result};
use crate::utils::num::{Time, TIME_TOLERANCE};

/// One entry of the merged exercise/exposure schedule. Where an exercise
/// and an exposure time coincide, both indices are set and the exercise
/// decision is applied before the exposure value is read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct EventTime {
    pub time: Time,
    pub exercise: Option<usize>,
    pub exposure: Option<usize>,
}

pub(crate) fn merge_event_times(exercise: &[Time], exposure: &[Time]) -> Vec<EventTime> {
    let mut out: Vec<EventTime> = Vec::with_capacity(exercise.len() + exposure.len());
    let mut i = 0;
    let mut j = 0;
    while i < exercise.len() || j < exposure.len() {
        let te = exercise.get(i).copied();
        let tx = exposure.get(j).copied();
        match (te, tx) {
            (Some(te), Some(tx)) if (te - tx).abs() < TIME_TOLERANCE => {
                out.push(EventTime {
                    time: te,
                    exercise: Some(i),
                    exposure: Some(j),
                });
                i += 1;
                j += 1;
            }
            (Some(te), Some(tx)) if te < tx => {
                out.push(EventTime {
                    time: te,
                    exercise: Some(i),
                    exposure: None,
                });
                i += 1;
            }
            (Some(te), None) => {
                out.push(EventTime {
                    time: te,
                    exercise: Some(i),
                    exposure: None,
                });
                i += 1;
            }
            (_, Some(tx)) => {
                out.push(EventTime {
                    time: tx,
                    exercise: None,
                    exposure: Some(j),
                });
                j += 1;
            }
            (None, None) => unreachable!(),
        }
    }
    out
}

/// Exercise decision taken on one simulated path: the index into the
/// calculator's exercise times at which the option was exercised, if it was.
/// Returned by a valuation run and fed back into the matching close-out run
/// so both runs see the same decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseDecisions {
    exercised_at: Option<usize>,
}

impl ExerciseDecisions {
    pub fn none() -> ExerciseDecisions {
        ExerciseDecisions { exercised_at: None }
    }

    pub fn at(exercise_index: usize) -> ExerciseDecisions {
        ExerciseDecisions {
            exercised_at: Some(exercise_index),
        }
    }

    pub fn exercised_at(&self) -> Option<usize> {
        self.exercised_at
    }
}

/// Whether a path run takes its own exercise decisions or replays the
/// decisions of a previous valuation run on the close-out grid. Replay skips
/// the time-value cross-check because close-out grids are shifted against
/// the calibrated schedule by construction.
#[derive(Debug, Clone, Copy)]
pub enum StickyCloseOut<'a> {
    Fresh,
    Replay(&'a ExerciseDecisions),
}

/// Result of one path run: the conditional values and the decisions taken,
/// so a close-out run can replay them.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPath {
    pub values: Vec<f64>,
    pub decisions: ExerciseDecisions,
}

/// # AmcCalculator
/// The cheap, reusable product of a calibration run: fitted regression
/// coefficients for the dirty underlying, the exercise-into underlying, the
/// continuation value and the option value, per exercise and exposure time.
/// Evaluating a path costs a handful of polynomial evaluations and shares
/// nothing mutable, so one calculator serves many outer scenario paths
/// concurrently.
///
/// All values are in base currency, deflated to the valuation date by the
/// model numeraire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmcCalculator {
    result_value: f64,
    base_currency: Currency,
    settlement: Option<Settlement>,
    exercise_times: Vec<Time>,
    exposure_times: Vec<Time>,
    events: Vec<EventTime>,
    basis: BasisSystem,
    state_indices: Vec<usize>,
    initial_state: Vec<f64>,
    coeffs_und_dirty: Vec<RegressionFit>,
    coeffs_und_ex_into: Vec<RegressionFit>,
    coeffs_continuation: Vec<RegressionFit>,
    coeffs_option: Vec<RegressionFit>,
}

impl AmcCalculator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        result_value: f64,
        base_currency: Currency,
        settlement: Option<Settlement>,
        exercise_times: Vec<Time>,
        exposure_times: Vec<Time>,
        basis: BasisSystem,
        state_indices: Vec<usize>,
        initial_state: Vec<f64>,
        coeffs_und_dirty: Vec<RegressionFit>,
        coeffs_und_ex_into: Vec<RegressionFit>,
        coeffs_continuation: Vec<RegressionFit>,
        coeffs_option: Vec<RegressionFit>,
    ) -> Result<AmcCalculator> {
        if coeffs_und_dirty.len() != exposure_times.len()
            || coeffs_option.len() != exposure_times.len()
        {
            return Err(AmcError::InvalidOperation(format!(
                "expected one underlying and one option fit per exposure time ({}), got {} and {}",
                exposure_times.len(),
                coeffs_und_dirty.len(),
                coeffs_option.len()
            )));
        }
        if coeffs_und_ex_into.len() != exercise_times.len()
            || coeffs_continuation.len() != exercise_times.len()
        {
            return Err(AmcError::InvalidOperation(format!(
                "expected one exercise and one continuation fit per exercise time ({}), got {} and {}",
                exercise_times.len(),
                coeffs_und_ex_into.len(),
                coeffs_continuation.len()
            )));
        }
        if settlement.is_none() && !exercise_times.is_empty() {
            return Err(AmcError::InvalidOperation(
                "exercise times without a settlement convention".into(),
            ));
        }
        if let Some(&bad) = state_indices.iter().find(|&&i| i >= initial_state.len()) {
            return Err(AmcError::InvalidOperation(format!(
                "state index {} exceeds the state dimension {}",
                bad,
                initial_state.len()
            )));
        }
        let events = merge_event_times(&exercise_times, &exposure_times);
        Ok(AmcCalculator {
            result_value,
            base_currency,
            settlement,
            exercise_times,
            exposure_times,
            events,
            basis,
            state_indices,
            initial_state,
            coeffs_und_dirty,
            coeffs_und_ex_into,
            coeffs_continuation,
            coeffs_option,
        })
    }

    pub fn result_value(&self) -> f64 {
        self.result_value
    }

    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    pub fn settlement(&self) -> Option<Settlement> {
        self.settlement
    }

    pub fn exercise_times(&self) -> &[Time] {
        &self.exercise_times
    }

    pub fn exposure_times(&self) -> &[Time] {
        &self.exposure_times
    }

    /// Times the outer simulation must include on its grid: the merged
    /// exercise and exposure schedule, ascending.
    pub fn relevant_times(&self) -> Vec<Time> {
        self.events.iter().map(|e| e.time).collect()
    }

    /// Components of the outer model state the fitted polynomials read.
    pub fn state_indices(&self) -> &[usize] {
        &self.state_indices
    }

    /// Full model state at the valuation date, as recorded at calibration.
    pub fn initial_state(&self) -> &[f64] {
        &self.initial_state
    }

    /// Stride of the `states` argument of [`AmcCalculator::simulate_path`].
    pub fn state_dimension(&self) -> usize {
        self.initial_state.len()
    }

    pub fn basis(&self) -> &BasisSystem {
        &self.basis
    }

    /// Evaluates one outer scenario path.
    ///
    /// `states` holds one full model state per path time, flattened with
    /// stride [`AmcCalculator::state_dimension`]. `is_relevant_time` marks
    /// the path times that correspond, in order, to the merged
    /// exercise/exposure schedule; their count must match it exactly.
    ///
    /// The returned values have length `exposure_times().len() + 1`: the
    /// calibrated value at the valuation date first, then one conditional
    /// value per exposure time.
    pub fn simulate_path(
        &self,
        path_times: &[Time],
        states: &[f64],
        is_relevant_time: &[bool],
        sticky: StickyCloseOut,
    ) -> Result<SimulatedPath> {
        if path_times.len() != is_relevant_time.len() {
            return Err(AmcError::InvalidOperation(format!(
                "{} path times but {} relevance flags",
                path_times.len(),
                is_relevant_time.len()
            )));
        }
        let state_dimension = self.state_dimension();
        if states.len() != path_times.len() * state_dimension {
            return Err(AmcError::InvalidOperation(format!(
                "expected {} state values for {} path times, got {}",
                path_times.len() * state_dimension,
                path_times.len(),
                states.len()
            )));
        }
        let relevant: Vec<usize> = (0..path_times.len())
            .filter(|&i| is_relevant_time[i])
            .collect();
        if relevant.len() != self.events.len() {
            return Err(AmcError::MissingSimulationTime(format!(
                "path marks {} relevant times, schedule has {}",
                relevant.len(),
                self.events.len()
            )));
        }

        let mut projected = vec![0.0; self.state_indices.len()];
        let mut values = Vec::with_capacity(self.exposure_times.len() + 1);
        values.push(self.result_value);
        let mut decisions = match sticky {
            StickyCloseOut::Fresh => ExerciseDecisions::none(),
            StickyCloseOut::Replay(previous) => *previous,
        };
        let mut exercised: Option<usize> = None;

        for (event, &position) in self.events.iter().zip(relevant.iter()) {
            if matches!(sticky, StickyCloseOut::Fresh)
                && (path_times[position] - event.time).abs() >= TIME_TOLERANCE
            {
                return Err(AmcError::MissingSimulationTime(format!(
                    "relevant path time {} does not match scheduled time {}",
                    path_times[position], event.time
                )));
            }
            let offset = position * state_dimension;
            for (slot, &index) in projected.iter_mut().zip(self.state_indices.iter()) {
                *slot = states[offset + index];
            }

            if let Some(k) = event.exercise {
                if exercised.is_none() {
                    match sticky {
                        StickyCloseOut::Fresh => {
                            let ex = self.coeffs_und_ex_into[k].value(&self.basis, &projected);
                            let cont = self.coeffs_continuation[k].value(&self.basis, &projected);
                            if ex > cont && ex > 0.0 {
                                exercised = Some(k);
                                decisions = ExerciseDecisions::at(k);
                            }
                        }
                        StickyCloseOut::Replay(_) => {
                            if decisions.exercised_at() == Some(k) {
                                exercised = Some(k);
                            }
                        }
                    }
                }
            }

            if let Some(x) = event.exposure {
                let value = match (self.settlement, exercised) {
                    (None, _) | (Some(Settlement::Physical), Some(_)) => {
                        self.coeffs_und_dirty[x].value(&self.basis, &projected)
                    }
                    (Some(_), None) => self.coeffs_option[x].value(&self.basis, &projected),
                    (Some(Settlement::Cash), Some(k)) => {
                        // cash settles at the decision time; exposure
                        // collapses to zero afterwards
                        if event.exercise == Some(k) {
                            self.coeffs_und_ex_into[k].value(&self.basis, &projected)
                        } else {
                            0.0
                        }
                    }
                };
                values.push(value);
            }
        }

        Ok(SimulatedPath { values, decisions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::basis::PolynomialType;

    // linear fit a + b*z over the order-one univariate basis
    fn linear(a: f64, b: f64) -> RegressionFit {
        let basis = BasisSystem::new(1, 1, PolynomialType::Monomial);
        let states = vec![0.0, 1.0, 2.0, 3.0];
        let values: Vec<f64> = states.iter().map(|z| a + b * z).collect();
        RegressionFit::fit(&basis, &states, &values)
    }

    fn basis() -> BasisSystem {
        BasisSystem::new(1, 1, PolynomialType::Monomial)
    }

    #[test]
    fn test_no_optionality_reports_underlying() {
        let calc = AmcCalculator::new(
            12.5,
            Currency::USD,
            None,
            vec![],
            vec![1.0, 2.0],
            basis(),
            vec![0],
            vec![0.0],
            vec![RegressionFit::constant(12.5, 2), RegressionFit::constant(4.0, 2)],
            vec![],
            vec![],
            vec![RegressionFit::constant(0.0, 2), RegressionFit::constant(0.0, 2)],
        )
        .unwrap();
        let path = calc
            .simulate_path(
                &[1.0, 2.0],
                &[0.3, -0.1],
                &[true, true],
                StickyCloseOut::Fresh,
            )
            .unwrap();
        assert_eq!(path.values.len(), 3);
        assert_eq!(path.values[0], 12.5);
        assert!((path.values[1] - 12.5).abs() < 1e-12);
        assert!((path.values[2] - 4.0).abs() < 1e-12);
        assert_eq!(path.decisions.exercised_at(), None);
    }

    fn one_exercise(settlement: Settlement) -> AmcCalculator {
        // exercise value z, continuation 0.5: exercise iff z > 0.5
        AmcCalculator::new(
            1.0,
            Currency::USD,
            Some(settlement),
            vec![2.0],
            vec![2.0, 3.0],
            basis(),
            vec![0],
            vec![0.0],
            vec![linear(0.0, 2.0), linear(0.0, 2.0)],
            vec![linear(0.0, 1.0)],
            vec![RegressionFit::constant(0.5, 2)],
            vec![linear(0.1, 0.5), RegressionFit::constant(0.0, 2)],
        )
        .unwrap()
    }

    #[test]
    fn test_exercise_boundary_is_monotone() {
        let calc = one_exercise(Settlement::Physical);
        for &(z, expect_exercise) in &[(-1.0, false), (0.2, false), (0.7, true), (2.0, true)] {
            let path = calc
                .simulate_path(&[2.0, 3.0], &[z, z], &[true, true], StickyCloseOut::Fresh)
                .unwrap();
            assert_eq!(
                path.decisions.exercised_at(),
                if expect_exercise { Some(0) } else { None },
                "state {}",
                z
            );
        }
    }

    #[test]
    fn test_exercise_tie_prefers_continuation() {
        // exercise and continuation values agree exactly on every state
        let calc = AmcCalculator::new(
            0.5,
            Currency::USD,
            Some(Settlement::Physical),
            vec![2.0],
            vec![2.0],
            basis(),
            vec![0],
            vec![0.0],
            vec![RegressionFit::constant(0.5, 2)],
            vec![RegressionFit::constant(0.5, 2)],
            vec![RegressionFit::constant(0.5, 2)],
            vec![RegressionFit::constant(0.5, 2)],
        )
        .unwrap();
        let path = calc
            .simulate_path(&[2.0], &[3.0], &[true], StickyCloseOut::Fresh)
            .unwrap();
        assert_eq!(path.decisions.exercised_at(), None);
    }

    #[test]
    fn test_settlement_conventions_at_and_after_exercise() {
        let z = 1.5;
        let physical = one_exercise(Settlement::Physical)
            .simulate_path(&[2.0, 3.0], &[z, z], &[true, true], StickyCloseOut::Fresh)
            .unwrap();
        // physically settled: exposure is the dirty underlying from the
        // decision on
        assert!((physical.values[1] - 3.0).abs() < 1e-12);
        assert!((physical.values[2] - 3.0).abs() < 1e-12);

        let cash = one_exercise(Settlement::Cash)
            .simulate_path(&[2.0, 3.0], &[z, z], &[true, true], StickyCloseOut::Fresh)
            .unwrap();
        // cash settled: the exercise amount at the decision time, nothing
        // afterwards
        assert!((cash.values[1] - z).abs() < 1e-12);
        assert_eq!(cash.values[2], 0.0);
    }

    #[test]
    fn test_unexercised_path_reads_option_value() {
        let calc = one_exercise(Settlement::Physical);
        let path = calc
            .simulate_path(&[2.0, 3.0], &[0.2, 0.2], &[true, true], StickyCloseOut::Fresh)
            .unwrap();
        assert!((path.values[1] - (0.1 + 0.5 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_sticky_replay_overrides_path_values() {
        let calc = one_exercise(Settlement::Physical);
        let valuation = calc
            .simulate_path(&[2.0, 3.0], &[1.5, 1.5], &[true, true], StickyCloseOut::Fresh)
            .unwrap();
        assert_eq!(valuation.decisions.exercised_at(), Some(0));

        // the close-out grid is shifted and its states are deep out of the
        // money, yet the replayed decision still exercises
        let close_out = calc
            .simulate_path(
                &[2.1, 3.1],
                &[-2.0, -2.0],
                &[true, true],
                StickyCloseOut::Replay(&valuation.decisions),
            )
            .unwrap();
        assert_eq!(close_out.decisions.exercised_at(), Some(0));
        assert!((close_out.values[1] - (-4.0)).abs() < 1e-12);

        // a fresh run on the same states would not exercise
        let fresh = calc
            .simulate_path(&[2.0, 3.0], &[-2.0, -2.0], &[true, true], StickyCloseOut::Fresh)
            .unwrap();
        assert_eq!(fresh.decisions.exercised_at(), None);
    }

    #[test]
    fn test_relevant_time_mismatch_is_an_error() {
        let calc = one_exercise(Settlement::Physical);
        let err = calc
            .simulate_path(&[2.0, 3.0], &[0.0, 0.0], &[true, false], StickyCloseOut::Fresh)
            .unwrap_err();
        assert!(matches!(err, AmcError::MissingSimulationTime(_)));

        let err = calc
            .simulate_path(&[2.5, 3.0], &[0.0, 0.0], &[true, true], StickyCloseOut::Fresh)
            .unwrap_err();
        assert!(matches!(err, AmcError::MissingSimulationTime(_)));
    }

    #[test]
    fn test_irrelevant_times_are_skipped() {
        let calc = one_exercise(Settlement::Physical);
        let path = calc
            .simulate_path(
                &[0.5, 2.0, 2.5, 3.0],
                &[9.0, 1.5, 9.0, 1.5],
                &[false, true, false, true],
                StickyCloseOut::Fresh,
            )
            .unwrap();
        assert_eq!(path.decisions.exercised_at(), Some(0));
        assert_eq!(path.values.len(), 3);
    }

    #[test]
    fn test_coefficient_count_mismatch_rejected() {
        let err = AmcCalculator::new(
            0.0,
            Currency::USD,
            Some(Settlement::Physical),
            vec![1.0],
            vec![1.0],
            basis(),
            vec![0],
            vec![0.0],
            vec![],
            vec![linear(0.0, 1.0)],
            vec![RegressionFit::constant(0.0, 2)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, AmcError::InvalidOperation(_)));
    }

    #[test]
    fn test_out_of_range_state_index_rejected() {
        let err = AmcCalculator::new(
            0.0,
            Currency::USD,
            None,
            vec![],
            vec![1.0],
            basis(),
            vec![2],
            vec![0.0],
            vec![RegressionFit::constant(0.0, 2)],
            vec![],
            vec![],
            vec![RegressionFit::constant(0.0, 2)],
        )
        .unwrap_err();
        assert!(matches!(err, AmcError::InvalidOperation(_)));
    }

    #[test]
    fn test_merge_event_times_coincident() {
        let events = merge_event_times(&[1.0, 2.0], &[2.0, 3.0]);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].exercise, Some(0));
        assert_eq!(events[0].exposure, None);
        assert_eq!(events[1].exercise, Some(1));
        assert_eq!(events[1].exposure, Some(0));
        assert_eq!(events[2].exposure, Some(1));
    }
}
