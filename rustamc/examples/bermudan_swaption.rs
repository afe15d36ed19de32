use rustamc::prelude::*;
use rustamc::utils::errors::Result;

fn main() -> Result<()> {
    let model = MultiCcyGaussianModel::new(Currency::USD, 0.03, 0.01);

    // 10y receiver swap, callable yearly from year 5
    let fixed = Leg::new(Currency::USD, Side::Receive).with_cashflows(
        (1..=10)
            .map(|y| Cashflow::new(y as f64, CashflowKind::Fixed { amount: 3.5 }))
            .collect(),
    );
    let float = Leg::new(Currency::USD, Side::Pay).with_cashflows(
        (1..10)
            .map(|y| {
                Cashflow::new(
                    y as f64 + 1.0,
                    CashflowKind::Floating {
                        fixing_time: y as f64,
                        period_start: y as f64,
                        period_end: y as f64 + 1.0,
                        accrual: 1.0,
                        notional: 100.0,
                        gearing: 1.0,
                        spread: 0.0,
                        past_fixing: None,
                        averaging: RateAveraging::Simple,
                    },
                )
            })
            .collect(),
    );
    let exercise = ExerciseSchedule::new(
        (5..=9).map(|y| y as f64).collect(),
        Settlement::Physical,
    );

    let exposure_times: Vec<f64> = (1..=20).map(|q| q as f64 * 0.5).collect();
    let config = McEngineConfig::new()
        .with_calibration_samples(10_000)
        .with_polynom_order(2);
    let engine = McMultiLegEngine::new(
        &model,
        vec![fixed, float],
        Some(exercise),
        exposure_times,
        config,
    );
    let calibration = engine.calibrate()?;
    println!("underlying npv: {:.4}", calibration.underlying_npv());
    println!("swaption value: {:.4}", calibration.result_value());

    // a valuation run and its sticky close-out replay
    let calculator = calibration.into_calculator();
    let path_times = calculator.relevant_times();
    let batch = model.generate_paths(
        &path_times,
        2,
        11,
        SequenceType::PseudoRandom,
        BrownianOrdering::Steps,
        DirectionIntegers::JoeKuo,
    )?;
    let states: Vec<f64> = (0..path_times.len())
        .flat_map(|k| batch.state(0, k).to_vec())
        .collect();
    let is_relevant = vec![true; path_times.len()];

    let valuation = calculator.simulate_path(
        &path_times,
        &states,
        &is_relevant,
        StickyCloseOut::Fresh,
    )?;
    println!("exercised at: {:?}", valuation.decisions.exercised_at());

    let close_out_states: Vec<f64> = (0..path_times.len())
        .flat_map(|k| batch.state(1, k).to_vec())
        .collect();
    let close_out = calculator.simulate_path(
        &path_times,
        &close_out_states,
        &is_relevant,
        StickyCloseOut::Replay(&valuation.decisions),
    )?;
    println!(
        "close-out values at first three exposure times: {:.4?}",
        &close_out.values[1..4.min(close_out.values.len())]
    );
    Ok(())
}
