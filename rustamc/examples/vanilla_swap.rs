use rustamc::prelude::*;
use rustamc::utils::errors::Result;

fn main() -> Result<()> {
    let model = MultiCcyGaussianModel::new(Currency::USD, 0.03, 0.01);

    // 5y receiver swap: 3.2% fixed on 100 against annual floating
    let fixed = Leg::new(Currency::USD, Side::Receive).with_cashflows(
        (1..=5)
            .map(|y| Cashflow::new(y as f64, CashflowKind::Fixed { amount: 3.2 }))
            .collect(),
    );
    let float = Leg::new(Currency::USD, Side::Pay).with_cashflows(
        (1..5)
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

    let exposure_times: Vec<f64> = (1..=10).map(|q| q as f64 * 0.5).collect();
    let config = McEngineConfig::new().with_calibration_samples(10_000);
    let engine = McMultiLegEngine::new(
        &model,
        vec![fixed, float],
        None,
        exposure_times.clone(),
        config,
    );
    let calibration = engine.calibrate()?;
    println!("swap npv: {:.4}", calibration.result_value());

    // exposure profile on one outer scenario path
    let calculator = calibration.calculator();
    let batch = model.generate_paths(
        &exposure_times,
        1,
        7,
        SequenceType::PseudoRandom,
        BrownianOrdering::Steps,
        DirectionIntegers::JoeKuo,
    )?;
    let states: Vec<f64> = (0..exposure_times.len())
        .flat_map(|k| batch.state(0, k).to_vec())
        .collect();
    let path = calculator.simulate_path(
        &exposure_times,
        &states,
        &vec![true; exposure_times.len()],
        StickyCloseOut::Fresh,
    )?;
    for (t, v) in exposure_times.iter().zip(path.values.iter().skip(1)) {
        println!("  t = {:>4.1}  value = {:>9.4}", t, v);
    }
    Ok(())
}
