use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rustamc::prelude::*;

fn model() -> MultiCcyGaussianModel {
    MultiCcyGaussianModel::new(Currency::USD, 0.03, 0.01).with_currency(
        Currency::EUR,
        0.02,
        0.008,
        1.08,
        0.10,
    )
}

fn bermudan_legs() -> Vec<Leg> {
    let fixed = Leg::new(Currency::USD, Side::Receive).with_cashflows(
        (6..=10)
            .map(|y| Cashflow::new(y as f64, CashflowKind::Fixed { amount: 4.0 }))
            .collect(),
    );
    let float = Leg::new(Currency::USD, Side::Pay).with_cashflows(
        (5..10)
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
    vec![fixed, float]
}

fn bench_calibration(c: &mut Criterion) {
    let model = model();
    let exercise = ExerciseSchedule::new(vec![5.0, 6.0, 7.0], Settlement::Physical);
    let exposure_times: Vec<f64> = (1..=20).map(|q| q as f64 * 0.5).collect();
    let config = McEngineConfig::new()
        .with_calibration_samples(5000)
        .with_calibration_seed(42);
    c.bench_function("bermudan calibration 5000 paths", |b| {
        b.iter(|| {
            let engine = McMultiLegEngine::new(
                &model,
                bermudan_legs(),
                Some(exercise.clone()),
                exposure_times.clone(),
                config.clone(),
            );
            let calibration = engine.calibrate().expect("calibration failed");
            black_box(calibration.result_value());
        })
    });
}

fn bench_simulate_path(c: &mut Criterion) {
    let model = model();
    let exercise = ExerciseSchedule::new(vec![5.0, 6.0, 7.0], Settlement::Physical);
    let exposure_times: Vec<f64> = (1..=20).map(|q| q as f64 * 0.5).collect();
    let config = McEngineConfig::new()
        .with_calibration_samples(5000)
        .with_calibration_seed(42);
    let engine = McMultiLegEngine::new(
        &model,
        bermudan_legs(),
        Some(exercise),
        exposure_times,
        config,
    );
    let calculator = engine.calibrate().expect("calibration failed").into_calculator();

    let path_times = calculator.relevant_times();
    let is_relevant = vec![true; path_times.len()];
    let batch = model
        .generate_paths(
            &path_times,
            1,
            99,
            SequenceType::PseudoRandom,
            BrownianOrdering::Steps,
            DirectionIntegers::JoeKuo,
        )
        .expect("path generation failed");
    let states: Vec<f64> = (0..path_times.len())
        .flat_map(|k| batch.state(0, k).to_vec())
        .collect();

    c.bench_function("simulate path", |b| {
        b.iter(|| {
            let path = calculator
                .simulate_path(&path_times, &states, &is_relevant, StickyCloseOut::Fresh)
                .expect("simulate path failed");
            black_box(path.values[0]);
        })
    });
}

criterion_group!(benches, bench_calibration, bench_simulate_path);
criterion_main!(benches);
