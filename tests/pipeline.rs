//! End-to-end pipeline tests on a synthetic gauging-station record.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flowcast::config::ForecastOptions;
use flowcast::core::MonthlySeries;
use flowcast::evaluation::{compare_models, cross_validate, CvConfig};
use flowcast::flow_duration::{FlowDurationForecaster, ScenarioForecast};
use flowcast::models::{Forecaster, ModelFamily, SeasonalSmoothing};
use flowcast::monthly::monthly_stats;

/// Ten years of monthly flow: annual sine cycle, mild trend, seeded noise.
fn station_record(n_months: usize, seed: u64) -> MonthlySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<f64> = (0..n_months)
        .map(|i| {
            let month = i % 12;
            let seasonal = 45.0 * (month as f64 * std::f64::consts::PI / 6.0).sin();
            let noise: f64 = rng.gen_range(-8.0..8.0);
            (120.0 + seasonal + 0.05 * i as f64 + noise).max(0.1)
        })
        .collect();
    MonthlySeries::new(values, 2014, 1).unwrap()
}

#[test]
fn monthly_quantiles_are_monotone_in_percentile() {
    let series = station_record(120, 42);
    let percentiles = [0.05, 0.15, 0.30, 0.50, 0.70, 0.85, 0.95];
    let rows = monthly_stats(&series, &percentiles, &ForecastOptions::default()).unwrap();

    assert_eq!(rows.len(), 12);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.month as usize, i + 1);
        assert_eq!(row.count, 10);
        let values: Vec<f64> = row.quantiles.iter().map(|(_, v)| v.unwrap()).collect();
        for pair in values.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
        assert!(row.min.unwrap() <= values[0]);
        assert!(row.max.unwrap() >= values[values.len() - 1]);
    }
}

#[test]
fn scenario_forecast_wraps_the_calendar() {
    let series = station_record(120, 42);
    let forecaster = FlowDurationForecaster::new(ForecastOptions::default());

    let table = forecaster.forecast_scenarios(&series, 11, 4).unwrap();
    assert_eq!(table.months(), &[12, 1, 2, 3]);

    // Columns ascend with their percentiles at every step.
    for step in 1..=4 {
        let row: Vec<f64> = table
            .columns()
            .iter()
            .map(|c| c.values[step - 1].unwrap())
            .collect();
        for pair in row.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
    }
}

#[test]
fn scenario_table_round_trips_through_rows() {
    let series = station_record(120, 7);
    let forecaster = FlowDurationForecaster::new(ForecastOptions::default());
    let table = forecaster.forecast_scenarios(&series, 5, 12).unwrap();

    let specs: Vec<(String, f64)> = table
        .columns()
        .iter()
        .map(|c| (c.label.clone(), c.percentile))
        .collect();
    let rebuilt =
        ScenarioForecast::from_rows(table.start_month(), &specs, &table.to_rows()).unwrap();
    assert_eq!(rebuilt.months(), table.months());
    assert_eq!(rebuilt.columns(), table.columns());
}

#[test]
fn persistence_at_historical_max_forecasts_monthly_maxima() {
    let series = station_record(120, 42);
    let forecaster = FlowDurationForecaster::new(ForecastOptions::default());

    // An observation at the June record maps to rank 1.0; with no shrink,
    // every step then forecasts its target month's historical maximum.
    let june_max = series
        .month_values(6)
        .into_iter()
        .fold(f64::MIN, f64::max);
    let table = forecaster
        .forecast_from_current_with_factor(&series, 6, june_max, 3, 1.0)
        .unwrap();

    assert_relative_eq!(table.metadata()["current_percentile"], 1.0, epsilon = 1e-12);
    for (step, &month) in table.months().iter().enumerate() {
        let month_max = series
            .month_values(month)
            .into_iter()
            .fold(f64::MIN, f64::max);
        assert_relative_eq!(
            table.value(step + 1, "persistence").unwrap(),
            month_max,
            epsilon = 1e-9
        );
    }
}

#[test]
fn persistence_shrink_forecasts_drier_than_neutral() {
    let series = station_record(120, 42);
    let options = ForecastOptions::default().with_persistence_factor(0.8);
    let forecaster = FlowDurationForecaster::new(options);

    let current = series.month_values(6)[3];
    let shrunk = forecaster
        .forecast_from_current(&series, 6, current, 6)
        .unwrap();
    let neutral = forecaster
        .forecast_from_current_with_factor(&series, 6, current, 6, 1.0)
        .unwrap();

    for step in 1..=6 {
        let s = shrunk.value(step, "persistence").unwrap();
        let n = neutral.value(step, "persistence").unwrap();
        assert!(s <= n + 1e-9);
    }
}

#[test]
fn model_families_fit_and_rank_on_holdout() {
    let series = station_record(120, 42);
    let table = compare_models(&series, ModelFamily::candidates(), 24).unwrap();

    assert!(table.failed.is_empty(), "unexpected failures: {:?}", table.failed);
    assert_eq!(table.rows.len(), 5);
    let rmses: Vec<f64> = table.rows.iter().map(|r| r.metrics.rmse.unwrap()).collect();
    for pair in rmses.windows(2) {
        assert!(pair[0] <= pair[1] + 1e-12);
    }
    // With a strong annual cycle, the best model should beat 45 units of
    // seasonal amplitude by a wide margin.
    assert!(table.best().unwrap().metrics.rmse.unwrap() < 45.0);
}

#[test]
fn family_below_its_history_floor_fails_cleanly_not_fatally() {
    // 47 training months: enough for smoothing, too short for the ensemble.
    let series = station_record(59, 9);
    let table = compare_models(&series, ModelFamily::candidates(), 12).unwrap();

    assert!(table
        .failed
        .iter()
        .any(|(family, _)| *family == ModelFamily::Ensemble));
    assert!(table
        .rows
        .iter()
        .any(|r| r.family == ModelFamily::ExponentialSmoothing));
}

#[test]
fn walk_forward_fold_count_and_step_profile() {
    let series = station_record(66, 42);
    let config = CvConfig::new(48, 6);
    let result = cross_validate(&config, &series, SeasonalSmoothing::new).unwrap();

    // Origins 48..=60 inclusive.
    assert_eq!(result.n_folds, 13);
    assert_eq!(result.per_step.len(), 6);
    for step in &result.per_step {
        assert_eq!(step.n_folds, 13);
        assert!(step.rmse.unwrap() >= 0.0);
        assert!(step.mae.unwrap() <= step.rmse.unwrap() + 1e-9);
    }
    assert_eq!(result.overall.n_valid, 13 * 6);
}

#[test]
fn forecast_dates_continue_the_record() {
    let series = station_record(120, 42);
    let mut model = SeasonalSmoothing::new();
    model.fit(&series).unwrap();

    let (year, month) = series.month_after_end();
    let forecast = model.predict(3).unwrap().with_origin(year, month);
    let dates = forecast.dates().unwrap();

    assert_eq!(dates.len(), 3);
    // 120 months from January 2014 ends December 2023; forecasting resumes
    // in January 2024.
    assert_eq!(dates[0].to_string(), "2024-01-01");
    assert_eq!(dates[2].to_string(), "2024-03-01");
}

#[test]
fn interval_bands_nest_by_confidence_level() {
    let series = station_record(96, 11);
    let mut model = SeasonalSmoothing::new();
    model.fit(&series).unwrap();

    let forecast = model.predict_with_intervals(6, &[0.80, 0.95]).unwrap();
    let narrow = forecast.band(0.80).unwrap();
    let wide = forecast.band(0.95).unwrap();
    for h in 0..6 {
        assert!(wide.lower[h] <= narrow.lower[h] + 1e-9);
        assert!(wide.upper[h] >= narrow.upper[h] - 1e-9);
    }
}

#[test]
fn missing_months_flow_through_statistics_but_not_models() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut values: Vec<f64> = (0..96)
        .map(|i| {
            let month = i % 12;
            100.0 + 30.0 * (month as f64 * std::f64::consts::PI / 6.0).sin()
                + rng.gen_range(-5.0..5.0)
        })
        .collect();
    values[14] = f64::NAN;
    values[50] = f64::NAN;
    let series = MonthlySeries::new(values, 2016, 1).unwrap();

    // Statistics drop the gaps month by month.
    let rows = monthly_stats(&series, &[0.5], &ForecastOptions::default()).unwrap();
    assert_eq!(rows[2].count, 6); // March lost two of eight years.
    assert!(rows[2].quantile(0.5).is_some());

    // Models refuse gapped training data outright.
    let mut model = SeasonalSmoothing::new();
    assert!(model.fit(&series).is_err());
}
