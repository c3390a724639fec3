use trendscan_core::data::{synthetic_candles, Interval};
use trendscan_core::{AccountConfig, StrategyParams};
use trendscan_runner::{
    run_walk_forward, Objective, ParamGrid, ParameterSearch, SearchError, TrendGrid,
    WalkForwardConfig, WalkForwardError,
};

fn small_grid() -> ParamGrid {
    ParamGrid::TrendCross(TrendGrid {
        stop_loss_atr_mult: vec![2.0, 3.0, 4.0],
        take_profit_atr_mult: vec![2.0, 3.5],
        cooldown_candles: vec![1, 6],
        ..TrendGrid::default()
    })
}

fn wf_config() -> WalkForwardConfig {
    WalkForwardConfig {
        train_len: 500,
        test_len: 200,
        step: 200,
        min_windows: 2,
        min_trades: 1,
        candidate_top: 5,
        objective: Objective::Return,
    }
}

#[test]
fn hard_fail_serial_parallel_identical() {
    let candles = synthetic_candles("BTC", 0, 2500, Interval::H1);
    let base = StrategyParams::default();

    let serial = ParameterSearch::new(AccountConfig::default())
        .with_parallelism(false)
        .scan(&candles, &small_grid(), &base, Objective::WinRate)
        .unwrap();
    let parallel = ParameterSearch::new(AccountConfig::default())
        .with_parallelism(true)
        .scan(&candles, &small_grid(), &base, Objective::WinRate)
        .unwrap();

    assert_eq!(serial.len(), 12);
    assert_eq!(serial, parallel);
}

#[test]
fn hard_fail_walk_forward_repeatable() {
    let candles = synthetic_candles("ETH", 0, 1900, Interval::H1);
    let base = StrategyParams::default();
    let run = |parallel| {
        run_walk_forward(
            &ParameterSearch::new(AccountConfig::default()).with_parallelism(parallel),
            &candles,
            &small_grid(),
            &base,
            &base,
            &wf_config(),
        )
    };

    match (run(false), run(true)) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
        (a, b) => panic!("serial and parallel disagree: {:?} vs {:?}", a.is_ok(), b.is_ok()),
    }
}

#[test]
fn hard_fail_no_valid_configuration_is_structured() {
    let candles = synthetic_candles("SOL", 0, 1000, Interval::H1);
    let err = ParameterSearch::new(AccountConfig::default())
        .search(&candles, &small_grid(), &StrategyParams::default(), Objective::Return, 10_000)
        .unwrap_err();
    match err {
        SearchError::NoValidConfiguration { evaluated, min_trades } => {
            assert_eq!(evaluated, 12);
            assert_eq!(min_trades, 10_000);
        }
        other => panic!("expected NoValidConfiguration, got {other}"),
    }
}

#[test]
fn hard_fail_too_few_candles_for_windows() {
    let candles = synthetic_candles("BTC", 0, 800, Interval::H1);
    let base = StrategyParams::default();
    let err = run_walk_forward(
        &ParameterSearch::new(AccountConfig::default()),
        &candles,
        &small_grid(),
        &base,
        &base,
        &wf_config(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        WalkForwardError::InsufficientWindows { available: 1, required: 2 }
    ));
}
