use lotto_terminal::refresh::{RefreshOutcome, RefreshState};
use lotto_terminal::state::{
    AccuracyPayload, AccuracyRecord, AppState, Delta, DrawRecord, FetchTag, FrequencyStat,
    HistoryPage, Prediction, PredictionRecord, StatsSummary, apply_delta,
};

fn prediction(period: &str) -> PredictionRecord {
    PredictionRecord {
        target_period: period.to_string(),
        prediction: Prediction::Legacy {
            numbers: vec![1, 2, 3, 4, 5, 6],
            confidence: 66.0,
        },
        locked_note: None,
        message: None,
    }
}

fn accuracy(periods: &[&str]) -> AccuracyPayload {
    AccuracyPayload {
        history: periods
            .iter()
            .map(|p| AccuracyRecord {
                period: p.to_string(),
                prediction: Prediction::Legacy {
                    numbers: vec![3, 7, 12, 19, 28, 40],
                    confidence: 70.0,
                },
                confidence: 70.0,
                actual: Some(vec![3, 12, 15, 22, 33, 41]),
            })
            .collect(),
        ..AccuracyPayload::default()
    }
}

fn history(total: u64) -> HistoryPage {
    let latest = DrawRecord {
        period: "0125".to_string(),
        jackpot_value: Some(45_000_000_000),
        ..DrawRecord::default()
    };
    HistoryPage {
        records: vec![latest.clone()],
        total,
        latest: Some(latest),
    }
}

fn settle(state: &mut AppState) {
    let tag = state.current_tag();
    apply_delta(state, Delta::FetchGroupSettled { tag });
}

#[test]
fn stale_responses_are_discarded() {
    let mut state = AppState::default();
    let old = state.begin_load();
    let current = state.begin_load();

    apply_delta(
        &mut state,
        Delta::SetLatestPrediction {
            tag: old.clone(),
            result: Ok(Some(prediction("0999"))),
        },
    );
    assert!(state.latest_prediction.is_none());

    apply_delta(&mut state, Delta::FetchGroupSettled { tag: old });
    assert!(state.loading);

    apply_delta(
        &mut state,
        Delta::SetLatestPrediction {
            tag: current,
            result: Ok(Some(prediction("0126"))),
        },
    );
    assert_eq!(
        state.latest_prediction.as_ref().map(|p| p.target_period.as_str()),
        Some("0126")
    );
}

#[test]
fn failed_slice_clears_and_logs_once() {
    let mut state = AppState::default();
    let tag = state.begin_load();
    apply_delta(
        &mut state,
        Delta::SetStatsSummary {
            tag: tag.clone(),
            result: Ok(StatsSummary {
                hot: vec![FrequencyStat {
                    number: 12,
                    frequency: 40,
                }],
                cold: Vec::new(),
            }),
        },
    );
    assert!(!state.frequency.is_empty());

    let tag = state.begin_load();
    apply_delta(
        &mut state,
        Delta::SetStatsSummary {
            tag,
            result: Err("http 500".to_string()),
        },
    );
    assert!(state.frequency.is_empty());
    let warns: Vec<&str> = state
        .logs
        .iter()
        .filter(|l| l.starts_with("[WARN]"))
        .collect();
    assert_eq!(warns.len(), 1);
    assert!(warns[0].contains("http 500"));
}

#[test]
fn accuracy_resets_browse_and_loading_blocks_it() {
    let mut state = AppState::default();
    let tag = state.begin_load();
    assert!(!state.can_browse());
    assert!(!state.browse_forward());

    apply_delta(
        &mut state,
        Delta::SetAccuracy {
            tag,
            result: Ok(accuracy(&["103", "102", "101"])),
        },
    );
    assert!(state.can_browse());
    assert_eq!(state.browse.index(), Some(0));
    assert!(state.browse_forward());
    assert!(state.browse_forward());
    assert!(!state.browse_forward());

    let card = state.past_prediction_card().expect("card present");
    assert_eq!(card.period, "101");
    assert_eq!(card.primary_matches, 2);
    assert_eq!(card.draw_size, 6);

    let tag = state.begin_load();
    apply_delta(
        &mut state,
        Delta::SetAccuracy {
            tag,
            result: Err("timeout".to_string()),
        },
    );
    assert!(state.accuracy.is_empty());
    assert!(state.past_prediction_card().is_none());
    assert_eq!(state.browse.index(), None);
}

#[test]
fn history_page_error_keeps_cursor_and_logs_error() {
    let mut state = AppState::default();
    let tag = state.begin_load();
    apply_delta(
        &mut state,
        Delta::SetHistoryPage {
            tag: tag.clone(),
            page: 1,
            result: Ok(history(25)),
        },
    );
    settle(&mut state);
    assert_eq!(state.history.cursor.page_count(), 3);
    assert!(!state.loading);

    let page = state.history.request_next().expect("next page allowed");
    apply_delta(
        &mut state,
        Delta::SetHistoryPage {
            tag,
            page,
            result: Err("connection refused".to_string()),
        },
    );
    assert!(state.history.records.is_empty());
    assert_eq!(state.history.cursor.page, 1);
    assert!(state.logs.get(0).unwrap().starts_with("[ERROR]"));
}

#[test]
fn switching_variant_drops_every_slice() {
    let mut state = AppState::default();
    let tag = state.begin_load();
    apply_delta(
        &mut state,
        Delta::SetLatestPrediction {
            tag: tag.clone(),
            result: Ok(Some(prediction("0126"))),
        },
    );
    apply_delta(
        &mut state,
        Delta::SetHistoryPage {
            tag: tag.clone(),
            page: 1,
            result: Ok(history(25)),
        },
    );

    state.cycle_variant();
    assert_eq!(state.variant, "power655");
    assert!(state.latest_prediction.is_none());
    assert!(state.history.records.is_empty());
    assert!(state.variant_spec().has_bonus());
    assert_eq!(
        state.logs.get(0),
        Some("[INFO] Switching view to Power 6/55...")
    );

    // A late mega645 response must not land in the power655 view.
    apply_delta(
        &mut state,
        Delta::SetLatestPrediction {
            tag,
            result: Ok(Some(prediction("0127"))),
        },
    );
    assert!(state.latest_prediction.is_none());
}

fn finish(state: &mut AppState, tag: &FetchTag, outcome: RefreshOutcome) {
    apply_delta(
        state,
        Delta::RefreshFinished {
            tag: tag.clone(),
            outcome,
        },
    );
}

fn synced(to: &str) -> RefreshOutcome {
    RefreshOutcome::Done {
        from: Some("0125".to_string()),
        to: to.to_string(),
    }
}

#[test]
fn refresh_progress_and_timeout_schedule_a_reload() {
    let mut state = AppState::default();
    state.begin_load();
    assert!(state.begin_refresh().is_none());
    settle(&mut state);

    let tag = state.begin_refresh().expect("refresh allowed");
    assert!(state.begin_refresh().is_none());

    apply_delta(
        &mut state,
        Delta::RefreshProgress {
            tag: tag.clone(),
            state: RefreshState::Polling {
                attempt: 1,
                max_attempts: 6,
            },
        },
    );
    assert!(state.logs.get(0).unwrap().starts_with("[OK] Crawl request sent"));

    finish(
        &mut state,
        &tag,
        RefreshOutcome::TimedOut {
            period: Some("0125".to_string()),
        },
    );
    assert_eq!(
        state.refresh,
        RefreshState::TimedOut {
            period: Some("0125".to_string())
        }
    );
    assert!(state.logs.get(0).unwrap().starts_with("[WARN] Refresh timed out"));
    assert!(state.take_reload_pending());
    assert!(!state.take_reload_pending());
    assert!(state.can_refresh());
}

#[test]
fn refresh_done_reloads_and_failure_does_not() {
    let mut state = AppState::default();
    let tag = state.begin_refresh().expect("refresh allowed");
    finish(&mut state, &tag, synced("0126"));
    assert!(state.logs.get(0).unwrap().starts_with("[OK] Synced latest"));
    assert!(state.take_reload_pending());

    let tag = state.begin_refresh().expect("refresh allowed");
    finish(
        &mut state,
        &tag,
        RefreshOutcome::Failed("http 502".to_string()),
    );
    assert!(matches!(state.refresh, RefreshState::Failed(_)));
    assert!(!state.take_reload_pending());
}

#[test]
fn refresh_for_another_variant_is_ignored() {
    let mut state = AppState::default();
    let tag = state.begin_refresh().expect("refresh allowed");
    state.cycle_variant();
    finish(&mut state, &tag, synced("0126"));
    assert_eq!(state.refresh, RefreshState::Idle);
    assert!(!state.take_reload_pending());
}

#[test]
fn refresh_from_before_a_round_trip_is_ignored() {
    let mut state = AppState::default();
    let first = state.begin_refresh().expect("refresh allowed");
    state.cycle_variant();
    state.cycle_variant();
    assert_eq!(state.variant, "mega645");

    // Back on the same variant with nothing running.
    finish(
        &mut state,
        &first,
        RefreshOutcome::TimedOut { period: None },
    );
    assert_eq!(state.refresh, RefreshState::Idle);
    assert!(!state.take_reload_pending());

    let second = state.begin_refresh().expect("refresh allowed");
    assert_ne!(first, second);
    let logged = state.logs.get(0).map(str::to_string);

    apply_delta(
        &mut state,
        Delta::RefreshProgress {
            tag: first.clone(),
            state: RefreshState::Polling {
                attempt: 3,
                max_attempts: 6,
            },
        },
    );
    finish(&mut state, &first, synced("0126"));

    assert_eq!(state.refresh, RefreshState::Submitting);
    assert!(!state.can_refresh());
    assert!(!state.take_reload_pending());
    assert_eq!(state.logs.get(0).map(str::to_string), logged);

    finish(&mut state, &second, synced("0127"));
    assert_eq!(
        state.refresh,
        RefreshState::Done {
            period: "0127".to_string()
        }
    );
    assert!(state.take_reload_pending());
}
