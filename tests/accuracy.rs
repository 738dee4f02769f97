use lotto_terminal::accuracy::{
    AccuracyTimeline, match_count, reconcile, reconcile_json, reconcile_record,
};
use lotto_terminal::state::{AccuracyRecord, Prediction, RankedSet, UNKNOWN_NUMBER};

fn legacy(period: &str, predicted: Vec<i32>, confidence: f64, actual: Vec<i32>) -> AccuracyRecord {
    AccuracyRecord {
        period: period.to_string(),
        prediction: Prediction::Legacy {
            numbers: predicted,
            confidence,
        },
        confidence,
        actual: Some(actual),
    }
}

#[test]
fn counts_primary_matches_against_the_draw() {
    let record = legacy(
        "101",
        vec![3, 7, 12, 19, 28, 40],
        72.5,
        vec![3, 12, 15, 22, 33, 41],
    );
    let entry = reconcile_record(&record);
    assert_eq!(entry.period, "101");
    assert_eq!(entry.matches, 2);
    assert_eq!(entry.predicted, vec![3, 7, 12, 19, 28, 40]);
    assert_eq!(entry.actual, vec![3, 12, 15, 22, 33, 41]);
}

#[test]
fn two_shared_numbers_survive_the_chart_round_trip() {
    let record = legacy(
        "101",
        vec![1, 2, 9, 10, 11, 12],
        72.5,
        vec![1, 2, 3, 4, 5, 6],
    );
    let timeline = AccuracyTimeline::from_records(&[record]);
    assert_eq!(timeline.get(0).map(|e| e.matches), Some(2));

    let points: Vec<_> = timeline.chart_points().collect();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].label, "#101");
    assert_eq!(points[0].confidence, 72.5);
    assert_eq!(points[0].matches, 2);
}

#[test]
fn sentinel_and_duplicates_do_not_inflate_matches() {
    assert_eq!(match_count(&[UNKNOWN_NUMBER, 4, 4, 9], &[4, 9, UNKNOWN_NUMBER]), 2);
    assert_eq!(match_count(&[], &[1, 2, 3]), 0);
    assert_eq!(match_count(&[1, 2, 3], &[]), 0);
}

#[test]
fn ensemble_matches_use_the_top_set() {
    let record = AccuracyRecord {
        period: "77".to_string(),
        prediction: Prediction::Ensemble {
            sets: vec![
                RankedSet {
                    numbers: vec![1, 2, 3, 4, 5, 6],
                    confidence: 60.0,
                },
                RankedSet {
                    numbers: vec![10, 11, 12, 13, 14, 15],
                    confidence: 50.0,
                },
            ],
        },
        confidence: 60.0,
        actual: Some(vec![10, 11, 12, 13, 14, 1]),
    };
    assert_eq!(reconcile_record(&record).matches, 1);
}

#[test]
fn unsettled_record_has_no_matches() {
    let mut record = legacy("9", vec![1, 2, 3, 4, 5, 6], 50.0, vec![]);
    record.actual = None;
    let entry = reconcile_record(&record);
    assert!(entry.actual.is_empty());
    assert_eq!(entry.matches, 0);
}

#[test]
fn reconcile_keeps_order_and_is_idempotent() {
    let history = vec![
        legacy("103", vec![1, 2, 3, 4, 5, 6], 61.0, vec![1, 2, 30, 31, 32, 33]),
        legacy("102", vec![1, 2, 3, 4, 5, 6], 55.0, vec![40, 41, 42, 43, 44, 45]),
        legacy("101", vec![3, 7, 12, 19, 28, 40], 72.5, vec![3, 12, 15, 22, 33, 41]),
    ];
    let first = reconcile(&history);
    let second = reconcile(&history);
    assert_eq!(first, second);
    let periods: Vec<&str> = first.iter().map(|e| e.period.as_str()).collect();
    assert_eq!(periods, vec!["103", "102", "101"]);
}

#[test]
fn chart_points_are_oldest_first_view_of_the_timeline() {
    let history = vec![
        legacy("103", vec![1, 2, 3, 4, 5, 6], 61.0, vec![1, 2, 30, 31, 32, 33]),
        legacy("102", vec![1, 2, 3, 4, 5, 6], 55.0, vec![40, 41, 42, 43, 44, 45]),
        legacy("101", vec![3, 7, 12, 19, 28, 40], 72.5, vec![3, 12, 15, 22, 33, 41]),
    ];
    let timeline = AccuracyTimeline::from_records(&history);
    let labels: Vec<String> = timeline.chart_points().map(|p| p.label).collect();
    assert_eq!(labels, vec!["#101", "#102", "#103"]);

    // Reversing the chart view gives the browse order back.
    let mut back: Vec<String> = timeline.chart_points().map(|p| p.label).collect();
    back.reverse();
    let browse: Vec<String> = timeline
        .entries()
        .iter()
        .map(|e| format!("#{}", e.period))
        .collect();
    assert_eq!(back, browse);

    assert!((timeline.average_matches() - 4.0 / 3.0).abs() < 1e-9);
}

#[test]
fn malformed_payload_reconciles_to_nothing() {
    assert!(reconcile_json("{not json").is_empty());
    assert!(reconcile_json("null").is_empty());
    assert!(AccuracyTimeline::default().chart_points().next().is_none());
}
