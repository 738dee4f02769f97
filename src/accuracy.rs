use std::collections::HashSet;

use crate::dashboard_fetch::parse_accuracy_json;
use crate::state::{AccuracyRecord, Prediction, UNKNOWN_NUMBER};

/// A past prediction joined with the draw that settled it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyEntry {
    pub period: String,
    pub confidence: f64,
    pub actual: Vec<i32>,
    /// Numbers of the primary set.
    pub predicted: Vec<i32>,
    /// Primary-set hits against `actual`.
    pub matches: usize,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub confidence: f64,
    pub matches: usize,
}

/// Distinct predicted numbers that also appear in `actual`. The sentinel never
/// matches.
pub fn match_count(predicted: &[i32], actual: &[i32]) -> usize {
    predicted
        .iter()
        .copied()
        .filter(|n| is_hit(*n, actual))
        .collect::<HashSet<_>>()
        .len()
}

pub fn is_hit(number: i32, actual: &[i32]) -> bool {
    number != UNKNOWN_NUMBER && actual.contains(&number)
}

pub fn reconcile_record(record: &AccuracyRecord) -> AccuracyEntry {
    let actual = record.actual.clone().unwrap_or_default();
    let predicted = record.prediction.primary_numbers().to_vec();
    let matches = match_count(&predicted, &actual);
    AccuracyEntry {
        period: record.period.clone(),
        confidence: record.confidence,
        actual,
        predicted,
        matches,
        prediction: record.prediction.clone(),
    }
}

/// Order and length preserving; newest-first in, newest-first out.
pub fn reconcile(history: &[AccuracyRecord]) -> Vec<AccuracyEntry> {
    history.iter().map(reconcile_record).collect()
}

/// Unreadable payloads reconcile to nothing rather than to an error.
pub fn reconcile_json(raw: &str) -> Vec<AccuracyEntry> {
    parse_accuracy_json(raw)
        .map(|payload| reconcile(&payload.history))
        .unwrap_or_default()
}

/// The one canonical newest-first list. Both the browser and the chart read
/// from it; the chart order is a reversed view, never a second copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyTimeline {
    entries: Vec<AccuracyEntry>,
}

impl AccuracyTimeline {
    pub fn new(entries: Vec<AccuracyEntry>) -> Self {
        Self { entries }
    }

    pub fn from_records(history: &[AccuracyRecord]) -> Self {
        Self::new(reconcile(history))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&AccuracyEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[AccuracyEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest-first, for a left-to-right time axis.
    pub fn chart_points(&self) -> impl Iterator<Item = ChartPoint> + '_ {
        self.entries.iter().rev().map(|entry| ChartPoint {
            label: format!("#{}", entry.period),
            confidence: entry.confidence,
            matches: entry.matches,
        })
    }

    pub fn average_matches(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: usize = self.entries.iter().map(|e| e.matches).sum();
        total as f64 / self.entries.len() as f64
    }
}
