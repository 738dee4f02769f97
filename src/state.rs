use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::accuracy::AccuracyTimeline;
use crate::aggregate::{CooccurrencePanels, FrequencyPanels};
use crate::browser::{BrowseCursor, PastPredictionCard, card_at};
use crate::config::{VariantCatalog, VariantSpec};
use crate::console::LogBuffer;
use crate::pagination::HistoryPane;
use crate::refresh::{RefreshOutcome, RefreshState};

/// Slot the model could not resolve (or the backend masked).
pub const UNKNOWN_NUMBER: i32 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawRecord {
    pub period: String,
    pub draw_date: Option<NaiveDate>,
    pub numbers: Vec<i32>,
    pub jackpot_value: Option<u64>,
    pub jackpot_winners: u32,
    pub jackpot2_value: Option<u64>,
    pub jackpot2_winners: u32,
    pub first_prize_value: Option<u64>,
    pub first_prize_winners: u32,
    pub second_prize_value: Option<u64>,
    pub second_prize_winners: u32,
    pub third_prize_value: Option<u64>,
    pub third_prize_winners: u32,
}

impl DrawRecord {
    pub fn total_jackpot_winners(&self) -> u32 {
        self.jackpot_winners.saturating_add(self.jackpot2_winners)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPage {
    pub records: Vec<DrawRecord>,
    pub total: u64,
    pub latest: Option<DrawRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSet {
    pub numbers: Vec<i32>,
    pub confidence: f64,
}

/// Older records carry one flat number list with a scalar confidence; newer
/// ones carry ranked sets, best first.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Legacy { numbers: Vec<i32>, confidence: f64 },
    Ensemble { sets: Vec<RankedSet> },
}

impl Prediction {
    pub fn primary_numbers(&self) -> &[i32] {
        match self {
            Prediction::Legacy { numbers, .. } => numbers,
            Prediction::Ensemble { sets } => sets
                .first()
                .map(|s| s.numbers.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Every set with its confidence, rank order. A legacy prediction is a
    /// single set.
    pub fn ranked_sets(&self) -> Vec<(&[i32], f64)> {
        match self {
            Prediction::Legacy {
                numbers,
                confidence,
            } => vec![(numbers.as_slice(), *confidence)],
            Prediction::Ensemble { sets } => sets
                .iter()
                .map(|s| (s.numbers.as_slice(), s.confidence))
                .collect(),
        }
    }

    pub fn set_count(&self) -> usize {
        match self {
            Prediction::Legacy { .. } => 1,
            Prediction::Ensemble { sets } => sets.len(),
        }
    }

    pub fn is_ensemble(&self) -> bool {
        matches!(self, Prediction::Ensemble { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub target_period: String,
    pub prediction: Prediction,
    /// Text the backend sends instead of a confidence for locked predictions.
    pub locked_note: Option<String>,
    pub message: Option<String>,
}

/// One row of the accuracy history before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyRecord {
    pub period: String,
    pub prediction: Prediction,
    pub confidence: f64,
    /// `None` until the draw for `period` is known.
    pub actual: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracySummary {
    pub total_predictions: u64,
    pub verified_count: u64,
    pub avg_matches: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyPayload {
    pub summary: AccuracySummary,
    pub history: Vec<AccuracyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyStat {
    pub number: i32,
    #[serde(default)]
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboStat {
    pub numbers: Vec<i32>,
    #[serde(default)]
    pub count: u32,
}

pub type PairStat = ComboStat;
pub type TripletStat = ComboStat;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub hot: Vec<FrequencyStat>,
    #[serde(default)]
    pub cold: Vec<FrequencyStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurrenceStats {
    #[serde(default)]
    pub pairs: Vec<PairStat>,
    #[serde(default)]
    pub triplets: Vec<TripletStat>,
}

/// Identifies one load of the dashboard. Responses tagged with anything but
/// the current tag are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTag {
    pub variant: String,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub variants: VariantCatalog,
    pub variant: String,
    pub generation: u64,
    pub loading: bool,
    pub latest_prediction: Option<PredictionRecord>,
    pub accuracy: AccuracyTimeline,
    pub accuracy_summary: Option<AccuracySummary>,
    pub accuracy_loading: bool,
    pub browse: BrowseCursor,
    pub frequency: FrequencyPanels,
    pub cooccurrence: CooccurrencePanels,
    pub history: HistoryPane,
    pub refresh: RefreshState,
    /// Bumped by every `begin_refresh`; only the newest refresh may report.
    pub refresh_generation: u64,
    pub reload_pending: bool,
    pub logs: LogBuffer,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(VariantCatalog::default(), crate::config::DEFAULT_VARIANT)
    }
}

impl AppState {
    pub fn new(variants: VariantCatalog, variant: &str) -> Self {
        let mut logs = LogBuffer::new();
        logs.record("[OK] Connected. Ready.");
        logs.record("[INFO] Waiting for prediction data...");
        Self {
            variants,
            variant: variant.to_string(),
            generation: 0,
            loading: false,
            latest_prediction: None,
            accuracy: AccuracyTimeline::default(),
            accuracy_summary: None,
            accuracy_loading: false,
            browse: BrowseCursor::default(),
            frequency: FrequencyPanels::default(),
            cooccurrence: CooccurrencePanels::default(),
            history: HistoryPane::default(),
            refresh: RefreshState::Idle,
            refresh_generation: 0,
            reload_pending: false,
            logs,
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.record(msg);
    }

    pub fn variant_spec(&self) -> VariantSpec {
        self.variants.spec(&self.variant)
    }

    pub fn variant_label(&self) -> String {
        self.variant_spec().label
    }

    pub fn current_tag(&self) -> FetchTag {
        FetchTag {
            variant: self.variant.clone(),
            generation: self.generation,
        }
    }

    pub fn is_current(&self, tag: &FetchTag) -> bool {
        tag.variant == self.variant && tag.generation == self.generation
    }

    /// Starts a new load of every slice. Earlier in-flight responses become
    /// stale.
    pub fn begin_load(&mut self) -> FetchTag {
        self.generation += 1;
        self.loading = true;
        self.accuracy_loading = true;
        self.history.begin_reload();
        self.current_tag()
    }

    /// Drops every slice and moves to the variant after the current one.
    pub fn cycle_variant(&mut self) {
        let next = self.variants.next_key(&self.variant);
        self.select_variant(&next);
    }

    pub fn select_variant(&mut self, key: &str) {
        self.variant = key.to_string();
        self.latest_prediction = None;
        self.accuracy.clear();
        self.accuracy_summary = None;
        self.browse.reset(0);
        self.frequency = FrequencyPanels::default();
        self.cooccurrence = CooccurrencePanels::default();
        self.history = HistoryPane::default();
        self.refresh = RefreshState::Idle;
        self.reload_pending = false;
        let label = self.variant_label();
        self.push_log(format!("[INFO] Switching view to {label}..."));
    }

    pub fn can_refresh(&self) -> bool {
        !self.loading && !self.refresh.is_active()
    }

    pub fn refresh_tag(&self) -> FetchTag {
        FetchTag {
            variant: self.variant.clone(),
            generation: self.refresh_generation,
        }
    }

    /// Reports from a refresh are accepted only while it is the active one.
    pub fn is_current_refresh(&self, tag: &FetchTag) -> bool {
        self.refresh.is_active() && *tag == self.refresh_tag()
    }

    /// Returns `None` when a load or a refresh is already running.
    pub fn begin_refresh(&mut self) -> Option<FetchTag> {
        if !self.can_refresh() {
            return None;
        }
        self.refresh_generation += 1;
        self.refresh = RefreshState::Submitting;
        let variant = self.variant.clone();
        self.push_log(format!("[INFO] Requesting a fresh crawl for {variant}..."));
        Some(self.refresh_tag())
    }

    pub fn take_reload_pending(&mut self) -> bool {
        std::mem::take(&mut self.reload_pending)
    }

    pub fn can_browse(&self) -> bool {
        !self.accuracy_loading
    }

    pub fn browse_back(&mut self) -> bool {
        self.can_browse() && self.browse.back()
    }

    pub fn browse_forward(&mut self) -> bool {
        self.can_browse() && self.browse.forward()
    }

    pub fn past_prediction_card(&self) -> Option<PastPredictionCard> {
        card_at(&self.accuracy, &self.browse, self.variant_spec().draw_size)
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetLatestPrediction {
        tag: FetchTag,
        result: Result<Option<PredictionRecord>, String>,
    },
    SetAccuracy {
        tag: FetchTag,
        result: Result<AccuracyPayload, String>,
    },
    SetStatsSummary {
        tag: FetchTag,
        result: Result<StatsSummary, String>,
    },
    SetCooccurrence {
        tag: FetchTag,
        result: Result<CooccurrenceStats, String>,
    },
    SetHistoryPage {
        tag: FetchTag,
        page: u32,
        result: Result<HistoryPage, String>,
    },
    FetchGroupSettled {
        tag: FetchTag,
    },
    RefreshProgress {
        tag: FetchTag,
        state: RefreshState,
    },
    RefreshFinished {
        tag: FetchTag,
        outcome: RefreshOutcome,
    },
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    LoadAll { tag: FetchTag },
    FetchHistoryPage { tag: FetchTag, page: u32 },
    Refresh { tag: FetchTag },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetLatestPrediction { tag, result } => {
            if !state.is_current(&tag) {
                return;
            }
            match result {
                Ok(Some(record)) => {
                    state.push_log(format!(
                        "[OK] Loaded {} prediction for period {}.",
                        tag.variant, record.target_period
                    ));
                    state.latest_prediction = Some(record);
                }
                Ok(None) => {
                    state.latest_prediction = None;
                    state.push_log(format!("[WARN] No prediction data for {}.", tag.variant));
                }
                Err(err) => {
                    state.latest_prediction = None;
                    state.push_log(format!(
                        "[WARN] No prediction data for {}: {err}",
                        tag.variant
                    ));
                }
            }
        }
        Delta::SetAccuracy { tag, result } => {
            if !state.is_current(&tag) {
                return;
            }
            state.accuracy_loading = false;
            match result {
                Ok(payload) => {
                    state.accuracy = AccuracyTimeline::from_records(&payload.history);
                    state.accuracy_summary = Some(payload.summary);
                }
                Err(err) => {
                    state.accuracy.clear();
                    state.accuracy_summary = None;
                    state.push_log(format!(
                        "[WARN] Could not load accuracy data for {}: {err}",
                        tag.variant
                    ));
                }
            }
            state.browse.reset(state.accuracy.len());
        }
        Delta::SetStatsSummary { tag, result } => {
            if !state.is_current(&tag) {
                return;
            }
            match result {
                Ok(summary) => state.frequency = FrequencyPanels::from_summary(Some(&summary)),
                Err(err) => {
                    state.frequency = FrequencyPanels::from_summary(None);
                    state.push_log(format!(
                        "[WARN] Could not load number stats for {}: {err}",
                        tag.variant
                    ));
                }
            }
        }
        Delta::SetCooccurrence { tag, result } => {
            if !state.is_current(&tag) {
                return;
            }
            match result {
                Ok(stats) => state.cooccurrence = CooccurrencePanels::from_payload(Some(&stats)),
                Err(err) => {
                    state.cooccurrence = CooccurrencePanels::from_payload(None);
                    state.push_log(format!(
                        "[WARN] Could not load co-occurrence stats for {}: {err}",
                        tag.variant
                    ));
                }
            }
        }
        Delta::SetHistoryPage { tag, page, result } => {
            if !state.is_current(&tag) {
                return;
            }
            match result {
                Ok(fetched) => state.history.apply_page(page, Some(fetched)),
                Err(err) => {
                    state.history.apply_page(page, None);
                    state.push_log(format!(
                        "[ERROR] Failed to load {} draw history: {err}",
                        tag.variant
                    ));
                }
            }
        }
        Delta::FetchGroupSettled { tag } => {
            if !state.is_current(&tag) {
                return;
            }
            state.loading = false;
            // Slices that never reported are settled too.
            state.accuracy_loading = false;
            state.history.in_flight = false;
        }
        Delta::RefreshProgress {
            tag,
            state: progress,
        } => {
            if !state.is_current_refresh(&tag) {
                return;
            }
            let variant = tag.variant;
            if state.refresh == RefreshState::Submitting
                && matches!(progress, RefreshState::Polling { .. })
            {
                state.push_log(format!(
                    "[OK] Crawl request sent for {variant}. Waiting for the backend job..."
                ));
            }
            state.refresh = progress;
        }
        Delta::RefreshFinished { tag, outcome } => {
            // A variant switch or a newer refresh supersedes this one.
            if !state.is_current_refresh(&tag) {
                return;
            }
            let variant = tag.variant;
            state.refresh = outcome.final_state();
            match &outcome {
                RefreshOutcome::Done { to, .. } => state.push_log(format!(
                    "[OK] Synced latest {variant} data from server (period {to})."
                )),
                RefreshOutcome::TimedOut { period } => state.push_log(format!(
                    "[WARN] Refresh timed out for {variant}; no new period after {}. Showing latest server data.",
                    period.as_deref().unwrap_or("-")
                )),
                RefreshOutcome::Failed(err) => {
                    state.push_log(format!("[WARN] Could not start crawler for {variant}: {err}"))
                }
            }
            if outcome.should_reload() {
                state.reload_pending = true;
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
