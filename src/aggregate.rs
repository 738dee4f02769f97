use crate::state::{ComboStat, CooccurrenceStats, FrequencyStat, StatsSummary};

pub const HOT_LIMIT: usize = 6;
pub const COLD_LIMIT: usize = 6;
pub const PAIR_LIMIT: usize = 5;
pub const TRIPLET_LIMIT: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyPanels {
    pub hot: Vec<FrequencyStat>,
    pub cold: Vec<FrequencyStat>,
}

impl FrequencyPanels {
    pub fn from_summary(summary: Option<&StatsSummary>) -> Self {
        let Some(summary) = summary else {
            return Self::default();
        };
        Self {
            hot: top_n(&summary.hot, HOT_LIMIT),
            cold: top_n(&summary.cold, COLD_LIMIT),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hot.is_empty() && self.cold.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrencePanels {
    pub pairs: Vec<ComboStat>,
    pub triplets: Vec<ComboStat>,
}

impl CooccurrencePanels {
    pub fn from_payload(stats: Option<&CooccurrenceStats>) -> Self {
        let Some(stats) = stats else {
            return Self::default();
        };
        Self {
            pairs: top_n(&stats.pairs, PAIR_LIMIT),
            triplets: top_n(&stats.triplets, TRIPLET_LIMIT),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.triplets.is_empty()
    }
}

/// First `limit` items in server order. Ties stay as delivered.
pub fn top_n<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().take(limit).cloned().collect()
}
