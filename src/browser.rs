use crate::accuracy::{AccuracyEntry, AccuracyTimeline, is_hit, match_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseState {
    Empty,
    Viewing(usize),
}

/// Position in the newest-first accuracy timeline. Index 0 is the most recent
/// settled prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrowseCursor {
    index: usize,
    len: usize,
}

impl BrowseCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }

    pub fn state(&self) -> BrowseState {
        if self.len == 0 {
            BrowseState::Empty
        } else {
            BrowseState::Viewing(self.index)
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self.state() {
            BrowseState::Empty => None,
            BrowseState::Viewing(idx) => Some(idx),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn can_back(&self) -> bool {
        self.len > 0 && self.index > 0
    }

    pub fn can_forward(&self) -> bool {
        self.len > 0 && self.index + 1 < self.len
    }

    /// Toward newer predictions. Returns whether the cursor moved.
    pub fn back(&mut self) -> bool {
        if !self.can_back() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Toward older predictions. Returns whether the cursor moved.
    pub fn forward(&mut self) -> bool {
        if !self.can_forward() {
            return false;
        }
        self.index += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberHit {
    pub number: i32,
    pub hit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetCard {
    pub rank: usize,
    pub confidence: f64,
    pub numbers: Vec<NumberHit>,
    pub hits: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PastPredictionCard {
    pub period: String,
    pub confidence: f64,
    pub sets: Vec<SetCard>,
    /// Actual balls, flagged when any ranked set contained them.
    pub actual: Vec<NumberHit>,
    pub primary_matches: usize,
    pub draw_size: usize,
}

impl PastPredictionCard {
    pub fn build(entry: &AccuracyEntry, draw_size: usize) -> Self {
        let ranked = entry.prediction.ranked_sets();
        let sets = ranked
            .iter()
            .enumerate()
            .map(|(rank, (balls, confidence))| SetCard {
                rank,
                confidence: *confidence,
                numbers: balls
                    .iter()
                    .map(|n| NumberHit {
                        number: *n,
                        hit: is_hit(*n, &entry.actual),
                    })
                    .collect(),
                hits: match_count(balls, &entry.actual),
            })
            .collect();

        let actual = entry
            .actual
            .iter()
            .map(|n| NumberHit {
                number: *n,
                hit: ranked.iter().any(|(numbers, _)| is_hit(*n, numbers)),
            })
            .collect();

        Self {
            period: entry.period.clone(),
            confidence: entry.confidence,
            sets,
            actual,
            primary_matches: entry.matches,
            draw_size,
        }
    }

    /// Primary-set hits over the full draw size, in [0, 1].
    pub fn top_set_accuracy(&self) -> f64 {
        if self.draw_size == 0 {
            return 0.0;
        }
        self.primary_matches as f64 / self.draw_size as f64
    }
}

pub fn card_at(
    timeline: &AccuracyTimeline,
    cursor: &BrowseCursor,
    draw_size: usize,
) -> Option<PastPredictionCard> {
    let idx = cursor.index()?;
    timeline
        .get(idx)
        .map(|entry| PastPredictionCard::build(entry, draw_size))
}
