use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::CardId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    KnewIt,
    QuickThink,
    LongThink,
    Peeked,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 4] = [
        ConfidenceLevel::KnewIt,
        ConfidenceLevel::QuickThink,
        ConfidenceLevel::LongThink,
        ConfidenceLevel::Peeked,
    ];

    /// Buckets cleared by the "reset weak areas" preset.
    pub const WEAK: [ConfidenceLevel; 2] = [ConfidenceLevel::LongThink, ConfidenceLevel::Peeked];

    /// Buckets cleared by the "reset strong areas" preset.
    pub const STRONG: [ConfidenceLevel; 2] = [ConfidenceLevel::KnewIt, ConfidenceLevel::QuickThink];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::KnewIt => "knew-it",
            ConfidenceLevel::QuickThink => "quick-think",
            ConfidenceLevel::LongThink => "long-think",
            ConfidenceLevel::Peeked => "peeked",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::KnewIt => "Knew it right away",
            ConfidenceLevel::QuickThink => "Had to think for a moment",
            ConfidenceLevel::LongThink => "Had to think for a while",
            ConfidenceLevel::Peeked => "Peeked at the answer",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            ConfidenceLevel::KnewIt => "Knew",
            ConfidenceLevel::QuickThink => "Brief",
            ConfidenceLevel::LongThink => "Long",
            ConfidenceLevel::Peeked => "Peek",
        }
    }

    /// Every rating except a peek counts toward `correct`.
    pub fn is_correct(self) -> bool {
        self != ConfidenceLevel::Peeked
    }

    /// Weight used by the completion confidence score.
    pub fn weight(self) -> f64 {
        match self {
            ConfidenceLevel::KnewIt => 1.0,
            ConfidenceLevel::QuickThink => 0.8,
            ConfidenceLevel::LongThink => 0.6,
            ConfidenceLevel::Peeked => 0.0,
        }
    }

    /// Rating keys 1-4 in bucket order.
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(ConfidenceLevel::KnewIt),
            '2' => Some(ConfidenceLevel::QuickThink),
            '3' => Some(ConfidenceLevel::LongThink),
            '4' => Some(ConfidenceLevel::Peeked),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfidenceLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown confidence level: {s}"))
    }
}

/// Partition of rated card ids into the four confidence buckets.
///
/// A card id lives in at most one bucket; [`ConfidenceTracking::classify`]
/// removes it from every bucket before inserting. Bucket order is rating order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceTracking {
    #[serde(rename = "knew-it", default)]
    knew_it: Vec<CardId>,
    #[serde(rename = "quick-think", default)]
    quick_think: Vec<CardId>,
    #[serde(rename = "long-think", default)]
    long_think: Vec<CardId>,
    #[serde(default)]
    peeked: Vec<CardId>,
}

impl ConfidenceTracking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, level: ConfidenceLevel) -> &[CardId] {
        match level {
            ConfidenceLevel::KnewIt => &self.knew_it,
            ConfidenceLevel::QuickThink => &self.quick_think,
            ConfidenceLevel::LongThink => &self.long_think,
            ConfidenceLevel::Peeked => &self.peeked,
        }
    }

    fn bucket_mut(&mut self, level: ConfidenceLevel) -> &mut Vec<CardId> {
        match level {
            ConfidenceLevel::KnewIt => &mut self.knew_it,
            ConfidenceLevel::QuickThink => &mut self.quick_think,
            ConfidenceLevel::LongThink => &mut self.long_think,
            ConfidenceLevel::Peeked => &mut self.peeked,
        }
    }

    /// Move `id` into `level`, dropping it from whichever bucket held it.
    pub fn classify(&mut self, id: &CardId, level: ConfidenceLevel) {
        for other in ConfidenceLevel::ALL {
            self.bucket_mut(other).retain(|existing| existing != id);
        }
        self.bucket_mut(level).push(id.clone());
    }

    pub fn level_of(&self, id: &CardId) -> Option<ConfidenceLevel> {
        ConfidenceLevel::ALL
            .into_iter()
            .find(|&level| self.bucket(level).contains(id))
    }

    pub fn is_rated(&self, id: &CardId) -> bool {
        self.level_of(id).is_some()
    }

    pub fn is_in_any(&self, id: &CardId, levels: &[ConfidenceLevel]) -> bool {
        levels.iter().any(|&level| self.bucket(level).contains(id))
    }

    pub fn count(&self, level: ConfidenceLevel) -> usize {
        self.bucket(level).len()
    }

    /// Number of distinct rated card ids across all buckets.
    pub fn rated_count(&self) -> usize {
        self.rated_ids().len()
    }

    pub fn rated_ids(&self) -> HashSet<&CardId> {
        ConfidenceLevel::ALL
            .into_iter()
            .flat_map(|level| self.bucket(level).iter())
            .collect()
    }

    pub fn clear(&mut self, level: ConfidenceLevel) {
        self.bucket_mut(level).clear();
    }

    pub fn clear_all(&mut self) {
        for level in ConfidenceLevel::ALL {
            self.clear(level);
        }
    }

    pub fn is_empty(&self) -> bool {
        ConfidenceLevel::ALL
            .into_iter()
            .all(|level| self.bucket(level).is_empty())
    }

    /// Repair a document that violates bucket exclusivity: the first bucket
    /// (in `ALL` order) holding an id keeps it, duplicates are dropped.
    /// Returns true if anything was removed.
    pub fn normalize(&mut self) -> bool {
        let mut seen: HashSet<CardId> = HashSet::new();
        let mut changed = false;
        for level in ConfidenceLevel::ALL {
            let bucket = self.bucket_mut(level);
            let before = bucket.len();
            bucket.retain(|id| seen.insert(id.clone()));
            changed |= bucket.len() != before;
        }
        changed
    }

    /// Drop ids the predicate rejects (e.g. cards no longer in the catalog).
    pub fn retain(&mut self, mut keep: impl FnMut(&CardId) -> bool) -> bool {
        let mut changed = false;
        for level in ConfidenceLevel::ALL {
            let bucket = self.bucket_mut(level);
            let before = bucket.len();
            bucket.retain(|id| keep(id));
            changed |= bucket.len() != before;
        }
        changed
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
}

impl Score {
    /// Derive the tally from the buckets: peeks are incorrect, the rest correct.
    pub fn tally(tracking: &ConfidenceTracking) -> Self {
        let mut score = Score::default();
        for level in ConfidenceLevel::ALL {
            let n = tracking.count(level) as u32;
            if level.is_correct() {
                score.correct += n;
            } else {
                score.incorrect += n;
            }
        }
        score
    }

    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }
}
