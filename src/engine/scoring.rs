use crate::catalog::Catalog;
use crate::engine::confidence::{ConfidenceLevel, ConfidenceTracking};

/// Weighted confidence percentage shown when a deck is finished:
/// knew-it counts fully, quick-think 0.8, long-think 0.6, peeks nothing.
pub fn confidence_score(tracking: &ConfidenceTracking, total_cards: usize) -> u32 {
    if total_cards == 0 {
        return 0;
    }
    let weighted: f64 = ConfidenceLevel::ALL
        .into_iter()
        .map(|level| tracking.count(level) as f64 * level.weight())
        .sum();
    (weighted / total_cards as f64 * 100.0).round() as u32
}

pub fn cards_to_review(tracking: &ConfidenceTracking) -> usize {
    ConfidenceLevel::WEAK
        .into_iter()
        .map(|level| tracking.count(level))
        .sum()
}

/// Bucket sizes plus the number of distinct cards answered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub knew_it: usize,
    pub quick_think: usize,
    pub long_think: usize,
    pub peeked: usize,
    pub answered: usize,
}

impl ProgressSummary {
    pub fn of(tracking: &ConfidenceTracking) -> Self {
        Self {
            knew_it: tracking.count(ConfidenceLevel::KnewIt),
            quick_think: tracking.count(ConfidenceLevel::QuickThink),
            long_think: tracking.count(ConfidenceLevel::LongThink),
            peeked: tracking.count(ConfidenceLevel::Peeked),
            answered: tracking.rated_count(),
        }
    }

    pub fn count(&self, level: ConfidenceLevel) -> usize {
        match level {
            ConfidenceLevel::KnewIt => self.knew_it,
            ConfidenceLevel::QuickThink => self.quick_think,
            ConfidenceLevel::LongThink => self.long_think,
            ConfidenceLevel::Peeked => self.peeked,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainCoverage {
    pub domain: String,
    pub number: String,
    pub rated: usize,
    pub total: usize,
}

impl DomainCoverage {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.rated as f64 / self.total as f64
    }
}

/// Rated vs. total cards for each catalog domain, in catalog order.
pub fn domain_coverage(catalog: &Catalog, tracking: &ConfidenceTracking) -> Vec<DomainCoverage> {
    catalog
        .domains()
        .iter()
        .map(|domain| {
            let mut rated = 0;
            let mut total = 0;
            for card in catalog.cards_in_domain(&domain.id) {
                total += 1;
                if tracking.is_rated(&card.id) {
                    rated += 1;
                }
            }
            DomainCoverage {
                domain: domain.id.clone(),
                number: domain.number.clone(),
                rated,
                total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CardId;
    use crate::catalog::tests::sample_catalog;

    #[test]
    fn test_confidence_score_weights() {
        let mut tracking = ConfidenceTracking::new();
        tracking.classify(&CardId::from("a1"), ConfidenceLevel::KnewIt);
        tracking.classify(&CardId::from("a2"), ConfidenceLevel::QuickThink);
        tracking.classify(&CardId::from("b1"), ConfidenceLevel::LongThink);
        tracking.classify(&CardId::from("b2"), ConfidenceLevel::Peeked);
        // (1.0 + 0.8 + 0.6) / 4 = 60%
        assert_eq!(confidence_score(&tracking, 4), 60);
        assert_eq!(cards_to_review(&tracking), 2);
    }

    #[test]
    fn test_progress_summary_counts() {
        let mut tracking = ConfidenceTracking::new();
        tracking.classify(&CardId::from("a1"), ConfidenceLevel::Peeked);
        tracking.classify(&CardId::from("a2"), ConfidenceLevel::Peeked);
        tracking.classify(&CardId::from("b1"), ConfidenceLevel::KnewIt);
        let summary = ProgressSummary::of(&tracking);
        assert_eq!(summary.count(ConfidenceLevel::Peeked), 2);
        assert_eq!(summary.knew_it, 1);
        assert_eq!(summary.answered, 3);
    }

    #[test]
    fn test_confidence_score_empty_deck() {
        assert_eq!(confidence_score(&ConfidenceTracking::new(), 0), 0);
    }

    #[test]
    fn test_domain_coverage_counts_rated() {
        let catalog = sample_catalog();
        let mut tracking = ConfidenceTracking::new();
        tracking.classify(&CardId::from("b2"), ConfidenceLevel::Peeked);
        let coverage = domain_coverage(&catalog, &tracking);
        assert_eq!(coverage.len(), 2);
        assert_eq!((coverage[0].rated, coverage[0].total), (0, 2));
        assert_eq!((coverage[1].rated, coverage[1].total), (1, 2));
        assert!((coverage[1].ratio() - 0.5).abs() < f64::EPSILON);
    }
}
