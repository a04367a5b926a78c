use crate::catalog::Card;
use crate::engine::confidence::{ConfidenceLevel, ConfidenceTracking};
use crate::engine::selection::{DomainSelection, StudyFilter, StudyMode};

/// Cards currently in play, in catalog order.
///
/// Domain stage first, then the mode stage: study mode optionally drops every
/// card rated in any bucket; review mode keeps cards found in at least one of
/// the selected buckets, and an empty bucket selection yields nothing.
pub fn visible_cards<'a>(
    catalog: &'a [Card],
    domains: &DomainSelection,
    mode: StudyMode,
    categories: &[ConfidenceLevel],
    tracking: &ConfidenceTracking,
    study_filter: StudyFilter,
) -> Vec<&'a Card> {
    if mode == StudyMode::Review && categories.is_empty() {
        return Vec::new();
    }

    catalog
        .iter()
        .filter(|card| domains.includes(&card.domain))
        .filter(|card| match mode {
            StudyMode::Study => match study_filter {
                StudyFilter::All => true,
                StudyFilter::Unanswered => !tracking.is_rated(&card.id),
            },
            StudyMode::Review => tracking.is_in_any(&card.id, categories),
        })
        .collect()
}
