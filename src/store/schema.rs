use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CardId;
use crate::engine::confidence::{ConfidenceLevel, ConfidenceTracking, Score};
use crate::engine::selection::{DomainSelection, StudyFilter, StudyMode};
use crate::session::record::StudyRecord;

pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Everything persisted for one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub confidence_tracking: ConfidenceTracking,
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub selected_domains: DomainSelection,
    #[serde(default)]
    pub selected_confidence_categories: Vec<ConfidenceLevel>,
    #[serde(default)]
    pub study_filter: StudyFilter,
    #[serde(default)]
    pub current_mode: StudyMode,
    #[serde(default)]
    pub completed_card_ids: Vec<CardId>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub last_studied: Option<DateTime<Utc>>,
    #[serde(default)]
    pub study_sessions: Vec<StudyRecord>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            confidence_tracking: ConfidenceTracking::default(),
            score: Score::default(),
            selected_domains: DomainSelection::All,
            selected_confidence_categories: Vec::new(),
            study_filter: StudyFilter::All,
            current_mode: StudyMode::Study,
            completed_card_ids: Vec::new(),
            streak_days: 0,
            last_studied: None,
            study_sessions: Vec::new(),
            last_sync: None,
        }
    }
}

impl ProgressSnapshot {
    /// Documents written by a newer build are not merged into.
    pub fn is_supported(&self) -> bool {
        self.version <= SNAPSHOT_VERSION
    }
}

/// Field-level update. `None` fields leave the stored value untouched, so
/// overlapping saves never clobber fields they did not carry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_tracking: Option<ConfidenceTracking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_domains: Option<DomainSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_confidence_categories: Option<Vec<ConfidenceLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_filter: Option<StudyFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mode: Option<StudyMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_card_ids: Option<Vec<CardId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_studied: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_sessions: Option<Vec<StudyRecord>>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProgressPatch::default()
    }

    /// Fold a later patch into this one; fields present in `newer` win.
    pub fn merge(&mut self, newer: ProgressPatch) {
        macro_rules! take_newer {
            ($($field:ident),*) => {
                $(if newer.$field.is_some() {
                    self.$field = newer.$field;
                })*
            };
        }
        take_newer!(
            confidence_tracking,
            score,
            selected_domains,
            selected_confidence_categories,
            study_filter,
            current_mode,
            completed_card_ids,
            streak_days,
            last_studied,
            study_sessions
        );
    }

    pub fn apply_to(&self, snapshot: &mut ProgressSnapshot) {
        macro_rules! copy_present {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    snapshot.$field = value.clone();
                })*
            };
        }
        copy_present!(
            confidence_tracking,
            score,
            selected_domains,
            selected_confidence_categories,
            study_filter,
            current_mode,
            completed_card_ids,
            streak_days,
            study_sessions
        );
        if self.last_studied.is_some() {
            snapshot.last_studied = self.last_studied;
        }
        snapshot.version = SNAPSHOT_VERSION;
    }
}

impl From<&ProgressSnapshot> for ProgressPatch {
    fn from(snapshot: &ProgressSnapshot) -> Self {
        Self {
            confidence_tracking: Some(snapshot.confidence_tracking.clone()),
            score: Some(snapshot.score),
            selected_domains: Some(snapshot.selected_domains.clone()),
            selected_confidence_categories: Some(snapshot.selected_confidence_categories.clone()),
            study_filter: Some(snapshot.study_filter),
            current_mode: Some(snapshot.current_mode),
            completed_card_ids: Some(snapshot.completed_card_ids.clone()),
            streak_days: Some(snapshot.streak_days),
            last_studied: snapshot.last_studied,
            study_sessions: Some(snapshot.study_sessions.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_from_empty_document() {
        let snapshot: ProgressSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, ProgressSnapshot::default());
        assert!(snapshot.selected_domains.is_all());
    }

    #[test]
    fn test_snapshot_uses_camel_case_fields() {
        let json = serde_json::to_value(ProgressSnapshot::default()).unwrap();
        assert!(json.get("confidenceTracking").is_some());
        assert!(json.get("selectedConfidenceCategories").is_some());
        assert_eq!(json["selectedDomains"], serde_json::json!(["all"]));
        assert_eq!(json["studyFilter"], "all");
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut snapshot = ProgressSnapshot {
            streak_days: 4,
            study_filter: StudyFilter::Unanswered,
            ..Default::default()
        };
        let patch = ProgressPatch {
            selected_domains: Some(DomainSelection::Domains(vec!["A".to_string()])),
            ..Default::default()
        };
        patch.apply_to(&mut snapshot);
        assert_eq!(snapshot.streak_days, 4);
        assert_eq!(snapshot.study_filter, StudyFilter::Unanswered);
        assert!(!snapshot.selected_domains.is_all());
    }

    #[test]
    fn test_merge_later_fields_win() {
        let mut first = ProgressPatch {
            study_filter: Some(StudyFilter::Unanswered),
            current_mode: Some(StudyMode::Review),
            ..Default::default()
        };
        first.merge(ProgressPatch {
            study_filter: Some(StudyFilter::All),
            ..Default::default()
        });
        assert_eq!(first.study_filter, Some(StudyFilter::All));
        assert_eq!(first.current_mode, Some(StudyMode::Review));
    }

    #[test]
    fn test_empty_patch_serializes_to_empty_object() {
        let patch = ProgressPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "{}");
    }

    #[test]
    fn test_future_version_is_unsupported() {
        let snapshot: ProgressSnapshot = serde_json::from_str(r#"{"version": 99}"#).unwrap();
        assert!(!snapshot.is_supported());
    }
}
