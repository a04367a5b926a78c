use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel domain id meaning "every domain".
pub const ALL_DOMAINS: &str = "all";

/// Domain filter. `All` and specific domains are mutually exclusive, and a
/// specific selection is never empty.
///
/// Serialized as a list of ids (`["all"]` or `["A", "B"]`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum DomainSelection {
    #[default]
    All,
    Domains(Vec<String>),
}

impl DomainSelection {
    pub fn is_all(&self) -> bool {
        matches!(self, DomainSelection::All)
    }

    pub fn includes(&self, domain: &str) -> bool {
        match self {
            DomainSelection::All => true,
            DomainSelection::Domains(ids) => ids.iter().any(|id| id == domain),
        }
    }

    /// True if `domain` is explicitly selected (never true for `All`).
    pub fn is_selected(&self, domain: &str) -> bool {
        match self {
            DomainSelection::All => domain == ALL_DOMAINS,
            DomainSelection::Domains(ids) => ids.iter().any(|id| id == domain),
        }
    }

    /// Apply one picker click. Choosing `all` clears specific domains;
    /// choosing a domain toggles it, and deselecting the last one reverts to `All`.
    pub fn toggle(&mut self, domain: &str) {
        if domain == ALL_DOMAINS {
            *self = DomainSelection::All;
            return;
        }
        let mut ids = match std::mem::take(self) {
            DomainSelection::All => Vec::new(),
            DomainSelection::Domains(ids) => ids,
        };
        if let Some(pos) = ids.iter().position(|id| id == domain) {
            ids.remove(pos);
        } else {
            ids.push(domain.to_string());
        }
        *self = if ids.is_empty() {
            DomainSelection::All
        } else {
            DomainSelection::Domains(ids)
        };
    }

    pub fn ids(&self) -> Vec<String> {
        self.clone().into()
    }
}

impl From<Vec<String>> for DomainSelection {
    fn from(ids: Vec<String>) -> Self {
        if ids.is_empty() || ids.iter().any(|id| id == ALL_DOMAINS) {
            return DomainSelection::All;
        }
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        DomainSelection::Domains(unique)
    }
}

impl From<DomainSelection> for Vec<String> {
    fn from(selection: DomainSelection) -> Self {
        match selection {
            DomainSelection::All => vec![ALL_DOMAINS.to_string()],
            DomainSelection::Domains(ids) => ids,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    #[default]
    Study,
    Review,
}

impl StudyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Study => "study",
            StudyMode::Review => "review",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            StudyMode::Study => StudyMode::Review,
            StudyMode::Review => StudyMode::Study,
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyFilter {
    #[default]
    All,
    Unanswered,
}

impl StudyFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StudyFilter::All => "all",
            StudyFilter::Unanswered => "unanswered",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            StudyFilter::All => StudyFilter::Unanswered,
            StudyFilter::Unanswered => StudyFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_well_formed(selection: &DomainSelection) -> bool {
        match selection {
            DomainSelection::All => true,
            DomainSelection::Domains(ids) => !ids.is_empty() && !ids.iter().any(|id| id == ALL_DOMAINS),
        }
    }

    #[test]
    fn test_toggle_specific_replaces_all() {
        let mut selection = DomainSelection::All;
        selection.toggle("A");
        assert_eq!(selection, DomainSelection::Domains(vec!["A".to_string()]));
        assert!(!selection.includes("B"));
    }

    #[test]
    fn test_deselecting_last_domain_reverts_to_all() {
        let mut selection = DomainSelection::All;
        selection.toggle("A");
        selection.toggle("A");
        assert_eq!(selection, DomainSelection::All);
    }

    #[test]
    fn test_selecting_all_clears_domains() {
        let mut selection = DomainSelection::All;
        selection.toggle("A");
        selection.toggle("B");
        selection.toggle(ALL_DOMAINS);
        assert!(selection.is_all());
    }

    #[test]
    fn test_any_toggle_sequence_stays_well_formed() {
        let clicks = ["A", "B", "all", "B", "C", "B", "C", "all", "all", "A"];
        let mut selection = DomainSelection::All;
        for click in clicks {
            selection.toggle(click);
            assert!(is_well_formed(&selection), "after {click}: {selection:?}");
        }
        assert_eq!(selection.ids(), vec!["A".to_string()]);
    }

    #[test]
    fn test_serde_list_form() {
        let json = serde_json::to_string(&DomainSelection::All).unwrap();
        assert_eq!(json, r#"["all"]"#);

        let mixed: DomainSelection = serde_json::from_str(r#"["A","all"]"#).unwrap();
        assert!(mixed.is_all());
        let empty: DomainSelection = serde_json::from_str("[]").unwrap();
        assert!(empty.is_all());
        let dup: DomainSelection = serde_json::from_str(r#"["A","A","B"]"#).unwrap();
        assert_eq!(dup.ids(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_mode_and_filter_serde() {
        assert_eq!(serde_json::to_string(&StudyMode::Review).unwrap(), r#""review""#);
        let filter: StudyFilter = serde_json::from_str(r#""unanswered""#).unwrap();
        assert_eq!(filter, StudyFilter::Unanswered);
    }
}
