use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::confidence::ConfidenceLevel;
use crate::engine::selection::StudyMode;

/// Oldest records are dropped past this many.
pub const MAX_STUDY_RECORDS: usize = 200;

/// One sitting: from sign-in (or app start) until sign-out or quit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cards_studied: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub incorrect_answers: u32,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub mode: StudyMode,
}

impl StudyRecord {
    pub fn start(now: DateTime<Utc>, domains: Vec<String>, mode: StudyMode) -> Self {
        Self {
            id: format!("session_{}", now.timestamp_millis()),
            start_time: now,
            end_time: None,
            cards_studied: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            domains,
            mode,
        }
    }

    pub fn record_rating(&mut self, level: ConfidenceLevel) {
        self.cards_studied += 1;
        if level.is_correct() {
            self.correct_answers += 1;
        } else {
            self.incorrect_answers += 1;
        }
    }

    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
    }

    pub fn is_empty(&self) -> bool {
        self.cards_studied == 0
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn accuracy(&self) -> f64 {
        if self.cards_studied == 0 {
            return 0.0;
        }
        self.correct_answers as f64 / self.cards_studied as f64 * 100.0
    }
}

pub fn push_record(history: &mut Vec<StudyRecord>, record: StudyRecord) {
    history.push(record);
    if history.len() > MAX_STUDY_RECORDS {
        let excess = history.len() - MAX_STUDY_RECORDS;
        history.drain(..excess);
    }
}

/// Consecutive UTC days with at least one study sitting.
pub fn next_streak(streak_days: u32, last_studied: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let today = now.date_naive();
    match last_studied.map(|t| t.date_naive()) {
        Some(last) if last == today => streak_days.max(1),
        Some(last) if Some(last) == today.pred_opt() => streak_days + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_record_counts_ratings() {
        let mut record = StudyRecord::start(at(1, 9), vec!["all".to_string()], StudyMode::Study);
        record.record_rating(ConfidenceLevel::KnewIt);
        record.record_rating(ConfidenceLevel::Peeked);
        record.record_rating(ConfidenceLevel::QuickThink);
        assert_eq!(record.cards_studied, 3);
        assert_eq!(record.correct_answers, 2);
        assert_eq!(record.incorrect_answers, 1);
        assert!(record.duration().is_none());
        record.finish(at(1, 10));
        assert_eq!(record.duration(), Some(Duration::hours(1)));
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = Vec::new();
        for i in 0..(MAX_STUDY_RECORDS + 5) {
            let mut record = StudyRecord::start(at(1, 0), Vec::new(), StudyMode::Study);
            record.id = format!("r{i}");
            push_record(&mut history, record);
        }
        assert_eq!(history.len(), MAX_STUDY_RECORDS);
        assert_eq!(history[0].id, "r5");
    }

    #[test]
    fn test_streak_rules() {
        assert_eq!(next_streak(0, None, at(5, 12)), 1);
        assert_eq!(next_streak(3, Some(at(5, 1)), at(5, 23)), 3);
        assert_eq!(next_streak(3, Some(at(4, 23)), at(5, 1)), 4);
        assert_eq!(next_streak(3, Some(at(2, 12)), at(5, 12)), 1);
    }
}
