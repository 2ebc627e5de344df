use crate::game::judgment::{JudgeGrade, PERFECT_SCORE};
use serde::Serialize;
use std::collections::HashMap;

// --- Grade Definitions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

pub fn percent_to_grade(percent: f64) -> Grade {
    if percent >= 0.95 { Grade::S }
    else if percent >= 0.85 { Grade::A }
    else if percent >= 0.70 { Grade::B }
    else if percent >= 0.50 { Grade::C }
    else { Grade::D }
}

/// End-of-play numbers for the results screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub score: u64,
    pub possible_score: u64,
    pub max_combo: u32,
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
    pub total_notes: usize,
    /// 0.0 to 1.0
    pub score_percent: f64,
    pub grade: Grade,
}

impl SessionSummary {
    pub fn from_counts(
        score: u64,
        max_combo: u32,
        judgment_counts: &HashMap<JudgeGrade, u32>,
        total_notes: usize,
    ) -> Self {
        let count = |grade| judgment_counts.get(&grade).copied().unwrap_or(0);
        let possible_score = total_notes as u64 * PERFECT_SCORE;
        let score_percent = if possible_score == 0 {
            0.0
        } else {
            (score as f64 / possible_score as f64).clamp(0.0, 1.0)
        };
        Self {
            score,
            possible_score,
            max_combo,
            perfect: count(JudgeGrade::Perfect),
            good: count(JudgeGrade::Good),
            miss: count(JudgeGrade::Miss),
            total_notes,
            score_percent,
            grade: percent_to_grade(score_percent),
        }
    }

    /// Notes that were neither hit nor missed yet.
    pub fn unjudged(&self) -> usize {
        self.total_notes
            .saturating_sub((self.perfect + self.good + self.miss) as usize)
    }
}
