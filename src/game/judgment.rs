use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JudgeGrade {
    Perfect,
    Good,
    Miss,
}

impl JudgeGrade {
    pub const ALL: [JudgeGrade; 3] = [JudgeGrade::Perfect, JudgeGrade::Good, JudgeGrade::Miss];

    pub fn label(self) -> &'static str {
        match self {
            JudgeGrade::Perfect => "Perfect",
            JudgeGrade::Good => "Good",
            JudgeGrade::Miss => "Miss",
        }
    }
}

impl fmt::Display for JudgeGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Judgment {
    pub time_error_ms: f64,
    pub grade: JudgeGrade,
    pub note_index: usize,
    pub lane: usize,
}

pub const PERFECT_SCORE: u64 = 100;
pub const GOOD_SCORE: u64 = 50;

pub fn grade_points_for(grade: JudgeGrade) -> u64 {
    match grade {
        JudgeGrade::Perfect => PERFECT_SCORE,
        JudgeGrade::Good => GOOD_SCORE,
        JudgeGrade::Miss => 0,
    }
}

/// Hit windows in seconds.
///
/// `miss` only decides which note a press is matched against. Scoring uses
/// `perfect` and `good`; a press matched in `[good, miss)` scores nothing and
/// leaves the note in play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingWindows {
    pub perfect: f64,
    pub good: f64,
    pub miss: f64,
}

impl Default for TimingWindows {
    fn default() -> Self {
        Self {
            perfect: 0.10,
            good: 0.20,
            miss: 0.25,
        }
    }
}

impl TimingWindows {
    #[inline(always)]
    pub fn selects(&self, abs_time_error: f64) -> bool {
        abs_time_error < self.miss
    }

    pub fn classify(&self, abs_time_error: f64) -> Option<JudgeGrade> {
        if abs_time_error < self.perfect {
            Some(JudgeGrade::Perfect)
        } else if abs_time_error < self.good {
            Some(JudgeGrade::Good)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let windows =
            [("PerfectWindow", self.perfect), ("GoodWindow", self.good), ("MissWindow", self.miss)];
        for (name, value) in windows {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be greater than zero, got {}", name, value));
            }
        }
        if self.perfect > self.good {
            return Err(format!(
                "PerfectWindow ({}) must not exceed GoodWindow ({})",
                self.perfect, self.good
            ));
        }
        Ok(())
    }
}
