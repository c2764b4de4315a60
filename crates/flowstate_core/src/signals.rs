use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::stats::pairwise_sum;

/// Auxiliary biometric/activity series keyed by signal name, in caller order.
pub type AuxiliarySignals = IndexMap<String, Vec<f64>>;

/// Score assigned to a signal when nothing is known about it.
pub const NEUTRAL_FACTOR: f64 = 0.5;

/// Recognized biometric, activity, cognitive and contextual signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    HeartRate,
    Hrv,
    SleepHours,
    SleepQuality,
    RestingHr,
    Steps,
    ActivityLevel,
    TypingSpeed,
    ReactionTimeMs,
    TimeOfDay,
    MoodScore,
}

impl Signal {
    /// Declaration order; the composite factor is summed over this order.
    pub const ALL: [Signal; 11] = [
        Signal::HeartRate,
        Signal::Hrv,
        Signal::SleepHours,
        Signal::SleepQuality,
        Signal::RestingHr,
        Signal::Steps,
        Signal::ActivityLevel,
        Signal::TypingSpeed,
        Signal::ReactionTimeMs,
        Signal::TimeOfDay,
        Signal::MoodScore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::HeartRate => "heart_rate",
            Signal::Hrv => "hrv",
            Signal::SleepHours => "sleep_hours",
            Signal::SleepQuality => "sleep_quality",
            Signal::RestingHr => "resting_hr",
            Signal::Steps => "steps",
            Signal::ActivityLevel => "activity_level",
            Signal::TypingSpeed => "typing_speed",
            Signal::ReactionTimeMs => "reaction_time_ms",
            Signal::TimeOfDay => "time_of_day",
            Signal::MoodScore => "mood_score",
        }
    }

    pub fn from_name(name: &str) -> Option<Signal> {
        Signal::ALL.into_iter().find(|s| s.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Maps the most recent reading onto an energy factor.
    ///
    /// Returns `None` for signals without a mapping; they stay neutral.
    pub fn factor(self, v: f64) -> Option<f64> {
        let f = match self {
            // 60 bpm at rest is good, 100 bpm suggests stress
            Signal::HeartRate => (1.0 - (v - 60.0) / 80.0).min(0.9).max(0.1),
            Signal::Hrv => (v / 120.0).min(0.9),
            Signal::SleepHours => ((v - 4.0) / 6.0).max(0.2).min(0.9),
            Signal::TypingSpeed => (v / 120.0).max(0.1).min(0.95),
            // lower is better
            Signal::ReactionTimeMs => (1.0 - v / 400.0).max(0.1),
            Signal::Steps => (v / 12000.0).max(0.2).min(0.95),
            Signal::SleepQuality
            | Signal::RestingHr
            | Signal::ActivityLevel
            | Signal::TimeOfDay
            | Signal::MoodScore => return None,
        };
        Some(f)
    }
}

/// Per-request table of normalized signal scores (0.5 = neutral/unknown).
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    scores: [f64; 11],
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::neutral()
    }
}

impl FactorTable {
    pub fn neutral() -> Self {
        Self {
            scores: [NEUTRAL_FACTOR; 11],
        }
    }

    /// Builds the table from the last reading of each recognized signal.
    /// Empty series and unrecognized names are ignored.
    pub fn from_auxiliary(auxiliary: &AuxiliarySignals) -> Self {
        let mut table = Self::neutral();
        for (name, values) in auxiliary {
            let (Some(signal), Some(&last)) = (Signal::from_name(name), values.last()) else {
                continue;
            };
            if let Some(score) = signal.factor(last) {
                table.scores[signal.index()] = score;
            }
        }
        table
    }

    pub fn get(&self, signal: Signal) -> f64 {
        self.scores[signal.index()]
    }

    /// Unweighted mean of all eleven scores.
    pub fn composite(&self) -> f64 {
        pairwise_sum(&self.scores) / self.scores.len() as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (Signal, f64)> + '_ {
        Signal::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}
