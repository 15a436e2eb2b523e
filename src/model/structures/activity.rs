use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

/// A recorded workout session as reported by the health-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active_energy_kcal: f64
}

impl Workout {
    /// Zero for records whose end precedes their start
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time).max(Duration::zero())
    }

    /// Zero for negative or non-finite readings
    pub fn energy(&self) -> f64 {
        if self.active_energy_kcal.is_finite() && self.active_energy_kcal > 0.0 {
            self.active_energy_kcal
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SleepStage {
    InBed,
    Awake,
    /// Asleep with no stage breakdown
    Asleep,
    Core,
    Deep,
    Rem
}

impl SleepStage {
    pub fn is_asleep(&self) -> bool {
        matches!(self, SleepStage::Asleep | SleepStage::Core | SleepStage::Deep | SleepStage::Rem)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub stage: SleepStage
}

impl SleepInterval {
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time).max(Duration::zero())
    }
}

/// Everything the score calculator consumes for one user and one week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyActivity {
    pub workouts: Vec<Workout>,
    pub sleep: Vec<SleepInterval>
}

impl WeeklyActivity {
    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty() && self.sleep.is_empty()
    }
}
