use crate::model::constants::{CONSISTENCY_MAX, INTENSITY_MAX, RECOVERY_MAX, VOLUME_MAX};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{component} = {value} exceeds its cap of {cap}")]
pub struct ComponentOutOfRange {
    pub component: &'static str,
    pub value: i64,
    pub cap: u32
}

/// The four capped parts of a weekly score.
///
/// Values are clamped when built through [`ScoreComponents::new`], so
/// [`ScoreComponents::total`] never exceeds 100. Values coming back from
/// storage go through [`ScoreComponents::checked`] instead, which refuses
/// anything out of range rather than clamping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    consistency: u32,
    volume: u32,
    intensity: u32,
    recovery: u32
}

impl ScoreComponents {
    pub fn new(consistency: u32, volume: u32, intensity: u32, recovery: u32) -> ScoreComponents {
        ScoreComponents {
            consistency: consistency.min(CONSISTENCY_MAX),
            volume: volume.min(VOLUME_MAX),
            intensity: intensity.min(INTENSITY_MAX),
            recovery: recovery.min(RECOVERY_MAX)
        }
    }

    pub fn checked(
        consistency: i64,
        volume: i64,
        intensity: i64,
        recovery: i64
    ) -> Result<ScoreComponents, ComponentOutOfRange> {
        Ok(ScoreComponents {
            consistency: check("consistency", consistency, CONSISTENCY_MAX)?,
            volume: check("volume", volume, VOLUME_MAX)?,
            intensity: check("intensity", intensity, INTENSITY_MAX)?,
            recovery: check("recovery", recovery, RECOVERY_MAX)?
        })
    }

    pub fn consistency(&self) -> u32 {
        self.consistency
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    pub fn recovery(&self) -> u32 {
        self.recovery
    }

    pub fn total(&self) -> u32 {
        self.consistency + self.volume + self.intensity + self.recovery
    }
}

fn check(component: &'static str, value: i64, cap: u32) -> Result<u32, ComponentOutOfRange> {
    if value < 0 || value > cap as i64 {
        return Err(ComponentOutOfRange { component, value, cap });
    }

    Ok(value as u32)
}
