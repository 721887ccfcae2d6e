use chrono::NaiveDateTime;
use serde::Serialize;

use crate::schedule::{ScheduleMode, WeeklySchedule};

pub const PRESET_COMFORT: &str = "comfort";
pub const PRESET_ECO: &str = "eco";
pub const PRESET_ICE: &str = "ice";
pub const PRESET_OFF: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Preset {
    #[serde(rename = "comfort")]
    Comfort,
    #[serde(rename = "eco")]
    Eco,
    #[serde(rename = "ice")]
    Ice,
    #[serde(rename = "none")]
    Off,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comfort => PRESET_COMFORT,
            Self::Eco => PRESET_ECO,
            Self::Ice => PRESET_ICE,
            Self::Off => PRESET_OFF,
        }
    }
}

/// Inputs the resolver reads from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ResolverInput<'a> {
    pub schedule: &'a WeeklySchedule,
    pub power: bool,
    pub ice_mode: bool,
    pub comfort_temp: f64,
    pub eco_temp: f64,
    pub ice_temp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub schedule_mode: ScheduleMode,
    pub preset: Preset,
    pub target_temp: f64,
}

/// Maps the schedule cell for `now` plus the device flags to the active
/// preset and setpoint.
///
/// Priority: power off, then the scheduled Comfort/Eco slot, then ice mode,
/// then off. Ice mode never overrides a scheduled slot.
pub fn resolve(input: &ResolverInput<'_>, now: NaiveDateTime) -> Resolution {
    let schedule_mode = input.schedule.mode_at(now);

    let (preset, target_temp) = if !input.power {
        (Preset::Off, 0.0)
    } else {
        match schedule_mode {
            ScheduleMode::Comfort => (Preset::Comfort, input.comfort_temp),
            ScheduleMode::Eco => (Preset::Eco, input.eco_temp),
            ScheduleMode::Off if input.ice_mode => (Preset::Ice, input.ice_temp),
            ScheduleMode::Off => (Preset::Off, 0.0),
        }
    };

    Resolution {
        schedule_mode,
        preset,
        target_temp,
    }
}
