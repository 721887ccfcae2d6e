use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::clock::Clock;
use crate::product::{product_by_type_version, Capabilities, ProductInfo};
use crate::record::{EnergyConsumptionData, RecordView};
use crate::resolver::{resolve, Preset, Resolution, ResolverInput};
use crate::schedule::{ScheduleMode, WeeklySchedule};

/// Device `mode` value meaning "follow the weekly schedule".
pub const DEVICE_MODE_AUTO: &str = "auto";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("malformed record: missing identity field `{0}`")]
    MalformedRecord(String),
    #[error("missing or invalid field `{0}`")]
    MissingField(String),
    #[error("invalid schedule shape: {rows} rows, {columns:?} columns (expected 7x24)")]
    InvalidScheduleShape { rows: usize, columns: Option<usize> },
    #[error("timestamp out of range in field `{0}`")]
    InvalidTimestamp(String),
}

/// Preset and setpoint the device is actually running.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum EffectiveState {
    /// Derived from the weekly schedule (device in automatic mode).
    Schedule(Resolution),
    /// Copied from the vendor's `status`/`temp` fields.
    Vendor { preset: String, target_temp: f64 },
}

impl EffectiveState {
    pub fn preset(&self) -> &str {
        match self {
            Self::Schedule(r) => r.preset.as_str(),
            Self::Vendor { preset, .. } => preset,
        }
    }

    pub fn target_temp(&self) -> f64 {
        match self {
            Self::Schedule(r) => r.target_temp,
            Self::Vendor { target_temp, .. } => *target_temp,
        }
    }
}

/// Everything a sync overwrites. Built in full before it replaces the
/// previous value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub name: String,
    pub nominal_power: i64,
    pub power: bool,
    pub mode: String,

    pub temp_calc: f64,
    pub temp_probe: f64,
    pub windows_open: bool,

    pub comfort_temp: f64,
    pub eco_temp: f64,
    pub ice_temp: f64,

    pub user_mode: bool,
    pub um_min_temp: Option<f64>,
    pub um_max_temp: Option<f64>,
    pub ice_mode: bool,

    pub schedule: WeeklySchedule,
    pub effective: EffectiveState,

    pub energy_data: Option<EnergyConsumptionData>,
    pub last_sync_app: DateTime<Utc>,
    pub last_sync_device: DateTime<Utc>,
    pub firmware_version: Option<String>,
    pub latest_firmware_version: Option<String>,
    pub hass_available: bool,
}

impl DeviceState {
    pub fn is_auto(&self) -> bool {
        self.mode == DEVICE_MODE_AUTO
    }

    fn resolver_input(&self) -> ResolverInput<'_> {
        ResolverInput {
            schedule: &self.schedule,
            power: self.power,
            ice_mode: self.ice_mode,
            comfort_temp: self.comfort_temp,
            eco_temp: self.eco_temp,
            ice_temp: self.ice_temp,
        }
    }
}

/// One radiator as last reported by the cloud API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    id: String,
    serial_number: String,
    product_type: String,
    product_version: String,
    capabilities: Capabilities,
    #[serde(flatten)]
    state: DeviceState,
}

impl DeviceSnapshot {
    pub fn new(
        device_id: impl Into<String>,
        raw: &Value,
        energy_data: Option<EnergyConsumptionData>,
        latest_firmware: Option<String>,
        clock: &impl Clock,
    ) -> Result<Self, SnapshotError> {
        let view = RecordView::new(raw)?;
        let product_type = view.product_type()?;
        let product_version = view.product_version()?.to_ascii_lowercase();
        if product_version.is_empty() {
            return Err(SnapshotError::MalformedRecord("product_version".to_string()));
        }
        let serial_number = view.serial_number()?;
        let capabilities = Capabilities::for_version(&product_version);

        let state = read_state(&view, capabilities, energy_data, latest_firmware, clock.now())?;

        Ok(Self {
            id: device_id.into(),
            serial_number,
            product_type,
            product_version,
            capabilities,
            state,
        })
    }

    /// Replaces all mutable fields from a fresh record. On error the
    /// snapshot is left untouched.
    pub fn update(
        &mut self,
        raw: &Value,
        energy_data: Option<EnergyConsumptionData>,
        latest_firmware: Option<String>,
        clock: &impl Clock,
    ) -> Result<(), SnapshotError> {
        let view = RecordView::new(raw)?;
        self.state = read_state(&view, self.capabilities, energy_data, latest_firmware, clock.now())?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    pub fn product_version(&self) -> &str {
        &self.product_version
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn preset(&self) -> &str {
        self.state.effective.preset()
    }

    pub fn target_temp(&self) -> f64 {
        self.state.effective.target_temp()
    }

    pub fn supports_user_mode(&self) -> bool {
        self.capabilities.user_mode
    }

    pub fn product(&self) -> Option<&'static ProductInfo> {
        product_by_type_version(&self.product_type, &self.product_version)
    }

    /// Schedule evaluation at an arbitrary time. Ignores `mode`; does not
    /// touch the snapshot.
    pub fn resolve_at(&self, now: NaiveDateTime) -> Resolution {
        resolve(&self.state.resolver_input(), now)
    }

    pub fn current_schedule_mode_of(&self, now: NaiveDateTime) -> ScheduleMode {
        self.state.schedule.mode_at(now)
    }

    pub fn current_preset_of(&self, now: NaiveDateTime) -> Preset {
        self.resolve_at(now).preset
    }

    pub fn current_target_temp_of(&self, now: NaiveDateTime) -> f64 {
        self.resolve_at(now).target_temp
    }
}

fn read_state(
    view: &RecordView<'_>,
    capabilities: Capabilities,
    energy_data: Option<EnergyConsumptionData>,
    latest_firmware: Option<String>,
    now: NaiveDateTime,
) -> Result<DeviceState, SnapshotError> {
    let (user_mode, um_min_temp, um_max_temp) = if capabilities.user_mode {
        (
            view.flag("user_mode")?,
            Some(view.float("um_min_temp")?),
            Some(view.float("um_max_temp")?),
        )
    } else {
        (false, None, None)
    };

    let mode = view.string("mode")?;
    let schedule = WeeklySchedule::from_value(view.field("schedule")?)?;
    let name = view.string("name")?;
    let nominal_power = view.int("nominal_power")?;
    let power = view.flag("power")?;
    let temp_calc = view.float("temp_calc")?;
    let temp_probe = view.float("temp_probe")?;
    let windows_open = view.flag("windows_open_status")?;
    let comfort_temp = view.float("comfort")?;
    let eco_temp = view.float("eco")?;
    let ice_temp = view.float("ice")?;
    let ice_mode = view.flag("ice_mode")?;
    let last_sync_app = view.epoch_millis("last_sync_datetime_app")?;
    let last_sync_device = view.epoch_millis("last_sync_datetime_device")?;

    let effective = if mode == DEVICE_MODE_AUTO {
        let input = ResolverInput {
            schedule: &schedule,
            power,
            ice_mode,
            comfort_temp,
            eco_temp,
            ice_temp,
        };
        EffectiveState::Schedule(resolve(&input, now))
    } else {
        EffectiveState::Vendor {
            preset: view.string("status")?,
            target_temp: view.float("temp")?,
        }
    };

    Ok(DeviceState {
        name,
        nominal_power,
        power,
        mode,
        temp_calc,
        temp_probe,
        windows_open,
        comfort_temp,
        eco_temp,
        ice_temp,
        user_mode,
        um_min_temp,
        um_max_temp,
        ice_mode,
        schedule,
        effective,
        energy_data,
        last_sync_app,
        last_sync_device,
        firmware_version: view.firmware_version(),
        latest_firmware_version: latest_firmware,
        hass_available: true,
    })
}
