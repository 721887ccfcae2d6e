pub mod clock;
pub mod config;
pub mod product;
pub mod record;
pub mod resolver;
pub mod schedule;
pub mod snapshot;
pub mod source;
pub mod tracker;

#[cfg(test)]
mod snapshot_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::TrackerConfig;
pub use product::{product_by_type_version, Capabilities, ProductInfo};
pub use record::EnergyConsumptionData;
pub use resolver::{resolve, Preset, Resolution, ResolverInput};
pub use schedule::{ScheduleMode, WeeklySchedule};
pub use snapshot::{DeviceSnapshot, DeviceState, EffectiveState, SnapshotError, DEVICE_MODE_AUTO};
pub use source::{DeviceSource, JsonFileSource, SourceError};
pub use tracker::{DeviceTracker, SyncFailure, SyncReport};
