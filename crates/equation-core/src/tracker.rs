use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::record::EnergyConsumptionData;
use crate::snapshot::DeviceSnapshot;
use crate::source::{DeviceSource, SourceError};

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub device_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub ts: NaiveDateTime,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    /// Devices no longer listed by any installation.
    pub removed: Vec<String>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    fn new(ts: NaiveDateTime) -> Self {
        Self {
            ts,
            created: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
            removed: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, device_id: Option<&str>, reason: impl ToString) {
        self.failures.push(SyncFailure {
            device_id: device_id.map(str::to_string),
            reason: reason.to_string(),
        });
    }
}

/// Keeps one snapshot per device and refreshes them from a source.
///
/// Snapshots are replaced whole: readers holding an `Arc` from a previous
/// cycle keep a consistent view, and a failed update leaves the previous
/// snapshot in place.
pub struct DeviceTracker<S: DeviceSource> {
    source: S,
    config: TrackerConfig,
    device_filter: Option<String>,
    devices: BTreeMap<String, Arc<DeviceSnapshot>>,
    syncs: u64,
}

impl<S: DeviceSource> DeviceTracker<S> {
    pub fn new(source: S, config: TrackerConfig, device_filter: Option<String>) -> Self {
        Self {
            source,
            config,
            device_filter,
            devices: BTreeMap::new(),
            syncs: 0,
        }
    }

    pub fn sync_interval(&self) -> Duration {
        self.config.sync_interval
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn syncs(&self) -> u64 {
        self.syncs
    }

    pub fn snapshot(&self, device_id: &str) -> Option<Arc<DeviceSnapshot>> {
        self.devices.get(device_id).cloned()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Arc<DeviceSnapshot>> {
        self.devices.values()
    }

    /// Installation id to device ids.
    pub async fn discover(&mut self) -> Result<BTreeMap<String, Vec<String>>, SourceError> {
        let limit = self.config.fetch_timeout;
        let mut out = BTreeMap::new();
        for installation in bounded(limit, self.source.installations()).await? {
            let devices = bounded(limit, self.source.installation_devices(&installation)).await?;
            out.insert(installation, devices);
        }
        Ok(out)
    }

    pub async fn sync(&mut self, clock: &impl Clock) -> Result<SyncReport, SourceError> {
        let limit = self.config.fetch_timeout;
        let mut report = SyncReport::new(clock.now());
        let mut listed = BTreeSet::new();
        let mut listing_complete = true;

        let installations = bounded(limit, self.source.installations()).await?;

        let latest_firmware = match bounded(limit, self.source.latest_firmware()).await {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "latest firmware lookup failed");
                None
            }
        };

        for installation in installations {
            let device_ids = match bounded(limit, self.source.installation_devices(&installation)).await {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(installation = %installation, error = %err, "device listing failed");
                    report.fail(None, format!("installation {installation}: {err}"));
                    listing_complete = false;
                    continue;
                }
            };

            for device_id in device_ids {
                if self
                    .device_filter
                    .as_deref()
                    .is_some_and(|wanted| wanted != device_id)
                {
                    continue;
                }
                listed.insert(device_id.clone());

                let raw = match bounded(limit, self.source.device(&device_id)).await {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!(device_id = %device_id, error = %err, "device fetch failed");
                        report.fail(Some(device_id.as_str()), err);
                        continue;
                    }
                };

                if !raw.get("data").is_some_and(Value::is_object) {
                    debug!(device_id = %device_id, "record has no data, skipping");
                    report.skipped.push(device_id);
                    continue;
                }

                let energy = match bounded(limit, self.source.energy_consumption(&device_id)).await {
                    Ok(energy) => energy,
                    Err(err) => {
                        warn!(device_id = %device_id, error = %err, "energy fetch failed, keeping previous");
                        self.previous_energy(&device_id)
                    }
                };

                self.apply(&device_id, &raw, energy, latest_firmware.clone(), clock, &mut report);
            }
        }

        // A failed listing says nothing about which devices are gone.
        if listing_complete {
            self.devices.retain(|id, _| {
                let keep = listed.contains(id);
                if !keep {
                    debug!(device_id = %id, "device no longer listed, dropping");
                    report.removed.push(id.clone());
                }
                keep
            });
        }

        self.syncs += 1;
        Ok(report)
    }

    fn apply(
        &mut self,
        device_id: &str,
        raw: &Value,
        energy: Option<EnergyConsumptionData>,
        latest_firmware: Option<String>,
        clock: &impl Clock,
        report: &mut SyncReport,
    ) {
        match self.devices.get(device_id) {
            Some(previous) => {
                let mut next = DeviceSnapshot::clone(previous);
                match next.update(raw, energy, latest_firmware, clock) {
                    Ok(()) => {
                        debug!(device_id = %device_id, preset = %next.preset(), target_temp = next.target_temp(), "device updated");
                        self.devices.insert(device_id.to_string(), Arc::new(next));
                        report.updated.push(device_id.to_string());
                    }
                    Err(err) => {
                        warn!(device_id = %device_id, error = %err, "update rejected, keeping previous snapshot");
                        report.fail(Some(device_id), err);
                    }
                }
            }
            None => match DeviceSnapshot::new(device_id, raw, energy, latest_firmware, clock) {
                Ok(snapshot) => {
                    debug!(device_id = %device_id, preset = %snapshot.preset(), target_temp = snapshot.target_temp(), "device added");
                    self.devices.insert(device_id.to_string(), Arc::new(snapshot));
                    report.created.push(device_id.to_string());
                }
                Err(err) => {
                    warn!(device_id = %device_id, error = %err, "record rejected");
                    report.fail(Some(device_id), err);
                }
            },
        }
    }

    fn previous_energy(&self, device_id: &str) -> Option<EnergyConsumptionData> {
        self.devices
            .get(device_id)
            .and_then(|s| s.state().energy_data.clone())
    }
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    timeout(limit, fut).await.map_err(|_| SourceError::Timeout)?
}
