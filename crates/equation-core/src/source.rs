use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::record::EnergyConsumptionData;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timeout")]
    Timeout,
    #[error("io error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read side of the vendor cloud API.
#[async_trait]
pub trait DeviceSource: Send {
    async fn installations(&mut self) -> Result<Vec<String>, SourceError>;
    async fn installation_devices(&mut self, installation_id: &str) -> Result<Vec<String>, SourceError>;
    /// Raw device record (`data`, `firmware`, `serialnumber`).
    async fn device(&mut self, device_id: &str) -> Result<Value, SourceError>;
    async fn latest_firmware(&mut self) -> Result<Option<String>, SourceError>;

    async fn energy_consumption(
        &mut self,
        _device_id: &str,
    ) -> Result<Option<EnergyConsumptionData>, SourceError> {
        Ok(None)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    latest_firmware: Option<String>,
    #[serde(default)]
    installations: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    energy: BTreeMap<String, Value>,
}

/// Serves API responses from a JSON file, re-read on every call so edits
/// show up on the next sync.
///
/// ```json
/// { "latest_firmware": "1.4.0",
///   "installations": { "home": { "dev-1": { "serialnumber": "...", "data": { } } } },
///   "energy": { "dev-1": [] } }
/// ```
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Fixture, SourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(self.path.display().to_string())
            } else {
                SourceError::Io(format!("failed to read {}: {err}", self.path.display()))
            }
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|err| SourceError::Decode(format!("{}: {err}", self.path.display())))
    }
}

#[async_trait]
impl DeviceSource for JsonFileSource {
    async fn installations(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(self.load().await?.installations.into_keys().collect())
    }

    async fn installation_devices(&mut self, installation_id: &str) -> Result<Vec<String>, SourceError> {
        let mut fixture = self.load().await?;
        fixture
            .installations
            .remove(installation_id)
            .map(|devices| devices.into_keys().collect())
            .ok_or_else(|| SourceError::NotFound(format!("installation {installation_id}")))
    }

    async fn device(&mut self, device_id: &str) -> Result<Value, SourceError> {
        self.load()
            .await?
            .installations
            .into_values()
            .find_map(|mut devices| devices.remove(device_id))
            .ok_or_else(|| SourceError::NotFound(format!("device {device_id}")))
    }

    async fn latest_firmware(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.load().await?.latest_firmware)
    }

    async fn energy_consumption(
        &mut self,
        device_id: &str,
    ) -> Result<Option<EnergyConsumptionData>, SourceError> {
        Ok(self
            .load()
            .await?
            .energy
            .remove(device_id)
            .map(EnergyConsumptionData))
    }
}
