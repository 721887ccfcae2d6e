//! Typed accessors over the raw device record returned by the vendor API.
//!
//! The vendor is loose about scalar encodings: numbers sometimes arrive as
//! strings and flags as `0`/`1`. Everything here coerces those shapes and
//! reports the offending key otherwise.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::snapshot::SnapshotError;

/// Energy consumption history handed in by the caller. Stored, never read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EnergyConsumptionData(pub Value);

pub(crate) struct RecordView<'a> {
    root: &'a Map<String, Value>,
    data: &'a Map<String, Value>,
}

impl<'a> RecordView<'a> {
    pub fn new(raw: &'a Value) -> Result<Self, SnapshotError> {
        let root = raw
            .as_object()
            .ok_or_else(|| SnapshotError::MalformedRecord("record".to_string()))?;
        let data = root
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| SnapshotError::MalformedRecord("data".to_string()))?;
        Ok(Self { root, data })
    }

    pub fn serial_number(&self) -> Result<String, SnapshotError> {
        identity_str(self.root, "serialnumber")
    }

    pub fn product_type(&self) -> Result<String, SnapshotError> {
        identity_str(self.data, "type")
    }

    pub fn product_version(&self) -> Result<String, SnapshotError> {
        identity_str(self.data, "product_version")
    }

    pub fn field(&self, key: &str) -> Result<&'a Value, SnapshotError> {
        self.data
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| SnapshotError::MissingField(key.to_string()))
    }

    pub fn string(&self, key: &str) -> Result<String, SnapshotError> {
        match self.field(key)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(SnapshotError::MissingField(key.to_string())),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64, SnapshotError> {
        let value = self.field(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|v| v.is_finite())
            .ok_or_else(|| SnapshotError::MissingField(key.to_string()))
    }

    pub fn int(&self, key: &str) -> Result<i64, SnapshotError> {
        let value = self.field(key)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| SnapshotError::MissingField(key.to_string()))
    }

    pub fn flag(&self, key: &str) -> Result<bool, SnapshotError> {
        match self.field(key)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(SnapshotError::MissingField(key.to_string())),
            },
            _ => Err(SnapshotError::MissingField(key.to_string())),
        }
    }

    pub fn epoch_millis(&self, key: &str) -> Result<DateTime<Utc>, SnapshotError> {
        let millis = self.int(key)?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| SnapshotError::InvalidTimestamp(key.to_string()))
    }

    pub fn firmware_version(&self) -> Option<String> {
        self.root
            .get("firmware")
            .and_then(Value::as_object)
            .and_then(|fw| fw.get("firmware_version_device"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

fn identity_str(map: &Map<String, Value>, key: &str) -> Result<String, SnapshotError> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SnapshotError::MalformedRecord(key.to_string()))
        .map(str::to_string)
}
