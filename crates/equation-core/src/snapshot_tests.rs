use crate::clock::FixedClock;
use crate::product::Capabilities;
use crate::record::EnergyConsumptionData;
use crate::resolver::Preset;
use crate::schedule::ScheduleMode;
use crate::snapshot::{DeviceSnapshot, EffectiveState, SnapshotError};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

// 2026-01-05 is a Monday.
fn monday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 5)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

fn week_rows() -> Vec<String> {
    // Monday: comfort 08:00-09:59, eco 18:00; rest of the week unscheduled.
    let monday = format!("{}CC{}E{}", "O".repeat(8), "O".repeat(8), "O".repeat(5));
    let mut rows = vec![monday];
    rows.extend((0..6).map(|_| "O".repeat(24)));
    rows
}

fn record(product_version: &str) -> Value {
    json!({
        "serialnumber": "EQ-0001",
        "firmware": { "firmware_version_device": "1.3.2" },
        "data": {
            "type": "radiator",
            "product_version": product_version,
            "name": "Living room",
            "nominal_power": 1500,
            "power": true,
            "mode": "auto",
            "temp_calc": "20.4",
            "temp_probe": 20.1,
            "windows_open_status": false,
            "comfort": 21.5,
            "eco": 17.0,
            "ice": 7.0,
            "um_max_temp": 24.0,
            "um_min_temp": 15.0,
            "user_mode": true,
            "ice_mode": true,
            "schedule": week_rows(),
            "status": "comfort",
            "temp": 19.0,
            "last_sync_datetime_app": 1767600000000_i64,
            "last_sync_datetime_device": 1767600005000_i64
        }
    })
}

fn with_data(mut raw: Value, key: &str, value: Value) -> Value {
    raw["data"][key] = value;
    raw
}

fn without_data(mut raw: Value, key: &str) -> Value {
    if let Some(data) = raw["data"].as_object_mut() {
        data.remove(key);
    }
    raw
}

#[test]
fn comfort_slot_resolves_comfort() {
    // Arrange
    let clock = FixedClock(monday(8, 30));

    // Act
    let snapshot = DeviceSnapshot::new("dev-1", &record("V2"), None, None, &clock).expect("snapshot");

    // Assert
    assert_eq!(snapshot.preset(), "comfort");
    assert_eq!(snapshot.target_temp(), 21.5);
    assert_eq!(snapshot.current_preset_of(monday(8, 30)), Preset::Comfort);
    assert_eq!(snapshot.current_target_temp_of(monday(8, 30)), 21.5);
    assert_eq!(snapshot.current_schedule_mode_of(monday(8, 30)), ScheduleMode::Comfort);
}

#[test]
fn unscheduled_hour_with_ice_mode_resolves_ice() {
    let clock = FixedClock(monday(2, 0));
    let snapshot = DeviceSnapshot::new("dev-1", &record("v2"), None, None, &clock).expect("snapshot");

    assert_eq!(snapshot.preset(), "ice");
    assert_eq!(snapshot.target_temp(), 7.0);
}

#[test]
fn powered_off_device_is_off() {
    let raw = with_data(record("v2"), "power", json!(false));
    let snapshot = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(8, 30))).expect("snapshot");

    assert_eq!(snapshot.preset(), "none");
    assert_eq!(snapshot.target_temp(), 0.0);
}

#[test]
fn manual_mode_copies_vendor_values() {
    // Arrange
    let raw = with_data(record("v2"), "mode", json!("manual"));
    let raw = with_data(raw, "status", json!("eco"));
    let raw = with_data(raw, "temp", json!("18.5"));

    // Act
    let snapshot = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(8, 30))).expect("snapshot");

    // Assert
    assert_eq!(
        snapshot.state().effective,
        EffectiveState::Vendor {
            preset: "eco".to_string(),
            target_temp: 18.5
        }
    );
    assert_eq!(snapshot.preset(), "eco");
    assert_eq!(snapshot.target_temp(), 18.5);
    // What-if queries still follow the schedule.
    assert_eq!(snapshot.current_preset_of(monday(8, 30)), Preset::Comfort);
}

#[test]
fn manual_mode_requires_vendor_status() {
    let raw = with_data(record("v2"), "mode", json!("manual"));
    let raw = without_data(raw, "status");

    let err = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(8, 30))).unwrap_err();

    assert_eq!(err, SnapshotError::MissingField("status".to_string()));
}

#[test]
fn auto_mode_ignores_vendor_status() {
    let raw = without_data(record("v2"), "status");
    let raw = without_data(raw, "temp");

    let snapshot = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(18, 0))).expect("snapshot");

    assert_eq!(snapshot.preset(), "eco");
    assert_eq!(snapshot.target_temp(), 17.0);
}

#[test]
fn user_mode_fields_read_only_for_v2() {
    // Arrange
    let v1 = without_data(record("v1"), "um_max_temp");
    let clock = FixedClock(monday(8, 30));

    // Act
    let v1 = DeviceSnapshot::new("dev-1", &v1, None, None, &clock).expect("v1 snapshot");
    let v2 = DeviceSnapshot::new("dev-2", &record("V2"), None, None, &clock).expect("v2 snapshot");

    // Assert
    assert!(!v1.supports_user_mode());
    assert!(!v1.state().user_mode);
    assert_eq!(v1.state().um_max_temp, None);
    assert_eq!(v1.state().um_min_temp, None);

    assert!(v2.supports_user_mode());
    assert_eq!(v2.product_version(), "v2");
    assert!(v2.state().user_mode);
    assert_eq!(v2.state().um_min_temp, Some(15.0));
    assert_eq!(v2.state().um_max_temp, Some(24.0));
}

#[test]
fn v2_without_user_mode_fields_is_rejected() {
    let raw = without_data(record("v2"), "um_min_temp");

    let err = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(8, 30))).unwrap_err();

    assert_eq!(err, SnapshotError::MissingField("um_min_temp".to_string()));
}

#[test]
fn user_mode_capability_is_exact_match() {
    assert!(Capabilities::for_version("v2").user_mode);
    assert!(!Capabilities::for_version("v1").user_mode);
    assert!(!Capabilities::for_version("v2 ").user_mode);
    assert!(!Capabilities::for_version("v2-beta").user_mode);
    assert!(!Capabilities::for_version("").user_mode);
}

#[test]
fn missing_identity_is_malformed() {
    let clock = FixedClock(monday(8, 30));

    let no_version = without_data(record("v2"), "product_version");
    let no_type = without_data(record("v2"), "type");
    let mut no_serial = record("v2");
    no_serial.as_object_mut().expect("object").remove("serialnumber");
    let empty_version = with_data(record("v2"), "product_version", json!(""));

    assert_eq!(
        DeviceSnapshot::new("d", &no_version, None, None, &clock).unwrap_err(),
        SnapshotError::MalformedRecord("product_version".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &no_type, None, None, &clock).unwrap_err(),
        SnapshotError::MalformedRecord("type".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &no_serial, None, None, &clock).unwrap_err(),
        SnapshotError::MalformedRecord("serialnumber".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &empty_version, None, None, &clock).unwrap_err(),
        SnapshotError::MalformedRecord("product_version".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &json!({"serialnumber": "x"}), None, None, &clock).unwrap_err(),
        SnapshotError::MalformedRecord("data".to_string())
    );
}

#[test]
fn schedule_shape_is_checked() {
    let clock = FixedClock(monday(8, 30));
    let six_rows: Vec<String> = (0..6).map(|_| "O".repeat(24)).collect();
    let mut short_row = week_rows();
    short_row[3] = "O".repeat(23);

    let err = DeviceSnapshot::new("d", &with_data(record("v2"), "schedule", json!(six_rows)), None, None, &clock)
        .unwrap_err();
    assert_eq!(err, SnapshotError::InvalidScheduleShape { rows: 6, columns: None });

    let err = DeviceSnapshot::new("d", &with_data(record("v2"), "schedule", json!(short_row)), None, None, &clock)
        .unwrap_err();
    assert_eq!(err, SnapshotError::InvalidScheduleShape { rows: 7, columns: Some(23) });
}

#[test]
fn schedule_rows_may_be_arrays_of_codes() {
    let rows: Vec<Vec<String>> = week_rows()
        .iter()
        .map(|row| row.chars().map(String::from).collect())
        .collect();
    let raw = with_data(record("v2"), "schedule", json!(rows));

    let snapshot = DeviceSnapshot::new("d", &raw, None, None, &FixedClock(monday(9, 0))).expect("snapshot");

    assert_eq!(snapshot.preset(), "comfort");
}

#[test]
fn failed_update_leaves_snapshot_untouched() {
    // Arrange
    let clock = FixedClock(monday(8, 30));
    let mut snapshot = DeviceSnapshot::new("dev-1", &record("v2"), None, None, &clock).expect("snapshot");
    let before = snapshot.clone();
    let bad = with_data(record("v2"), "power", json!(false));
    let bad = with_data(bad, "comfort", json!("warm"));

    // Act
    let err = snapshot.update(&bad, None, Some("9.9.9".to_string()), &clock).unwrap_err();

    // Assert
    assert_eq!(err, SnapshotError::MissingField("comfort".to_string()));
    assert_eq!(snapshot, before);
}

#[test]
fn update_replaces_state_and_keeps_identity() {
    let clock = FixedClock(monday(8, 30));
    let mut snapshot = DeviceSnapshot::new("dev-1", &record("v2"), None, None, &clock).expect("snapshot");

    let next = with_data(record("v9"), "ice_mode", json!(0));
    let next = with_data(next, "power", json!(1));
    snapshot
        .update(&next, None, Some("1.4.0".to_string()), &FixedClock(monday(3, 0)))
        .expect("update");

    assert_eq!(snapshot.product_version(), "v2");
    assert!(snapshot.supports_user_mode());
    assert_eq!(snapshot.preset(), "none");
    assert_eq!(snapshot.target_temp(), 0.0);
    assert_eq!(snapshot.state().latest_firmware_version.as_deref(), Some("1.4.0"));
}

#[test]
fn update_is_idempotent() {
    let clock = FixedClock(monday(8, 30));
    let energy = EnergyConsumptionData(json!([{"day": "2026-01-04", "kwh": 3.2}]));
    let mut snapshot = DeviceSnapshot::new("dev-1", &record("v2"), None, None, &clock).expect("snapshot");

    snapshot
        .update(&record("v2"), Some(energy.clone()), Some("1.4.0".to_string()), &clock)
        .expect("first update");
    let first = serde_json::to_string(&snapshot).expect("serialize");
    snapshot
        .update(&record("v2"), Some(energy), Some("1.4.0".to_string()), &clock)
        .expect("second update");
    let second = serde_json::to_string(&snapshot).expect("serialize");

    assert_eq!(first, second);
}

#[test]
fn sync_bookkeeping_fields() {
    let mut raw = record("v1");
    raw.as_object_mut().expect("object").remove("firmware");

    let snapshot = DeviceSnapshot::new("dev-1", &raw, None, None, &FixedClock(monday(8, 30))).expect("snapshot");
    let state = snapshot.state();

    assert_eq!(state.firmware_version, None);
    assert_eq!(state.latest_firmware_version, None);
    assert!(state.hass_available);
    assert_eq!(state.last_sync_app.timestamp_millis(), 1767600000000);
    assert_eq!(state.last_sync_device.timestamp_millis(), 1767600005000);
    assert_eq!(state.temp_calc, 20.4);
    assert_eq!(state.nominal_power, 1500);
    assert_eq!(snapshot.serial_number(), "EQ-0001");

    let with_fw = DeviceSnapshot::new("dev-1", &record("v1"), None, None, &FixedClock(monday(8, 30))).expect("snapshot");
    assert_eq!(with_fw.state().firmware_version.as_deref(), Some("1.3.2"));
}

#[test]
fn wrong_shaped_fields_are_rejected() {
    let clock = FixedClock(monday(8, 30));

    let bad_flag = with_data(record("v2"), "ice_mode", json!("yes"));
    let bad_name = with_data(record("v2"), "name", json!(42));
    let null_temp = with_data(record("v2"), "temp_probe", Value::Null);

    assert_eq!(
        DeviceSnapshot::new("d", &bad_flag, None, None, &clock).unwrap_err(),
        SnapshotError::MissingField("ice_mode".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &bad_name, None, None, &clock).unwrap_err(),
        SnapshotError::MissingField("name".to_string())
    );
    assert_eq!(
        DeviceSnapshot::new("d", &null_temp, None, None, &clock).unwrap_err(),
        SnapshotError::MissingField("temp_probe".to_string())
    );
}

#[test]
fn product_lookup_tolerates_unknown_hardware() {
    let clock = FixedClock(monday(8, 30));
    let known = DeviceSnapshot::new("d", &record("V2"), None, None, &clock).expect("snapshot");
    let unknown = DeviceSnapshot::new("d", &record("v7"), None, None, &clock).expect("snapshot");

    assert_eq!(known.product().map(|p| p.name), Some("Equation Radiator V2"));
    assert!(unknown.product().is_none());
}

#[test]
fn out_of_range_sync_timestamp_is_rejected() {
    // Arrange
    let raw = with_data(record("v2"), "last_sync_datetime_app", json!(i64::MAX));

    // Act
    let err = DeviceSnapshot::new("d", &raw, None, None, &FixedClock(monday(8, 30))).unwrap_err();

    // Assert
    assert_eq!(
        err,
        SnapshotError::InvalidTimestamp("last_sync_datetime_app".to_string())
    );
}

#[test]
fn effective_state_is_resolved_from_the_fields_it_was_built_with() {
    let clock = FixedClock(monday(18, 0));
    let raw = with_data(record("v2"), "eco", json!("16.0"));

    let snapshot = DeviceSnapshot::new("d", &raw, None, None, &clock).expect("snapshot");

    assert_eq!(
        snapshot.state().effective,
        EffectiveState::Schedule(snapshot.resolve_at(monday(18, 0)))
    );
    assert_eq!(snapshot.target_temp(), 16.0);
}
