use std::fmt::Write as _;

use chrono::NaiveDateTime;
use equation_core::{DeviceSnapshot, EffectiveState, SyncReport};
use serde_json::{json, Value};

pub fn human_snapshot(snapshot: &DeviceSnapshot) -> String {
    let state = snapshot.state();
    let product = snapshot
        .product()
        .map(|p| p.name)
        .unwrap_or("unknown product");
    let source = match state.effective {
        EffectiveState::Schedule(_) => "schedule",
        EffectiveState::Vendor { .. } => "vendor",
    };

    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({}) ===", state.name, snapshot.id());
    let _ = writeln!(
        out,
        "Device:     {} {} [{}] serial={}",
        product,
        snapshot.product_version(),
        snapshot.product_type(),
        snapshot.serial_number()
    );
    let _ = writeln!(
        out,
        "State:      power={} mode={} ice_mode={} window_open={}",
        state.power, state.mode, state.ice_mode, state.windows_open
    );
    let _ = writeln!(
        out,
        "Preset:     {} target={:.1}C (from {})",
        snapshot.preset(),
        snapshot.target_temp(),
        source
    );
    let _ = writeln!(
        out,
        "Sensors:    probe={:.1}C calc={:.1}C",
        state.temp_probe, state.temp_calc
    );
    let _ = writeln!(
        out,
        "Setpoints:  comfort={:.1}C eco={:.1}C ice={:.1}C",
        state.comfort_temp, state.eco_temp, state.ice_temp
    );
    if snapshot.supports_user_mode() {
        let _ = writeln!(
            out,
            "User mode:  enabled={} min={} max={}",
            state.user_mode,
            fmt_temp(state.um_min_temp),
            fmt_temp(state.um_max_temp)
        );
    }
    let _ = writeln!(
        out,
        "Firmware:   {} (latest {})",
        state.firmware_version.as_deref().unwrap_or("n/a"),
        state.latest_firmware_version.as_deref().unwrap_or("n/a")
    );
    let _ = write!(
        out,
        "Last sync:  app={} device={}",
        state.last_sync_app.to_rfc3339(),
        state.last_sync_device.to_rfc3339()
    );
    out
}

pub fn human_report(report: &SyncReport) -> String {
    let mut out = format!(
        "Sync {}: created={} updated={} skipped={} removed={} failed={}",
        report.ts.format("%Y-%m-%dT%H:%M:%S"),
        report.created.len(),
        report.updated.len(),
        report.skipped.len(),
        report.removed.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        let _ = write!(
            out,
            "\n  {}: {}",
            failure.device_id.as_deref().unwrap_or("-"),
            failure.reason
        );
    }
    out
}

/// What the schedule would select at `at`, without touching the snapshot.
pub fn projection(snapshot: &DeviceSnapshot, at: NaiveDateTime) -> Value {
    let resolution = snapshot.resolve_at(at);
    json!({
        "device_id": snapshot.id(),
        "name": snapshot.state().name,
        "at": at,
        "schedule_mode": resolution.schedule_mode,
        "preset": resolution.preset,
        "target_temp": resolution.target_temp,
        "auto": snapshot.state().is_auto(),
    })
}

fn fmt_temp(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}C"))
        .unwrap_or_else(|| "n/a".to_string())
}
