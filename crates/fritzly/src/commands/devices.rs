//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;

use fritzly_core::{Controller, CoreError, DeviceCategory, DeviceKind, DeviceRecord, OperationMode};

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "AIN")]
    ain: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Product")]
    product: String,
}

fn to_row(d: &Arc<DeviceRecord>, color: bool) -> DeviceRow {
    DeviceRow {
        ain: d.ain.to_string(),
        name: d.name.clone(),
        kind: d.category().to_string(),
        status: output::paint_presence(d.present, color),
        state: state_summary(d, color),
        temperature: d
            .current_temperature()
            .map_or_else(|| "-".into(), format_celsius),
        product: d.product_name.clone(),
    }
}

fn format_celsius(c: f64) -> String {
    format!("{c:.1} °C")
}

/// One-cell summary of what the device is doing.
pub(crate) fn state_summary(d: &DeviceRecord, color: bool) -> String {
    match &d.kind {
        DeviceKind::Switch { power_meter, .. } => {
            let on = d.is_on();
            let label = match on {
                Some(true) => "on",
                Some(false) => "off",
                None => "?",
            };
            let state = output::paint_state(label, on == Some(true), color);
            match power_meter.current_power_w() {
                Some(w) => format!("{state} ({w:.1} W)"),
                None => state,
            }
        }
        DeviceKind::Thermostat { hkr, .. } => {
            let mode = hkr.current_operation(d.present);
            let active = !matches!(mode, OperationMode::Off | OperationMode::Unknown);
            let label = output::paint_state(&mode.to_string(), active, color);
            match (mode, hkr.target_temperature()) {
                (OperationMode::Auto | OperationMode::Manual, Some(t)) => {
                    format!("{label} -> {}", format_celsius(t))
                }
                _ => label,
            }
        }
        DeviceKind::Generic { .. } => "-".into(),
    }
}

/// Key/value view of one device.
pub(crate) fn detail(d: &DeviceRecord, color: bool) -> String {
    let mut lines: Vec<(&str, String)> = vec![
        ("AIN", d.ain.to_string()),
        ("Name", d.name.clone()),
        ("Kind", d.category().to_string()),
        ("Status", output::paint_presence(d.present, color)),
        ("State", state_summary(d, color)),
        ("Product", format!("{} {}", d.manufacturer, d.product_name)),
        ("Firmware", d.fw_version.clone()),
        ("Functions", d.function_mask.capabilities().join(", ")),
    ];
    if let Some(t) = d.current_temperature() {
        lines.push(("Temperature", format_celsius(t)));
    }
    if let Some(hkr) = d.hkr() {
        if let Some(t) = hkr.comfort_temperature() {
            lines.push(("Comfort", format_celsius(t)));
        }
        if let Some(t) = hkr.economy_temperature() {
            lines.push(("Economy", format_celsius(t)));
        }
    }
    if let Some(kwh) = d.power_meter().and_then(|p| p.total_energy_kwh()) {
        lines.push(("Energy", format!("{kwh:.3} kWh")));
    }
    lines.extend(d.attributes());
    output::key_values(lines)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, session: &Session) -> Result<(), CliError> {
    let command = args.command.unwrap_or(DevicesCommand::List { kind: None });

    match command {
        DevicesCommand::List { kind } => {
            let snapshot = Controller::oneshot(session.gateway.clone(), |c| async move {
                Ok(c.devices_snapshot())
            })
            .await?;
            let devices: Vec<Arc<DeviceRecord>> = snapshot
                .iter()
                .filter(|d| kind.is_none_or(|k| d.category() == DeviceCategory::from(k)))
                .cloned()
                .collect();

            let color = session.color;
            let out = output::render_list(
                session.format,
                &devices,
                |d| to_row(d, color),
                |d| d.ain.to_string(),
            )?;
            output::print_output(&out, session.quiet);
            Ok(())
        }

        DevicesCommand::Get { ain } => {
            let device = Controller::oneshot(session.gateway.clone(), |c| async move {
                c.device(&ain).ok_or(CoreError::DeviceNotFound { ain })
            })
            .await?;

            let color = session.color;
            let out = output::render_single(
                session.format,
                &device,
                |d| detail(d, color),
                |d| d.ain.to_string(),
            )?;
            output::print_output(&out, session.quiet);
            Ok(())
        }
    }
}
