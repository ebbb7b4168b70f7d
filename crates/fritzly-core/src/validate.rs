// ── Schema validation ──
//
// Turns a raw `<device>` element into a typed `DeviceRecord` for a given
// shape. Required attributes must be present and non-empty. Required
// sub-record leaves must be present but may be empty (`<lock/>` reads as
// `None`); every non-empty leaf must parse as its coarse type.

use std::str::FromStr;

use fritzly_api::{RawDevice, RawHkr, RawPowerMeter, RawSwitch, RawTemperature};
use thiserror::Error;

use crate::model::{
    Ain, DeviceCategory, DeviceKind, DeviceRecord, FunctionMask, NextChange, PowerMeter,
    SwitchState, Temperature, ThermostatState,
};

/// Why a raw device element was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` is not {expected}: {value:?}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Pick the actor family for a raw device from its capability bits.
///
/// An unparsable bitmask classifies as generic; validation then rejects it.
pub fn classify(raw: &RawDevice) -> DeviceCategory {
    raw.function_bitmask
        .as_deref()
        .and_then(|bits| bits.trim().parse::<u32>().ok())
        .map_or(DeviceCategory::Generic, |bits| {
            FunctionMask::new(bits).category()
        })
}

/// Check a raw device against `shape` without keeping the result.
pub fn validate(raw: &RawDevice, shape: DeviceCategory) -> Result<(), ValidationError> {
    parse_record(raw, shape).map(drop)
}

/// Validate a raw device against `shape` and convert it to a record.
pub fn parse_record(raw: &RawDevice, shape: DeviceCategory) -> Result<DeviceRecord, ValidationError> {
    let ain = required_str("identifier", raw.identifier.as_ref())?;
    let id = required("id", "a non-negative integer", raw.id.as_ref())?;
    let bits = required(
        "functionbitmask",
        "a non-negative integer",
        raw.function_bitmask.as_ref(),
    )?;
    let fw_version = required_str("fwversion", raw.fw_version.as_ref())?;
    let manufacturer = required_str("manufacturer", raw.manufacturer.as_ref())?;
    let product_name = required_str("productname", raw.product_name.as_ref())?;
    let present = boolean("present", raw.present.as_ref())?.ok_or(ValidationError::Missing("present"))?;
    let name = required_str("name", raw.name.as_ref())?;

    let kind = match shape {
        DeviceCategory::Generic => DeviceKind::Generic {
            temperature: raw.temperature.as_ref().map(temperature).transpose()?,
        },
        DeviceCategory::Switch => DeviceKind::Switch {
            switch: switch(raw.switch.as_ref().ok_or(ValidationError::Missing("switch"))?)?,
            power_meter: power_meter(
                raw.powermeter
                    .as_ref()
                    .ok_or(ValidationError::Missing("powermeter"))?,
            )?,
            temperature: raw.temperature.as_ref().map(temperature).transpose()?,
        },
        DeviceCategory::Thermostat => DeviceKind::Thermostat {
            temperature: temperature(
                raw.temperature
                    .as_ref()
                    .ok_or(ValidationError::Missing("temperature"))?,
            )?,
            hkr: hkr(raw.hkr.as_ref().ok_or(ValidationError::Missing("hkr"))?)?,
        },
    };

    Ok(DeviceRecord {
        ain: Ain::from(ain),
        id,
        function_mask: FunctionMask::new(bits),
        fw_version,
        manufacturer,
        product_name,
        present,
        name,
        kind,
    })
}

// ── Sub-records ──────────────────────────────────────────────────────

fn switch(raw: &RawSwitch) -> Result<SwitchState, ValidationError> {
    Ok(SwitchState {
        state: required_boolean("switch.state", raw.state.as_ref())?,
        mode: leaf(raw.mode.as_ref()).map(str::to_owned),
        lock: boolean("switch.lock", raw.lock.as_ref())?,
        device_lock: boolean("switch.devicelock", raw.devicelock.as_ref())?,
    })
}

fn power_meter(raw: &RawPowerMeter) -> Result<PowerMeter, ValidationError> {
    Ok(PowerMeter {
        power_mw: required_number("powermeter.power", raw.power.as_ref())?,
        energy_wh: required_number("powermeter.energy", raw.energy.as_ref())?,
    })
}

fn temperature(raw: &RawTemperature) -> Result<Temperature, ValidationError> {
    Ok(Temperature {
        celsius_tenths: required_number("temperature.celsius", raw.celsius.as_ref())?,
        offset_tenths: required_number("temperature.offset", raw.offset.as_ref())?,
    })
}

fn hkr(raw: &RawHkr) -> Result<ThermostatState, ValidationError> {
    let next_change = raw
        .nextchange
        .as_ref()
        .map(|next| -> Result<NextChange, ValidationError> {
            Ok(NextChange {
                end_period: number("hkr.nextchange.endperiod", next.endperiod.as_ref())?,
                tchange: number("hkr.nextchange.tchange", next.tchange.as_ref())?,
            })
        })
        .transpose()?;

    Ok(ThermostatState {
        tist: required_number("hkr.tist", raw.tist.as_ref())?,
        tsoll: required_number("hkr.tsoll", raw.tsoll.as_ref())?,
        absenk: required_number("hkr.absenk", raw.absenk.as_ref())?,
        komfort: required_number("hkr.komfort", raw.komfort.as_ref())?,
        lock: required_number("hkr.lock", raw.lock.as_ref())?,
        device_lock: number("hkr.devicelock", raw.devicelock.as_ref())?,
        error_code: number("hkr.errorcode", raw.errorcode.as_ref())?,
        battery_low: number("hkr.batterylow", raw.batterylow.as_ref())?,
        next_change,
    })
}

// ── Leaves ───────────────────────────────────────────────────────────

fn leaf(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// A leaf that must be present. An empty element still counts as present.
fn required_leaf<'a>(
    field: &'static str,
    value: Option<&'a String>,
) -> Result<Option<&'a str>, ValidationError> {
    value.map(|v| leaf(Some(v))).ok_or(ValidationError::Missing(field))
}

fn required_number<T: FromStr>(
    field: &'static str,
    value: Option<&String>,
) -> Result<Option<T>, ValidationError> {
    parse_number(field, required_leaf(field, value)?)
}

fn required_boolean(field: &'static str, value: Option<&String>) -> Result<Option<bool>, ValidationError> {
    parse_boolean(field, required_leaf(field, value)?)
}

fn required_str(field: &'static str, value: Option<&String>) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_owned())
        .ok_or(ValidationError::Missing(field))
}

fn required<T: FromStr>(
    field: &'static str,
    expected: &'static str,
    value: Option<&String>,
) -> Result<T, ValidationError> {
    let raw = leaf(value).ok_or(ValidationError::Missing(field))?;
    raw.parse().map_err(|_| ValidationError::Invalid {
        field,
        expected,
        value: raw.to_owned(),
    })
}

fn number<T: FromStr>(field: &'static str, value: Option<&String>) -> Result<Option<T>, ValidationError> {
    parse_number(field, leaf(value))
}

fn boolean(field: &'static str, value: Option<&String>) -> Result<Option<bool>, ValidationError> {
    parse_boolean(field, leaf(value))
}

fn parse_number<T: FromStr>(field: &'static str, value: Option<&str>) -> Result<Option<T>, ValidationError> {
    value
        .map(|raw| {
            raw.parse().map_err(|_| ValidationError::Invalid {
                field,
                expected: "a number",
                value: raw.to_owned(),
            })
        })
        .transpose()
}

fn parse_boolean(field: &'static str, value: Option<&str>) -> Result<Option<bool>, ValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "disable" => Ok(Some(false)),
        _ => Err(ValidationError::Invalid {
            field,
            expected: "a boolean",
            value: raw.to_owned(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fritzly_api::RawNextChange;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Option<String> {
        Some(v.to_owned())
    }

    fn base(bits: &str) -> RawDevice {
        RawDevice {
            identifier: s("08761 0000434"),
            id: s("17"),
            function_bitmask: s(bits),
            fw_version: s("03.33"),
            manufacturer: s("AVM"),
            product_name: s("FRITZ!DECT 200"),
            present: s("1"),
            name: s("Plug"),
            ..RawDevice::default()
        }
    }

    fn plug() -> RawDevice {
        RawDevice {
            switch: Some(RawSwitch {
                state: s("1"),
                mode: s("manuell"),
                lock: s("0"),
                devicelock: s("0"),
            }),
            powermeter: Some(RawPowerMeter {
                power: s("4500"),
                energy: s("707"),
            }),
            ..base("2944")
        }
    }

    fn radiator() -> RawDevice {
        RawDevice {
            temperature: Some(RawTemperature {
                celsius: s("210"),
                offset: s("-5"),
            }),
            hkr: Some(RawHkr {
                tist: s("42"),
                tsoll: s("44"),
                absenk: s("32"),
                komfort: s("44"),
                lock: s("0"),
                nextchange: Some(RawNextChange {
                    endperiod: s("1484341200"),
                    tchange: s("32"),
                }),
                ..RawHkr::default()
            }),
            ..base("320")
        }
    }

    #[test]
    fn switch_without_temperature_is_valid() {
        let record = parse_record(&plug(), DeviceCategory::Switch).unwrap();

        assert_eq!(record.category(), DeviceCategory::Switch);
        assert_eq!(record.is_on(), Some(true));
        assert_eq!(record.temperature(), None);
        assert_eq!(record.power_meter().unwrap().power_mw, Some(4500));
    }

    #[test]
    fn thermostat_without_temperature_is_rejected() {
        let mut raw = radiator();
        raw.temperature = None;

        assert_eq!(
            validate(&raw, DeviceCategory::Thermostat),
            Err(ValidationError::Missing("temperature"))
        );
    }

    #[test]
    fn thermostat_fields_are_typed() {
        let record = parse_record(&radiator(), DeviceCategory::Thermostat).unwrap();
        let hkr = record.hkr().unwrap();

        assert_eq!(hkr.tsoll, Some(44));
        assert_eq!(hkr.device_lock, None);
        assert_eq!(hkr.next_change.as_ref().unwrap().end_period, Some(1_484_341_200));
        assert_eq!(record.temperature().unwrap().offset_tenths, Some(-5));
    }

    #[test]
    fn empty_leaves_read_as_none() {
        let mut raw = plug();
        raw.switch.as_mut().unwrap().state = s("");
        raw.powermeter.as_mut().unwrap().power = s("");

        let record = parse_record(&raw, DeviceCategory::Switch).unwrap();
        assert_eq!(record.is_on(), None);
        assert_eq!(record.power_meter().unwrap().power_mw, None);
    }

    #[test]
    fn required_leaf_must_be_present() {
        let mut raw = radiator();
        raw.hkr.as_mut().unwrap().tsoll = None;
        assert_eq!(
            validate(&raw, DeviceCategory::Thermostat),
            Err(ValidationError::Missing("hkr.tsoll"))
        );

        let mut raw = plug();
        raw.switch.as_mut().unwrap().state = None;
        assert_eq!(
            validate(&raw, DeviceCategory::Switch),
            Err(ValidationError::Missing("switch.state"))
        );

        let mut raw = radiator();
        raw.temperature.as_mut().unwrap().offset = None;
        assert_eq!(
            validate(&raw, DeviceCategory::Thermostat),
            Err(ValidationError::Missing("temperature.offset"))
        );
    }

    #[test]
    fn decoded_hkr_tells_missing_from_empty() {
        let xml = |hkr: &str| {
            format!(
                r#"<devicelist version="1"><device identifier="11960 0089208" id="16" functionbitmask="320" fwversion="03.54" manufacturer="AVM" productname="Comet DECT"><present>1</present><name>Radiator</name><temperature><celsius>210</celsius><offset>0</offset></temperature><hkr>{hkr}</hkr></device></devicelist>"#
            )
        };

        let sparse = fritzly_api::parse_inventory(&xml("<tist>1</tist>")).unwrap();
        assert_eq!(
            validate(&sparse.devices["11960 0089208"], DeviceCategory::Thermostat),
            Err(ValidationError::Missing("hkr.tsoll"))
        );

        let empty = fritzly_api::parse_inventory(&xml(
            "<tist>42</tist><tsoll></tsoll><absenk>32</absenk><komfort>44</komfort><lock/>",
        ))
        .unwrap();
        let record = parse_record(&empty.devices["11960 0089208"], DeviceCategory::Thermostat).unwrap();
        let hkr = record.hkr().unwrap();
        assert_eq!(hkr.tsoll, None);
        assert_eq!(hkr.lock, None);
        assert_eq!(hkr.tist, Some(42));
    }

    #[test]
    fn leaf_must_match_its_type() {
        let mut raw = radiator();
        raw.hkr.as_mut().unwrap().tsoll = s("warm");

        assert_eq!(
            validate(&raw, DeviceCategory::Thermostat),
            Err(ValidationError::Invalid {
                field: "hkr.tsoll",
                expected: "a number",
                value: "warm".into(),
            })
        );
    }

    #[test]
    fn required_attributes_are_enforced() {
        let mut raw = plug();
        raw.id = None;
        assert_eq!(
            validate(&raw, DeviceCategory::Switch),
            Err(ValidationError::Missing("id"))
        );

        let mut raw = plug();
        raw.id = s("-3");
        assert!(matches!(
            validate(&raw, DeviceCategory::Switch),
            Err(ValidationError::Invalid { field: "id", .. })
        ));

        let mut raw = plug();
        raw.present = s("maybe");
        assert!(validate(&raw, DeviceCategory::Switch).is_err());
    }

    #[test]
    fn switch_shape_requires_power_meter() {
        let mut raw = plug();
        raw.powermeter = None;
        assert_eq!(
            validate(&raw, DeviceCategory::Switch),
            Err(ValidationError::Missing("powermeter"))
        );
    }

    #[test]
    fn generic_keeps_optional_temperature() {
        let raw = RawDevice {
            temperature: Some(RawTemperature {
                celsius: s("195"),
                offset: s("0"),
            }),
            ..base("1280")
        };
        assert_eq!(classify(&raw), DeviceCategory::Generic);

        let record = parse_record(&raw, DeviceCategory::Generic).unwrap();
        assert_eq!(record.temperature().unwrap().celsius_tenths, Some(195));
    }

    #[test]
    fn classify_handles_bad_bitmask() {
        assert_eq!(classify(&base("2944")), DeviceCategory::Switch);
        assert_eq!(classify(&base("320")), DeviceCategory::Thermostat);
        assert_eq!(classify(&base("lots")), DeviceCategory::Generic);
    }
}
