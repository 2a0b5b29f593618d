//! Static catalog of HAP service and characteristic types.
//!
//! Every standard type is a row of data. [`crate::CharSpec`] and
//! [`crate::ServiceSpec`] start from a row and let the application adjust it.


use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::Deserialize;
use serde::Serialize;

use crate::value::Numeric;
use crate::Format;
use crate::Perms;
use crate::Value;

/// Short-form HAP type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HapType(pub u16);

impl fmt::Display for HapType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Compile-time default value of a catalog row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Seed {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    Empty,
}

impl Seed {
    /// Default value in `format`; falls back to the format's zero value when the
    /// seed does not fit.
    pub fn materialize(
        &self,
        format: Format,
    ) -> Value {
        let seeded = match self {
            Seed::Bool(b) => Value::Bool(*b).coerce(format).ok(),
            Seed::Int(i) => Value::cast(format, Numeric::Int(*i as i128)).ok(),
            Seed::Float(v) => Value::cast(format, Numeric::Float(*v)).ok(),
            Seed::Str(s) => Value::from(*s).coerce(format).ok(),
            Seed::Empty => None,
        };
        seeded.unwrap_or_else(|| Value::empty(format))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharType {
    pub type_id: HapType,
    pub name: &'static str,
    pub format: Format,
    pub perms: Perms,
    pub default: Seed,
    pub range: Option<(f64, f64)>,
    pub valid_values: &'static [u32],
    pub unit: Option<&'static str>,
}

impl CharType {
    pub const fn new(
        type_id: HapType,
        name: &'static str,
        format: Format,
        perms: Perms,
        default: Seed,
    ) -> Self {
        Self {
            type_id,
            name,
            format,
            perms,
            default,
            range: None,
            valid_values: &[],
            unit: None,
        }
    }

    const fn range(
        self,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            range: Some((min, max)),
            ..self
        }
    }

    const fn valid(
        self,
        valid_values: &'static [u32],
    ) -> Self {
        Self {
            valid_values,
            ..self
        }
    }

    const fn unit(
        self,
        unit: &'static str,
    ) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceType {
    pub type_id: HapType,
    pub name: &'static str,
    pub required: &'static [HapType],
    pub optional: &'static [HapType],
}

/// Characteristic type ids
pub mod chr {
    use super::HapType;

    pub const ACCESSORY_FLAGS: HapType = HapType(0xA6);
    pub const ACTIVE: HapType = HapType(0xB0);
    pub const BATTERY_LEVEL: HapType = HapType(0x68);
    pub const BRIGHTNESS: HapType = HapType(0x08);
    pub const CHARGING_STATE: HapType = HapType(0x8F);
    pub const COLOR_TEMPERATURE: HapType = HapType(0xCE);
    pub const CONFIGURED_NAME: HapType = HapType(0xE3);
    pub const CONTACT_SENSOR_STATE: HapType = HapType(0x6A);
    pub const COOLING_THRESHOLD_TEMPERATURE: HapType = HapType(0x0D);
    pub const CURRENT_AMBIENT_LIGHT_LEVEL: HapType = HapType(0x6B);
    pub const CURRENT_DOOR_STATE: HapType = HapType(0x0E);
    pub const CURRENT_HEATING_COOLING_STATE: HapType = HapType(0x0F);
    pub const CURRENT_POSITION: HapType = HapType(0x6D);
    pub const CURRENT_RELATIVE_HUMIDITY: HapType = HapType(0x10);
    pub const CURRENT_TEMPERATURE: HapType = HapType(0x11);
    pub const FIRMWARE_REVISION: HapType = HapType(0x52);
    pub const HARDWARE_REVISION: HapType = HapType(0x53);
    pub const HEATING_THRESHOLD_TEMPERATURE: HapType = HapType(0x12);
    pub const HUE: HapType = HapType(0x13);
    pub const IDENTIFY: HapType = HapType(0x14);
    pub const IN_USE: HapType = HapType(0xD2);
    pub const LEAK_DETECTED: HapType = HapType(0x70);
    pub const LOCK_CURRENT_STATE: HapType = HapType(0x1D);
    pub const LOCK_TARGET_STATE: HapType = HapType(0x1E);
    pub const MANUFACTURER: HapType = HapType(0x20);
    pub const MODEL: HapType = HapType(0x21);
    pub const MOTION_DETECTED: HapType = HapType(0x22);
    pub const NAME: HapType = HapType(0x23);
    pub const OBSTRUCTION_DETECTED: HapType = HapType(0x24);
    pub const OCCUPANCY_DETECTED: HapType = HapType(0x71);
    pub const ON: HapType = HapType(0x25);
    pub const OUTLET_IN_USE: HapType = HapType(0x26);
    pub const POSITION_STATE: HapType = HapType(0x72);
    pub const PROGRAMMABLE_SWITCH_EVENT: HapType = HapType(0x73);
    pub const REMAINING_DURATION: HapType = HapType(0xD4);
    pub const ROTATION_SPEED: HapType = HapType(0x29);
    pub const SATURATION: HapType = HapType(0x2F);
    pub const SERIAL_NUMBER: HapType = HapType(0x30);
    pub const SET_DURATION: HapType = HapType(0xD3);
    pub const SMOKE_DETECTED: HapType = HapType(0x76);
    pub const STATUS_ACTIVE: HapType = HapType(0x75);
    pub const STATUS_FAULT: HapType = HapType(0x77);
    pub const STATUS_LOW_BATTERY: HapType = HapType(0x79);
    pub const TARGET_DOOR_STATE: HapType = HapType(0x32);
    pub const TARGET_HEATING_COOLING_STATE: HapType = HapType(0x33);
    pub const TARGET_POSITION: HapType = HapType(0x7C);
    pub const TARGET_TEMPERATURE: HapType = HapType(0x35);
    pub const TEMPERATURE_DISPLAY_UNITS: HapType = HapType(0x36);
    pub const VALVE_TYPE: HapType = HapType(0xD5);
    pub const VERSION: HapType = HapType(0x37);
}

/// Service type ids
pub mod svc {
    use super::HapType;

    pub const ACCESSORY_INFORMATION: HapType = HapType(0x3E);
    pub const BATTERY_SERVICE: HapType = HapType(0x96);
    pub const CONTACT_SENSOR: HapType = HapType(0x80);
    pub const FAN: HapType = HapType(0xB7);
    pub const GARAGE_DOOR_OPENER: HapType = HapType(0x41);
    pub const HAP_PROTOCOL_INFORMATION: HapType = HapType(0xA2);
    pub const HUMIDITY_SENSOR: HapType = HapType(0x82);
    pub const LEAK_SENSOR: HapType = HapType(0x83);
    pub const LIGHT_BULB: HapType = HapType(0x43);
    pub const LIGHT_SENSOR: HapType = HapType(0x84);
    pub const LOCK_MECHANISM: HapType = HapType(0x45);
    pub const MOTION_SENSOR: HapType = HapType(0x85);
    pub const OCCUPANCY_SENSOR: HapType = HapType(0x86);
    pub const OUTLET: HapType = HapType(0x47);
    pub const SMOKE_SENSOR: HapType = HapType(0x87);
    pub const STATELESS_PROGRAMMABLE_SWITCH: HapType = HapType(0x89);
    pub const SWITCH: HapType = HapType(0x49);
    pub const TEMPERATURE_SENSOR: HapType = HapType(0x8A);
    pub const THERMOSTAT: HapType = HapType(0x4A);
    pub const VALVE: HapType = HapType(0xD0);
    pub const WINDOW_COVERING: HapType = HapType(0x8C);
}

const R: Perms = Perms::READ;
const REV: Perms = Perms::READ_NOTIFY;
const RWEV: Perms = Perms::READ_WRITE_NOTIFY;
const W: Perms = Perms::WRITE;

const BINARY: &[u32] = &[0, 1];

#[rustfmt::skip]
pub static CHARACTERISTICS: &[CharType] = &[
    CharType::new(chr::ACCESSORY_FLAGS, "AccessoryFlags", Format::Uint32, REV, Seed::Int(1)),
    CharType::new(chr::ACTIVE, "Active", Format::Uint8, RWEV, Seed::Int(0)).range(0.0, 1.0).valid(BINARY),
    CharType::new(chr::BATTERY_LEVEL, "BatteryLevel", Format::Uint8, REV, Seed::Int(100)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::BRIGHTNESS, "Brightness", Format::Int, RWEV, Seed::Int(0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::CHARGING_STATE, "ChargingState", Format::Uint8, REV, Seed::Int(0)).range(0.0, 2.0),
    CharType::new(chr::COLOR_TEMPERATURE, "ColorTemperature", Format::Uint32, RWEV, Seed::Int(200)).range(140.0, 500.0),
    CharType::new(chr::CONFIGURED_NAME, "ConfiguredName", Format::String, RWEV, Seed::Str("unnamed")),
    CharType::new(chr::CONTACT_SENSOR_STATE, "ContactSensorState", Format::Uint8, REV, Seed::Int(1)).range(0.0, 1.0),
    CharType::new(chr::COOLING_THRESHOLD_TEMPERATURE, "CoolingThresholdTemperature", Format::Float, RWEV, Seed::Float(10.0)).range(10.0, 35.0).unit("celsius"),
    CharType::new(chr::CURRENT_AMBIENT_LIGHT_LEVEL, "CurrentAmbientLightLevel", Format::Float, REV, Seed::Float(1.0)).range(0.0001, 100000.0).unit("lux"),
    CharType::new(chr::CURRENT_DOOR_STATE, "CurrentDoorState", Format::Uint8, REV, Seed::Int(1)).range(0.0, 4.0),
    CharType::new(chr::CURRENT_HEATING_COOLING_STATE, "CurrentHeatingCoolingState", Format::Uint8, REV, Seed::Int(0)).range(0.0, 2.0),
    CharType::new(chr::CURRENT_POSITION, "CurrentPosition", Format::Uint8, REV, Seed::Int(0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::CURRENT_RELATIVE_HUMIDITY, "CurrentRelativeHumidity", Format::Float, REV, Seed::Float(0.0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::CURRENT_TEMPERATURE, "CurrentTemperature", Format::Float, REV, Seed::Float(0.0)).range(0.0, 100.0).unit("celsius"),
    CharType::new(chr::FIRMWARE_REVISION, "FirmwareRevision", Format::String, R, Seed::Str("1.0.0")),
    CharType::new(chr::HARDWARE_REVISION, "HardwareRevision", Format::String, R, Seed::Str("1.0.0")),
    CharType::new(chr::HEATING_THRESHOLD_TEMPERATURE, "HeatingThresholdTemperature", Format::Float, RWEV, Seed::Float(16.0)).range(0.0, 25.0).unit("celsius"),
    CharType::new(chr::HUE, "Hue", Format::Float, RWEV, Seed::Float(0.0)).range(0.0, 360.0).unit("arcdegrees"),
    CharType::new(chr::IDENTIFY, "Identify", Format::Bool, W, Seed::Bool(true)),
    CharType::new(chr::IN_USE, "InUse", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::LEAK_DETECTED, "LeakDetected", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::LOCK_CURRENT_STATE, "LockCurrentState", Format::Uint8, REV, Seed::Int(0)).range(0.0, 3.0),
    CharType::new(chr::LOCK_TARGET_STATE, "LockTargetState", Format::Uint8, RWEV, Seed::Int(0)).range(0.0, 1.0).valid(BINARY),
    CharType::new(chr::MANUFACTURER, "Manufacturer", Format::String, R, Seed::Str("hapdb")),
    CharType::new(chr::MODEL, "Model", Format::String, R, Seed::Str("hapdb-device")),
    CharType::new(chr::MOTION_DETECTED, "MotionDetected", Format::Bool, REV, Seed::Bool(false)),
    CharType::new(chr::NAME, "Name", Format::String, R, Seed::Str("unnamed")),
    CharType::new(chr::OBSTRUCTION_DETECTED, "ObstructionDetected", Format::Bool, REV, Seed::Bool(false)),
    CharType::new(chr::OCCUPANCY_DETECTED, "OccupancyDetected", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::ON, "On", Format::Bool, RWEV, Seed::Bool(false)),
    CharType::new(chr::OUTLET_IN_USE, "OutletInUse", Format::Bool, REV, Seed::Bool(false)),
    CharType::new(chr::POSITION_STATE, "PositionState", Format::Uint8, REV, Seed::Int(2)).range(0.0, 2.0),
    CharType::new(chr::PROGRAMMABLE_SWITCH_EVENT, "ProgrammableSwitchEvent", Format::Uint8, REV, Seed::Int(0)).range(0.0, 2.0).valid(&[0, 1, 2]),
    CharType::new(chr::REMAINING_DURATION, "RemainingDuration", Format::Uint32, REV, Seed::Int(60)).range(0.0, 3600.0).unit("seconds"),
    CharType::new(chr::ROTATION_SPEED, "RotationSpeed", Format::Float, RWEV, Seed::Float(0.0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::SATURATION, "Saturation", Format::Float, RWEV, Seed::Float(0.0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::SERIAL_NUMBER, "SerialNumber", Format::String, R, Seed::Str("SN-00000001")),
    CharType::new(chr::SET_DURATION, "SetDuration", Format::Uint32, RWEV, Seed::Int(60)).range(0.0, 3600.0).unit("seconds"),
    CharType::new(chr::SMOKE_DETECTED, "SmokeDetected", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::STATUS_ACTIVE, "StatusActive", Format::Bool, REV, Seed::Bool(true)),
    CharType::new(chr::STATUS_FAULT, "StatusFault", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::STATUS_LOW_BATTERY, "StatusLowBattery", Format::Uint8, REV, Seed::Int(0)).range(0.0, 1.0),
    CharType::new(chr::TARGET_DOOR_STATE, "TargetDoorState", Format::Uint8, RWEV, Seed::Int(1)).range(0.0, 1.0).valid(BINARY),
    CharType::new(chr::TARGET_HEATING_COOLING_STATE, "TargetHeatingCoolingState", Format::Uint8, RWEV, Seed::Int(0)).range(0.0, 3.0).valid(&[0, 1, 2, 3]),
    CharType::new(chr::TARGET_POSITION, "TargetPosition", Format::Uint8, RWEV, Seed::Int(0)).range(0.0, 100.0).unit("percentage"),
    CharType::new(chr::TARGET_TEMPERATURE, "TargetTemperature", Format::Float, RWEV, Seed::Float(16.0)).range(10.0, 38.0).unit("celsius"),
    CharType::new(chr::TEMPERATURE_DISPLAY_UNITS, "TemperatureDisplayUnits", Format::Uint8, RWEV, Seed::Int(0)).range(0.0, 1.0).valid(BINARY),
    CharType::new(chr::VALVE_TYPE, "ValveType", Format::Uint8, REV, Seed::Int(0)).range(0.0, 3.0),
    CharType::new(chr::VERSION, "Version", Format::String, REV, Seed::Str("1.1.0")),
];

const SENSOR_EXTRAS: &[HapType] = &[
    chr::NAME,
    chr::STATUS_ACTIVE,
    chr::STATUS_FAULT,
    chr::STATUS_LOW_BATTERY,
];

#[rustfmt::skip]
pub static SERVICES: &[ServiceType] = &[
    ServiceType {
        type_id: svc::ACCESSORY_INFORMATION,
        name: "AccessoryInformation",
        required: &[chr::IDENTIFY],
        optional: &[
            chr::FIRMWARE_REVISION, chr::MANUFACTURER, chr::MODEL, chr::NAME,
            chr::SERIAL_NUMBER, chr::HARDWARE_REVISION, chr::ACCESSORY_FLAGS,
        ],
    },
    ServiceType {
        type_id: svc::HAP_PROTOCOL_INFORMATION,
        name: "HAPProtocolInformation",
        required: &[chr::VERSION],
        optional: &[],
    },
    ServiceType {
        type_id: svc::BATTERY_SERVICE,
        name: "BatteryService",
        required: &[chr::BATTERY_LEVEL, chr::CHARGING_STATE, chr::STATUS_LOW_BATTERY],
        optional: &[chr::NAME],
    },
    ServiceType { type_id: svc::CONTACT_SENSOR, name: "ContactSensor", required: &[chr::CONTACT_SENSOR_STATE], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::FAN,
        name: "Fan",
        required: &[chr::ACTIVE],
        optional: &[chr::ROTATION_SPEED, chr::NAME, chr::CONFIGURED_NAME],
    },
    ServiceType {
        type_id: svc::GARAGE_DOOR_OPENER,
        name: "GarageDoorOpener",
        required: &[chr::CURRENT_DOOR_STATE, chr::TARGET_DOOR_STATE, chr::OBSTRUCTION_DETECTED],
        optional: &[chr::LOCK_CURRENT_STATE, chr::LOCK_TARGET_STATE, chr::NAME],
    },
    ServiceType { type_id: svc::HUMIDITY_SENSOR, name: "HumiditySensor", required: &[chr::CURRENT_RELATIVE_HUMIDITY], optional: SENSOR_EXTRAS },
    ServiceType { type_id: svc::LEAK_SENSOR, name: "LeakSensor", required: &[chr::LEAK_DETECTED], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::LIGHT_BULB,
        name: "LightBulb",
        required: &[chr::ON],
        optional: &[
            chr::BRIGHTNESS, chr::HUE, chr::SATURATION, chr::COLOR_TEMPERATURE,
            chr::NAME, chr::CONFIGURED_NAME,
        ],
    },
    ServiceType { type_id: svc::LIGHT_SENSOR, name: "LightSensor", required: &[chr::CURRENT_AMBIENT_LIGHT_LEVEL], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::LOCK_MECHANISM,
        name: "LockMechanism",
        required: &[chr::LOCK_CURRENT_STATE, chr::LOCK_TARGET_STATE],
        optional: &[chr::NAME],
    },
    ServiceType { type_id: svc::MOTION_SENSOR, name: "MotionSensor", required: &[chr::MOTION_DETECTED], optional: SENSOR_EXTRAS },
    ServiceType { type_id: svc::OCCUPANCY_SENSOR, name: "OccupancySensor", required: &[chr::OCCUPANCY_DETECTED], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::OUTLET,
        name: "Outlet",
        required: &[chr::ON, chr::OUTLET_IN_USE],
        optional: &[chr::NAME, chr::CONFIGURED_NAME],
    },
    ServiceType { type_id: svc::SMOKE_SENSOR, name: "SmokeSensor", required: &[chr::SMOKE_DETECTED], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::STATELESS_PROGRAMMABLE_SWITCH,
        name: "StatelessProgrammableSwitch",
        required: &[chr::PROGRAMMABLE_SWITCH_EVENT],
        optional: &[chr::NAME],
    },
    ServiceType {
        type_id: svc::SWITCH,
        name: "Switch",
        required: &[chr::ON],
        optional: &[chr::NAME, chr::CONFIGURED_NAME],
    },
    ServiceType { type_id: svc::TEMPERATURE_SENSOR, name: "TemperatureSensor", required: &[chr::CURRENT_TEMPERATURE], optional: SENSOR_EXTRAS },
    ServiceType {
        type_id: svc::THERMOSTAT,
        name: "Thermostat",
        required: &[
            chr::CURRENT_HEATING_COOLING_STATE, chr::TARGET_HEATING_COOLING_STATE,
            chr::CURRENT_TEMPERATURE, chr::TARGET_TEMPERATURE, chr::TEMPERATURE_DISPLAY_UNITS,
        ],
        optional: &[
            chr::COOLING_THRESHOLD_TEMPERATURE, chr::HEATING_THRESHOLD_TEMPERATURE,
            chr::CURRENT_RELATIVE_HUMIDITY, chr::NAME,
        ],
    },
    ServiceType {
        type_id: svc::VALVE,
        name: "Valve",
        required: &[chr::ACTIVE, chr::IN_USE, chr::VALVE_TYPE],
        optional: &[chr::SET_DURATION, chr::REMAINING_DURATION, chr::STATUS_FAULT, chr::NAME],
    },
    ServiceType {
        type_id: svc::WINDOW_COVERING,
        name: "WindowCovering",
        required: &[chr::CURRENT_POSITION, chr::TARGET_POSITION, chr::POSITION_STATE],
        optional: &[chr::OBSTRUCTION_DETECTED, chr::NAME],
    },
];

lazy_static! {
    static ref CHARS_BY_ID: HashMap<HapType, &'static CharType> =
        CHARACTERISTICS.iter().map(|c| (c.type_id, c)).collect();
    static ref CHARS_BY_NAME: HashMap<&'static str, &'static CharType> =
        CHARACTERISTICS.iter().map(|c| (c.name, c)).collect();
    static ref SERVICES_BY_ID: HashMap<HapType, &'static ServiceType> =
        SERVICES.iter().map(|s| (s.type_id, s)).collect();
    static ref SERVICES_BY_NAME: HashMap<&'static str, &'static ServiceType> =
        SERVICES.iter().map(|s| (s.name, s)).collect();
}

pub fn characteristic(type_id: HapType) -> Option<&'static CharType> {
    CHARS_BY_ID.get(&type_id).copied()
}

pub fn characteristic_named(name: &str) -> Option<&'static CharType> {
    CHARS_BY_NAME.get(name).copied()
}

pub fn service(type_id: HapType) -> Option<&'static ServiceType> {
    SERVICES_BY_ID.get(&type_id).copied()
}

pub fn service_named(name: &str) -> Option<&'static ServiceType> {
    SERVICES_BY_NAME.get(name).copied()
}
