//! Simulated sensor readings for the status panel
//!
//! Stands in for the soil, climate and light nodes. Soil sensors report a raw
//! 10-bit value where higher means drier, converted to a moisture percentage
//! the same way the soil node does. Fan and light status follow the device
//! controller rather than being simulated.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::control::DeviceSnapshot;
use crate::device::WateringRequest;

/// Full-scale soil sensor reading (bone dry)
pub const SOIL_RAW_MAX: u16 = 1023;

const SOIL_RAW_RANGE: Range<u16> = 380..720;
const TEMPERATURE_TENTHS: Range<i32> = 220..320;
const HUMIDITY_TENTHS: Range<i32> = 550..750;

/// Moisture gained by the sector currently being watered
const WATERING_BOOST_PERCENT: f64 = 15.0;

/// Moisture percentage for a raw soil reading, rounded to one decimal
pub fn moisture_percent(raw: u16) -> f64 {
    let raw = raw.min(SOIL_RAW_MAX);
    round_tenth(f64::from(SOIL_RAW_MAX - raw) / f64::from(SOIL_RAW_MAX) * 100.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn switch_label(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// One round of readings from every node
#[derive(Debug, Clone, Serialize)]
pub struct SensorReadings {
    /// Moisture percent per irrigation sector, keyed `sector_N`
    pub soil_moisture: BTreeMap<String, f64>,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percent
    pub humidity: f64,
    pub fan_status: &'static str,
    pub light_status: &'static str,
    pub last_updated: DateTime<Utc>,
}

pub struct SimulatedSensors {
    rng: StdRng,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Take a reading, reflecting the current device states
    pub fn read(&mut self, devices: &DeviceSnapshot) -> SensorReadings {
        let mut soil_moisture = BTreeMap::new();
        for sector in WateringRequest::SECTORS {
            let mut percent = moisture_percent(self.rng.gen_range(SOIL_RAW_RANGE));
            if devices.water_sector == Some(sector) {
                percent = round_tenth((percent + WATERING_BOOST_PERCENT).min(100.0));
            }
            soil_moisture.insert(format!("sector_{}", sector), percent);
        }

        let temperature = f64::from(self.rng.gen_range(TEMPERATURE_TENTHS)) / 10.0;
        let humidity = f64::from(self.rng.gen_range(HUMIDITY_TENTHS)) / 10.0;

        SensorReadings {
            soil_moisture,
            temperature,
            humidity,
            fan_status: switch_label(devices.ventilation.is_on()),
            light_status: switch_label(devices.light.is_on()),
            last_updated: Utc::now(),
        }
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}
