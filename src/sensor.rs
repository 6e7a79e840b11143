// SPDX-License-Identifier: GPL-3.0-only
//! Sensor wire record
//!
//! One line of telemetry is one JSON object:
//! `{"deviceId": "...", "sensorId": "...", "ts": 1700000000, "value": 1234}`.
//! Only `value` drives brightness; the rest is carried for logging.

use serde::Deserialize;

use crate::brightness::RawReading;
use crate::error::{AppError, Result};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SensorMessage {
    #[serde(rename = "deviceId", alias = "deviceid", alias = "DeviceId", default)]
    pub device_id: String,
    #[serde(rename = "sensorId", alias = "sensorid", alias = "SensorId", default)]
    pub sensor_id: String,
    #[serde(rename = "ts", alias = "Ts", alias = "TS", default)]
    pub timestamp: i64,
    #[serde(alias = "Value")]
    pub value: RawReading,
}

impl SensorMessage {
    /// Parse one trimmed line of telemetry
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| AppError::MalformedMessage {
            line: line.to_string(),
            source,
        })
    }
}
