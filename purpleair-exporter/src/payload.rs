//! Decoding of the sensor's `/json` document.
//!
//! Every field the firmware is known to report is decoded into a named slot.
//! Fields missing from a document take their zero value, since firmware
//! versions differ in what they report. A `null` value counts as missing.
//! Unknown fields are ignored. A known field carrying a value of the wrong
//! type is a decode error.

use serde::Deserialize;
use thiserror::Error;

/// Failure to decode a sensor response body.
#[derive(Debug, Error)]
#[error("failed to decode sensor payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// One decoded sensor document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorPayload {
    // Identity and housekeeping
    #[serde(rename = "SensorId")]
    pub sensor_id: String,
    #[serde(rename = "DateTime")]
    pub date_time: String,
    #[serde(rename = "Geo")]
    pub geo: String,
    #[serde(rename = "Mem")]
    pub mem: i64,
    #[serde(rename = "memfrag")]
    pub mem_frag: i64,
    #[serde(rename = "memfb")]
    pub mem_fb: i64,
    #[serde(rename = "memcs")]
    pub mem_cs: i64,
    #[serde(rename = "Id")]
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "Adc")]
    pub adc: f64,
    #[serde(rename = "loggingrate")]
    pub logging_rate: i64,
    pub place: String,
    pub version: String,
    pub uptime: i64,
    pub rssi: i64,
    pub period: i64,
    #[serde(rename = "httpsuccess")]
    pub http_success: i64,
    #[serde(rename = "httpsends")]
    pub http_sends: i64,
    #[serde(rename = "hardwareversion")]
    pub hardware_version: String,
    #[serde(rename = "hardwarediscovered")]
    pub hardware_discovered: String,

    // Legacy environmental sensor
    pub current_temp_f: i64,
    pub current_humidity: i64,
    pub current_dewpoint_f: i64,
    pub pressure: f64,

    // BME680
    pub current_temp_f_680: f64,
    pub current_humidity_680: f64,
    pub current_dewpoint_f_680: f64,
    pub pressure_680: f64,
    pub gas_680: f64,

    // AQI colors
    #[serde(rename = "p25aqic")]
    pub p25_aqi_color: String,
    #[serde(rename = "p25aqic_b")]
    pub p25_aqi_color_b: String,

    // Particle counts per deciliter
    pub p_0_3_um: f64,
    pub p_0_3_um_b: f64,
    pub p_0_5_um: f64,
    pub p_0_5_um_b: f64,
    pub p_1_0_um: f64,
    pub p_1_0_um_b: f64,
    pub p_2_5_um: f64,
    pub p_2_5_um_b: f64,
    pub p_5_0_um: f64,
    pub p_5_0_um_b: f64,
    pub p_10_0_um: f64,
    pub p_10_0_um_b: f64,

    pub pa_latency: i64,

    // Particulate mass
    pub pm1_0_atm: f64,
    pub pm1_0_atm_b: f64,
    pub pm1_0_cf_1: f64,
    pub pm1_0_cf_1_b: f64,
    pub pm2_5_atm: f64,
    pub pm2_5_atm_b: f64,
    pub pm2_5_cf_1: f64,
    pub pm2_5_cf_1_b: f64,
    pub pm10_0_atm: f64,
    pub pm10_0_atm_b: f64,
    pub pm10_0_cf_1: f64,
    pub pm10_0_cf_1_b: f64,

    #[serde(rename = "pm2.5_aqi")]
    pub pm2_5_aqi: f64,
    #[serde(rename = "pm2.5_aqi_b")]
    pub pm2_5_aqi_b: f64,

    // Upload status
    pub response: i64,
    pub response_date: i64,
    pub latency: i64,
    #[serde(rename = "wlstate")]
    pub wl_state: String,
    pub status_0: i64,
    pub status_1: i64,
    pub status_2: i64,
    pub status_3: i64,
    pub status_4: i64,
    pub status_5: i64,
    pub status_7: i64,
    pub status_8: i64,
    pub status_9: i64,
    pub ssid: String,
}

impl SensorPayload {
    /// Decode a payload from a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let mut fields: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(body)?;
        fields.retain(|_, value| !value.is_null());

        Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
    }
}
