//! Outbound message types.
//!
//! These are the wire shapes subscribers see, tagged by `type`:
//!
//! ```json
//! {"type":"gnss","fix_quality":4,"lat":35.68,"lon":139.76,"alt":45.2,
//!  "num_satellites":12,"hdop":0.5,"utc_time":"123519.00",
//!  "vtg_valid":true,"speed_ms":2.83,"track_degrees":54.7}
//! {"type":"imu","utc_time":"2025-03-01T12:35:19.123Z",
//!  "accel_mg":[1.2,-0.8,999.9],"gyro_dps":[0.1,0.0,-0.2]}
//! ```
//!
//! Empty receiver fields stay `null`; zero is a measurement and must never
//! stand in for missing data.

use crate::gnss::tracker::FixSnapshot;
use crate::imu::sampler::ImuSample;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// One message on the outbound feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Gnss(GnssReport),
    Imu(ImuReport),
}

/// GNSS state snapshot, emitted on change only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GnssReport {
    pub fix_quality: u8,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub num_satellites: Option<u32>,
    pub hdop: Option<f64>,
    /// Receiver-reported UTC time, HHMMSS.ss
    pub utc_time: Option<String>,
    pub vtg_valid: bool,
    pub speed_ms: Option<f64>,
    pub track_degrees: Option<f64>,
}

/// One inertial sample, emitted at the acquisition rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuReport {
    /// Sample instant on the disciplined UTC axis, RFC 3339 with
    /// millisecond precision
    pub utc_time: String,
    pub accel_mg: [f64; 3],
    pub gyro_dps: [f64; 3],
}

impl From<&FixSnapshot> for GnssReport {
    fn from(fix: &FixSnapshot) -> Self {
        Self {
            fix_quality: fix.fix_quality.code(),
            lat: fix.latitude_deg,
            lon: fix.longitude_deg,
            alt: fix.altitude_m,
            num_satellites: fix.num_satellites,
            hdop: fix.hdop,
            utc_time: fix.utc_time.clone(),
            vtg_valid: fix.vtg_valid,
            speed_ms: fix.speed_ms,
            track_degrees: fix.track_deg,
        }
    }
}

impl From<&ImuSample> for ImuReport {
    fn from(sample: &ImuSample) -> Self {
        Self {
            utc_time: sample.utc.to_rfc3339_opts(SecondsFormat::Millis, true),
            accel_mg: sample.accel_mg,
            gyro_dps: sample.gyro_dps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::FixQuality;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_gnss_json_shape() {
        let fix = FixSnapshot {
            utc_time: Some("123519.00".to_string()),
            latitude_deg: Some(35.681236),
            longitude_deg: Some(139.767125),
            altitude_m: Some(45.2),
            fix_quality: FixQuality::RtkFixed,
            num_satellites: Some(12),
            hdop: Some(0.5),
            vtg_valid: true,
            speed_ms: Some(2.83),
            track_deg: Some(54.7),
        };
        let msg = OutboundMessage::Gnss(GnssReport::from(&fix));
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "gnss");
        assert_eq!(json["fix_quality"], 4);
        assert_eq!(json["lat"], 35.681236);
        assert_eq!(json["vtg_valid"], true);
    }

    #[test]
    fn test_gnss_null_fields() {
        let msg = OutboundMessage::Gnss(GnssReport::from(&FixSnapshot::default()));
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["fix_quality"], 0);
        assert!(json["lat"].is_null());
        assert!(json["speed_ms"].is_null());
        assert_eq!(json["vtg_valid"], false);
    }

    #[test]
    fn test_imu_json_shape() {
        let sample = crate::imu::sampler::ImuSample {
            utc: Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 19).unwrap(),
            low_confidence: false,
            accel_mg: [1.0, 2.0, 999.0],
            gyro_dps: [0.1, 0.2, 0.3],
            raw_sequence: 7,
        };
        let msg = OutboundMessage::Imu(ImuReport::from(&sample));
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "imu");
        assert_eq!(json["utc_time"], "2025-03-01T12:35:19.000Z");
        assert_eq!(json["accel_mg"][2], 999.0);
    }

    #[test]
    fn test_json_round_trip() {
        let msg = OutboundMessage::Imu(ImuReport {
            utc_time: "2025-03-01T12:35:19.123Z".to_string(),
            accel_mg: [0.0, 0.0, 1000.0],
            gyro_dps: [0.0, 0.0, 0.0],
        });
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: OutboundMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, msg);
    }
}
