//! Typed rows for the hosted store tables.
//!
//! Column names match the hosted schema; `id` and server-maintained
//! timestamps are optional so inserts can omit them and reads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::{AudioProfile, Device, DeviceCategory, Track};

/// Row in `device_connections` - one remembered device per row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConnectionRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub device_name: String,
    pub device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_profile: Option<String>,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default)]
    pub is_trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub connection_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl DeviceConnectionRow {
    /// Snapshot a registry device into a row
    pub fn from_device(device: &Device) -> Self {
        Self {
            id: None,
            device_name: device.name.clone(),
            device_type: device.category.to_string(),
            audio_profile: device.audio_profile.map(|p| {
                serde_json::to_value(p)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default()
            }),
            auto_connect: device.category == DeviceCategory::Car,
            is_trusted: device.paired,
            battery_level: device.battery.map(i32::from),
            signal_strength: Some(i32::from(device.signal_strength)),
            mac_address: Some(device.id.clone()),
            connection_count: 0,
            last_connected_at: device.last_connected_at,
        }
    }

    /// Rehydrate a registry device from a persisted row.
    ///
    /// Persisted devices are trusted-but-disconnected until the transport
    /// says otherwise.
    pub fn into_device(self) -> Device {
        let category = match self.device_type.as_str() {
            "headphones" => DeviceCategory::Headphones,
            "earphones" => DeviceCategory::Earphones,
            "smartwatch" => DeviceCategory::Smartwatch,
            "phone" => DeviceCategory::Phone,
            "car" => DeviceCategory::Car,
            "speaker" => DeviceCategory::Speaker,
            "gamepad" => DeviceCategory::Gamepad,
            _ => DeviceCategory::from_name(&self.device_name),
        };
        let audio_profile = match self.audio_profile.as_deref() {
            Some("A2DP") => Some(AudioProfile::A2dp),
            Some("HFP") => Some(AudioProfile::Hfp),
            Some("AVRCP") => Some(AudioProfile::Avrcp),
            _ => None,
        };

        Device {
            id: self
                .mac_address
                .or(self.id)
                .unwrap_or_else(|| self.device_name.clone()),
            name: self.device_name,
            category,
            connected: false,
            paired: self.is_trusted,
            signal_strength: self.signal_strength.unwrap_or(0).clamp(0, 100) as u8,
            battery: self.battery_level.map(|b| b.clamp(0, 100) as u8),
            last_connected_at: self.last_connected_at,
            audio_profile,
        }
    }
}

/// Patch body for stamping a successful connection on a row
#[derive(Debug, Serialize)]
pub struct ConnectionStampPatch {
    pub last_connected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i32>,
    pub is_trusted: bool,
}

/// Row in `automation_rules` - trigger/action blobs persisted by the rule
/// builder. Nothing in this service evaluates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRuleRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(default = "empty_array")]
    pub triggers: Value,
    #[serde(default = "empty_array")]
    pub conditions: Value,
    #[serde(default = "empty_array")]
    pub actions: Value,
    #[serde(default)]
    pub execution_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<DateTime<Utc>>,
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

/// Row in `voice_commands` - write-only log of one interpreted transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCommandRow {
    pub command_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_detected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    pub language_code: String,
    pub execution_successful: bool,
}

/// Row in `audio_library` - source material for the playback facade's
/// playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrackRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub play_count: i64,
}

impl AudioTrackRow {
    /// Convert a library row to a playlist track. Rows without a duration get
    /// a three-minute default so the progress ticker always has a bound.
    pub fn into_track(self) -> Track {
        Track {
            id: self.id.unwrap_or_else(|| self.title.clone()),
            title: self.title,
            artist: self.artist.unwrap_or_else(|| "Unknown Artist".to_string()),
            album: self.album,
            duration: self.duration_seconds.unwrap_or(180).clamp(1, u32::MAX as i64) as u32,
            cover_art: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DeviceCategory;

    #[test]
    fn device_row_round_trip_preserves_identity() {
        let device = Device::new("00:1A:7D:DA:71:13", "BMW Car Audio", DeviceCategory::Car)
            .paired()
            .with_signal(80)
            .with_profile(AudioProfile::A2dp);

        let row = DeviceConnectionRow::from_device(&device);
        assert_eq!(row.device_type, "car");
        assert_eq!(row.audio_profile.as_deref(), Some("A2DP"));
        assert!(row.auto_connect);
        assert!(row.is_trusted);

        let back = row.into_device();
        assert_eq!(back.id, "00:1A:7D:DA:71:13");
        assert_eq!(back.category, DeviceCategory::Car);
        assert!(back.paired);
        assert!(!back.connected, "persisted devices rehydrate disconnected");
        assert_eq!(back.audio_profile, Some(AudioProfile::A2dp));
    }

    #[test]
    fn unknown_device_type_falls_back_to_name_detection() {
        let row = DeviceConnectionRow {
            id: Some("row-1".to_string()),
            device_name: "Garage Speaker".to_string(),
            device_type: "boombox".to_string(),
            audio_profile: None,
            auto_connect: false,
            is_trusted: true,
            battery_level: None,
            signal_strength: None,
            mac_address: None,
            connection_count: 3,
            last_connected_at: None,
        };
        let device = row.into_device();
        assert_eq!(device.category, DeviceCategory::Speaker);
        assert_eq!(device.id, "row-1");
    }

    #[test]
    fn track_row_defaults_duration() {
        let row = AudioTrackRow {
            id: None,
            title: "Untitled".to_string(),
            artist: None,
            album: None,
            duration_seconds: None,
            play_count: 0,
        };
        let track = row.into_track();
        assert_eq!(track.duration, 180);
        assert_eq!(track.artist, "Unknown Artist");
    }
}
