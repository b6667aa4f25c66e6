//! Event types for the hub event bus.
//!
//! This module defines the device, playback and notification models shared
//! across the service, plus the event enum published on the bus. Every event
//! is serde-serializable so the SSE endpoint can forward it to dashboard
//! clients verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Device model
// =============================================================================

/// Device category as shown on the dashboard.
///
/// Categories drive icon selection in the UI and audio-routing decisions in
/// the connection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Headphones,
    Earphones,
    Smartwatch,
    Phone,
    Car,
    Speaker,
    Gamepad,
    Other,
}

impl DeviceCategory {
    /// Whether connecting a device of this category should take over audio
    /// output routing.
    pub fn is_audio_output(&self) -> bool {
        matches!(
            self,
            Self::Headphones | Self::Earphones | Self::Speaker | Self::Car
        )
    }

    /// Best-effort category detection from an advertised device name.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("car") || lower.contains("mazda") || lower.contains("auto") {
            Self::Car
        } else if lower.contains("headphone") {
            Self::Headphones
        } else if lower.contains("buds") || lower.contains("airpods") {
            Self::Earphones
        } else if lower.contains("watch") {
            Self::Smartwatch
        } else if lower.contains("phone") {
            Self::Phone
        } else if lower.contains("speaker") {
            Self::Speaker
        } else if lower.contains("controller") || lower.contains("gamepad") {
            Self::Gamepad
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Headphones => "headphones",
            Self::Earphones => "earphones",
            Self::Smartwatch => "smartwatch",
            Self::Phone => "phone",
            Self::Car => "car",
            Self::Speaker => "speaker",
            Self::Gamepad => "gamepad",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Bluetooth audio profile advertised by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AudioProfile {
    A2dp,
    Hfp,
    Avrcp,
}

/// A known Bluetooth device.
///
/// Devices enter the registry from a seed list, the persisted
/// `device_connections` table or a scan result. They are mutated by
/// connect/disconnect actions and never removed, only marked disconnected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Transport-level identifier (MAC-derived on real platforms)
    pub id: String,

    /// Advertised device name
    pub name: String,

    /// Dashboard category (drives icons and audio routing)
    pub category: DeviceCategory,

    /// Whether the device currently holds a link
    pub connected: bool,

    /// Whether the device has been paired before
    pub paired: bool,

    /// Signal strength, 0-100
    pub signal_strength: u8,

    /// Battery level if the device reports one
    pub battery: Option<u8>,

    /// When the device last connected successfully
    pub last_connected_at: Option<DateTime<Utc>>,

    /// Audio profile if the device is audio-capable
    pub audio_profile: Option<AudioProfile>,
}

impl Device {
    /// Create a disconnected, unpaired device with the given identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: DeviceCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            connected: false,
            paired: false,
            signal_strength: 0,
            battery: None,
            last_connected_at: None,
            audio_profile: None,
        }
    }

    /// Builder-style signal strength (clamped to 100)
    pub fn with_signal(mut self, signal: u8) -> Self {
        self.signal_strength = signal.min(100);
        self
    }

    /// Builder-style audio profile
    pub fn with_profile(mut self, profile: AudioProfile) -> Self {
        self.audio_profile = Some(profile);
        self
    }

    /// Builder-style battery level
    pub fn with_battery(mut self, battery: u8) -> Self {
        self.battery = Some(battery.min(100));
        self
    }

    /// Builder-style paired flag
    pub fn paired(mut self) -> Self {
        self.paired = true;
        self
    }

    /// Builder-style connected flag (implies paired)
    pub fn connected(mut self) -> Self {
        self.connected = true;
        self.paired = true;
        self
    }
}

// =============================================================================
// Playback model
// =============================================================================

/// A track in the playback facade's playlist.
///
/// Tracks are ephemeral playback state; nothing here touches real audio data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Track length in seconds
    pub duration: u32,
    pub cover_art: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration,
            cover_art: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }
}

/// The device currently receiving audio output.
///
/// At most one route exists at a time; routing to a new device replaces the
/// previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRoute {
    pub device_id: String,
    pub device_name: String,
}

// =============================================================================
// Notifications
// =============================================================================

/// Severity of a user-facing transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

// =============================================================================
// Bus events
// =============================================================================

/// All events that can be published on the event bus.
///
/// Categories:
/// - Device lifecycle: discovery, connect/disconnect, scan progress
/// - Playback: track/state/volume/progress changes, audio routing
/// - Voice: processed commands
/// - Rules: saved/toggled automation rules
/// - Notifications: transient user-facing toasts
/// - System: shutdown coordination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusEvent {
    // =========================================================================
    // Device lifecycle
    // =========================================================================
    /// A previously unknown device appeared in a scan result
    DeviceDiscovered { device: Device },

    /// A device connected (manually or via auto-reconnect)
    DeviceConnected { device: Device },

    /// A device link was dropped; pairing state is preserved
    DeviceDisconnected { device: Device },

    /// Discovery started
    ScanStarted,

    /// Discovery finished; `discovered` counts devices new to the registry
    ScanFinished { discovered: usize },

    // =========================================================================
    // Playback
    // =========================================================================
    /// Audio output moved to a different device (or was cleared)
    AudioRouteChanged {
        previous: Option<AudioRoute>,
        current: Option<AudioRoute>,
    },

    /// Play/pause state changed
    PlaybackStateChanged { is_playing: bool },

    /// The current track changed
    TrackChanged { track: Track, index: usize },

    /// One second of playback elapsed
    ProgressTicked { progress: u32 },

    /// Volume changed (already clamped to 0-100)
    VolumeChanged { volume: u8 },

    /// Shuffle/repeat flags changed
    PlaybackModeChanged { shuffle: bool, repeat: bool },

    // =========================================================================
    // Voice
    // =========================================================================
    /// A voice transcript was interpreted and answered
    VoiceCommandProcessed {
        transcript: String,
        intent: String,
        response: String,
    },

    // =========================================================================
    // Automation rules
    // =========================================================================
    /// A new rule was persisted
    RuleSaved { rule_id: String, name: String },

    /// A rule was enabled or disabled
    RuleToggled { rule_id: String, enabled: bool },

    // =========================================================================
    // Notifications
    // =========================================================================
    /// Transient user-facing notification (rendered as a toast)
    Notification {
        level: NotificationLevel,
        title: String,
        body: String,
    },

    // =========================================================================
    // System
    // =========================================================================
    /// Service is shutting down
    ShuttingDown { reason: Option<String> },

    /// A background service acknowledged shutdown
    ServiceStopped { service: String },
}

impl BusEvent {
    /// Get the event type as a string (for logging/filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DeviceDiscovered { .. } => "device_discovered",
            Self::DeviceConnected { .. } => "device_connected",
            Self::DeviceDisconnected { .. } => "device_disconnected",
            Self::ScanStarted => "scan_started",
            Self::ScanFinished { .. } => "scan_finished",
            Self::AudioRouteChanged { .. } => "audio_route_changed",
            Self::PlaybackStateChanged { .. } => "playback_state_changed",
            Self::TrackChanged { .. } => "track_changed",
            Self::ProgressTicked { .. } => "progress_ticked",
            Self::VolumeChanged { .. } => "volume_changed",
            Self::PlaybackModeChanged { .. } => "playback_mode_changed",
            Self::VoiceCommandProcessed { .. } => "voice_command_processed",
            Self::RuleSaved { .. } => "rule_saved",
            Self::RuleToggled { .. } => "rule_toggled",
            Self::Notification { .. } => "notification",
            Self::ShuttingDown { .. } => "shutting_down",
            Self::ServiceStopped { .. } => "service_stopped",
        }
    }

    /// Check if this is a device lifecycle event
    pub fn is_device_event(&self) -> bool {
        matches!(
            self,
            Self::DeviceDiscovered { .. }
                | Self::DeviceConnected { .. }
                | Self::DeviceDisconnected { .. }
                | Self::ScanStarted
                | Self::ScanFinished { .. }
        )
    }

    /// Check if this is a playback-related event
    pub fn is_playback_event(&self) -> bool {
        matches!(
            self,
            Self::AudioRouteChanged { .. }
                | Self::PlaybackStateChanged { .. }
                | Self::TrackChanged { .. }
                | Self::ProgressTicked { .. }
                | Self::VolumeChanged { .. }
                | Self::PlaybackModeChanged { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_name() {
        assert_eq!(DeviceCategory::from_name("MAZDA CX-5"), DeviceCategory::Car);
        assert_eq!(
            DeviceCategory::from_name("Galaxy Buds Pro"),
            DeviceCategory::Earphones
        );
        assert_eq!(
            DeviceCategory::from_name("Apple Watch Series 9"),
            DeviceCategory::Smartwatch
        );
        assert_eq!(
            DeviceCategory::from_name("Mystery Gadget"),
            DeviceCategory::Other
        );
    }

    #[test]
    fn audio_output_categories() {
        assert!(DeviceCategory::Car.is_audio_output());
        assert!(DeviceCategory::Headphones.is_audio_output());
        assert!(DeviceCategory::Speaker.is_audio_output());
        assert!(!DeviceCategory::Phone.is_audio_output());
        assert!(!DeviceCategory::Gamepad.is_audio_output());
    }

    #[test]
    fn audio_profile_serializes_uppercase() {
        let json = serde_json::to_string(&AudioProfile::A2dp).unwrap();
        assert_eq!(json, "\"A2DP\"");
    }

    #[test]
    fn device_builder_connected_implies_paired() {
        let device = Device::new("1", "BMW Car Audio", DeviceCategory::Car).connected();
        assert!(device.connected);
        assert!(device.paired);
    }

    #[test]
    fn event_type_and_categories() {
        let device = Device::new("1", "Test", DeviceCategory::Speaker);
        let event = BusEvent::DeviceDiscovered { device };
        assert_eq!(event.event_type(), "device_discovered");
        assert!(event.is_device_event());
        assert!(!event.is_playback_event());
    }

    #[test]
    fn event_serialization_is_tagged() {
        let event = BusEvent::VolumeChanged { volume: 60 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("VolumeChanged"));
        assert!(json.contains("60"));
    }
}
