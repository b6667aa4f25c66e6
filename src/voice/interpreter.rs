//! Voice command decision table.
//!
//! First matching rule wins; unmatched transcripts fall back to a generic
//! filler response. There is no conversational state here - interpretation
//! is a pure function of the transcript plus the current connected-device
//! count (for the status reply).

use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Detected intent, logged alongside each command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DeviceConnect,
    AudioControl,
    VolumeControl,
    StatusQuery,
    HelpRequest,
    GeneralConversation,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceConnect => "device_connect",
            Self::AudioControl => "audio_control",
            Self::VolumeControl => "volume_control",
            Self::StatusQuery => "status_query",
            Self::HelpRequest => "help_request",
            Self::GeneralConversation => "general_conversation",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hub-side action the service should execute for a matched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAction {
    ConnectCar,
    PlayMusic,
    PauseMusic,
    NextTrack,
    VolumeUp,
    VolumeDown,
    None,
}

/// Result of running a transcript through the decision table.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub intent: Intent,
    pub action: VoiceAction,
    pub response: String,
}

const FILLER_RESPONSES: &[&str] = &[
    "I understand you'd like help with that. Let me see what I can do for you.",
    "That's an interesting request. Based on your recent activity, I think I can assist you with this.",
    "I'm processing your request with the context of your connected devices and preferences.",
    "Let me help you with that while keeping your car audio system in mind.",
];

const CAPABILITIES_RESPONSE: &str = "I can help you connect to your car's Bluetooth system, \
control music playback, adjust volume, check device status, and answer questions about your \
connected devices. What would you like me to help you with?";

/// Classify a transcript for logging. Mirrors the response table's keyword
/// groups but is evaluated independently of it.
pub fn detect_intent(transcript: &str) -> Intent {
    let lower = transcript.to_lowercase();
    if lower.contains("connect") || lower.contains("pair") {
        Intent::DeviceConnect
    } else if lower.contains("play") || lower.contains("music") {
        Intent::AudioControl
    } else if lower.contains("volume") {
        Intent::VolumeControl
    } else if lower.contains("status") || lower.contains("what") {
        Intent::StatusQuery
    } else if lower.contains("help") {
        Intent::HelpRequest
    } else {
        Intent::GeneralConversation
    }
}

/// Run the decision table. `connected_devices` feeds the status reply only.
pub fn interpret(transcript: &str, connected_devices: usize) -> Interpretation {
    let lower = transcript.to_lowercase();

    if lower.contains("connect") && (lower.contains("car") || lower.contains("mazda")) {
        return Interpretation {
            intent: Intent::DeviceConnect,
            action: VoiceAction::ConnectCar,
            response: "I've initiated the connection to your car. The Bluetooth audio profile \
                       is now active and ready for music streaming."
                .to_string(),
        };
    }

    if lower.contains("play") || lower.contains("music") {
        return interpret_music(&lower);
    }

    if lower.contains("volume") {
        return interpret_volume(&lower);
    }

    // Checked before "help" on purpose: "what can you do" reads as a status
    // question to this table, matching the shipped behavior.
    if lower.contains("what") || lower.contains("status") {
        let response = format!(
            "System status: {} device{} connected, audio streaming ready, and all voice \
             commands are fully operational. How can I assist you today?",
            connected_devices,
            if connected_devices == 1 { "" } else { "s" }
        );
        return Interpretation {
            intent: Intent::StatusQuery,
            action: VoiceAction::None,
            response,
        };
    }

    if lower.contains("help") {
        return Interpretation {
            intent: Intent::HelpRequest,
            action: VoiceAction::None,
            response: CAPABILITIES_RESPONSE.to_string(),
        };
    }

    let filler = FILLER_RESPONSES[rand::thread_rng().gen_range(0..FILLER_RESPONSES.len())];
    Interpretation {
        intent: Intent::GeneralConversation,
        action: VoiceAction::None,
        response: filler.to_string(),
    }
}

fn interpret_music(lower: &str) -> Interpretation {
    if lower.contains("pause") || lower.contains("stop") {
        return Interpretation {
            intent: Intent::AudioControl,
            action: VoiceAction::PauseMusic,
            response: "Music paused. Would you like me to resume it later or play something \
                       different?"
                .to_string(),
        };
    }
    if lower.contains("next") || lower.contains("skip") {
        return Interpretation {
            intent: Intent::AudioControl,
            action: VoiceAction::NextTrack,
            response: "Skipping to the next track. This is a great choice for your drive."
                .to_string(),
        };
    }
    Interpretation {
        intent: Intent::AudioControl,
        action: VoiceAction::PlayMusic,
        response: "Starting your personalized driving playlist. The audio is now streaming to \
                   your car audio system."
            .to_string(),
    }
}

fn interpret_volume(lower: &str) -> Interpretation {
    if lower.contains("up") || lower.contains("higher") || lower.contains("louder") {
        return Interpretation {
            intent: Intent::VolumeControl,
            action: VoiceAction::VolumeUp,
            response: "Volume increased. Is that better for you?".to_string(),
        };
    }
    if lower.contains("down") || lower.contains("lower") || lower.contains("quieter") {
        return Interpretation {
            intent: Intent::VolumeControl,
            action: VoiceAction::VolumeDown,
            response: "Volume decreased. Let me know if you need any other adjustments."
                .to_string(),
        };
    }
    Interpretation {
        intent: Intent::VolumeControl,
        action: VoiceAction::None,
        response: "Volume adjusted to your preference.".to_string(),
    }
}
