//! VoiceService - transcript in, executed action + canned response out
//!
//! Orchestrates one voice interaction: run the decision table, execute the
//! matched hub action, synthesize the reply (with local fallback), log the
//! interaction to the hosted store and publish the outcome on the bus.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::audio::PlaybackService;
use crate::bus::{BusEvent, DeviceCategory, NotificationLevel, SharedBus};
use crate::devices::{ConnectionController, DeviceRegistry};
use crate::store::{SharedStore, VoiceCommandRow};
use crate::voice::interpreter::{detect_intent, interpret, VoiceAction};
use crate::voice::speech::{LocalSpeech, SpeechSynthesizer};

const RECENT_COMMANDS_KEPT: usize = 5;
const VOLUME_STEP: i32 = 10;
const CONFIDENCE: f32 = 0.95;
const LANGUAGE: &str = "en-US";

/// Result returned to the API caller.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceOutcome {
    pub transcript: String,
    pub intent: String,
    pub response: String,
}

pub struct VoiceService {
    registry: Arc<DeviceRegistry>,
    controller: Arc<ConnectionController>,
    playback: Arc<PlaybackService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: SharedStore,
    bus: SharedBus,
    /// Retained for context display only; nothing consults it for
    /// disambiguation.
    recent: RwLock<VecDeque<String>>,
}

impl VoiceService {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        controller: Arc<ConnectionController>,
        playback: Arc<PlaybackService>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: SharedStore,
        bus: SharedBus,
    ) -> Self {
        Self {
            registry,
            controller,
            playback,
            synthesizer,
            store,
            bus,
            recent: RwLock::new(VecDeque::new()),
        }
    }

    /// Handle one final transcript from the recognizer.
    pub async fn handle_transcript(&self, transcript: &str) -> Result<VoiceOutcome> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            // Recognition-class failure: reset and tell the user, no retry
            self.bus.notify(
                NotificationLevel::Warning,
                "Voice Assistant",
                "I could not understand that. Please try again.",
            );
            bail!("empty transcript");
        }

        self.remember(transcript).await;

        let connected = self.registry.connected_count().await;
        let interpretation = interpret(transcript, connected);
        let intent = detect_intent(transcript);

        self.execute(interpretation.action).await;
        self.speak(&interpretation.response).await;
        self.log_interaction(transcript, intent.as_str(), &interpretation.response)
            .await;

        self.bus.publish(BusEvent::VoiceCommandProcessed {
            transcript: transcript.to_string(),
            intent: intent.as_str().to_string(),
            response: interpretation.response.clone(),
        });

        Ok(VoiceOutcome {
            transcript: transcript.to_string(),
            intent: intent.as_str().to_string(),
            response: interpretation.response,
        })
    }

    /// Most recent transcripts, newest last.
    pub async fn recent_commands(&self) -> Vec<String> {
        self.recent.read().await.iter().cloned().collect()
    }

    async fn remember(&self, transcript: &str) {
        let mut recent = self.recent.write().await;
        recent.push_back(transcript.to_string());
        while recent.len() > RECENT_COMMANDS_KEPT {
            recent.pop_front();
        }
    }

    async fn execute(&self, action: VoiceAction) {
        match action {
            VoiceAction::ConnectCar => {
                match self.registry.first_paired(DeviceCategory::Car).await {
                    // The controller owns success/failure notifications
                    Some(car) => {
                        let _ = self.controller.connect(&car.id).await;
                    }
                    None => self.bus.notify(
                        NotificationLevel::Warning,
                        "Voice Assistant",
                        "No paired car audio system found.",
                    ),
                }
            }
            VoiceAction::PlayMusic => self.playback.play().await,
            VoiceAction::PauseMusic => self.playback.pause().await,
            VoiceAction::NextTrack => self.playback.next().await,
            VoiceAction::VolumeUp => {
                self.playback.adjust_volume(VOLUME_STEP).await;
            }
            VoiceAction::VolumeDown => {
                self.playback.adjust_volume(-VOLUME_STEP).await;
            }
            VoiceAction::None => {}
        }
    }

    /// Synthesize the reply; remote failure falls back to the local
    /// primitive and never disturbs the interaction.
    async fn speak(&self, response: &str) {
        if let Err(e) = self.synthesizer.synthesize(response).await {
            warn!(
                "Speech synthesis via {} failed, using local fallback: {}",
                self.synthesizer.name(),
                e
            );
            let _ = LocalSpeech.synthesize(response).await;
        }
    }

    /// Write-only interaction log. Single attempt, abandoned on error.
    async fn log_interaction(&self, transcript: &str, intent: &str, response: &str) {
        let Some(store) = &self.store else {
            return;
        };
        let row = VoiceCommandRow {
            command_text: transcript.to_string(),
            intent_detected: Some(intent.to_string()),
            confidence_score: Some(CONFIDENCE),
            response_text: Some(response.to_string()),
            language_code: LANGUAGE.to_string(),
            execution_successful: true,
        };
        if let Err(e) = store
            .table("voice_commands")
            .insert::<_, VoiceCommandRow>(&row)
            .await
        {
            debug!("Could not log voice interaction: {}", e);
        }
    }
}
