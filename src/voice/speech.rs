//! Speech synthesis boundary.
//!
//! Text-to-speech is consumed as a black-box service: the hub posts the
//! response text to a hosted synthesis endpoint and gets audio bytes back.
//! When the endpoint is unconfigured or fails, a local primitive stands in -
//! synthesis failures never change the text response itself.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::SpeechConfig;

const SYNTH_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Turn response text into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Hosted speech-to-speech endpoint.
pub struct HttpSpeech {
    http: Client,
    endpoint: String,
    api_key: String,
    voice_id: String,
}

impl HttpSpeech {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(SYNTH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            voice_id: config.voice_id.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeech {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.endpoint, self.voice_id);
        let response = self
            .http
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": text,
                "model_id": "eleven_multilingual_v2",
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                    "style": 0.5,
                    "use_speaker_boost": true
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("speech endpoint returned {}", status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Local text-to-speech primitive stand-in.
///
/// The hub itself has no speaker; the dashboard client performs local
/// synthesis from the response text, so this fallback only has to succeed.
pub struct LocalSpeech;

#[async_trait]
impl SpeechSynthesizer for LocalSpeech {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        debug!("Local speech fallback for {} chars", text.len());
        Ok(Vec::new())
    }
}

/// Pick the synthesizer for the current configuration.
pub fn from_config(config: Option<&SpeechConfig>) -> Arc<dyn SpeechSynthesizer> {
    match config {
        Some(speech) => Arc::new(HttpSpeech::new(speech)),
        None => Arc::new(LocalSpeech),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_always_succeeds() {
        let local = LocalSpeech;
        assert!(local.synthesize("hello").await.unwrap().is_empty());
    }

    #[test]
    fn unconfigured_selects_local() {
        assert_eq!(from_config(None).name(), "local");
    }

    #[test]
    fn configured_selects_remote() {
        let config = SpeechConfig {
            endpoint: "https://speech.example.co/v1/text-to-speech".to_string(),
            api_key: "key".to_string(),
            voice_id: "aria".to_string(),
        };
        assert_eq!(from_config(Some(&config)).name(), "remote");
    }
}
