//! PlaybackService - simulated transport state for the dashboard player
//!
//! Holds current track, play state, volume, progress and the shuffle/repeat
//! flags. Progress advances once per second while playing via a
//! coordinator-owned ticker task. No real audio decoding occurs anywhere
//! here.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audio::library::demo_playlist;
use crate::bus::{AudioRoute, BusEvent, Device, NotificationLevel, SharedBus, Track};

const DEFAULT_VOLUME: u8 = 75;
const TICK_PERIOD: Duration = Duration::from_secs(1);

struct PlayerState {
    playlist: Vec<Track>,
    index: usize,
    is_playing: bool,
    volume: u8,
    progress: u32,
    shuffle: bool,
    repeat: bool,
    route: Option<AudioRoute>,
}

/// Serializable view of the player for the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub index: usize,
    pub is_playing: bool,
    pub volume: u8,
    pub progress: u32,
    pub shuffle: bool,
    pub repeat: bool,
    pub route: Option<AudioRoute>,
    pub playlist: Vec<Track>,
}

pub struct PlaybackService {
    state: RwLock<PlayerState>,
    bus: SharedBus,
}

impl PlaybackService {
    /// Create with the built-in demo playlist (non-empty from the start).
    pub fn new(bus: SharedBus) -> Self {
        Self::with_playlist(bus, demo_playlist())
    }

    pub fn with_playlist(bus: SharedBus, playlist: Vec<Track>) -> Self {
        let playlist = if playlist.is_empty() {
            warn!("Refusing empty playlist, falling back to demo tracks");
            demo_playlist()
        } else {
            playlist
        };
        Self {
            state: RwLock::new(PlayerState {
                playlist,
                index: 0,
                is_playing: false,
                volume: DEFAULT_VOLUME,
                progress: 0,
                shuffle: false,
                repeat: false,
                route: None,
            }),
            bus,
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let s = self.state.read().await;
        PlaybackSnapshot {
            current_track: s.playlist.get(s.index).cloned(),
            index: s.index,
            is_playing: s.is_playing,
            volume: s.volume,
            progress: s.progress,
            shuffle: s.shuffle,
            repeat: s.repeat,
            route: s.route.clone(),
            playlist: s.playlist.clone(),
        }
    }

    pub async fn current_track(&self) -> Option<Track> {
        let s = self.state.read().await;
        s.playlist.get(s.index).cloned()
    }

    /// Start playback. Purely a flag flip; when a device holds the audio
    /// route a "Playing on ..." notification is attributed to it.
    pub async fn play(&self) {
        let (route, track) = {
            let mut s = self.state.write().await;
            s.is_playing = true;
            (s.route.clone(), s.playlist.get(s.index).cloned())
        };
        self.bus
            .publish(BusEvent::PlaybackStateChanged { is_playing: true });
        if let Some(route) = route {
            let body = track
                .map(|t| format!("{} - {}", t.title, t.artist))
                .unwrap_or_else(|| "Audio".to_string());
            self.bus.notify(
                NotificationLevel::Success,
                format!("Playing on {}", route.device_name),
                body,
            );
        }
    }

    pub async fn pause(&self) {
        self.state.write().await.is_playing = false;
        self.bus
            .publish(BusEvent::PlaybackStateChanged { is_playing: false });
    }

    /// Advance to the next track: uniform random index with shuffle on (the
    /// current track may repeat - there is no no-repeat guarantee),
    /// otherwise `(index + 1) % len`.
    pub async fn next(&self) {
        let changed = {
            let mut s = self.state.write().await;
            advance(&mut s)
        };
        if let Some((track, index)) = changed {
            self.bus.publish(BusEvent::TrackChanged { track, index });
        }
    }

    /// Go to the previous track: always `(index - 1 + len) % len`, shuffle
    /// is ignored on the way back.
    pub async fn previous(&self) {
        let changed = {
            let mut s = self.state.write().await;
            if s.playlist.is_empty() {
                None
            } else {
                s.index = (s.index + s.playlist.len() - 1) % s.playlist.len();
                s.progress = 0;
                Some((s.playlist[s.index].clone(), s.index))
            }
        };
        if let Some((track, index)) = changed {
            self.bus.publish(BusEvent::TrackChanged { track, index });
        }
    }

    /// Jump to a playlist position and start playing.
    pub async fn play_track(&self, index: usize) -> bool {
        let changed = {
            let mut s = self.state.write().await;
            if index >= s.playlist.len() {
                return false;
            }
            s.index = index;
            s.progress = 0;
            s.is_playing = true;
            (s.playlist[index].clone(), index)
        };
        self.bus.publish(BusEvent::TrackChanged {
            track: changed.0,
            index: changed.1,
        });
        self.bus
            .publish(BusEvent::PlaybackStateChanged { is_playing: true });
        true
    }

    /// Set volume, clamped into 0-100. Returns the applied value.
    pub async fn set_volume(&self, value: i32) -> u8 {
        let volume = value.clamp(0, 100) as u8;
        self.state.write().await.volume = volume;
        self.bus.publish(BusEvent::VolumeChanged { volume });
        volume
    }

    /// Relative volume change (voice "volume up"/"volume down")
    pub async fn adjust_volume(&self, delta: i32) -> u8 {
        let current = i32::from(self.state.read().await.volume);
        self.set_volume(current + delta).await
    }

    pub async fn volume(&self) -> u8 {
        self.state.read().await.volume
    }

    /// Seek within the current track (clamped to its duration).
    pub async fn seek(&self, progress: u32) -> u32 {
        let applied = {
            let mut s = self.state.write().await;
            let duration = s.playlist.get(s.index).map(|t| t.duration).unwrap_or(0);
            s.progress = progress.min(duration);
            s.progress
        };
        self.bus
            .publish(BusEvent::ProgressTicked { progress: applied });
        applied
    }

    pub async fn toggle_shuffle(&self) -> bool {
        let (shuffle, repeat) = {
            let mut s = self.state.write().await;
            s.shuffle = !s.shuffle;
            (s.shuffle, s.repeat)
        };
        self.bus
            .publish(BusEvent::PlaybackModeChanged { shuffle, repeat });
        shuffle
    }

    pub async fn toggle_repeat(&self) -> bool {
        let (shuffle, repeat) = {
            let mut s = self.state.write().await;
            s.repeat = !s.repeat;
            (s.shuffle, s.repeat)
        };
        self.bus
            .publish(BusEvent::PlaybackModeChanged { shuffle, repeat });
        repeat
    }

    /// Replace the playlist. Empty loads are rejected so the non-empty
    /// invariant holds once a playlist exists.
    pub async fn load_playlist(&self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            warn!("Ignoring empty playlist load");
            return;
        }
        let (track, index) = {
            let mut s = self.state.write().await;
            s.playlist = tracks;
            s.index = 0;
            s.progress = 0;
            (s.playlist[0].clone(), 0usize)
        };
        self.bus.publish(BusEvent::TrackChanged { track, index });
    }

    // =========================================================================
    // Audio routing (single primary route)
    // =========================================================================

    /// Route audio output to a device, replacing any previous route.
    pub async fn route_to(&self, device: &Device) {
        let current = AudioRoute {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
        };
        let previous = {
            let mut s = self.state.write().await;
            s.route.replace(current.clone())
        };
        info!("Audio routed to {}", current.device_name);
        self.bus.publish(BusEvent::AudioRouteChanged {
            previous,
            current: Some(current),
        });
    }

    /// Drop the route if the given device holds it.
    pub async fn clear_route(&self, device_id: &str) {
        let previous = {
            let mut s = self.state.write().await;
            if s.route.as_ref().map(|r| r.device_id.as_str()) == Some(device_id) {
                s.route.take()
            } else {
                None
            }
        };
        if previous.is_some() {
            self.bus.publish(BusEvent::AudioRouteChanged {
                previous,
                current: None,
            });
        }
    }

    pub async fn routed_device_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .route
            .as_ref()
            .map(|r| r.device_id.clone())
    }

    // =========================================================================
    // Progress ticker
    // =========================================================================

    /// Advance playback by one second. Reaching the track's duration moves
    /// on: repeat restarts the same track, otherwise `next()` semantics
    /// apply. No-op while paused.
    pub async fn tick(&self) {
        let event = {
            let mut s = self.state.write().await;
            if !s.is_playing || s.playlist.is_empty() {
                return;
            }
            let duration = s.playlist[s.index].duration;
            s.progress += 1;
            if s.progress >= duration {
                if s.repeat {
                    s.progress = 0;
                    BusEvent::ProgressTicked { progress: 0 }
                } else {
                    match advance(&mut s) {
                        Some((track, index)) => BusEvent::TrackChanged { track, index },
                        None => return,
                    }
                }
            } else {
                BusEvent::ProgressTicked {
                    progress: s.progress,
                }
            }
        };
        self.bus.publish(event);
    }

    /// Run the one-second ticker until cancelled. Spawned under the service
    /// coordinator so teardown cannot leak the timer.
    pub async fn run_ticker(self: Arc<Self>, cancel: CancellationToken) {
        info!("Playback ticker started");
        let mut ticker = interval(TICK_PERIOD);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Playback ticker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}

/// Pick the next index and reset progress. Shared by `next()` and the
/// end-of-track path so both honor the shuffle flag identically.
fn advance(s: &mut PlayerState) -> Option<(Track, usize)> {
    if s.playlist.is_empty() {
        return None;
    }
    let len = s.playlist.len();
    s.index = if s.shuffle {
        rand::thread_rng().gen_range(0..len)
    } else {
        (s.index + 1) % len
    };
    s.progress = 0;
    Some((s.playlist[s.index].clone(), s.index))
}
