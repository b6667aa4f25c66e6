//! Playlist sources for the playback facade.

use tracing::warn;

use crate::bus::Track;
use crate::store::{AudioTrackRow, SharedStore};

/// Built-in demo playlist used when the hosted library is unavailable or
/// empty. The playlist non-empty invariant holds from startup onward.
pub fn demo_playlist() -> Vec<Track> {
    vec![
        Track::new("1", "Midnight Drive", "Synthetic Dreams", 245).with_album("Neon Nights"),
        Track::new("2", "Digital Horizon", "Electric Pulse", 312).with_album("Future Waves"),
        Track::new("3", "Chrome Reflection", "Meta Sound", 287).with_album("Glass World"),
    ]
}

/// Load the playlist from the hosted `audio_library` table, falling back to
/// the demo playlist when the store is absent, errors out or has no rows.
/// One attempt, no retry.
pub async fn load_playlist(store: &SharedStore) -> Vec<Track> {
    let Some(store) = store else {
        return demo_playlist();
    };

    match store
        .table("audio_library")
        .order("created_at", false)
        .select::<AudioTrackRow>()
        .await
    {
        Ok(rows) if rows.is_empty() => demo_playlist(),
        Ok(rows) => rows.into_iter().map(AudioTrackRow::into_track).collect(),
        Err(e) => {
            warn!("Could not load audio library, using demo playlist: {}", e);
            demo_playlist()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_playlist_is_non_empty_with_positive_durations() {
        let playlist = demo_playlist();
        assert!(!playlist.is_empty());
        assert!(playlist.iter().all(|t| t.duration > 0));
    }

    #[tokio::test]
    async fn absent_store_falls_back_to_demo() {
        let playlist = load_playlist(&None).await;
        assert_eq!(playlist.len(), demo_playlist().len());
    }
}
