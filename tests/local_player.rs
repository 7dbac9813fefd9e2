use std::sync::Arc;
use std::time::Duration;

use mc2pc::session::local::{LocalPlayer, Track, PAIR_WINDOW, RESTART_THRESHOLD_MS};
use mc2pc::session::{
    PlaybackSession, SessionEvent, TrackMetadata, TransportControls, TransportStatus,
};

fn track(title: &str) -> Track {
    Track {
        metadata: TrackMetadata {
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
        },
        duration_ms: Some(180_000),
    }
}

fn player() -> LocalPlayer {
    LocalPlayer::new("test", vec![track("A"), track("B"), track("C")])
}

fn status(p: &LocalPlayer) -> TransportStatus {
    p.playback_state().unwrap().status
}

fn position(p: &LocalPlayer) -> u64 {
    p.playback_state().unwrap().position_ms
}

// ── play / pause ──────────────────────────────────────────────────────────────

#[test]
fn play_pause_pair_toggles() {
    let p = player();
    p.play();
    p.pause();
    assert_eq!(status(&p), TransportStatus::Playing);
    p.play();
    p.pause();
    assert_eq!(status(&p), TransportStatus::Paused);
    p.play();
    p.pause();
    assert_eq!(status(&p), TransportStatus::Playing);
}

#[test]
fn lone_pause_after_window_pauses() {
    let p = player();
    p.play();
    std::thread::sleep(PAIR_WINDOW + Duration::from_millis(50));
    p.pause();
    assert_eq!(status(&p), TransportStatus::Paused);
}

#[test]
fn pause_keeps_position() {
    let p = player();
    p.seek(42_000);
    p.play();
    std::thread::sleep(PAIR_WINDOW + Duration::from_millis(50));
    p.pause();
    let paused_at = position(&p);
    assert!(paused_at >= 42_000);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(position(&p), paused_at);
}

// ── skipping ──────────────────────────────────────────────────────────────────

#[test]
fn skip_wraps_both_ways() {
    let p = player();
    p.skip_to_previous();
    assert_eq!(p.current_index(), 2);
    p.skip_to_next();
    assert_eq!(p.current_index(), 0);
    assert_eq!(p.metadata().unwrap().title, "A");
}

#[test]
fn skip_emits_metadata_change() {
    let p = player();
    let mut rx = p.subscribe();
    p.skip_to_next();
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::MetadataChanged);
}

#[test]
fn previous_past_threshold_restarts_current_track() {
    let p = player();
    p.select(1);
    p.seek(RESTART_THRESHOLD_MS + 1000);
    let mut rx = p.subscribe();

    p.skip_to_previous();

    assert_eq!(p.current_index(), 1);
    assert_eq!(position(&p), 0);
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::PlaybackStateChanged);

    // Back at the start, the next press goes to the previous track.
    p.skip_to_previous();
    assert_eq!(p.current_index(), 0);
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::MetadataChanged);
}

#[test]
fn previous_at_threshold_selects_previous_track() {
    let p = player();
    p.select(2);
    p.seek(RESTART_THRESHOLD_MS);
    p.skip_to_previous();
    assert_eq!(p.current_index(), 1);
}

#[test]
fn concurrent_skips_land_on_a_consistent_track() {
    let p = Arc::new(player());

    std::thread::scope(|scope| {
        for i in 0..4 {
            let p = Arc::clone(&p);
            scope.spawn(move || {
                for _ in 0..250 {
                    if i % 2 == 0 {
                        p.seek(RESTART_THRESHOLD_MS + 1);
                        p.skip_to_previous();
                    } else {
                        p.skip_to_next();
                    }
                }
            });
        }
    });

    assert!(p.current_index() < 3);
    assert_eq!(
        p.metadata().unwrap().title,
        ["A", "B", "C"][p.current_index()]
    );
}

#[test]
fn seek_clamps_to_duration() {
    let p = player();
    p.seek(10_000_000);
    assert_eq!(position(&p), 180_000);
}

// ── empty playlist ────────────────────────────────────────────────────────────

#[test]
fn empty_playlist_reports_nothing() {
    let p = LocalPlayer::new("empty", vec![]);
    p.play();
    p.skip_to_next();
    p.skip_to_previous();
    p.seek(1000);
    assert!(p.metadata().is_none());
    assert!(p.playback_state().is_none());
}
