//! Integration tests for VSL Core

use std::sync::Arc;
use std::time::Duration;

use vsl_core::{
    AnalyticsEmitter, AnalyticsSink, ChannelSink, FanoutSink, FullscreenAction, Gesture,
    GestureConfig, GestureRecognizer, Key, KeyOutcome, ManualClock, MediaBinding, MemorySink,
    NoopScreen, PlaybackController, PlaybackRate, PlayerConfig, SimulatedMedia, SurfaceKind, Tap,
    VideoEventKind, VisibilityPhase, VslPlayer, Zone,
};

fn controller(duration: f64) -> PlaybackController<SimulatedMedia> {
    PlaybackController::new(
        SimulatedMedia::loaded(duration),
        AnalyticsEmitter::disabled(),
        0.7,
    )
}

fn player(config: PlayerConfig) -> (VslPlayer<SimulatedMedia>, ManualClock, Arc<MemorySink>) {
    let clock = ManualClock::new();
    let sink = Arc::new(MemorySink::new());
    let player = VslPlayer::new(
        SimulatedMedia::loaded(120.0),
        config,
        sink.clone(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    (player, clock, sink)
}

/// Advance the clock and the active binding together, forwarding notifications
fn play_for(player: &mut VslPlayer<SimulatedMedia>, clock: &ManualClock, ms: u64) {
    clock.advance_ms(ms);
    let kind = player.active().kind();
    let events = player.active_mut().media_mut().advance(ms as f64 / 1000.0);
    for event in events {
        player.handle_media_event(kind, event);
    }
    player.poll();
}

// =============================================================================
// Playback Controller
// =============================================================================

#[test]
fn test_set_volume_clamps_and_derives_mute() {
    let mut c = controller(60.0);
    for v in [-3.0, -0.01, 0.0, 0.001, 0.42, 0.999, 1.0, 1.5, 80.0] {
        c.set_volume(v);
        let stored = v.clamp(0.0, 1.0);
        assert_eq!(c.state().volume, stored, "volume for {v}");
        assert_eq!(c.state().is_muted, stored == 0.0, "mute for {v}");
    }
}

#[test]
fn test_toggle_mute_is_involution() {
    let mut c = controller(60.0);
    for v in [0.1, 0.5, 0.93] {
        c.set_volume(v);
        let before = (c.state().is_muted, c.state().volume);
        c.toggle_mute();
        c.toggle_mute();
        assert_eq!((c.state().is_muted, c.state().volume), before);
    }
}

#[test]
fn test_seek_by_clamps_to_duration() {
    let duration = 90.0;
    for (start, delta) in [(0.0, -10.0), (5.0, -10.0), (45.0, 10.0), (85.0, 10.0), (30.0, 200.0)] {
        let mut c = controller(duration);
        c.media_mut().set_current_time(start);
        c.seek_by(delta);
        let expected = f64::clamp(start + delta, 0.0, duration);
        assert_eq!(c.state().current_time, expected);
        assert_eq!(c.media().current_time(), expected);
    }
}

#[test]
fn test_milestones_fire_once_in_order() {
    let sink = Arc::new(MemorySink::new());
    let mut c = PlaybackController::new(
        SimulatedMedia::loaded(100.0),
        AnalyticsEmitter::new("vsl", sink.clone()),
        0.7,
    );
    c.toggle_play_pause();

    // Small steps cross every milestone exactly once
    for _ in 0..190 {
        for event in c.media_mut().advance(0.5) {
            c.handle_event(event);
        }
    }
    // Seeking back and replaying the same range must not refire
    c.seek_to_fraction(0.1);
    for event in c.media_mut().advance(50.0) {
        c.handle_event(event);
    }

    let milestones: Vec<u8> = sink
        .kinds()
        .into_iter()
        .filter_map(|k| match k {
            VideoEventKind::Progress { milestone } => Some(milestone),
            _ => None,
        })
        .collect();
    assert_eq!(milestones, vec![25, 50, 75, 90]);
    assert!(!sink.kinds().contains(&VideoEventKind::Complete));
}

#[test]
fn test_replay_refires_milestones() {
    let sink = Arc::new(MemorySink::new());
    let mut c = PlaybackController::new(
        SimulatedMedia::loaded(40.0),
        AnalyticsEmitter::new("vsl", sink.clone()),
        0.7,
    );
    for _ in 0..2 {
        c.toggle_play_pause();
        for event in c.media_mut().advance(60.0) {
            c.handle_event(event);
        }
    }
    let count = sink
        .kinds()
        .iter()
        .filter(|k| matches!(k, VideoEventKind::Progress { .. }))
        .count();
    assert_eq!(count, 8);
}

#[test]
fn test_invalid_rate_rejected() {
    let mut c = controller(60.0);
    for rate in [0.0, 0.6, 3.0, f64::NAN, -1.0] {
        assert!(c.set_playback_rate(rate).is_err());
    }
    assert_eq!(c.state().playback_rate, PlaybackRate::Normal);
}

// =============================================================================
// Gestures
// =============================================================================

#[test]
fn test_double_tap_classification() {
    for (x1, x2) in [(100.0, 100.0), (100.0, 149.0), (700.0, 651.0)] {
        for gap in [1u64, 150, 299] {
            let mut rec = GestureRecognizer::new(GestureConfig::default());
            rec.tap(Tap { at: Duration::from_secs(1), x: x1, width: 900.0 });
            let second = Tap {
                at: Duration::from_secs(1) + Duration::from_millis(gap),
                x: x2,
                width: 900.0,
            };
            assert!(matches!(rec.tap(second), Gesture::DoubleTap(_)), "{x1} {x2} {gap}");
        }

        let mut rec = GestureRecognizer::new(GestureConfig::default());
        assert_eq!(rec.tap(Tap { at: Duration::from_secs(1), x: x1, width: 900.0 }), Gesture::SingleTap);
        let late = Tap { at: Duration::from_millis(1300), x: x2, width: 900.0 };
        assert_eq!(rec.tap(late), Gesture::SingleTap);
    }
}

#[test]
fn test_double_tap_zones_drive_player() {
    let (mut p, clock, _) = player(PlayerConfig::mobile());
    p.open_fullscreen(SimulatedMedia::loaded(120.0), Box::new(NoopScreen));
    p.seek_to_fraction(0.5);

    p.tap(850.0, 900.0);
    clock.advance_ms(100);
    p.tap(860.0, 900.0);
    assert_eq!(p.active().state().current_time, 70.0);

    clock.advance_ms(1000);
    p.tap(450.0, 900.0);
    clock.advance_ms(100);
    p.tap(450.0, 900.0);
    assert!(p.active().state().is_playing);

    assert_eq!(Zone::locate(10.0, 900.0), Zone::Back);
}

// =============================================================================
// Control visibility
// =============================================================================

#[test]
fn test_auto_hide_after_three_seconds() {
    let (mut p, clock, _) = player(PlayerConfig::mobile());
    p.toggle_play_pause();

    play_for(&mut p, &clock, 2999);
    assert!(p.inline().controls_visible());
    play_for(&mut p, &clock, 1);
    assert!(!p.inline().controls_visible());
}

#[test]
fn test_input_resets_hide_deadline() {
    let (mut p, clock, _) = player(PlayerConfig::default());
    p.toggle_play_pause();

    play_for(&mut p, &clock, 2000);
    p.set_volume(0.5);
    play_for(&mut p, &clock, 2000);
    assert!(p.inline().controls_visible());
    play_for(&mut p, &clock, 1000);
    assert!(!p.inline().controls_visible());
}

#[test]
fn test_pause_cancels_hide_and_forces_visible() {
    let (mut p, clock, _) = player(PlayerConfig::default());
    p.toggle_play_pause();
    play_for(&mut p, &clock, 1000);
    p.toggle_play_pause();

    assert_eq!(p.inline().visibility().phase(), VisibilityPhase::Visible);
    play_for(&mut p, &clock, 10_000);
    assert!(p.inline().controls_visible());
}

#[test]
fn test_desktop_hover_persists_until_leave() {
    let (mut p, clock, _) = player(PlayerConfig::default());
    p.toggle_play_pause();
    p.pointer_enter();
    play_for(&mut p, &clock, 5000);
    assert!(p.inline().controls_visible());

    p.pointer_leave();
    play_for(&mut p, &clock, 499);
    assert!(p.inline().controls_visible());
    play_for(&mut p, &clock, 1);
    assert!(!p.inline().controls_visible());
}

// =============================================================================
// Fullscreen hand-off
// =============================================================================

#[test]
fn test_fullscreen_round_trip_preserves_state() {
    let (mut p, _, _) = player(PlayerConfig::mobile());
    p.inline_mut().media_mut().set_current_time(42.5);
    p.set_volume(0.3);
    p.set_playback_rate(1.25).unwrap();
    p.inline_mut().refresh_from_binding();

    p.open_fullscreen(SimulatedMedia::loaded(120.0), Box::new(NoopScreen));
    p.close_fullscreen().unwrap();

    let state = p.inline().state();
    assert_eq!(state.current_time, 42.5);
    assert_eq!(state.volume, 0.3);
    assert!(!state.is_muted);
    assert_eq!(state.playback_rate, PlaybackRate::OneAndQuarter);
}

#[test]
fn test_fullscreen_exclusivity() {
    let (mut p, clock, sink) = player(PlayerConfig::mobile());
    p.toggle_play_pause();
    play_for(&mut p, &clock, 1000);

    p.open_fullscreen(SimulatedMedia::loaded(120.0), Box::new(NoopScreen));
    assert!(!p.inline().state().is_playing);
    assert!(p.inline().media().paused());
    assert!(p.fullscreen().unwrap().state().is_playing);

    play_for(&mut p, &clock, 5000);
    assert!(p.inline().media().paused());
    assert_eq!(p.fullscreen().unwrap().state().current_time, 6.0);

    assert_eq!(p.key(Key::Escape), KeyOutcome::Close);
    assert!(!p.inline().state().is_playing);
    assert_eq!(p.inline().state().current_time, 6.0);

    let fullscreen: Vec<_> = sink
        .kinds()
        .into_iter()
        .filter_map(|k| match k {
            VideoEventKind::Fullscreen { action } => Some(action),
            _ => None,
        })
        .collect();
    assert_eq!(fullscreen, vec![FullscreenAction::Open, FullscreenAction::Close]);
}

#[test]
fn test_locked_overlay_ignores_keys_and_unlocks_on_close() {
    let (mut p, _, _) = player(PlayerConfig::mobile());
    p.open_fullscreen(SimulatedMedia::loaded(120.0), Box::new(NoopScreen));
    assert!(p.toggle_lock());
    assert_eq!(p.key(Key::Escape), KeyOutcome::Ignored);
    assert!(p.is_fullscreen());

    p.toggle_lock();
    p.key(Key::Escape);
    p.open_fullscreen(SimulatedMedia::loaded(120.0), Box::new(NoopScreen));
    assert!(!p.fullscreen().unwrap().is_locked());
    assert_eq!(p.active().kind(), SurfaceKind::Fullscreen);
}

// =============================================================================
// Analytics
// =============================================================================

#[test]
fn test_event_records_carry_context() {
    let (mut p, _, sink) = player(PlayerConfig {
        video_name: "launch-vsl".into(),
        ..PlayerConfig::mobile()
    });
    p.seek_to_fraction(0.25);
    p.toggle_play_pause();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].video_name, "launch-vsl");
    assert_eq!(events[0].session_id, events[1].session_id);
    assert!(events[0].sequence < events[1].sequence);
    assert_eq!(events[1].current_time, 30.0);
    assert_eq!(events[1].duration, 120.0);
    assert_eq!(events[1].percentage, 25.0);

    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["type"], "seek");
    assert_eq!(json["to"], 30.0);
}

#[test]
fn test_channel_sink_delivers_off_thread() {
    tokio_test::block_on(async {
        let (sink, mut rx) = ChannelSink::channel(16);
        let memory = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new().with(Arc::new(sink)).with(memory.clone());
        let emitter = AnalyticsEmitter::new("vsl", Arc::new(fanout));

        emitter.emit(VideoEventKind::Play, 0.0, 60.0);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, VideoEventKind::Play);
        assert_eq!(memory.events().len(), 1);
    });
}

#[test]
fn test_sink_failure_does_not_affect_playback() {
    struct Broken;
    impl AnalyticsSink for Broken {
        fn deliver(&self, _event: &vsl_core::VideoEvent) -> vsl_core::Result<()> {
            Err(vsl_core::Error::delivery("offline"))
        }
    }

    let mut p = VslPlayer::new(
        SimulatedMedia::loaded(60.0),
        PlayerConfig::default(),
        Arc::new(Broken),
        Arc::new(ManualClock::new()),
    )
    .unwrap();
    p.toggle_play_pause();
    p.seek_by(10.0);
    assert!(p.inline().state().is_playing);
    assert_eq!(p.inline().state().current_time, 10.0);
}
