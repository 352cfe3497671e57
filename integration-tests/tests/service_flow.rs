//! Whole-service flows: one tick source driving both channels, mixed
//! volumes, and teardown.

use std::sync::Arc;

use audio_backend::mock::MockOutput;
use audio_service::{
    AudioService, SpatialAnchor, StepUpdater, Vec3, DEFAULT_CROSSFADE_SECS, INVALID_VOICE_ID,
};
use clip_store::{ClipAsset, ClipCatalog, ClipDescriptor, ClipSource, ResidentLoader};
use event_bus::EventBus;

fn service() -> (AudioService, Arc<StepUpdater>, Arc<MockOutput>) {
    let mut catalog = ClipCatalog::new();
    let short = Arc::new(ClipAsset::from_samples(vec![0.0; 24_000], 48_000, 1));
    let long = Arc::new(ClipAsset::from_samples(vec![0.0; 480_000], 48_000, 1));
    catalog
        .register(ClipDescriptor::new("footstep", ClipSource::Memory(short)).with_volume(0.5))
        .unwrap();
    for name in ["menu_theme", "battle_theme"] {
        catalog
            .register(ClipDescriptor::new(name, ClipSource::Memory(long.clone())).with_loop(true))
            .unwrap();
    }

    let updater = Arc::new(StepUpdater::new());
    let output = Arc::new(MockOutput::new());
    let service = AudioService::builder()
        .catalog(Arc::new(catalog))
        .loader(Arc::new(ResidentLoader::new()))
        .output(output.clone())
        .updater(updater.clone())
        .bus(Arc::new(EventBus::new()))
        .build()
        .unwrap();
    (service, updater, output)
}

#[test]
fn one_tick_source_drives_sfx_reclaim_and_music_fades_together() {
    let (service, updater, output) = service();

    let step_id = service.play_sfx("footstep");
    service.play_music("menu_theme");
    let menu_source = output.last_source().unwrap();

    service.cross_fade_music("battle_theme", 1.0);

    // Quarter fade: footstep (0.5 s) still alive, menu theme at half gain.
    updater.step(0.25);
    assert!(service.sfx().is_playing(step_id));
    assert!((output.gain_of(menu_source).unwrap() - 0.5).abs() < 1e-6);

    // Past the switch point and the footstep's end.
    updater.step(0.35);
    assert!(!service.sfx().is_playing(step_id));
    assert!(output.is_stopped(menu_source));
    assert_eq!(
        service.music().current_track().as_deref(),
        Some("battle_theme")
    );

    updater.step(0.5);
    assert!(!service.music().is_fading());
}

#[test]
fn sfx_gain_reflects_clip_volume_times_channel_mix() {
    let (service, _updater, output) = service();

    service.set_master_volume(0.5);
    service.set_sfx_volume(0.4);
    service.play_sfx("footstep");

    // clip 0.5 × master 0.5 × channel 0.4
    let source = output.last_source().unwrap();
    assert!((output.gain_of(source).unwrap() - 0.1).abs() < 1e-6);
}

#[test]
fn following_voice_tracks_a_moving_anchor_each_tick() {
    struct Emitter {
        position: parking_lot::Mutex<Vec3>,
    }
    impl SpatialAnchor for Emitter {
        fn position(&self) -> Vec3 {
            *self.position.lock()
        }
    }

    let (service, updater, output) = service();
    let emitter = Arc::new(Emitter {
        position: parking_lot::Mutex::new([0.0, 0.0, 0.0]),
    });
    let anchor: Arc<dyn SpatialAnchor> = emitter.clone();

    service.play_sfx_following("footstep", &anchor);
    let source = output.last_source().unwrap();

    *emitter.position.lock() = [2.0, 0.0, 1.0];
    updater.step(0.1);
    *emitter.position.lock() = [4.0, 0.0, 2.0];
    updater.step(0.1);

    let positions = output.source(source).unwrap().positions;
    assert!(positions.contains(&[2.0, 0.0, 1.0]));
    assert_eq!(positions.last(), Some(&[4.0, 0.0, 2.0]));
}

#[test]
fn positioned_play_hands_the_location_to_the_backend() {
    let (service, _updater, output) = service();
    service.play_sfx_at("footstep", [1.0, 2.0, 3.0]);
    let source = output.last_source().unwrap();
    assert_eq!(output.source(source).unwrap().positions, vec![[1.0, 2.0, 3.0]]);
}

#[test]
fn default_crossfade_constant_is_short_and_positive() {
    assert!(DEFAULT_CROSSFADE_SECS > 0.0);
    assert!(DEFAULT_CROSSFADE_SECS < 1.0);
}

#[test]
fn disposed_service_noops_every_operation() {
    let (service, updater, output) = service();
    service.play_sfx("footstep");
    service.play_music("menu_theme");
    service.dispose();
    assert_eq!(output.active_count(), 0);

    assert_eq!(service.play_sfx("footstep"), INVALID_VOICE_ID);
    service.play_music("battle_theme");
    service.cross_fade_music("menu_theme", 1.0);
    updater.step(1.0);
    assert_eq!(output.active_count(), 0);
    assert_eq!(service.music().current_track(), None);

    // A second dispose changes nothing.
    service.dispose();
}
