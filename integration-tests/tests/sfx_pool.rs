//! Pool lifecycle scenarios: growth under overlap, tick-driven reclamation,
//! reference counting, and load-failure handling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use audio_backend::mock::MockOutput;
use audio_service::{SfxPlayer, StepUpdater, INVALID_VOICE_ID, PREWARM_VOICES};
use clip_store::{
    ClipAsset, ClipCatalog, ClipDescriptor, ClipLoader, ClipSource, ResidentLoader,
    StreamingLoader,
};
use event_bus::EventBus;

fn one_second_clip(name: &str) -> ClipDescriptor {
    let asset = Arc::new(ClipAsset::from_samples(vec![0.0; 48_000], 48_000, 1));
    ClipDescriptor::new(name, ClipSource::Memory(asset))
}

fn player(catalog: ClipCatalog, loader: Arc<dyn ClipLoader>) -> (SfxPlayer, Arc<StepUpdater>, Arc<MockOutput>) {
    let updater = Arc::new(StepUpdater::new());
    let output = Arc::new(MockOutput::new());
    let player = SfxPlayer::new(
        Arc::new(catalog),
        loader,
        output.clone(),
        updater.clone(),
        Arc::new(EventBus::new()),
    );
    (player, updater, output)
}

#[test]
fn twelve_overlapping_one_shots_grow_the_pool_to_twelve() {
    let mut catalog = ClipCatalog::new();
    catalog.register(one_second_clip("blip")).unwrap();
    let (player, updater, _output) = player(catalog, Arc::new(ResidentLoader::new()));

    assert_eq!(player.voice_count(), PREWARM_VOICES);

    let ids: Vec<_> = (0..12).map(|_| player.play("blip")).collect();
    assert!(ids.iter().all(|&id| id >= 0));
    assert_eq!(player.voice_count(), 12);
    assert_eq!(player.alive_count(), 12);
    assert_eq!(player.clip_refcount("blip"), 12);

    updater.step(1.1);
    assert_eq!(player.alive_count(), 0);
    assert_eq!(player.clip_refcount("blip"), 0);
    // The pool keeps its grown size for reuse.
    assert_eq!(player.voice_count(), 12);
}

#[test]
fn refcount_equals_plays_minus_stops_never_negative() {
    let mut catalog = ClipCatalog::new();
    catalog.register(one_second_clip("chime")).unwrap();
    let (player, _updater, _output) = player(catalog, Arc::new(ResidentLoader::new()));

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(player.play("chime"));
    }
    assert_eq!(player.clip_refcount("chime"), 5);

    for id in &ids[..3] {
        player.stop(*id);
    }
    assert_eq!(player.clip_refcount("chime"), 2);

    // Stops beyond the number of plays clamp at zero.
    for id in &ids {
        player.stop(*id);
    }
    player.stop(ids[0]);
    assert_eq!(player.clip_refcount("chime"), 0);
}

#[test]
fn reclaimed_voice_gets_a_strictly_greater_identity() {
    let mut catalog = ClipCatalog::new();
    catalog.register(one_second_clip("tick")).unwrap();
    let (player, updater, _output) = player(catalog, Arc::new(ResidentLoader::new()));

    let first = player.play("tick");
    updater.step(1.5);
    assert!(!player.is_playing(first));

    let second = player.play("tick");
    assert!(second > first);
}

#[test]
fn unknown_clip_leaves_all_state_untouched() {
    let mut catalog = ClipCatalog::new();
    catalog.register(one_second_clip("real")).unwrap();
    let (player, _updater, output) = player(catalog, Arc::new(ResidentLoader::new()));

    let id = player.play("imaginary");
    assert_eq!(id, INVALID_VOICE_ID);
    assert_eq!(player.voice_count(), PREWARM_VOICES);
    assert_eq!(player.alive_count(), 0);
    assert_eq!(player.clip_refcount("imaginary"), 0);
    assert_eq!(output.begun_count(), 0);
}

#[test]
fn async_load_starts_on_a_later_tick_and_still_reclaims() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..4_800 {
        writer.write_sample(2000i16).unwrap();
    }
    writer.finalize().unwrap();

    let mut catalog = ClipCatalog::new();
    catalog
        .register(ClipDescriptor::new("snap", ClipSource::Wav(path)))
        .unwrap();
    let (player, updater, output) = player(catalog, Arc::new(StreamingLoader::new()));

    let id = player.play("snap");
    assert!(player.is_playing(id));

    // Tick until the worker's completion lands; the clip is 0.1 s long, and
    // elapsed time only counts wall ticks, so keep steps tiny.
    let deadline = Instant::now() + Duration::from_secs(5);
    while output.begun_count() == 0 {
        assert!(Instant::now() < deadline, "load never completed");
        updater.step(0.0);
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(player.is_playing(id));

    updater.step(0.2);
    assert!(!player.is_playing(id));
    assert_eq!(player.clip_refcount("snap"), 0);
}

#[test]
fn failed_load_reclaims_the_voice_and_its_reference() {
    let mut catalog = ClipCatalog::new();
    catalog
        .register(ClipDescriptor::new(
            "phantom",
            ClipSource::Wav("/nonexistent/phantom.wav".into()),
        ))
        .unwrap();
    let (player, updater, output) = player(catalog, Arc::new(StreamingLoader::new()));

    let id = player.play("phantom");
    assert!(id >= 0);
    assert_eq!(player.clip_refcount("phantom"), 1);

    // The failure completion arrives on some later tick and the voice is
    // reclaimed in the same advance pass.
    let deadline = Instant::now() + Duration::from_secs(5);
    while player.is_playing(id) {
        assert!(Instant::now() < deadline, "failure never observed");
        updater.step(0.0);
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(player.clip_refcount("phantom"), 0);
    assert_eq!(output.begun_count(), 0);
}

#[test]
fn stop_during_load_discards_the_late_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slow.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..48_000 {
        writer.write_sample(500i16).unwrap();
    }
    writer.finalize().unwrap();

    let mut catalog = ClipCatalog::new();
    catalog
        .register(ClipDescriptor::new("slow", ClipSource::Wav(path)))
        .unwrap();
    let (player, updater, output) = player(catalog, Arc::new(StreamingLoader::new()));

    let id = player.play("slow");
    player.stop(id);
    assert_eq!(player.clip_refcount("slow"), 0);

    // However late the worker finishes, nothing ever becomes audible.
    std::thread::sleep(Duration::from_millis(50));
    for _ in 0..10 {
        updater.step(0.016);
    }
    assert_eq!(output.begun_count(), 0);
    assert_eq!(player.alive_count(), 0);
}

#[test]
fn scene_unload_releases_only_idle_clips() {
    #[derive(Default)]
    struct RecordingLoader {
        inner: ResidentLoader,
        released: parking_lot::Mutex<Vec<String>>,
    }
    impl ClipLoader for RecordingLoader {
        fn resolve(&self, clip: &ClipDescriptor) -> clip_store::Resolution {
            self.inner.resolve(clip)
        }
        fn release(&self, clip: &ClipDescriptor) {
            self.released.lock().push(clip.name.clone());
            self.inner.release(clip);
        }
    }

    let mut catalog = ClipCatalog::new();
    catalog.register(one_second_clip("short")).unwrap();
    let long_asset = Arc::new(ClipAsset::from_samples(vec![0.0; 480_000], 48_000, 1));
    catalog
        .register(ClipDescriptor::new("long", ClipSource::Memory(long_asset)))
        .unwrap();

    let loader = Arc::new(RecordingLoader::default());
    let updater = Arc::new(StepUpdater::new());
    let bus = Arc::new(EventBus::new());
    let player = SfxPlayer::new(
        Arc::new(catalog),
        loader.clone(),
        Arc::new(MockOutput::new()),
        updater.clone(),
        bus.clone(),
    );

    player.play("short");
    player.play("long");
    updater.step(2.0); // "short" finishes, "long" keeps playing

    bus.publish(audio_service::SceneUnloaded {
        scene: "level_1".into(),
    });
    bus.drain();

    assert_eq!(&*loader.released.lock(), &["short".to_string()]);

    // After dispose the subscription is gone: no further releases.
    player.dispose();
    bus.publish(audio_service::SceneUnloaded {
        scene: "level_2".into(),
    });
    bus.drain();
    assert_eq!(loader.released.lock().len(), 1);
}
