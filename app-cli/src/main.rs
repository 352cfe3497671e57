//! Scripted demo: generated tones through the playback service. Runs against
//! the recording mock by default; build with `--features cpal-audio` to hear
//! it on a real device.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use audio_backend::AudioOutput;
use audio_service::{AudioService, SceneUnloaded, StepUpdater};
use clip_store::{ClipAsset, ClipCatalog, ClipDescriptor, ClipSource, ResidentLoader};
use event_bus::EventBus;

const SAMPLE_RATE: u32 = 48_000;
const TICK_SECS: f32 = 1.0 / 60.0;

fn tone(freq: f32, secs: f32) -> Arc<ClipAsset> {
    let frames = (secs * SAMPLE_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            // Short attack/release envelope to avoid clicks.
            let env = (t / 0.01).min(1.0) * ((secs - t) / 0.05).clamp(0.0, 1.0);
            (TAU * freq * t).sin() * 0.25 * env
        })
        .collect();
    Arc::new(ClipAsset::from_samples(samples, SAMPLE_RATE, 1))
}

fn build_catalog() -> Result<ClipCatalog> {
    let mut catalog = ClipCatalog::new();
    catalog.register(
        ClipDescriptor::new("laser", ClipSource::Memory(tone(880.0, 0.4))).with_volume(0.7),
    )?;
    catalog.register(
        ClipDescriptor::new("thud", ClipSource::Memory(tone(110.0, 0.3))).with_pitch(0.8),
    )?;
    catalog.register(
        ClipDescriptor::new("theme_calm", ClipSource::Memory(tone(220.0, 2.0)))
            .with_volume(0.5)
            .with_loop(true),
    )?;
    catalog.register(
        ClipDescriptor::new("theme_tense", ClipSource::Memory(tone(330.0, 2.0)))
            .with_volume(0.5)
            .with_loop(true),
    )?;
    Ok(catalog)
}

fn build_output() -> Result<Arc<dyn AudioOutput>> {
    #[cfg(feature = "cpal-audio")]
    {
        Ok(Arc::new(audio_backend::cpal_backend::CpalOutput::new()?))
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        Ok(Arc::new(audio_backend::mock::MockOutput::new()))
    }
}

fn run_for(updater: &StepUpdater, secs: f32) {
    let ticks = (secs / TICK_SECS) as usize;
    for _ in 0..ticks {
        updater.step(TICK_SECS);
        #[cfg(feature = "cpal-audio")]
        thread::sleep(Duration::from_secs_f32(TICK_SECS));
        #[cfg(not(feature = "cpal-audio"))]
        thread::sleep(Duration::ZERO);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,audio_service=debug".into()),
        )
        .init();

    let updater = Arc::new(StepUpdater::new());
    let bus = Arc::new(EventBus::new());
    let service = AudioService::builder()
        .catalog(Arc::new(build_catalog()?))
        .loader(Arc::new(ResidentLoader::new()))
        .output(build_output()?)
        .updater(updater.clone())
        .bus(bus.clone())
        .build()?;

    tracing::info!("starting calm theme");
    service.play_music("theme_calm");
    run_for(&updater, 1.0);

    tracing::info!("firing overlapping effects");
    for i in 0..6 {
        service.play_sfx(if i % 2 == 0 { "laser" } else { "thud" });
        run_for(&updater, 0.15);
    }

    tracing::info!("crossfading to tense theme");
    service.cross_fade_music("theme_tense", 1.0);
    run_for(&updater, 2.0);

    tracing::info!("scene unload releases idle clips");
    bus.publish(SceneUnloaded {
        scene: "demo".into(),
    });
    bus.drain();
    run_for(&updater, 0.5);

    service.dispose();
    tracing::info!("done");
    Ok(())
}
