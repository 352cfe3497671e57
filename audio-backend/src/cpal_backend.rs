//! Device-backed output using cpal, with a small per-source mixer.
//!
//! Demo-grade: sources are mixed with linear gain and nearest-frame pitch
//! stepping; positions are accepted but not spatialised.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::{AudioOutput, BackendError, PlayParams, SourceId, Vec3};
use clip_store::ClipAsset;

struct ActiveSource {
    id: SourceId,
    asset: Arc<ClipAsset>,
    playhead: f64,
    step: f64,
    gain: f32,
    looped: bool,
    done: bool,
}

struct Shared {
    sources: Mutex<Vec<ActiveSource>>,
    next_id: AtomicU64,
    sample_rate: u32,
}

enum CtrlMsg {
    Shutdown,
}

/// Real output. The cpal `Stream` is not `Send`, so a worker thread owns it
/// and the handle talks to the worker over a control channel.
pub struct CpalOutput {
    shared: Arc<Shared>,
    ctrl_tx: Sender<CtrlMsg>,
}

impl CpalOutput {
    pub fn new() -> Result<Self, BackendError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(BackendError::DeviceNotFound)?;
        let config = device
            .supported_output_configs()
            .map_err(|e| BackendError::Stream(e.to_string()))?
            .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 1)
            .ok_or_else(|| BackendError::UnsupportedFormat("no f32 output config".into()))?
            .with_max_sample_rate()
            .config();

        let shared = Arc::new(Shared {
            sources: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            sample_rate: config.sample_rate.0,
        });

        let (ctrl_tx, ctrl_rx) = unbounded();
        let worker_shared = shared.clone();
        thread::spawn(move || worker_loop(device, config, ctrl_rx, worker_shared));

        Ok(Self { shared, ctrl_tx })
    }
}

fn worker_loop(
    device: cpal::Device,
    config: cpal::StreamConfig,
    ctrl_rx: Receiver<CtrlMsg>,
    shared: Arc<Shared>,
) {
    let channels = config.channels as usize;
    let cb_shared = shared.clone();
    let data_cb = move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
        data.iter_mut().for_each(|s| *s = 0.0);
        let mut sources = cb_shared.sources.lock();
        for source in sources.iter_mut() {
            mix_into(source, data, channels);
        }
        sources.retain(|s| !s.done);
    };
    let err_cb = |err| tracing::warn!(error = %err, "cpal stream error");

    let stream = match device.build_output_stream(&config, data_cb, err_cb, None) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to build output stream");
            return;
        }
    };
    if let Err(e) = stream.play() {
        tracing::error!(error = %e, "failed to start output stream");
        return;
    }

    loop {
        match ctrl_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(CtrlMsg::Shutdown) => return,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn mix_into(source: &mut ActiveSource, data: &mut [f32], out_channels: usize) {
    if source.done {
        return;
    }
    let clip_channels = source.asset.channels.max(1) as usize;
    let frames = source.asset.frames;
    for frame in data.chunks_mut(out_channels) {
        let idx = source.playhead as u64;
        if idx >= frames {
            if source.looped && frames > 0 {
                source.playhead %= frames as f64;
            } else {
                source.done = true;
                break;
            }
        }
        let base = (source.playhead as u64 as usize) * clip_channels;
        for (c, out) in frame.iter_mut().enumerate() {
            let sample = source.asset.samples[base + c.min(clip_channels - 1)];
            *out += sample * source.gain;
        }
        source.playhead += source.step;
    }
}

impl AudioOutput for CpalOutput {
    fn begin(&self, asset: &Arc<ClipAsset>, params: PlayParams) -> SourceId {
        let id = SourceId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let step = params.pitch as f64 * asset.sample_rate as f64 / self.shared.sample_rate as f64;
        self.shared.sources.lock().push(ActiveSource {
            id,
            asset: asset.clone(),
            playhead: 0.0,
            step,
            gain: params.gain,
            looped: params.looped,
            done: false,
        });
        id
    }

    fn set_gain(&self, id: SourceId, gain: f32) {
        let mut sources = self.shared.sources.lock();
        if let Some(source) = sources.iter_mut().find(|s| s.id == id) {
            source.gain = gain;
        }
    }

    fn set_position(&self, _id: SourceId, _position: Vec3) {
        // Positions are tracked by the service for spatial-capable backends;
        // this mixer renders everything centered.
    }

    fn stop(&self, id: SourceId) {
        let mut sources = self.shared.sources.lock();
        if let Some(source) = sources.iter_mut().find(|s| s.id == id) {
            source.done = true;
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.ctrl_tx.send(CtrlMsg::Shutdown);
    }
}
