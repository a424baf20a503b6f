//! The decoder thread (§4.2): one per `Open` player, owning the file
//! handle and resampler state exclusively.
//!
//! A command-free poll loop (`thread::sleep(Duration::from_millis(10))`
//! backpressure spin, `tracing` on every failure path) driving a single
//! fixed ring generalized to the bus-A/bus-B pair and the seek/loop state
//! machine of §4.2.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::player::decoder::AudioDecoder;
use crate::player::demux::demux_frame;
use crate::player::notifier::{ChangeThresholds, NotifyKind, Notification, Notifier};
use crate::player::resampler::Resampler;
use crate::player::ring_buffer::RingWriter;
use crate::player::state::{FileState, PlayerShared, ReadState};

const BACKPRESSURE_SLEEP: Duration = Duration::from_millis(10);
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// `play_pos_frames / output_sample_rate / src_ratio_effective` (§4.3
/// `get_position`), shared with the control surface's own accessor so the
/// decoder's notifications and `Player::get_position` never disagree.
pub(crate) fn position_seconds(shared: &PlayerShared, output_sample_rate: u32) -> f32 {
    if output_sample_rate == 0 {
        return 0.0;
    }
    let ratio = shared.src_ratio();
    let ratio = if ratio.abs() < f32::EPSILON { 1.0 } else { ratio };
    shared.play_pos_frames() as f32 / output_sample_rate as f32 / ratio
}

/// Owns the spawned OS thread; dropping without calling [`join`] detaches
/// it (the thread still exits promptly once `file_state` is set to
/// `Closed`, per §5 "Cancellation").
pub struct DecoderThread {
    handle: Option<JoinHandle<()>>,
}

impl DecoderThread {
    /// Spawn the decoder for `path`, publishing into `writer` and
    /// notifying through `notifier`. `shared.file_state()` must already be
    /// `Opening` (the control surface's job, §4.3 `load`).
    pub fn spawn(
        path: PathBuf,
        shared: Arc<PlayerShared>,
        writer: RingWriter,
        notifier: Arc<dyn Notifier>,
        output_sample_rate: u32,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("player-decoder".to_string())
            .spawn(move || run(path, shared, writer, notifier, output_sample_rate))
            .expect("failed to spawn decoder thread");
        Self { handle: Some(handle) }
    }

    /// Block until the thread exits. `unload` calls this after setting
    /// `file_state=Closed` (§4.2 life-cycle).
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn run(path: PathBuf, shared: Arc<PlayerShared>, mut writer: RingWriter, notifier: Arc<dyn Notifier>, output_sample_rate: u32) {
    let mut decoder = match AudioDecoder::open(&path) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(target: "player::decoder", "failed to open {}: {}", path.display(), e);
            shared.set_file_state(FileState::Closed);
            return;
        }
    };

    let file_sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    let base_ratio = output_sample_rate as f64 / file_sample_rate as f64;
    let frames_total_output = (decoder.frames_total() as f64 * base_ratio) as u64;
    shared.set_frames_total(frames_total_output);
    shared.set_src_ratio(base_ratio as f32);

    let mut resampler = match Resampler::new(shared.src_quality(), channels) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "player::decoder", "resampler init failed: {}", e);
            shared.set_file_state(FileState::Closed);
            return;
        }
    };

    shared.set_file_state(FileState::Open);
    // Nothing else ever kicks off the first fill; the decoder starts
    // loading itself as soon as it has a file open.
    shared.set_read_state(ReadState::Loading);

    let mut thresholds = ChangeThresholds::default();

    while shared.file_state() == FileState::Open {
        match shared.read_state() {
            ReadState::Seeking => {
                writer.reset();
                let effective_ratio = current_ratio(&shared, base_ratio);
                let seek_target = (shared.play_pos_frames() as f64 / effective_ratio) as u64;
                if let Err(e) = decoder.seek(seek_target) {
                    tracing::warn!(target: "player::decoder", "seek to {} failed: {}", seek_target, e);
                }
                resampler.reset();
                shared.set_read_state(ReadState::Loading);
            }
            ReadState::Looping => {
                if let Err(e) = decoder.seek(0) {
                    tracing::warn!(target: "player::decoder", "loop seek failed: {}", e);
                }
                resampler.reset();
                shared.set_read_state(ReadState::Loading);
            }
            ReadState::Loading => {
                load_one_block(&shared, &mut decoder, &mut resampler, &mut writer, &notifier, &mut thresholds, channels, base_ratio, output_sample_rate);
            }
            ReadState::Idle => {
                thread::sleep(IDLE_SLEEP);
            }
        }

        notify_if_crossed(&shared, notifier.as_ref(), &mut thresholds, output_sample_rate);
    }

    shared.set_file_state(FileState::Closed);
}

fn current_ratio(shared: &PlayerShared, base_ratio: f64) -> f64 {
    let pitch_mult = 2f64.powf(shared.pitch_shift() as f64 / 12.0);
    let ratio = base_ratio * pitch_mult;
    if ratio.abs() < f64::EPSILON { base_ratio } else { ratio }
}

#[allow(clippy::too_many_arguments)]
fn load_one_block(
    shared: &PlayerShared,
    decoder: &mut AudioDecoder,
    resampler: &mut Resampler,
    writer: &mut RingWriter,
    notifier: &Arc<dyn Notifier>,
    thresholds: &mut ChangeThresholds,
    channels: u16,
    base_ratio: f64,
    output_sample_rate: u32,
) {
    let channels = channels as usize;
    let frames_to_read = shared.buffer_size();

    let input = match decoder.read_frames(frames_to_read) {
        Ok(samples) => samples,
        Err(e) => {
            tracing::error!(target: "player::decoder", "decode error: {}", e);
            Vec::new()
        }
    };
    let short_read = input.len() < frames_to_read * channels;

    let ratio = current_ratio(shared, base_ratio);
    shared.set_src_ratio(ratio as f32);

    let block: Vec<f32> = if (ratio - 1.0).abs() < f64::EPSILON {
        input
    } else {
        match resampler.process(ratio, &input, short_read) {
            Ok((_, out)) => out,
            Err(e) => {
                tracing::warn!(target: "player::decoder", "resample error: {}", e);
                Vec::new()
            }
        }
    };

    if short_read {
        if shared.loop_enabled() {
            shared.set_read_state(ReadState::Looping);
        } else {
            shared.set_read_state(ReadState::Idle);
        }
    }

    if channels == 0 || block.is_empty() {
        return;
    }

    let track_a = shared.track_a();
    let track_b = shared.track_b();
    let frames_out = block.len() / channels;

    let mut idx = 0;
    while idx < frames_out {
        while writer.write_space() == 0 {
            if shared.file_state() != FileState::Open {
                return;
            }
            notify_if_crossed(shared, notifier.as_ref(), thresholds, output_sample_rate);
            thread::sleep(BACKPRESSURE_SLEEP);
        }
        let space = writer.write_space().min(frames_out - idx);
        for _ in 0..space {
            let frame = &block[idx * channels..(idx + 1) * channels];
            let (a, b) = demux_frame(frame, track_a, track_b);
            writer.write_frame(a, b);
            idx += 1;
        }
    }
}

fn notify_if_crossed(shared: &PlayerShared, notifier: &dyn Notifier, t: &mut ChangeThresholds, output_sample_rate: u32) {
    let play_state = shared.play_state() as u8;
    if t.play_state_changed(play_state) {
        notifier.notify(Notification { kind: NotifyKind::Transport, value: play_state as f32 });
    }

    let position = position_seconds(shared, output_sample_rate);
    if t.position_crossed(position) {
        notifier.notify(Notification { kind: NotifyKind::Position, value: position });
    }

    let gain = shared.gain();
    if t.gain_crossed(gain) {
        notifier.notify(Notification { kind: NotifyKind::Gain, value: gain });
    }

    let loop_enabled = shared.loop_enabled();
    if t.loop_changed(loop_enabled) {
        notifier.notify(Notification { kind: NotifyKind::Loop, value: if loop_enabled { 1.0 } else { 0.0 } });
    }

    let track_a = shared.track_a();
    if t.track_a_changed(track_a) {
        notifier.notify(Notification { kind: NotifyKind::TrackA, value: track_a as f32 });
    }

    let track_b = shared.track_b();
    if t.track_b_changed(track_b) {
        notifier.notify(Notification { kind: NotifyKind::TrackB, value: track_b as f32 });
    }

    let quality = shared.src_quality() as u8;
    if t.quality_changed(quality) {
        notifier.notify(Notification { kind: NotifyKind::Quality, value: quality as f32 });
    }

    let debug = shared.debug();
    if t.debug_changed(debug) {
        notifier.notify(Notification { kind: NotifyKind::Debug, value: if debug { 1.0 } else { 0.0 } });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::notifier::NullNotifier;
    use crate::player::ring_buffer::RingBufferPair;
    use std::time::Instant;

    fn write_sine_wav(path: &std::path::Path, sample_rate: u32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (sample_rate as f32 * seconds) as u32;
        for i in 0..total {
            let v = ((i as f32 / sample_rate as f32 * 440.0 * std::f32::consts::TAU).sin() * 10000.0) as i16;
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn open_failure_closes_file_state() {
        let shared = PlayerShared::new();
        shared.set_file_state(FileState::Opening);
        let (writer, _reader) = RingBufferPair::new(4096);

        let thread = DecoderThread::spawn(
            PathBuf::from("/nonexistent/path.wav"),
            Arc::clone(&shared),
            writer,
            Arc::new(NullNotifier),
            8000,
        );
        thread.join();

        assert_eq!(shared.file_state(), FileState::Closed);
    }

    #[test]
    fn successful_open_fills_ring_then_unload_joins_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 1.0);

        let shared = PlayerShared::new();
        shared.set_buffer_size(256);
        shared.set_file_state(FileState::Opening);
        let (writer, mut reader) = RingBufferPair::new(4096);

        let thread = DecoderThread::spawn(path, Arc::clone(&shared), writer, Arc::new(NullNotifier), 8000);

        let start = Instant::now();
        while reader.read_space() == 0 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(reader.read_space() > 0, "decoder never produced samples");
        assert_eq!(shared.file_state(), FileState::Open);

        shared.set_file_state(FileState::Closed);
        let join_start = Instant::now();
        thread.join();
        assert!(join_start.elapsed() < Duration::from_secs(1), "unload stalled past one backpressure sleep");
    }
}
