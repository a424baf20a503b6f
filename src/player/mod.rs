//! The streaming audio-file player (§2, §3.1, §4.1–§4.6).
//!
//! Three threads of control meet here: the non-realtime control surface
//! ([`Player`], driven by whatever owns a [`PlayerHandle`]), the decoder
//! thread ([`decoder_thread`], one per open file), and the realtime audio
//! callback ([`ProcessState`], driven by an [`AudioGraphClient`]). All
//! three talk only through [`state::PlayerShared`]'s atomics and the
//! [`ring_buffer::RingBufferPair`] — never a lock, matching §5.

pub mod audio_graph;
pub mod cpal_backend;
mod decoder;
mod decoder_thread;
mod demux;
pub mod midi;
pub mod notifier;
mod registry;
mod resampler;
mod ring_buffer;
pub mod state;

pub use audio_graph::{AudioGraphClient, ProcessCallback, SampleRateCallback};
pub use cpal_backend::{CpalGraphClient, NullGraphClient};
pub use midi::{MidiAction, MidiEvent};
pub use notifier::{ChangeThresholds, ChannelNotifier, NotifyKind, Notification, Notifier, NullNotifier};
pub use registry::{PlayerHandle, PlayerRegistry};
pub use state::{AUTO_TRACK, FileState, PlayState, PlayerShared, ReadState, SrcQuality};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer as RawRingBuffer};

use crate::error::{Error, Result};
use decoder_thread::DecoderThread;
use ring_buffer::{RingBufferPair, RingReader, RingWriter};

/// How long `load()` polls for the decoder to leave `Opening` before
/// giving up waiting and reporting whatever state it settled in (§9: no
/// hard timeout on `load`, so this bounds only the *poll loop's CPU use*,
/// not whether the caller gets an answer — it always returns once the
/// decoder actually settles).
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Owns the player table (§9 redesign note: "encapsulate global player
/// table ... as a value; pass it by reference").
pub struct PlayerHost {
    registry: PlayerRegistry<Player>,
    max_players: usize,
}

impl PlayerHost {
    pub fn new(max_players: usize) -> Self {
        Self { registry: PlayerRegistry::new(max_players), max_players }
    }

    pub fn with_shutdown_hook(max_players: usize, hook: impl FnMut() + Send + 'static) -> Self {
        Self { registry: PlayerRegistry::with_shutdown_hook(max_players, hook), max_players }
    }

    /// §4.3 `create()`. Builds and activates the audio-graph client before
    /// reserving a slot, so a registration failure never leaves a
    /// half-built player in the table.
    pub fn create(&mut self, name: &str, graph: Box<dyn AudioGraphClient>) -> Result<PlayerHandle> {
        if !self.registry.has_free_slot() {
            return Err(Error::NoFreeSlot(self.max_players));
        }
        let player = Player::activate(name, graph)?;
        self.registry.insert(player)
    }

    /// §4.3 `remove()`: stop, unload, close the client, free the slot.
    /// Runs the registry's shutdown hook if this was the last player.
    pub fn remove(&mut self, handle: PlayerHandle) -> Result<()> {
        {
            let player = self.registry.get_mut(handle)?;
            player.stop();
            player.unload();
            player.graph.close()?;
        }
        self.registry.remove(handle)?;
        Ok(())
    }

    pub fn get(&self, handle: PlayerHandle) -> Result<&Player> {
        self.registry.get(handle)
    }

    pub fn get_mut(&mut self, handle: PlayerHandle) -> Result<&mut Player> {
        self.registry.get_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// The non-realtime control surface for one player slot (§4.3).
pub struct Player {
    shared: Arc<PlayerShared>,
    graph: Box<dyn AudioGraphClient>,
    decoder: Option<DecoderThread>,
    reader_handoff: Producer<Option<RingReader>>,
    midi_cc_enabled: Arc<AtomicBool>,
    output_sample_rate: u32,
    path: Option<PathBuf>,
}

impl Player {
    /// §4.3 `create()`'s audio-graph half: register the client, two
    /// output streams, one MIDI-input stream, install the process and
    /// sample-rate callbacks, and activate. No file is open yet.
    fn activate(name: &str, mut graph: Box<dyn AudioGraphClient>) -> Result<Self> {
        let shared = PlayerShared::new();
        let midi_cc_enabled = Arc::new(AtomicBool::new(true));

        graph.register_client(name)?;
        graph.register_output_stream(&format!("{name}-a"))?;
        graph.register_output_stream(&format!("{name}-b"))?;
        graph.register_midi_input_stream(&format!("{name}-midi"))?;

        // Single-slot lock-free handoff from `load`/`unload` to the
        // realtime callback, reusing rtrb (generic over any `Send` type,
        // not just samples) instead of a lock for this rare swap.
        let (reader_handoff, handoff_consumer) = RawRingBuffer::<Option<RingReader>>::new(8);

        let mut process_state = ProcessState {
            shared: Arc::clone(&shared),
            handoff: handoff_consumer,
            reader: None,
            midi_cc_enabled: Arc::clone(&midi_cc_enabled),
        };
        graph.set_process_callback(Box::new(move |bus_a, bus_b, midi| {
            process_state.process(bus_a, bus_b, midi);
        }))?;

        // `Player` reads the sample rate fresh from `graph` right after
        // `activate()` below, so the callback itself has nothing to do.
        graph.set_samplerate_callback(Box::new(|_rate| {}))?;

        graph.activate()?;
        let output_sample_rate = graph.sample_rate();

        Ok(Self {
            shared,
            graph,
            decoder: None,
            reader_handoff,
            midi_cc_enabled,
            output_sample_rate,
            path: None,
        })
    }

    pub fn handle_state(&self) -> FileState {
        self.shared.file_state()
    }

    pub fn play_state(&self) -> PlayState {
        self.shared.play_state()
    }

    /// §4.3 `load()`: unload first, spawn a fresh decoder, poll until it
    /// leaves `Opening`.
    pub fn load(&mut self, path: impl AsRef<Path>, notifier: Arc<dyn Notifier>) -> Result<()> {
        self.unload();

        let path = path.as_ref().to_path_buf();
        self.shared.set_file_state(FileState::Opening);

        let capacity = self.shared.buffer_size() * self.shared.buffer_count();
        let (writer, reader) = RingBufferPair::new(capacity);
        if self.reader_handoff.push(Some(reader)).is_err() {
            tracing::warn!(target: "player::commands", "reader handoff full, dropping stale entry");
        }

        self.decoder = Some(DecoderThread::spawn(
            path.clone(),
            Arc::clone(&self.shared),
            writer,
            notifier,
            self.output_sample_rate,
        ));
        self.path = Some(path);

        while self.shared.file_state() == FileState::Opening {
            std::thread::sleep(LOAD_POLL_INTERVAL);
        }

        if self.shared.file_state() == FileState::Open {
            Ok(())
        } else {
            Err(Error::UnsupportedFormat("decoder failed to open file".to_string()))
        }
    }

    /// §4.3 `unload()`: stop playback, close the file, join the decoder.
    pub fn unload(&mut self) {
        self.shared.set_play_state(PlayState::Stopped);
        self.shared.set_file_state(FileState::Closed);
        if let Some(decoder) = self.decoder.take() {
            decoder.join();
        }
        let _ = self.reader_handoff.push(None);
        self.path = None;
    }

    /// §4.3 `start()`: only valid when `Open` and not already `Playing`.
    pub fn start(&self) {
        try_start(&self.shared);
    }

    /// §4.3 `stop()`: any non-`Stopped` state moves to `Stopping`.
    pub fn stop(&self) {
        try_stop(&self.shared);
    }

    /// §4.3 `set_position`: clamp to duration, convert to output-rate
    /// frames, reset the rings and request a reseek.
    pub fn set_position(&self, seconds: f32) {
        let frames_total = self.shared.frames_total();
        if frames_total == 0 {
            return;
        }
        // `src_ratio = output_sample_rate / file_samplerate`, so
        // `src_ratio * seconds * file_samplerate` reduces to
        // `seconds * output_sample_rate` directly.
        let target = (seconds as f64 * self.output_sample_rate as f64) as u64;
        self.shared.set_play_pos_frames(target.min(frames_total.saturating_sub(1)));
        self.shared.set_read_state(ReadState::Seeking);
    }

    /// §4.3 `get_position`.
    pub fn get_position(&self) -> f32 {
        decoder_thread::position_seconds(&self.shared, self.output_sample_rate)
    }

    pub fn set_gain(&self, gain: f32) {
        self.shared.set_gain(gain);
    }

    pub fn gain(&self) -> f32 {
        self.shared.gain()
    }

    /// Track-selection changes trigger a re-seek to the current position
    /// so freshly enqueued samples reflect the new routing (§4.3).
    pub fn set_track_a(&self, track: i32) {
        self.shared.set_track_a(track);
        self.reseek_to_current_position();
    }

    pub fn set_track_b(&self, track: i32) {
        self.shared.set_track_b(track);
        self.reseek_to_current_position();
    }

    fn reseek_to_current_position(&self) {
        if self.shared.file_state() == FileState::Open {
            self.shared.set_read_state(ReadState::Seeking);
        }
    }

    pub fn set_loop(&self, enabled: bool) {
        self.shared.set_loop_enabled(enabled);
    }

    pub fn set_src_quality(&self, quality: SrcQuality) {
        self.shared.set_src_quality(quality);
    }

    /// `buffer_size`/`buffer_count` are only honored while `Closed` (§3.1).
    pub fn set_buffer_size(&self, size: usize) -> Result<()> {
        if self.shared.file_state() != FileState::Closed {
            return Err(Error::invalid_argument("buffer_size is only mutable while closed"));
        }
        self.shared.set_buffer_size(size);
        Ok(())
    }

    pub fn set_buffer_count(&self, count: usize) -> Result<()> {
        if count < 2 {
            return Err(Error::invalid_argument("buffer_count must be >= 2"));
        }
        if self.shared.file_state() != FileState::Closed {
            return Err(Error::invalid_argument("buffer_count is only mutable while closed"));
        }
        self.shared.set_buffer_count(count);
        Ok(())
    }

    /// Gates CC routing in §4.6 ("when MIDI CC routing is enabled").
    /// Not named explicitly among §4.3's operations, but the gate has to
    /// be controllable from somewhere; this is the natural home.
    pub fn set_midi_cc_enabled(&self, enabled: bool) {
        self.midi_cc_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    pub fn shared(&self) -> &Arc<PlayerShared> {
        &self.shared
    }
}

fn try_start(shared: &PlayerShared) {
    if shared.file_state() == FileState::Open && shared.play_state() != PlayState::Playing {
        shared.set_play_state(PlayState::Starting);
    }
}

fn try_stop(shared: &PlayerShared) {
    if shared.play_state() != PlayState::Stopped {
        shared.set_play_state(PlayState::Stopping);
    }
}

/// Captured by the realtime process callback (§4.4). Owns the consumer
/// half of the ring pair and never touches anything but atomics and
/// lock-free pops once built.
struct ProcessState {
    shared: Arc<PlayerShared>,
    handoff: Consumer<Option<RingReader>>,
    reader: Option<RingReader>,
    midi_cc_enabled: Arc<AtomicBool>,
}

impl ProcessState {
    fn process(&mut self, bus_a: &mut [f32], bus_b: &mut [f32], midi: &[MidiEvent]) {
        while let Ok(update) = self.handoff.pop() {
            self.reader = update;
        }

        for s in bus_a.iter_mut() {
            *s = 0.0;
        }
        for s in bus_b.iter_mut() {
            *s = 0.0;
        }

        if self.shared.file_state() != FileState::Open {
            return;
        }

        if self.shared.play_state() == PlayState::Starting && self.shared.read_state() != ReadState::Seeking {
            self.shared.set_play_state(PlayState::Playing);
        }

        let play_state = self.shared.play_state();
        let producing = matches!(play_state, PlayState::Playing | PlayState::Stopping);
        let produced = if producing {
            self.reader.as_mut().map(|r| r.read_into(bus_a, bus_b)).unwrap_or(0)
        } else {
            0
        };

        let gain = self.shared.gain();
        for s in bus_a[..produced].iter_mut() {
            *s *= gain;
        }
        for s in bus_b[..produced].iter_mut() {
            *s *= gain;
        }

        let frames_total = self.shared.frames_total();
        if frames_total > 0 && produced > 0 {
            let pos = self.shared.play_pos_frames();
            self.shared.set_play_pos_frames((pos + produced as u64) % frames_total);
        }

        let natural_eof = play_state == PlayState::Playing
            && self.shared.read_state() == ReadState::Idle
            && self.reader.as_ref().map(|r| r.read_space() == 0).unwrap_or(true);

        if play_state == PlayState::Stopping || natural_eof {
            soft_mute(&mut bus_a[..produced]);
            soft_mute(&mut bus_b[..produced]);
            self.shared.set_play_state(PlayState::Stopped);
            if natural_eof {
                self.shared.set_play_pos_frames(0);
                self.shared.set_read_state(ReadState::Seeking);
            }
        }

        self.process_midi(midi);
    }

    fn process_midi(&mut self, midi: &[MidiEvent]) {
        let midi_cc_enabled = self.midi_cc_enabled.load(Ordering::Relaxed);
        for event in midi {
            let last_note = self.shared.last_note();
            if let Some(action) = midi::classify(event, last_note, midi_cc_enabled) {
                self.apply_midi_action(action);
            }
        }
    }

    fn apply_midi_action(&mut self, action: MidiAction) {
        match action {
            MidiAction::StopAndClear => {
                try_stop(&self.shared);
                self.shared.set_pitch_shift(0);
                self.shared.set_last_note(None);
            }
            MidiAction::TriggerNote { note, pitch_shift } => {
                self.shared.set_pitch_shift(pitch_shift);
                self.shared.set_play_pos_frames(0);
                self.shared.set_read_state(ReadState::Seeking);
                self.shared.set_play_state(PlayState::Starting);
                self.shared.set_last_note(Some(note));
            }
            MidiAction::CapturePitchBend { value } => {
                // Not applied to live playback — §9 open question; a
                // live-retune would multiply `src_ratio` by the bend's
                // semitone offset right here.
                self.shared.set_pitch_bend(value);
            }
            MidiAction::CcPosition { fraction } => {
                let frames_total = self.shared.frames_total();
                if frames_total > 0 {
                    let target = (frames_total as f32 * fraction) as u64;
                    self.shared.set_play_pos_frames(target.min(frames_total - 1));
                    self.shared.set_read_state(ReadState::Seeking);
                }
            }
            MidiAction::CcGain { gain } => self.shared.set_gain(gain),
            MidiAction::CcTransportToggle { engage } => {
                if engage {
                    try_start(&self.shared);
                } else {
                    try_stop(&self.shared);
                }
            }
            MidiAction::CcLoopToggle { enable } => self.shared.set_loop_enabled(enable),
        }
    }
}

/// Linear fade 1→0 across the buffer (§4.4 step 7, glossary "soft-mute").
fn soft_mute(buf: &mut [f32]) {
    let n = buf.len();
    if n == 0 {
        return;
    }
    for (i, s) in buf.iter_mut().enumerate() {
        *s *= 1.0 - (i as f32 / n as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    fn write_sine_wav(path: &Path, sample_rate: u32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (sample_rate as f32 * seconds) as u32;
        for i in 0..total {
            let v = ((i as f32 / sample_rate as f32 * 440.0 * std::f32::consts::TAU).sin() * 10000.0) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn new_host_with_player(max_players: usize) -> (PlayerHost, PlayerHandle) {
        let mut host = PlayerHost::new(max_players);
        let graph = Box::new(NullGraphClient::new(8000));
        let handle = host.create("test", graph).unwrap();
        (host, handle)
    }

    #[test]
    fn create_fails_past_capacity() {
        let mut host = PlayerHost::new(1);
        host.create("a", Box::new(NullGraphClient::new(8000))).unwrap();
        let err = host.create("b", Box::new(NullGraphClient::new(8000))).unwrap_err();
        assert!(matches!(err, Error::NoFreeSlot(1)));
    }

    #[test]
    fn load_and_play_drains_into_process_callback() {
        let (mut host, handle) = new_host_with_player(4);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 1.0);

        let player = host.get_mut(handle).unwrap();
        player.set_buffer_size(256).unwrap();
        player.load(&path, Arc::new(NullNotifier)).unwrap();
        assert_eq!(player.handle_state(), FileState::Open);

        player.start();

        // Wait for the decoder to actually produce into the ring before
        // pumping the realtime callback.
        let start = StdInstant::now();
        while player.shared.read_state() != ReadState::Idle && start.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(5));
        }

        let mut bus_a = [0.0f32; 64];
        let mut bus_b = [0.0f32; 64];
        let null_client: &mut NullGraphClient = player
            .graph
            .as_any_mut()
            .downcast_mut::<NullGraphClient>()
            .expect("test builds players against NullGraphClient");
        null_client.run_process(&mut bus_a, &mut bus_b, &[]);

        assert_eq!(player.play_state(), PlayState::Playing);
        assert!(bus_a.iter().any(|&s| s != 0.0), "expected decoded samples on bus A");
        assert_eq!(bus_a, bus_b, "mono fixture should route identically to both buses");

        player.unload();
        assert_eq!(player.handle_state(), FileState::Closed);
    }

    #[test]
    fn set_buffer_size_rejected_while_open() {
        let (mut host, handle) = new_host_with_player(4);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 0.2);

        let player = host.get_mut(handle).unwrap();
        player.load(&path, Arc::new(NullNotifier)).unwrap();
        assert!(player.set_buffer_size(1024).is_err());
        player.unload();
        assert!(player.set_buffer_size(1024).is_ok());
    }

    #[test]
    fn remove_runs_shutdown_hook_when_registry_empties() {
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let mut host = PlayerHost::with_shutdown_hook(2, move || {
            calls_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });
        let h = host.create("solo", Box::new(NullGraphClient::new(8000))).unwrap();
        host.remove(h).unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn removed_handle_is_bad_handle() {
        let mut host = PlayerHost::new(2);
        let h = host.create("solo", Box::new(NullGraphClient::new(8000))).unwrap();
        host.remove(h).unwrap();
        assert!(host.get(h).is_err());
    }
}
