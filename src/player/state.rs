//! Lock-free shared player state and the command/event types that cross
//! the control-surface / decoder-thread boundary.
//!
//! All state read by the realtime audio callback lives here as atomics, so
//! the callback never takes a lock (§5: "the audio callback may NOT
//! suspend, allocate, take locks, or block on I/O").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, AtomicU64, Ordering};

/// File open/close life-cycle (I4: `Closed -> Opening -> Open -> Closed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FileState {
    #[default]
    Closed = 0,
    Opening = 1,
    Open = 2,
}

impl FileState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Opening,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// Decoder-side read state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReadState {
    #[default]
    Idle = 0,
    Seeking = 1,
    Loading = 2,
    Looping = 3,
}

impl ReadState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Seeking,
            2 => Self::Loading,
            3 => Self::Looping,
            _ => Self::Idle,
        }
    }
}

/// Callback-side play state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayState {
    #[default]
    Stopped = 0,
    Starting = 1,
    Playing = 2,
    Stopping = 3,
}

impl PlayState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Starting,
            2 => Self::Playing,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Resampler quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum SrcQuality {
    Fastest = 0,
    #[default]
    Medium = 1,
    Best = 2,
}

impl SrcQuality {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Fastest,
            2 => Self::Best,
            _ => Self::Medium,
        }
    }
}

/// Sentinel for "no note currently held" in `last_note`.
const NO_NOTE: i32 = -1;

/// Sentinel for "mix odd/even channels" in `track_a`/`track_b`.
pub const AUTO_TRACK: i32 = -1;

/// Per-player state shared between the control surface, the decoder
/// thread and the realtime audio callback. One instance per player slot,
/// always accessed through an `Arc`.
#[derive(Debug)]
pub struct PlayerShared {
    file_state: AtomicU8,
    read_state: AtomicU8,
    play_state: AtomicU8,
    loop_enabled: AtomicBool,
    gain_bits: AtomicU32,
    track_a: AtomicI32,
    track_b: AtomicI32,
    buffer_size: AtomicU32,
    buffer_count: AtomicU32,
    src_quality: AtomicU8,
    src_ratio_bits: AtomicU32,
    play_pos_frames: AtomicU64,
    frames_total: AtomicU64,
    pitch_shift: AtomicI32,
    pitch_bend: AtomicU32,
    last_note: AtomicI32,
    debug: AtomicBool,
}

impl Default for PlayerShared {
    fn default() -> Self {
        Self {
            file_state: AtomicU8::new(FileState::Closed as u8),
            read_state: AtomicU8::new(ReadState::Idle as u8),
            play_state: AtomicU8::new(PlayState::Stopped as u8),
            loop_enabled: AtomicBool::new(false),
            gain_bits: AtomicU32::new(1.0_f32.to_bits()),
            track_a: AtomicI32::new(AUTO_TRACK),
            track_b: AtomicI32::new(AUTO_TRACK),
            buffer_size: AtomicU32::new(4096),
            buffer_count: AtomicU32::new(4),
            src_quality: AtomicU8::new(SrcQuality::Medium as u8),
            src_ratio_bits: AtomicU32::new(1.0_f32.to_bits()),
            play_pos_frames: AtomicU64::new(0),
            frames_total: AtomicU64::new(0),
            pitch_shift: AtomicI32::new(0),
            pitch_bend: AtomicU32::new(8192),
            last_note: AtomicI32::new(NO_NOTE),
            debug: AtomicBool::new(false),
        }
    }
}

impl PlayerShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // `file_state`/`read_state`/`play_state` are the cross-thread
    // handshake words (§5 "Ordering"): the writer publishes with
    // `Release`, the reader observes with `Acquire`.

    pub fn file_state(&self) -> FileState {
        FileState::from_u8(self.file_state.load(Ordering::Acquire))
    }

    pub fn set_file_state(&self, state: FileState) {
        self.file_state.store(state as u8, Ordering::Release);
    }

    pub fn read_state(&self) -> ReadState {
        ReadState::from_u8(self.read_state.load(Ordering::Acquire))
    }

    pub fn set_read_state(&self, state: ReadState) {
        self.read_state.store(state as u8, Ordering::Release);
    }

    pub fn play_state(&self) -> PlayState {
        PlayState::from_u8(self.play_state.load(Ordering::Acquire))
    }

    pub fn set_play_state(&self, state: PlayState) {
        self.play_state.store(state as u8, Ordering::Release);
    }

    // Plain scalar fields: single machine word, no invariant coupling them
    // to another field, so relaxed ordering is sufficient (§5).

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain_bits.store(gain.clamp(0.0, 2.0).to_bits(), Ordering::Relaxed);
    }

    pub fn track_a(&self) -> i32 {
        self.track_a.load(Ordering::Relaxed)
    }

    pub fn set_track_a(&self, track: i32) {
        self.track_a.store(track, Ordering::Relaxed);
    }

    pub fn track_b(&self) -> i32 {
        self.track_b.load(Ordering::Relaxed)
    }

    pub fn set_track_b(&self, track: i32) {
        self.track_b.store(track, Ordering::Relaxed);
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size.load(Ordering::Relaxed) as usize
    }

    pub fn set_buffer_size(&self, size: usize) {
        self.buffer_size.store(size as u32, Ordering::Relaxed);
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count.load(Ordering::Relaxed) as usize
    }

    pub fn set_buffer_count(&self, count: usize) {
        self.buffer_count.store(count as u32, Ordering::Relaxed);
    }

    pub fn src_quality(&self) -> SrcQuality {
        SrcQuality::from_u8(self.src_quality.load(Ordering::Relaxed))
    }

    pub fn set_src_quality(&self, quality: SrcQuality) {
        self.src_quality.store(quality as u8, Ordering::Relaxed);
    }

    pub fn src_ratio(&self) -> f32 {
        f32::from_bits(self.src_ratio_bits.load(Ordering::Relaxed))
    }

    pub fn set_src_ratio(&self, ratio: f32) {
        self.src_ratio_bits.store(ratio.to_bits(), Ordering::Relaxed);
    }

    // `play_pos_frames` is written by the callback during playback and by
    // the control surface on seek; the `Seeking` handshake makes these
    // mutually exclusive (§5), so relaxed is sufficient here too.

    pub fn play_pos_frames(&self) -> u64 {
        self.play_pos_frames.load(Ordering::Relaxed)
    }

    pub fn set_play_pos_frames(&self, frames: u64) {
        self.play_pos_frames.store(frames, Ordering::Relaxed);
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total.load(Ordering::Relaxed)
    }

    pub fn set_frames_total(&self, frames: u64) {
        self.frames_total.store(frames, Ordering::Relaxed);
    }

    pub fn pitch_shift(&self) -> i32 {
        self.pitch_shift.load(Ordering::Relaxed)
    }

    pub fn set_pitch_shift(&self, semitones: i32) {
        self.pitch_shift.store(semitones, Ordering::Relaxed);
    }

    /// 14-bit MIDI pitch-bend value (0..16383, centre 8192). Captured but
    /// not applied to live playback (§9 open question).
    pub fn pitch_bend(&self) -> u16 {
        self.pitch_bend.load(Ordering::Relaxed) as u16
    }

    pub fn set_pitch_bend(&self, value: u16) {
        self.pitch_bend.store(value as u32, Ordering::Relaxed);
    }

    pub fn last_note(&self) -> Option<u8> {
        let n = self.last_note.load(Ordering::Relaxed);
        if n < 0 { None } else { Some(n as u8) }
    }

    pub fn set_last_note(&self, note: Option<u8>) {
        self.last_note
            .store(note.map(|n| n as i32).unwrap_or(NO_NOTE), Ordering::Relaxed);
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state() {
        let s = PlayerShared::new();
        assert_eq!(s.file_state(), FileState::Closed);
        assert_eq!(s.read_state(), ReadState::Idle);
        assert_eq!(s.play_state(), PlayState::Stopped);
        assert_eq!(s.last_note(), None);
        assert_eq!(s.gain(), 1.0);
    }

    #[test]
    fn gain_is_clamped() {
        let s = PlayerShared::new();
        s.set_gain(5.0);
        assert_eq!(s.gain(), 2.0);
        s.set_gain(-1.0);
        assert_eq!(s.gain(), 0.0);
    }

    #[test]
    fn last_note_roundtrip() {
        let s = PlayerShared::new();
        s.set_last_note(Some(72));
        assert_eq!(s.last_note(), Some(72));
        s.set_last_note(None);
        assert_eq!(s.last_note(), None);
    }

    #[test]
    fn state_transitions_roundtrip() {
        let s = PlayerShared::new();
        s.set_file_state(FileState::Opening);
        assert_eq!(s.file_state(), FileState::Opening);
        s.set_read_state(ReadState::Seeking);
        assert_eq!(s.read_state(), ReadState::Seeking);
        s.set_play_state(PlayState::Starting);
        assert_eq!(s.play_state(), PlayState::Starting);
    }
}
