//! The audio-graph client: a per-player external collaborator (§6).
//!
//! The real backend (JACK or equivalent) is explicitly out of scope; this
//! trait exposes exactly the register/activate/close surface a realtime
//! audio-graph host needs, so the `process()` path stays testable without
//! hardware.

use crate::error::Result;
use crate::player::midi::MidiEvent;

/// Per-period process callback: fill `bus_a`/`bus_b` (same length) for
/// the MIDI events routed to this player this period. Takes
/// caller-owned output slices rather than returning `Vec`s so the
/// realtime path never allocates (§5).
pub type ProcessCallback = Box<dyn FnMut(&mut [f32], &mut [f32], &[MidiEvent]) + Send>;

/// Sample-rate change callback, invoked if the graph's rate changes after
/// activation.
pub type SampleRateCallback = Box<dyn Fn(u32) + Send>;

/// One audio-graph client per player: two output streams (bus A, bus B)
/// and one MIDI input stream.
pub trait AudioGraphClient {
    fn register_client(&mut self, name: &str) -> Result<()>;
    fn register_output_stream(&mut self, name: &str) -> Result<()>;
    fn register_midi_input_stream(&mut self, name: &str) -> Result<()>;
    fn set_process_callback(&mut self, callback: ProcessCallback) -> Result<()>;
    fn set_samplerate_callback(&mut self, callback: SampleRateCallback) -> Result<()>;
    fn activate(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    /// The graph's current sample rate, available once activated.
    fn sample_rate(&self) -> u32;

    /// Downcast support for tests that need to drive a concrete client
    /// (namely `NullGraphClient::run_process`) through the trait object
    /// `Player` stores it behind.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
