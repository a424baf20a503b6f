//! Realtime streaming audio-file player and step-sequencer pattern core
//! for a standalone instrument.
//!
//! Two independent trees share this crate: [`player`] (decode thread,
//! ring buffers, realtime audio callback, per-slot control surface) and
//! [`pattern`] (step events, quantization/swing/humanisation, undo/redo).
//! Neither depends on the other; a sequencer built on top wires MIDI
//! output from `pattern` into a `player`'s MIDI input per its own
//! discipline.

pub mod config;
pub mod error;
pub mod pattern;
pub mod player;

/// Install a `tracing` subscriber reading `RUST_LOG` (default `info`),
/// writing to stderr. Convenience for binaries embedding this crate;
/// library code should never call this itself.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
