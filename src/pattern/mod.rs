//! Step-sequencer pattern core: [`StepEvent`], [`Pattern`] and [`PatternIndex`].
//!
//! This tree owns the event model, quantization/swing/humanisation fields,
//! edit operations and undo/redo snapshot stack. It has no notion of a
//! transport, a bank/sequence hierarchy, or a MIDI backend — a sequencer
//! built on top reads patterns under its own discipline (§5 of the design
//! document).

mod event;
mod index;
mod pattern;

pub use event::{Command, StepEvent};
pub use index::{PatternId, PatternIndex};
pub use pattern::Pattern;

/// Pulses per quarter note: the tick resolution of the sequencer's musical
/// time. A step is `PPQN / steps_per_beat` clock ticks.
pub const PPQN: u32 = 24;

/// Upper bound on a note's stutter (intra-note retrigger) count.
pub const MAX_STUTTER_COUNT: u8 = 255;

/// Upper bound on a stutter retrigger's duration, in clock ticks.
pub const MAX_STUTTER_DUR: u8 = 255;
