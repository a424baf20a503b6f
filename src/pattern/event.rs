//! A single step event within a [`crate::pattern::Pattern`].

use serde::{Deserialize, Serialize};

/// The kind of MIDI-like event a [`StepEvent`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// A note-on, with `value1` the note number and `value2` the velocity.
    NoteOn,
    /// A continuous controller event, with `value1` the controller number.
    Control,
    /// A program-change event, with `value1` the program number.
    ProgramChange,
}

/// Default per-event play chance (percent) applied to freshly created notes.
pub const DEFAULT_PLAY_CHANCE: u8 = 100;

/// Default stutter duration (ticks) applied to freshly created notes.
pub const DEFAULT_STUTTER_DUR: u8 = 1;

/// One event within a pattern's step grid.
///
/// `value1`/`value2` each carry a start and end value: for a note-on, only
/// the start halves are meaningful (note, velocity); CC events ramp from
/// `value2_start` to `value2_end` over `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    position: u32,
    command: Command,
    value1_start: u8,
    value1_end: u8,
    value2_start: u8,
    value2_end: u8,
    duration: f32,
    offset: f32,
    stutter_count: u8,
    stutter_dur: u8,
    play_chance: u8,
}

impl StepEvent {
    /// Create a new event. `value1_end`/`value2_end` default to the start
    /// values; stutter defaults to none (count 0, dur 1); play chance
    /// defaults to always (100).
    pub fn new(
        position: u32,
        command: Command,
        value1: u8,
        value2: u8,
        duration: f32,
        offset: f32,
    ) -> Self {
        Self {
            position,
            command,
            value1_start: value1,
            value1_end: value1,
            value2_start: value2,
            value2_end: value2,
            duration,
            offset,
            stutter_count: 0,
            stutter_dur: DEFAULT_STUTTER_DUR,
            play_chance: DEFAULT_PLAY_CHANCE,
        }
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn value1_start(&self) -> u8 {
        self.value1_start
    }

    pub fn set_value1_start(&mut self, value: u8) {
        self.value1_start = value;
    }

    pub fn value1_end(&self) -> u8 {
        self.value1_end
    }

    pub fn set_value1_end(&mut self, value: u8) {
        self.value1_end = value;
    }

    pub fn value2_start(&self) -> u8 {
        self.value2_start
    }

    pub fn set_value2_start(&mut self, value: u8) {
        self.value2_start = value;
    }

    pub fn value2_end(&self) -> u8 {
        self.value2_end
    }

    pub fn set_value2_end(&mut self, value: u8) {
        self.value2_end = value;
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset.clamp(0.0, 0.99);
    }

    pub fn stutter_count(&self) -> u8 {
        self.stutter_count
    }

    pub fn set_stutter_count(&mut self, count: u8) {
        self.stutter_count = count;
    }

    pub fn stutter_dur(&self) -> u8 {
        self.stutter_dur
    }

    pub fn set_stutter_dur(&mut self, dur: u8) {
        self.stutter_dur = dur;
    }

    pub fn play_chance(&self) -> u8 {
        self.play_chance
    }

    pub fn set_play_chance(&mut self, chance: u8) {
        self.play_chance = chance.min(100);
    }

    /// Whether the half-open range `[position, position+duration)` overlaps
    /// `[other_start, other_start+other_duration)`.
    pub(crate) fn overlaps(&self, other_start: u32, other_duration: f32) -> bool {
        let event_start = other_start as f32;
        let event_end = event_start + other_duration;
        let check_start = self.position as f32;
        let check_end = check_start + self.duration;
        (check_start >= event_start && check_start < event_end)
            || (check_end > event_start && check_end <= event_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_defaults() {
        let ev = StepEvent::new(0, Command::NoteOn, 60, 100, 1.0, 0.0);
        assert_eq!(ev.value1_start(), 60);
        assert_eq!(ev.value1_end(), 60);
        assert_eq!(ev.stutter_count(), 0);
        assert_eq!(ev.stutter_dur(), 1);
        assert_eq!(ev.play_chance(), 100);
    }

    #[test]
    fn offset_is_clamped() {
        let mut ev = StepEvent::new(0, Command::NoteOn, 60, 100, 1.0, 0.0);
        ev.set_offset(5.0);
        assert_eq!(ev.offset(), 0.99);
        ev.set_offset(-1.0);
        assert_eq!(ev.offset(), 0.0);
    }

    #[test]
    fn overlap_detects_adjacent_ranges_as_non_overlapping() {
        let ev = StepEvent::new(0, Command::NoteOn, 60, 100, 2.0, 0.0);
        assert!(!ev.overlaps(2, 1.0));
        assert!(ev.overlaps(1, 1.0));
    }
}
