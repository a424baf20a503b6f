//! Pattern: an ordered sequence of step events plus pattern-wide musical
//! parameters and an undo/redo snapshot stack.

use crate::error::{Error, Result};
use crate::pattern::event::{Command, StepEvent};
use crate::pattern::{MAX_STUTTER_COUNT, MAX_STUTTER_DUR, PPQN};

/// Steps-per-beat values a pattern may be quantized to.
const VALID_STEPS_PER_BEAT: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 24];

/// An ordered sequence of [`StepEvent`]s with pattern-wide musical
/// parameters and an undo/redo snapshot stack.
#[derive(Debug, Clone)]
pub struct Pattern {
    beats: u32,
    steps_per_beat: u32,
    scale: u8,
    tonic: u8,
    ref_note: u8,
    quantize_notes: bool,
    swing_div: u32,
    swing_amount: f32,
    human_time: f32,
    human_velo: f32,
    play_chance: f32,
    zoom: u32,
    events: Vec<StepEvent>,
    snapshots: Vec<Vec<StepEvent>>,
    snapshot_pos: usize,
}

impl Pattern {
    /// Create a pattern with `beats` beats and `steps_per_beat` quantization.
    /// An invalid `steps_per_beat` (not one of 1,2,3,4,6,8,12,24) falls back
    /// to 4 rather than being silently accepted.
    pub fn new(beats: u32, steps_per_beat: u32) -> Self {
        let steps_per_beat = if VALID_STEPS_PER_BEAT.contains(&steps_per_beat) {
            steps_per_beat
        } else {
            4
        };
        let mut pattern = Self {
            beats: beats.max(1),
            steps_per_beat,
            scale: 0,
            tonic: 0,
            ref_note: 60,
            quantize_notes: false,
            swing_div: 0,
            swing_amount: 0.0,
            human_time: 0.0,
            human_velo: 0.0,
            play_chance: 1.0,
            zoom: 1,
            events: Vec::new(),
            snapshots: Vec::new(),
            snapshot_pos: 0,
        };
        pattern.reset_snapshots();
        pattern
    }

    // ---- event insertion/removal (§4.7) ----

    fn add_event(
        &mut self,
        position: u32,
        command: Command,
        value1: u8,
        value2: u8,
        duration: f32,
        offset: f32,
    ) -> usize {
        let mut stutter_count = 0u8;
        let mut stutter_dur = 1u8;
        let mut captured = false;

        self.events.retain(|ev| {
            let overlaps = ev.overlaps(position, duration);
            let matches = overlaps && ev.command() == command && ev.value1_start() == value1;
            if matches {
                if !captured {
                    stutter_count = ev.stutter_count();
                    stutter_dur = ev.stutter_dur();
                    captured = true;
                }
                false
            } else {
                true
            }
        });

        let idx = self
            .events
            .iter()
            .position(|ev| ev.position() > position)
            .unwrap_or(self.events.len());

        let mut new_event = StepEvent::new(position, command, value1, value2, duration, offset);
        new_event.set_stutter_count(stutter_count);
        new_event.set_stutter_dur(stutter_dur);
        self.events.insert(idx, new_event);
        idx
    }

    fn delete_event(&mut self, position: u32, command: Command, value1: u8) -> bool {
        if let Some(idx) = self
            .events
            .iter()
            .position(|ev| ev.position() == position && ev.command() == command && ev.value1_start() == value1)
        {
            self.events.remove(idx);
            true
        } else {
            false
        }
    }

    /// Add a note-on event. Rejects an out-of-range step, note or velocity
    /// without mutating the pattern.
    pub fn add_note(&mut self, step: u32, note: u8, velocity: u8, duration: f32, offset: f32) -> Result<()> {
        if step >= self.steps() {
            return Err(Error::invalid_argument(format!("step {step} out of range")));
        }
        if note > 127 {
            return Err(Error::invalid_argument(format!("note {note} out of range")));
        }
        if velocity > 127 {
            return Err(Error::invalid_argument(format!("velocity {velocity} out of range")));
        }
        self.add_event(step, Command::NoteOn, note, velocity, duration, offset);
        Ok(())
    }

    /// Remove the note-on event at `(step, note)`, if present.
    pub fn remove_note(&mut self, step: u32, note: u8) {
        self.delete_event(step, Command::NoteOn, note);
    }

    /// The step at which the note sounding at `step` actually started, or
    /// `None` if no note-on at `note` covers `step`.
    pub fn note_start(&self, step: u32, note: u8) -> Option<u32> {
        self.events.iter().find_map(|ev| {
            let covers = ev.position() <= step
                && (ev.position() as f32 + ev.duration()).ceil() as u32 > step;
            if covers && ev.command() == Command::NoteOn && ev.value1_start() == note {
                Some(ev.position())
            } else {
                None
            }
        })
    }

    pub fn note_velocity(&self, step: u32, note: u8) -> u8 {
        self.find_note(step, note).map(|ev| ev.value2_start()).unwrap_or(0)
    }

    pub fn set_note_velocity(&mut self, step: u32, note: u8, velocity: u8) -> Result<()> {
        if velocity > 127 {
            return Err(Error::invalid_argument(format!("velocity {velocity} out of range")));
        }
        if let Some(ev) = self.find_note_mut(step, note) {
            ev.set_value2_start(velocity);
        }
        Ok(())
    }

    pub fn note_duration(&self, step: u32, note: u8) -> f32 {
        if step >= self.steps() {
            return 0.0;
        }
        self.find_note(step, note).map(|ev| ev.duration()).unwrap_or(0.0)
    }

    pub fn note_offset(&self, step: u32, note: u8) -> f32 {
        self.find_note(step, note).map(|ev| ev.offset()).unwrap_or(0.0)
    }

    pub fn set_note_offset(&mut self, step: u32, note: u8, offset: f32) {
        if let Some(ev) = self.find_note_mut(step, note) {
            ev.set_offset(offset);
        }
    }

    /// Set stutter (intra-note retrigger) on a note, only if the note's
    /// duration can accommodate `count` retriggers of `dur` ticks each.
    pub fn set_stutter(&mut self, step: u32, note: u8, count: u8, dur: u8) {
        if let Some(ev) = self.find_note_mut(step, note) {
            if ev.duration() > (count as f32) * (dur as f32) {
                ev.set_stutter_count(count);
                ev.set_stutter_dur(dur);
            }
        }
    }

    pub fn stutter_count(&self, step: u32, note: u8) -> u8 {
        self.find_note(step, note).map(|ev| ev.stutter_count()).unwrap_or(0)
    }

    pub fn set_stutter_count(&mut self, step: u32, note: u8, count: u8) -> Result<()> {
        if count > MAX_STUTTER_COUNT {
            return Err(Error::invalid_argument(format!("stutter count {count} out of range")));
        }
        if let Some(ev) = self.find_note_mut(step, note) {
            ev.set_stutter_count(count);
        }
        Ok(())
    }

    pub fn stutter_dur(&self, step: u32, note: u8) -> u8 {
        self.find_note(step, note).map(|ev| ev.stutter_dur()).unwrap_or(1)
    }

    pub fn set_stutter_dur(&mut self, step: u32, note: u8, dur: u8) -> Result<()> {
        if dur > MAX_STUTTER_DUR {
            return Err(Error::invalid_argument(format!("stutter dur {dur} out of range")));
        }
        if let Some(ev) = self.find_note_mut(step, note) {
            ev.set_stutter_dur(dur);
        }
        Ok(())
    }

    /// Per-note play chance (percent), distinct from the pattern-wide
    /// [`Pattern::play_chance`].
    pub fn play_chance_at(&self, step: u32, note: u8) -> u8 {
        self.find_note(step, note).map(|ev| ev.play_chance()).unwrap_or(100)
    }

    pub fn set_play_chance_at(&mut self, step: u32, note: u8, chance: u8) {
        if let Some(ev) = self.find_note_mut(step, note) {
            ev.set_play_chance(chance.min(100));
        }
    }

    fn find_note(&self, step: u32, note: u8) -> Option<&StepEvent> {
        self.events
            .iter()
            .find(|ev| ev.position() == step && ev.command() == Command::NoteOn && ev.value1_start() == note)
    }

    fn find_note_mut(&mut self, step: u32, note: u8) -> Option<&mut StepEvent> {
        self.events
            .iter_mut()
            .find(|ev| ev.position() == step && ev.command() == Command::NoteOn && ev.value1_start() == note)
    }

    // ---- program change / control ----

    /// Add (or replace) the program-change event at `step`.
    pub fn add_program_change(&mut self, step: u32, program: u8) -> Result<()> {
        if step >= self.steps() || program > 127 {
            return Err(Error::invalid_argument("invalid program change"));
        }
        let _ = self.remove_program_change(step);
        self.add_event(step, Command::ProgramChange, program, 0, 0.0, 0.0);
        Ok(())
    }

    /// Remove the program-change event at `step`, if any. Returns whether
    /// one was present.
    pub fn remove_program_change(&mut self, step: u32) -> bool {
        match self.program_change_at(step) {
            Some(program) => self.delete_event(step, Command::ProgramChange, program),
            None => false,
        }
    }

    pub fn program_change_at(&self, step: u32) -> Option<u8> {
        if step >= self.steps() {
            return None;
        }
        self.events
            .iter()
            .find(|ev| ev.position() == step && ev.command() == Command::ProgramChange)
            .map(|ev| ev.value1_start())
    }

    /// Add a controller-ramp event spanning `value_start` to `value_end`
    /// over `duration` steps.
    pub fn add_control(&mut self, step: u32, control: u8, value_start: u8, value_end: u8, duration: f32) -> Result<()> {
        if step > self.steps() || control > 127 || value_start > 127 || value_end > 127 || duration > self.steps() as f32 {
            return Err(Error::invalid_argument("invalid control event"));
        }
        let idx = self.add_event(step, Command::Control, control, value_start, duration, 0.0);
        self.events[idx].set_value2_end(value_end);
        Ok(())
    }

    pub fn remove_control(&mut self, step: u32, control: u8) {
        self.delete_event(step, Command::Control, control);
    }

    /// Always 0.0: no control-ramp duration lookup is defined.
    pub fn control_duration(&self, _step: u32, _control: u8) -> f32 {
        0.0
    }

    // ---- pattern-wide shape ----

    pub fn steps(&self) -> u32 {
        self.beats * self.steps_per_beat
    }

    pub fn length_in_clocks(&self) -> u32 {
        self.beats * PPQN
    }

    pub fn clocks_per_step(&self) -> u32 {
        if self.steps_per_beat > PPQN || self.steps_per_beat == 0 {
            1
        } else {
            PPQN / self.steps_per_beat
        }
    }

    /// Re-quantize to `value` steps per beat, scaling every event's
    /// position and duration by `value / steps_per_beat`. Rejects any
    /// value other than 1, 2, 3, 4, 6, 8, 12, 24.
    pub fn set_steps_per_beat(&mut self, value: u32) -> Result<()> {
        if !VALID_STEPS_PER_BEAT.contains(&value) {
            return Err(Error::invalid_argument(format!("invalid steps-per-beat {value}")));
        }
        let scale = value as f32 / self.steps_per_beat as f32;
        for ev in &mut self.events {
            ev.set_position((ev.position() as f32 * scale).round() as u32);
            ev.set_duration(ev.duration() * scale);
        }
        self.steps_per_beat = value;
        Ok(())
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    /// Set the beat count, truncating any events at or beyond the new
    /// step count (the event list is ordered, so this is a prefix cut).
    pub fn set_beats_in_pattern(&mut self, beats: u32) {
        if beats == 0 {
            return;
        }
        self.beats = beats;
        let limit = self.steps();
        let cut = self.events.iter().position(|ev| ev.position() >= limit).unwrap_or(self.events.len());
        self.events.truncate(cut);
    }

    pub fn beats_in_pattern(&self) -> u32 {
        self.beats
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: u8) {
        self.scale = scale;
    }

    pub fn tonic(&self) -> u8 {
        self.tonic
    }

    pub fn set_tonic(&mut self, tonic: u8) {
        self.tonic = tonic;
    }

    pub fn ref_note(&self) -> u8 {
        self.ref_note
    }

    pub fn set_ref_note(&mut self, note: u8) {
        if note < 128 {
            self.ref_note = note;
        }
    }

    pub fn quantize_notes(&self) -> bool {
        self.quantize_notes
    }

    pub fn set_quantize_notes(&mut self, flag: bool) {
        self.quantize_notes = flag;
    }

    pub fn swing_div(&self) -> u32 {
        self.swing_div
    }

    pub fn set_swing_div(&mut self, div: u32) {
        self.swing_div = div;
    }

    pub fn swing_amount(&self) -> f32 {
        self.swing_amount
    }

    pub fn set_swing_amount(&mut self, amount: f32) {
        self.swing_amount = amount.clamp(0.0, 1.0);
    }

    pub fn human_time(&self) -> f32 {
        self.human_time
    }

    pub fn set_human_time(&mut self, amount: f32) {
        self.human_time = amount.max(0.0);
    }

    pub fn human_velo(&self) -> f32 {
        self.human_velo
    }

    pub fn set_human_velo(&mut self, amount: f32) {
        self.human_velo = amount.max(0.0);
    }

    /// Pattern-wide play chance ∈ [0, 1], distinct from the per-note
    /// [`Pattern::play_chance_at`].
    pub fn play_chance(&self) -> f32 {
        self.play_chance
    }

    pub fn set_play_chance(&mut self, chance: f32) {
        self.play_chance = chance.clamp(0.0, 1.0);
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u32) {
        self.zoom = zoom.max(1);
    }

    // ---- bulk edits ----

    /// Shift every note-on's note number by `n`. Aborts the whole operation
    /// (no mutation) if any note would leave [0, 127].
    pub fn transpose(&mut self, n: i32) -> Result<()> {
        for ev in &self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let note = ev.value1_start() as i32 + n;
            if !(0..=127).contains(&note) {
                return Err(Error::invalid_argument("transpose would leave MIDI note range"));
            }
        }
        for ev in &mut self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let note = (ev.value1_start() as i32 + n) as u8;
            ev.set_value1_start(note);
            ev.set_value1_end(note);
        }
        Ok(())
    }

    pub fn change_velocity_all(&mut self, delta: i32) {
        for ev in &mut self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let vel = (ev.value2_start() as i32 + delta).clamp(1, 127) as u8;
            ev.set_value2_start(vel);
        }
    }

    pub fn change_duration_all(&mut self, delta: f32) {
        for ev in &mut self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let duration = (ev.duration() + delta).max(0.1);
            ev.set_duration(duration);
        }
    }

    pub fn change_stutter_count_all(&mut self, delta: i32) {
        for ev in &mut self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let count = (ev.stutter_count() as i32 + delta).clamp(0, MAX_STUTTER_COUNT as i32) as u8;
            ev.set_stutter_count(count);
        }
    }

    pub fn change_stutter_dur_all(&mut self, delta: i32) {
        for ev in &mut self.events {
            if ev.command() != Command::NoteOn {
                continue;
            }
            let dur = (ev.stutter_dur() as i32 + delta).clamp(1, MAX_STUTTER_DUR as i32) as u8;
            ev.set_stutter_dur(dur);
        }
    }

    // ---- introspection ----

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn event_at(&self, index: usize) -> Option<&StepEvent> {
        self.events.get(index)
    }

    pub fn first_event_at_step(&self, step: u32) -> Option<usize> {
        self.events.iter().position(|ev| ev.position() == step)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Iterate events in position order.
    pub fn events(&self) -> impl Iterator<Item = &StepEvent> {
        self.events.iter()
    }

    /// The highest position among all events, or `None` if the pattern is
    /// empty.
    pub fn last_step(&self) -> Option<u32> {
        self.events.iter().map(|ev| ev.position()).max()
    }

    /// Rebuild an independent pattern with the same events and parameters,
    /// but a fresh (single-entry) snapshot history.
    ///
    /// This is a named method rather than [`Clone`] so that cloning a
    /// pattern never silently carries its undo/redo history along.
    pub fn duplicate(&self) -> Self {
        let mut out = Self::new(self.beats, self.steps_per_beat);
        out.scale = self.scale;
        out.tonic = self.tonic;
        out.ref_note = self.ref_note;
        out.quantize_notes = self.quantize_notes;
        out.swing_div = self.swing_div;
        out.swing_amount = self.swing_amount;
        out.human_time = self.human_time;
        out.human_velo = self.human_velo;
        out.play_chance = self.play_chance;
        out.zoom = self.zoom;
        for ev in &self.events {
            let idx = out.add_event(ev.position(), ev.command(), ev.value1_start(), ev.value2_start(), ev.duration(), ev.offset());
            out.events[idx].set_value1_end(ev.value1_end());
            out.events[idx].set_value2_end(ev.value2_end());
            out.events[idx].set_stutter_count(ev.stutter_count());
            out.events[idx].set_stutter_dur(ev.stutter_dur());
            out.events[idx].set_play_chance(ev.play_chance());
        }
        out.reset_snapshots();
        out
    }

    // ---- undo/redo snapshot stack (P4) ----

    /// Snapshot the current event list, truncating any redo history past
    /// the cursor, and point the cursor at the new snapshot.
    pub fn save_snapshot(&mut self) {
        self.snapshots.truncate(self.snapshot_pos + 1);
        self.snapshots.push(self.events.clone());
        self.snapshot_pos = self.snapshots.len() - 1;
    }

    /// Clear all history and save the current state as the sole snapshot.
    pub fn reset_snapshots(&mut self) {
        self.snapshots.clear();
        self.snapshot_pos = 0;
        self.save_snapshot();
    }

    fn restore_snapshot(&mut self, index: usize) {
        if let Some(snapshot) = self.snapshots.get(index) {
            self.events = snapshot.clone();
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.snapshot_pos > 0 {
            self.snapshot_pos -= 1;
            self.restore_snapshot(self.snapshot_pos);
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.snapshots.len() > 1 && self.snapshot_pos < self.snapshots.len() - 1 {
            self.snapshot_pos += 1;
            self.restore_snapshot(self.snapshot_pos);
            true
        } else {
            false
        }
    }

    pub fn undo_all(&mut self) -> bool {
        if self.snapshot_pos > 0 {
            self.snapshot_pos = 0;
            self.restore_snapshot(0);
            true
        } else {
            false
        }
    }

    pub fn redo_all(&mut self) -> bool {
        if self.snapshots.len() > 1 && self.snapshot_pos < self.snapshots.len() - 1 {
            self.snapshot_pos = self.snapshots.len() - 1;
            self.restore_snapshot(self.snapshot_pos);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_pattern() -> Pattern {
        Pattern::new(4, 4)
    }

    #[test]
    fn steps_and_clocks_per_step() {
        let p = Pattern::new(4, 4);
        assert_eq!(p.steps(), 16);
        assert_eq!(p.clocks_per_step(), 6);
        assert_eq!(p.length_in_clocks(), 4 * PPQN);
    }

    #[test]
    fn invalid_steps_per_beat_falls_back_to_four() {
        let p = Pattern::new(4, 5);
        assert_eq!(p.steps_per_beat(), 4);
    }

    #[test]
    fn add_note_rejects_out_of_range() {
        let mut p = empty_pattern();
        assert!(p.add_note(99, 60, 100, 1.0, 0.0).is_err());
        assert!(p.add_note(0, 200, 100, 1.0, 0.0).is_err());
        assert!(p.add_note(0, 60, 200, 1.0, 0.0).is_err());
        assert_eq!(p.event_count(), 0);
    }

    #[test]
    fn events_remain_sorted_by_position() {
        let mut p = empty_pattern();
        p.add_note(8, 64, 90, 1.0, 0.0).unwrap();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.add_note(4, 62, 80, 1.0, 0.0).unwrap();
        let positions: Vec<u32> = p.events().map(|e| e.position()).collect();
        assert_eq!(positions, vec![0, 4, 8]);
    }

    #[test]
    fn note_replace_on_overlap() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 100, 2.0, 0.0).unwrap();
        p.add_note(1, 60, 80, 1.0, 0.0).unwrap();
        assert_eq!(p.event_count(), 1);
        assert_eq!(p.note_velocity(1, 60), 80);
        assert_eq!(p.note_duration(1, 60), 1.0);
        assert_eq!(p.note_velocity(0, 60), 0);
    }

    #[test]
    fn overlap_replace_inherits_stutter() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 100, 2.0, 0.0).unwrap();
        p.set_stutter(0, 60, 3, 2);
        p.add_note(1, 60, 80, 1.0, 0.0).unwrap();
        assert_eq!(p.stutter_count(1, 60), 3);
        assert_eq!(p.stutter_dur(1, 60), 2);
    }

    #[test]
    fn remove_note_erases_matching_event() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.remove_note(0, 60);
        assert_eq!(p.event_count(), 0);
    }

    #[test]
    fn transpose_round_trip() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.add_note(1, 64, 90, 1.0, 0.0).unwrap();
        let before: Vec<u8> = p.events().map(|e| e.value1_start()).collect();
        p.transpose(5).unwrap();
        p.transpose(-5).unwrap();
        let after: Vec<u8> = p.events().map(|e| e.value1_start()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn transpose_aborts_whole_operation_out_of_range() {
        let mut p = empty_pattern();
        p.add_note(0, 125, 100, 1.0, 0.0).unwrap();
        p.add_note(1, 10, 100, 1.0, 0.0).unwrap();
        assert!(p.transpose(10).is_err());
        // Neither note moved.
        assert_eq!(p.note_velocity(0, 125), 100);
        assert_eq!(p.note_velocity(1, 10), 100);
    }

    #[test]
    fn set_steps_per_beat_scales_events() {
        let mut p = Pattern::new(4, 4);
        p.add_note(4, 60, 100, 2.0, 0.0).unwrap();
        p.set_steps_per_beat(8).unwrap();
        assert_eq!(p.steps_per_beat(), 8);
        assert_eq!(p.event_at(0).unwrap().position(), 8);
        assert_eq!(p.event_at(0).unwrap().duration(), 4.0);
    }

    #[test]
    fn set_steps_per_beat_rejects_invalid() {
        let mut p = empty_pattern();
        assert!(p.set_steps_per_beat(5).is_err());
    }

    #[test]
    fn set_beats_truncates_events() {
        let mut p = Pattern::new(4, 4);
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.add_note(15, 62, 100, 1.0, 0.0).unwrap();
        p.set_beats_in_pattern(1);
        assert_eq!(p.event_count(), 1);
        assert_eq!(p.event_at(0).unwrap().position(), 0);
    }

    #[test]
    fn change_velocity_all_clamps() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 120, 1.0, 0.0).unwrap();
        p.change_velocity_all(50);
        assert_eq!(p.note_velocity(0, 60), 127);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut p = empty_pattern();
        p.save_snapshot();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.save_snapshot();
        p.add_note(4, 62, 100, 1.0, 0.0).unwrap();
        p.save_snapshot();

        assert!(p.undo());
        assert_eq!(p.event_count(), 1);
        assert_eq!(p.event_at(0).unwrap().value1_start(), 60);

        assert!(p.undo());
        assert_eq!(p.event_count(), 0);

        assert!(p.redo());
        assert_eq!(p.event_count(), 1);

        assert!(p.redo_all());
        assert_eq!(p.event_count(), 2);
    }

    #[test]
    fn edit_after_undo_truncates_redo_history() {
        let mut p = empty_pattern();
        p.save_snapshot();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.save_snapshot();
        assert!(p.undo());
        p.add_note(0, 64, 100, 1.0, 0.0).unwrap();
        p.save_snapshot();
        assert!(!p.redo());
        assert_eq!(p.event_at(0).unwrap().value1_start(), 64);
    }

    #[test]
    fn program_change_replace() {
        let mut p = empty_pattern();
        p.add_program_change(0, 5).unwrap();
        p.add_program_change(0, 9).unwrap();
        assert_eq!(p.program_change_at(0), Some(9));
    }

    #[test]
    fn duplicate_has_independent_snapshot_history() {
        let mut p = empty_pattern();
        p.add_note(0, 60, 100, 1.0, 0.0).unwrap();
        p.save_snapshot();
        let mut dup = p.duplicate();
        assert!(!dup.undo());
        dup.remove_note(0, 60);
        assert_eq!(p.event_count(), 1);
        assert_eq!(dup.event_count(), 0);
    }
}
