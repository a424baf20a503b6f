//! MIDI event routing to a single player (§4.6).
//!
//! The JACK/MIDI backend itself is out of scope; `process()` takes
//! already-demultiplexed-to-this-player events of this small type rather
//! than parsing raw JACK MIDI buffers.

/// A MIDI-like event delivered to a player's process callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self { status, data1, data2 }
    }

    fn status_nibble(&self) -> u8 {
        self.status & 0xF0
    }

    pub fn is_note_off(&self) -> bool {
        self.status_nibble() == 0x80 || (self.status_nibble() == 0x90 && self.data2 == 0)
    }

    pub fn is_note_on(&self) -> bool {
        self.status_nibble() == 0x90 && self.data2 > 0
    }

    pub fn is_pitch_bend(&self) -> bool {
        self.status_nibble() == 0xE0
    }

    pub fn is_control_change(&self) -> bool {
        self.status_nibble() == 0xB0
    }

    pub fn note(&self) -> u8 {
        self.data1
    }

    pub fn velocity(&self) -> u8 {
        self.data2
    }

    /// 14-bit pitch-bend value, `lsb + 128*msb`.
    pub fn pitch_bend_value(&self) -> u16 {
        self.data1 as u16 + 128 * self.data2 as u16
    }

    pub fn cc_number(&self) -> u8 {
        self.data1
    }

    pub fn cc_value(&self) -> u8 {
        self.data2
    }
}

/// The control-surface action a routed MIDI event produces. Kept as plain
/// data so `Player::process` can apply it without re-deriving the
/// classification, and so the routing logic itself stays unit-testable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiAction {
    /// Stop playback, clear pitch shift, clear last note.
    StopAndClear,
    /// Stop, set pitch_shift, seek to 0, start, record last_note.
    TriggerNote { note: u8, pitch_shift: i32 },
    /// Capture (not apply) a 14-bit pitch-bend value.
    CapturePitchBend { value: u16 },
    /// Jump to `fraction * duration`.
    CcPosition { fraction: f32 },
    /// Set gain to `value / 100`.
    CcGain { gain: f32 },
    /// Toggle transport (threshold 63).
    CcTransportToggle { engage: bool },
    /// Toggle loop (threshold 63).
    CcLoopToggle { enable: bool },
}

/// Classify one MIDI event routed to a player with `last_note` currently
/// held (if any). `midi_cc_enabled` gates CC routing (§4.6 "when MIDI CC
/// routing is enabled").
pub fn classify(event: &MidiEvent, last_note: Option<u8>, midi_cc_enabled: bool) -> Option<MidiAction> {
    if event.is_note_off() {
        if last_note == Some(event.note()) {
            return Some(MidiAction::StopAndClear);
        }
        return None;
    }

    if event.is_note_on() {
        return Some(MidiAction::TriggerNote {
            note: event.note(),
            pitch_shift: 60 - event.note() as i32,
        });
    }

    if event.is_pitch_bend() {
        return Some(MidiAction::CapturePitchBend { value: event.pitch_bend_value() });
    }

    if midi_cc_enabled && event.is_control_change() {
        return match event.cc_number() {
            1 => Some(MidiAction::CcPosition { fraction: event.cc_value() as f32 / 127.0 }),
            7 => Some(MidiAction::CcGain { gain: event.cc_value() as f32 / 100.0 }),
            68 => Some(MidiAction::CcTransportToggle { engage: event.cc_value() > 63 }),
            69 => Some(MidiAction::CcLoopToggle { enable: event.cc_value() > 63 }),
            _ => None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_triggers_with_transpose_from_middle_c() {
        let ev = MidiEvent::new(0x90, 72, 100);
        let action = classify(&ev, None, false).unwrap();
        assert_eq!(action, MidiAction::TriggerNote { note: 72, pitch_shift: -12 });
    }

    #[test]
    fn note_off_matching_last_note_stops() {
        let ev = MidiEvent::new(0x80, 72, 0);
        assert_eq!(classify(&ev, Some(72), false), Some(MidiAction::StopAndClear));
    }

    #[test]
    fn note_on_velocity_zero_is_note_off() {
        let ev = MidiEvent::new(0x90, 72, 0);
        assert_eq!(classify(&ev, Some(72), false), Some(MidiAction::StopAndClear));
    }

    #[test]
    fn note_off_not_matching_last_note_is_ignored() {
        let ev = MidiEvent::new(0x80, 60, 0);
        assert_eq!(classify(&ev, Some(72), false), None);
    }

    #[test]
    fn pitch_bend_is_captured() {
        let ev = MidiEvent::new(0xE0, 0, 64); // lsb=0, msb=64 -> 8192
        assert_eq!(classify(&ev, None, false), Some(MidiAction::CapturePitchBend { value: 8192 }));
    }

    #[test]
    fn cc_ignored_unless_enabled() {
        let ev = MidiEvent::new(0xB0, 7, 100);
        assert_eq!(classify(&ev, None, false), None);
        assert_eq!(classify(&ev, None, true), Some(MidiAction::CcGain { gain: 1.0 }));
    }

    #[test]
    fn cc_transport_and_loop_thresholds() {
        let below = MidiEvent::new(0xB0, 68, 63);
        let above = MidiEvent::new(0xB0, 68, 64);
        assert_eq!(classify(&below, None, true), Some(MidiAction::CcTransportToggle { engage: false }));
        assert_eq!(classify(&above, None, true), Some(MidiAction::CcTransportToggle { engage: true }));
    }
}
