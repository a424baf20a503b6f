//! Player state-change notifications (§4.3, §6).
//!
//! A trait, owned by the host and invoked only from the decoder thread
//! when an observable parameter crosses a change threshold — never from
//! the realtime callback.

use crossbeam_channel::{Sender, TrySendError};

/// What changed, for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    All,
    Transport,
    Position,
    Gain,
    Loop,
    TrackA,
    TrackB,
    Quality,
    Debug,
}

/// A notification payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Notification {
    pub kind: NotifyKind,
    pub value: f32,
}

/// Observer for player state changes. Implementations must not block —
/// the decoder thread calls this inline between decode iterations.
pub trait Notifier: Send {
    fn notify(&self, notification: Notification);
}

/// Default channel-backed notifier: a bounded `crossbeam_channel` event
/// path (`try_send`, log-and-drop on `Full` rather than block the decoder
/// thread).
pub struct ChannelNotifier {
    tx: Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(target: "player::events", "notification channel full, dropping");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(target: "player::events", "notification channel disconnected");
            }
        }
    }
}

/// No-op notifier for tests/headless use.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Tracks the last-notified value of each observable field so the
/// decoder thread only notifies on a real change-of-threshold crossing
/// (§4.3 "Notification").
#[derive(Debug, Default)]
pub struct ChangeThresholds {
    last_play_state: Option<u8>,
    last_position: Option<f32>,
    last_gain: Option<f32>,
    last_loop: Option<bool>,
    last_track_a: Option<i32>,
    last_track_b: Option<i32>,
    last_quality: Option<u8>,
    last_debug: Option<bool>,
}

impl ChangeThresholds {
    pub fn position_crossed(&mut self, position_secs: f32) -> bool {
        let crossed = self.last_position.is_none_or(|p| (position_secs - p).abs() >= 0.1);
        if crossed {
            self.last_position = Some(position_secs);
        }
        crossed
    }

    pub fn gain_crossed(&mut self, gain: f32) -> bool {
        let crossed = self.last_gain.is_none_or(|g| (gain - g).abs() >= 0.01);
        if crossed {
            self.last_gain = Some(gain);
        }
        crossed
    }

    pub fn play_state_changed(&mut self, play_state: u8) -> bool {
        let changed = self.last_play_state != Some(play_state);
        self.last_play_state = Some(play_state);
        changed
    }

    pub fn loop_changed(&mut self, loop_enabled: bool) -> bool {
        let changed = self.last_loop != Some(loop_enabled);
        self.last_loop = Some(loop_enabled);
        changed
    }

    pub fn track_a_changed(&mut self, track_a: i32) -> bool {
        let changed = self.last_track_a != Some(track_a);
        self.last_track_a = Some(track_a);
        changed
    }

    pub fn track_b_changed(&mut self, track_b: i32) -> bool {
        let changed = self.last_track_b != Some(track_b);
        self.last_track_b = Some(track_b);
        changed
    }

    pub fn quality_changed(&mut self, quality: u8) -> bool {
        let changed = self.last_quality != Some(quality);
        self.last_quality = Some(quality);
        changed
    }

    pub fn debug_changed(&mut self, debug: bool) -> bool {
        let changed = self.last_debug != Some(debug);
        self.last_debug = Some(debug);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_threshold_requires_tenth_second() {
        let mut t = ChangeThresholds::default();
        assert!(t.position_crossed(0.0));
        assert!(!t.position_crossed(0.05));
        assert!(t.position_crossed(0.11));
    }

    #[test]
    fn gain_threshold_requires_hundredth() {
        let mut t = ChangeThresholds::default();
        assert!(t.gain_crossed(1.0));
        assert!(!t.gain_crossed(1.005));
        assert!(t.gain_crossed(1.02));
    }

    #[test]
    fn channel_notifier_does_not_block_on_full_channel() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let notifier = ChannelNotifier::new(tx);
        notifier.notify(Notification { kind: NotifyKind::All, value: 0.0 });
        // Second send has no receiver draining, but must not panic or block.
        notifier.notify(Notification { kind: NotifyKind::Gain, value: 1.0 });
    }
}
