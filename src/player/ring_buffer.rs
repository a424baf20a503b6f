//! Lock-free SPSC ring buffer pair carrying decoded float samples from the
//! decoder thread to the realtime audio callback.
//!
//! Built on `rtrb::RingBuffer::<f32>`. The player needs two rings (bus A,
//! bus B) that are always filled and drained in lockstep (I1);
//! [`RingBufferPair`] wraps both halves so there is no way to touch one
//! ring through this type without touching the other.

use rtrb::{Consumer, Producer, RingBuffer};

/// The producer half of a [`RingBufferPair`], owned by the decoder thread.
pub struct RingWriter {
    a: Producer<f32>,
    b: Producer<f32>,
}

impl RingWriter {
    /// Free space, in samples, common to both rings (the smaller of the
    /// two — they're always kept equal by construction).
    pub fn write_space(&self) -> usize {
        self.a.slots().min(self.b.slots())
    }

    /// Push one paired frame. Per §4.2.3.f, bus B is written first so bus
    /// A never outraces it.
    pub fn write_frame(&mut self, a_sample: f32, b_sample: f32) -> bool {
        if self.b.push(b_sample).is_err() {
            return false;
        }
        if self.a.push(a_sample).is_err() {
            // Can't happen if both rings were constructed with equal
            // capacity and have been written in lockstep; recover by
            // treating it as a dropped frame rather than panicking.
            return false;
        }
        true
    }

    /// Destructive reset, used only while the decoder thread holds
    /// `ReadState::Seeking` or `ReadState::Looping` (§4.1) — the consumer
    /// side must not be reading concurrently.
    pub fn reset(&mut self) {
        while self.a.pop().is_ok() {}
        while self.b.pop().is_ok() {}
    }
}

/// The consumer half of a [`RingBufferPair`], owned by the realtime audio
/// callback.
pub struct RingReader {
    a: Consumer<f32>,
    b: Consumer<f32>,
}

impl RingReader {
    /// Samples available, common to both rings.
    pub fn read_space(&self) -> usize {
        self.a.slots().min(self.b.slots())
    }

    /// Drain up to `dst_a.len()` / `dst_b.len()` samples (equal lengths
    /// expected), reading the *same count* from both rings regardless of
    /// how many are actually available in each (I1, §4.4 step 4).
    ///
    /// Returns the number of paired frames copied.
    pub fn read_into(&mut self, dst_a: &mut [f32], dst_b: &mut [f32]) -> usize {
        let n = dst_a.len().min(dst_b.len()).min(self.read_space());
        for i in 0..n {
            dst_a[i] = self.a.pop().unwrap_or(0.0);
            dst_b[i] = self.b.pop().unwrap_or(0.0);
        }
        n
    }
}

/// A matched pair of SPSC rings for bus A and bus B, capacity
/// `buffer_size * buffer_count` samples each.
pub struct RingBufferPair;

impl RingBufferPair {
    /// Build a fresh pair with the given per-ring capacity in samples,
    /// returning the writer half (decoder thread) and reader half
    /// (audio callback).
    pub fn new(capacity: usize) -> (RingWriter, RingReader) {
        let (pa, ca) = RingBuffer::<f32>::new(capacity);
        let (pb, cb) = RingBuffer::<f32>::new(capacity);
        (RingWriter { a: pa, b: pb }, RingReader { a: ca, b: cb })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_preserve_pairing() {
        let (mut w, mut r) = RingBufferPair::new(16);
        for i in 0..8 {
            assert!(w.write_frame(i as f32, -(i as f32)));
        }
        let mut a = [0.0f32; 8];
        let mut b = [0.0f32; 8];
        let n = r.read_into(&mut a, &mut b);
        assert_eq!(n, 8);
        assert_eq!(a, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(b, [0.0, -1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0]);
    }

    #[test]
    fn read_into_never_exceeds_common_space() {
        let (mut w, mut r) = RingBufferPair::new(16);
        w.write_frame(1.0, 2.0);
        let mut a = [0.0f32; 4];
        let mut b = [0.0f32; 4];
        let n = r.read_into(&mut a, &mut b);
        assert_eq!(n, 1);
    }

    #[test]
    fn reset_drains_both_rings() {
        let (mut w, mut r) = RingBufferPair::new(16);
        w.write_frame(1.0, 2.0);
        w.write_frame(1.0, 2.0);
        w.reset();
        assert_eq!(r.read_space(), 0);
    }
}
