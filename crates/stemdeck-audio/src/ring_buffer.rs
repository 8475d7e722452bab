//! Lock-free single-producer single-consumer sample queue.
//!
//! The mixer (producer) renders playing stems into it on each transport
//! tick, and the device output callback (consumer) drains it. Samples are
//! stored as `f32` bit patterns in atomics, so no `unsafe` is needed; the
//! read/write indices use acquire/release ordering to publish them.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// `clear_to` value when no clear is pending.
const NO_CLEAR: usize = usize::MAX;

/// SPSC ring of interleaved f32 samples.
pub struct RingBuffer {
    slots: Box<[AtomicU32]>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    /// Read index requested by the producer's last `clear`, applied by the
    /// consumer on its next `read`.
    clear_to: AtomicUsize,
}

impl RingBuffer {
    /// Create a ring holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        // One slot stays empty to tell full from empty.
        let slots = (0..capacity.saturating_add(1)).map(|_| AtomicU32::new(0)).collect();
        Self {
            slots,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            clear_to: AtomicUsize::new(NO_CLEAR),
        }
    }

    /// Maximum number of queued samples.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        if to >= from {
            to - from
        } else {
            self.slots.len() - from + to
        }
    }

    /// Read index as seen from outside, with a pending clear applied.
    fn effective_read_pos(&self) -> usize {
        match self.clear_to.load(Ordering::Acquire) {
            NO_CLEAR => self.read_pos.load(Ordering::Acquire),
            target => target,
        }
    }

    /// Number of samples available for reading.
    pub fn available_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        self.distance(self.effective_read_pos(), w)
    }

    /// Number of samples that can be written.
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    /// Queue samples. Returns how many fit.
    pub fn write(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.available_write());
        let mut w = self.write_pos.load(Ordering::Relaxed);
        for &sample in &data[..count] {
            self.slots[w].store(sample.to_bits(), Ordering::Relaxed);
            w = (w + 1) % self.slots.len();
        }
        self.write_pos.store(w, Ordering::Release);
        count
    }

    /// Dequeue into `output`. Returns how many samples were read.
    pub fn read(&self, output: &mut [f32]) -> usize {
        let mut r = match self.clear_to.swap(NO_CLEAR, Ordering::AcqRel) {
            NO_CLEAR => self.read_pos.load(Ordering::Relaxed),
            target => target,
        };
        let w = self.write_pos.load(Ordering::Acquire);
        let count = output.len().min(self.distance(r, w));
        for out in &mut output[..count] {
            *out = f32::from_bits(self.slots[r].load(Ordering::Relaxed));
            r = (r + 1) % self.slots.len();
        }
        self.read_pos.store(r, Ordering::Release);
        count
    }

    /// Drop everything queued so far. Producer side only.
    ///
    /// The consumer owns the read index, so the clear is recorded and
    /// applied at the start of the consumer's next `read`. Samples written
    /// after the clear are kept. A read already running when the clear is
    /// requested may still deliver samples it claimed.
    pub fn clear(&self) {
        self.clear_to
            .store(self.write_pos.load(Ordering::Relaxed), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let rb = RingBuffer::new(64);
        let data: Vec<f32> = (0..40).map(|i| i as f32 * 0.5).collect();
        assert_eq!(rb.write(&data), 40);
        assert_eq!(rb.available_read(), 40);

        let mut out = vec![0.0f32; 40];
        assert_eq!(rb.read(&mut out), 40);
        assert_eq!(out, data);
        assert_eq!(rb.available_read(), 0);
    }

    #[test]
    fn test_wraps_around() {
        let rb = RingBuffer::new(16);
        rb.write(&[1.0; 12]);
        rb.read(&mut [0.0; 8]);

        let tail: Vec<f32> = (0..12).map(|i| 100.0 + i as f32).collect();
        assert_eq!(rb.write(&tail), 12);

        let mut out = vec![0.0f32; 16];
        assert_eq!(rb.read(&mut out), 16);
        assert_eq!(out[3], 1.0);
        assert_eq!(out[4], 100.0);
        assert_eq!(out[15], 111.0);
    }

    #[test]
    fn test_full_ring_rejects_excess() {
        let rb = RingBuffer::new(8);
        assert_eq!(rb.write(&[0.25; 20]), 8);
        assert_eq!(rb.available_write(), 0);
        assert_eq!(rb.write(&[1.0]), 0);
    }

    #[test]
    fn test_negative_and_large_values_survive() {
        let rb = RingBuffer::new(4);
        rb.write(&[-2.5, 3.75]);
        let mut out = [0.0f32; 2];
        rb.read(&mut out);
        assert_eq!(out, [-2.5, 3.75]);
    }

    #[test]
    fn test_clear() {
        let rb = RingBuffer::new(16);
        rb.write(&[1.0; 10]);
        rb.clear();
        assert_eq!(rb.available_read(), 0);
        assert_eq!(rb.available_write(), 16);
    }

    #[test]
    fn test_clear_keeps_later_writes() {
        let rb = RingBuffer::new(16);
        rb.write(&[1.0; 10]);
        rb.clear();
        rb.write(&[2.0, 3.0]);
        assert_eq!(rb.available_read(), 2);

        let mut out = [0.0f32; 4];
        assert_eq!(rb.read(&mut out), 2);
        assert_eq!(&out[..2], &[2.0, 3.0]);
        assert_eq!(rb.available_read(), 0);
    }

    #[test]
    fn test_clear_survives_interleaved_consumer() {
        use std::sync::Arc;
        use std::thread;

        let rb = Arc::new(RingBuffer::new(256));
        let consumer = {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                let mut out = [0.0f32; 7];
                let mut after_marker = Vec::new();
                let mut seen_marker = false;
                loop {
                    let n = rb.read(&mut out);
                    for &s in &out[..n] {
                        if s < 0.0 {
                            seen_marker = true;
                        } else if seen_marker {
                            after_marker.push(s);
                        }
                    }
                    if after_marker.len() >= 64 {
                        break;
                    }
                    thread::yield_now();
                }
                after_marker
            })
        };

        for _ in 0..100 {
            rb.write(&[1.0; 32]);
        }
        rb.clear();
        // Everything queued from here on must come out in order, and nothing
        // from before the clear may follow the marker.
        while rb.write(&[-1.0]) == 0 {
            thread::yield_now();
        }
        let mut sent = 0;
        while sent < 64 {
            sent += rb.write(&[2.0]);
        }

        let after_marker = consumer.join().unwrap();
        assert_eq!(after_marker.len(), 64);
        assert!(after_marker.iter().all(|&s| s == 2.0));
    }
}
