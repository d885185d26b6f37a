use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Wired device on a shared CSMA segment.
///
/// Send and receive are gated independently; a frame is dropped (and counted)
/// when its direction is disabled.
#[derive(Debug)]
pub struct CsmaNetDevice {
    send_enable: AtomicBool,
    receive_enable: AtomicBool,
    dropped_frames: AtomicU64,
}

impl Default for CsmaNetDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CsmaNetDevice {
    pub fn new() -> Self {
        Self {
            send_enable: AtomicBool::new(true),
            receive_enable: AtomicBool::new(true),
            dropped_frames: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn set_send_enable(&self, enable: bool) {
        self.send_enable.store(enable, Ordering::Release);
    }

    #[inline]
    pub fn set_receive_enable(&self, enable: bool) {
        self.receive_enable.store(enable, Ordering::Release);
    }

    #[inline]
    pub fn is_send_enabled(&self) -> bool {
        self.send_enable.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_receive_enabled(&self) -> bool {
        self.receive_enable.load(Ordering::Acquire)
    }

    /// Offers a frame for transmission. Returns `false` if it was dropped.
    pub fn send(&self) -> bool {
        self.gate(self.is_send_enabled())
    }

    /// Offers a received frame to the stack. Returns `false` if it was dropped.
    pub fn receive(&self) -> bool {
        self.gate(self.is_receive_enabled())
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    fn gate(&self, enabled: bool) -> bool {
        if !enabled {
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        }
        enabled
    }
}
