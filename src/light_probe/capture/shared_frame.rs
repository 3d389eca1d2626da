use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use image::RgbImage;

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<RgbImage>,
    sequence: u64,
    fix_sphere: bool,
    hdr_in_progress: bool,
    exposure_value: f32,
}

/// Copy of the slot taken under its lock.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub frame: RgbImage,
    /// Publication number of `frame`, starting at 1
    pub sequence: u64,
    /// The sphere is known not to move: keep its position
    pub fix_sphere: bool,
    pub hdr_in_progress: bool,
    /// Exposure value of the capture settings in effect
    pub exposure_value: f32,
}

/// Latest-frame slot shared by the capture side and its readers.
///
/// One writer publishes, any number of readers take snapshots. Readers get
/// their own copy of the frame, so the lock is only held for the copy and
/// never during processing. Unread frames are overwritten, not queued.
#[derive(Debug, Clone, Default)]
pub struct SharedFrame {
    inner: Arc<(Mutex<SlotState>, Condvar)>,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Slot state stays consistent even if a holder panicked
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the latest frame and wakes waiting readers.
    ///
    /// Returns the sequence number of the new frame.
    pub fn publish(&self, frame: RgbImage) -> u64 {
        let sequence = {
            let mut state = self.lock();
            state.frame = Some(frame);
            state.sequence += 1;
            state.sequence
        };
        self.inner.1.notify_all();
        sequence
    }

    /// Sequence number of the latest frame, 0 before any.
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    pub fn set_fix_sphere(&self, fix: bool) {
        self.lock().fix_sphere = fix;
    }

    pub fn fix_sphere(&self) -> bool {
        self.lock().fix_sphere
    }

    pub fn set_hdr_in_progress(&self, in_progress: bool) {
        self.lock().hdr_in_progress = in_progress;
    }

    pub fn hdr_in_progress(&self) -> bool {
        self.lock().hdr_in_progress
    }

    pub fn set_exposure_value(&self, exposure_value: f32) {
        self.lock().exposure_value = exposure_value;
    }

    pub fn exposure_value(&self) -> f32 {
        self.lock().exposure_value
    }

    /// Latest frame, if any was published.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        Self::copy_out(&self.lock())
    }

    /// Waits at most `timeout` for a frame newer than `sequence`.
    pub fn snapshot_after(&self, sequence: u64, timeout: Duration) -> Option<FrameSnapshot> {
        let (lock, ready) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = ready
            .wait_timeout_while(guard, timeout, |state| state.sequence <= sequence)
            .unwrap_or_else(PoisonError::into_inner);

        if state.sequence <= sequence {
            return None;
        }
        Self::copy_out(&state)
    }

    fn copy_out(state: &SlotState) -> Option<FrameSnapshot> {
        state.frame.as_ref().map(|frame| FrameSnapshot {
            frame: frame.clone(),
            sequence: state.sequence,
            fix_sphere: state.fix_sphere,
            hdr_in_progress: state.hdr_in_progress,
            exposure_value: state.exposure_value,
        })
    }
}

/// Cooperative stop request shared between threads.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
