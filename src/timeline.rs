use std::sync::atomic::{AtomicI64, Ordering};

use crate::foundation::core::FrameTime;

/// Playback timeline consumed by the roto context.
///
/// Auto-keying reads the current frame from here, and the keyframe
/// navigation operations seek it.
pub trait Timeline: Send + Sync {
    /// The frame the playhead currently sits on.
    fn current_frame(&self) -> FrameTime;

    /// Move the playhead to `frame`.
    fn seek_frame(&self, frame: FrameTime);
}

/// A minimal in-memory timeline.
#[derive(Debug, Default)]
pub struct FrameTimeline {
    frame: AtomicI64,
}

impl FrameTimeline {
    /// Timeline positioned at `frame`.
    pub fn new(frame: FrameTime) -> Self {
        Self {
            frame: AtomicI64::new(frame.0),
        }
    }
}

impl Timeline for FrameTimeline {
    fn current_frame(&self) -> FrameTime {
        FrameTime(self.frame.load(Ordering::SeqCst))
    }

    fn seek_frame(&self, frame: FrameTime) {
        self.frame.store(frame.0, Ordering::SeqCst);
    }
}
