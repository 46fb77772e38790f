use crate::frame::Frame;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Single-slot latest-value cell between the frame producer and the
/// monitor loop.
///
/// The producer replaces the slot content unconditionally; the consumer
/// always reads the newest frame. This is deliberately not a queue: a
/// slow consumer sees dropped frames, never a growing backlog.
pub struct LatestFrameCell {
    slot: RwLock<Option<Frame>>,
    stats: CellStats,
}

/// Counters for producer/consumer behavior monitoring
#[derive(Debug, Default)]
pub struct CellStats {
    /// Total frames published into the cell
    pub frames_published: AtomicU64,
    /// Total reads that returned a frame
    pub frames_read: AtomicU64,
    /// Frames overwritten before any consumer read them
    pub frames_replaced_unread: AtomicU64,
    last_published_id: AtomicU64,
    last_read_id: AtomicU64,
}

/// Snapshot of cell statistics
#[derive(Debug, Clone)]
pub struct CellStatsSnapshot {
    pub frames_published: u64,
    pub frames_read: u64,
    pub frames_replaced_unread: u64,
}

impl LatestFrameCell {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            stats: CellStats::default(),
        }
    }

    /// Replace the slot content with a newer frame.
    pub fn publish(&self, frame: Frame) {
        trace!("Publishing frame {} ({}x{})", frame.id, frame.width, frame.height);

        let frame_id = frame.id;
        {
            let mut slot = self.slot.write();
            if let Some(previous) = slot.as_ref() {
                if self.stats.last_read_id.load(Ordering::Relaxed) < previous.id + 1 {
                    self.stats
                        .frames_replaced_unread
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
            *slot = Some(frame);
        }

        self.stats.frames_published.fetch_add(1, Ordering::Relaxed);
        self.stats
            .last_published_id
            .store(frame_id + 1, Ordering::Relaxed);
    }

    /// Read a clone of the newest frame, if any. Never blocks the producer
    /// for longer than the clone of the (shared) frame handle.
    pub fn latest(&self) -> Option<Frame> {
        let frame = self.slot.read().clone();
        if let Some(ref frame) = frame {
            self.stats.frames_read.fetch_add(1, Ordering::Relaxed);
            self.stats
                .last_read_id
                .fetch_max(frame.id + 1, Ordering::Relaxed);
        }
        frame
    }

    /// True once any frame has been published
    pub fn has_frame(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn stats(&self) -> CellStatsSnapshot {
        CellStatsSnapshot {
            frames_published: self.stats.frames_published.load(Ordering::Relaxed),
            frames_read: self.stats.frames_read.load(Ordering::Relaxed),
            frames_replaced_unread: self.stats.frames_replaced_unread.load(Ordering::Relaxed),
        }
    }
}

impl Default for LatestFrameCell {
    fn default() -> Self {
        Self::new()
    }
}
