/// Handle of one requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

impl FrameRequestId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Host hook for animation frames.
///
/// When a requested frame fires, the host calls
/// [`ChartWidget::on_animation_frame`](super::ChartWidget::on_animation_frame).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequestId;

    fn cancel_frame(&mut self, id: FrameRequestId);
}

/// Scheduler that only records requests; tests and headless hosts fire
/// frames by hand.
#[derive(Debug, Default)]
pub struct ManualFrameScheduler {
    next_id: u64,
    pending: Option<FrameRequestId>,
    requested: usize,
    cancelled: usize,
}

impl ManualFrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self) -> Option<FrameRequestId> {
        self.pending
    }

    /// Consumes the pending request, as a host does right before calling
    /// back into the widget.
    pub fn take_pending(&mut self) -> Option<FrameRequestId> {
        self.pending.take()
    }

    #[must_use]
    pub fn requested(&self) -> usize {
        self.requested
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id);
        self.next_id += 1;
        self.requested += 1;
        self.pending = Some(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        if self.pending == Some(id) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameScheduler, ManualFrameScheduler};

    #[test]
    fn manual_scheduler_tracks_requests_and_cancellations() {
        let mut scheduler = ManualFrameScheduler::new();
        let first = scheduler.request_frame();
        scheduler.cancel_frame(first);
        assert_eq!(scheduler.pending(), None);
        assert_eq!(scheduler.cancelled(), 1);

        let second = scheduler.request_frame();
        assert_ne!(first, second);
        scheduler.cancel_frame(first);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.take_pending(), Some(second));
        assert_eq!(scheduler.requested(), 2);
    }
}
