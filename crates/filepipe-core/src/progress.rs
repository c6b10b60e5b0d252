//! Transfer progress callbacks.

/// Receives lifecycle and progress notifications from an
/// [`InstrumentedStream`](crate::InstrumentedStream).
///
/// `start` and `finish` are each delivered at most once per stream.
pub trait ProgressListener {
    /// Called before the first progress notification.
    fn start(&mut self) {}

    /// Called after every read that delivered bytes. `consumed` is the
    /// running total; `total` is the size hint, if one was given.
    fn progress(&mut self, consumed: u64, total: Option<u64>);

    /// Called when the stream reaches its end.
    fn finish(&mut self) {}
}

impl<L: ProgressListener + ?Sized> ProgressListener for &mut L {
    fn start(&mut self) {
        (**self).start();
    }

    fn progress(&mut self, consumed: u64, total: Option<u64>) {
        (**self).progress(consumed, total);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

impl<L: ProgressListener + ?Sized> ProgressListener for Box<L> {
    fn start(&mut self) {
        (**self).start();
    }

    fn progress(&mut self, consumed: u64, total: Option<u64>) {
        (**self).progress(consumed, total);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Adapts a `(consumed, total)` closure into a [`ProgressListener`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressFn<F>(pub F);

impl<F> ProgressListener for ProgressFn<F>
where
    F: FnMut(u64, Option<u64>),
{
    fn progress(&mut self, consumed: u64, total: Option<u64>) {
        (self.0)(consumed, total);
    }
}

/// Shorthand for [`ProgressFn`].
pub fn progress_fn<F>(f: F) -> ProgressFn<F>
where
    F: FnMut(u64, Option<u64>),
{
    ProgressFn(f)
}

/// Listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn progress(&mut self, _consumed: u64, _total: Option<u64>) {}
}

/// Listener that records what it was told. Useful for tests and for hosts
/// that poll rather than react.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecorder {
    pub starts: usize,
    pub finishes: usize,
    pub updates: Vec<(u64, Option<u64>)>,
}

impl ProgressRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported running total.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.updates.last().map_or(0, |(consumed, _)| *consumed)
    }
}

impl ProgressListener for ProgressRecorder {
    fn start(&mut self) {
        self.starts += 1;
    }

    fn progress(&mut self, consumed: u64, total: Option<u64>) {
        self.updates.push((consumed, total));
    }

    fn finish(&mut self) {
        self.finishes += 1;
    }
}
