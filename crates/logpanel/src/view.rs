//! UI-thread side of the log: drains queued commands into the [`Sink`].
//!
//! ```text
//! producer threads ──Logger::append──▶ unbounded FIFO ──process_pending──▶ LogView (UI thread)
//! ```
//!
//! Producers never touch the sink directly. They enqueue through a
//! [`Logger`] handle and return immediately; the UI thread applies the
//! queued commands in arrival order whenever it calls
//! [`LogView::process_pending`], typically once per frame.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::entry::{LogEntry, LogImage};
use crate::logger::Logger;
use crate::sink::Sink;

/// A mutation queued for the UI thread.
#[derive(Debug)]
pub(crate) enum ViewCommand {
    Append(LogEntry),
    Clear,
}

pub(crate) type CommandSender = UnboundedSender<ViewCommand>;

/// The log surface's model, owned by the UI thread.
pub struct LogView {
    sink: Sink,
    rx: UnboundedReceiver<ViewCommand>,
    revision: u64,
}

impl LogView {
    /// Create a view and the producer handle that feeds it.
    ///
    /// Clone the [`Logger`] freely and hand it to any thread. Once the view
    /// is dropped, the handle's appends become silent no-ops.
    pub fn new(max_history: usize) -> (Self, Logger) {
        let (tx, rx) = unbounded_channel();
        let view = Self {
            sink: Sink::new(max_history),
            rx,
            revision: 0,
        };
        (view, Logger::from_sender(tx))
    }

    /// Apply every queued command in arrival order. Returns how many were
    /// applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.rx.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Append(entry) => {
                self.sink.append(entry);
            }
            ViewCommand::Clear => self.sink.clear(),
        }
        self.revision += 1;
    }

    /// Clear immediately, bypassing the queue.
    pub fn clear(&mut self) {
        self.sink.clear();
        self.revision += 1;
    }

    /// Plain-text snapshot of what has been applied so far.
    pub fn value(&self) -> String {
        self.sink.value()
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Incremented on every applied command; frontends redraw when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.sink.iter()
    }

    pub fn image(&self, index: usize) -> Option<&LogImage> {
        self.sink.get(index).and_then(LogEntry::as_image)
    }

    /// Indices of the image entries currently held, oldest first.
    pub fn image_indices(&self) -> Vec<usize> {
        self.sink
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, LogEntry::Image(_)))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_wait_for_process_pending() {
        let (mut view, logger) = LogView::new(10);
        logger.print("0");
        assert_eq!(view.value(), "");
        assert_eq!(view.process_pending(), 1);
        assert_eq!(view.value(), "0\n");
        assert_eq!(view.revision(), 1);
    }

    #[test]
    fn queued_clear_is_ordered_with_appends() {
        let (mut view, logger) = LogView::new(10);
        logger.print("a");
        logger.clear();
        logger.print("b");
        view.process_pending();
        assert_eq!(view.value(), "b\n");
    }

    #[test]
    fn cross_thread_submissions_keep_per_thread_order() {
        let (mut view, logger) = LogView::new(10_000);
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        logger.print(format!("{t}:{i}"));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(view.process_pending(), 1000);

        for t in 0..4 {
            let seen: Vec<usize> = view
                .value()
                .lines()
                .filter_map(|l| l.strip_prefix(&format!("{t}:")).map(|n| n.parse().unwrap()))
                .collect();
            assert_eq!(seen, (0..250).collect::<Vec<_>>());
        }
    }

    #[test]
    fn append_after_teardown_is_a_no_op() {
        let (view, logger) = LogView::new(10);
        assert!(logger.is_connected());
        drop(view);
        assert!(!logger.is_connected());
        logger.print("nobody is listening");
        logger.clear();
    }

    #[test]
    fn image_lookup() {
        let (mut view, logger) = LogView::new(10);
        logger.print("text");
        logger.append(LogEntry::Image(LogImage::new(image::RgbaImage::new(3, 2))));
        view.process_pending();
        assert_eq!(view.image_indices(), vec![1]);
        assert!(view.image(0).is_none());
        assert_eq!(view.image(1).map(LogImage::width), Some(3));
    }
}
