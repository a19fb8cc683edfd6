//! Redirectable process console.
//!
//! A [`Console`] is the explicit stand-in for the process's standard output:
//! code prints through it, and a log panel can redirect it for as long as it
//! holds a [`RedirectGuard`]. Targets form a stack. Writes go to the newest
//! one, and dropping a guard unlinks only its own target, so redirects may
//! be released in any order.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies a console target, so callers can check what is installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// The target the console was created with.
    pub const ORIGINAL: StreamId = StreamId(0);
}

struct Target {
    id: StreamId,
    writer: Box<dyn Write + Send>,
}

/// Stack of targets; the original target sits at the bottom and is never
/// removed.
struct Targets(Vec<Target>);

impl Targets {
    fn top(&mut self) -> io::Result<&mut Target> {
        self.0
            .last_mut()
            .ok_or_else(|| io::Error::other("console has no target"))
    }

    fn current(&self) -> StreamId {
        self.0.last().map_or(StreamId::ORIGINAL, |t| t.id)
    }
}

pub struct Console {
    targets: Mutex<Targets>,
    next_id: AtomicU64,
}

impl Console {
    /// A console writing to the real standard output.
    pub fn stdout() -> Arc<Self> {
        Self::with_target(io::stdout())
    }

    pub fn with_target(writer: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            targets: Mutex::new(Targets(vec![Target {
                id: StreamId::ORIGINAL,
                writer: Box::new(writer),
            }])),
            next_id: AtomicU64::new(1),
        })
    }

    /// Id of the target writes currently go to.
    pub fn current(&self) -> StreamId {
        self.lock().current()
    }

    /// Send all output to `writer` until the returned guard drops.
    ///
    /// When the guard drops, output returns to the newest target still
    /// installed.
    pub fn redirect(self: &Arc<Self>, writer: impl Write + Send + 'static) -> RedirectGuard {
        let id = StreamId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut targets = self.lock();
        let from = targets.current();
        targets.0.push(Target {
            id,
            writer: Box::new(writer),
        });
        drop(targets);
        tracing::debug!(?from, to = ?id, "console redirected");
        RedirectGuard {
            console: Arc::clone(self),
            id,
        }
    }

    /// Write `text` as a single chunk.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut targets = self.lock();
        let target = targets.top()?;
        target.writer.write_all(text.as_bytes())?;
        target.writer.flush()
    }

    pub fn print(&self, value: impl Display) -> io::Result<()> {
        self.write_str(&value.to_string())
    }

    /// Print `value`, then the line terminator as a separate write.
    pub fn println(&self, value: impl Display) -> io::Result<()> {
        self.write_str(&value.to_string())?;
        self.write_str("\n")
    }

    /// An [`io::Write`] adapter over this console.
    pub fn writer(self: &Arc<Self>) -> ConsoleWriter {
        ConsoleWriter(Arc::clone(self))
    }

    fn lock(&self) -> MutexGuard<'_, Targets> {
        self.targets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes its target from the console on drop.
#[must_use = "the redirect ends as soon as the guard is dropped"]
pub struct RedirectGuard {
    console: Arc<Console>,
    id: StreamId,
}

impl RedirectGuard {
    pub fn id(&self) -> StreamId {
        self.id
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        let mut targets = self.console.lock();
        if let Some(pos) = targets.0.iter().position(|t| t.id == self.id) {
            let mut removed = targets.0.remove(pos);
            let _ = removed.writer.flush();
            tracing::debug!(from = ?self.id, to = ?targets.current(), "console restored");
        }
    }
}

pub struct ConsoleWriter(Arc<Console>);

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().top()?.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().top()?.writer.flush()
    }
}
