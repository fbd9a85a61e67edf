use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Periodic jobs a session may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Stats,
    Comments,
}

/// Owns the interval tasks of one controller. Each task only posts a tick
/// back to the controller loop; the work happens there.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: HashMap<TimerKind, JoinHandle<()>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start `kind`, replacing any running instance
    pub fn start(&mut self, kind: TimerKind, period: Duration, ticks: mpsc::UnboundedSender<TimerKind>) {
        self.stop(kind);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if ticks.send(kind).is_err() {
                    break;
                }
            }
        });

        trace!("Started {:?} timer every {:?}", kind, period);
        self.handles.insert(kind, handle);
    }

    pub fn stop(&mut self, kind: TimerKind) -> bool {
        match self.handles.remove(&kind) {
            Some(handle) => {
                handle.abort();
                trace!("Stopped {:?} timer", kind);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.handles.contains_key(&kind)
    }

    pub fn active(&self) -> usize {
        self.handles.len()
    }

    /// Abort every timer; returns how many were running
    pub fn cancel_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        count
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
