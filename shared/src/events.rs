//! Progress event stream emitted while a batch runs
//!
//! The pipeline reports progress through a structured channel instead of a
//! bare callback so that several observers (CLI output, logs, tests) can
//! watch the same run without coupling the pipeline to any one of them.

use std::fmt;
use tokio::sync::mpsc;

/// One human-relevant progress observation. Never affects control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Free-form stage description, e.g. "Analyzing product photos".
    Stage { message: String },
    /// A transient remote failure triggered a backoff wait.
    RetryWait {
        attempt: u32,
        max_attempts: u32,
        delay_secs: u64,
    },
    /// The backoff wait finished and the call is being retried.
    Resumed { attempt: u32, max_attempts: u32 },
    /// One generation unit of the current batch completed.
    UnitFinished { index: usize, total: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Stage { message } => write!(f, "{message}"),
            ProgressEvent::RetryWait {
                attempt,
                max_attempts,
                delay_secs,
            } => write!(
                f,
                "High traffic, retrying in {delay_secs}s (attempt {attempt}/{max_attempts})"
            ),
            ProgressEvent::Resumed {
                attempt,
                max_attempts,
            } => write!(f, "Resumed (attempt {attempt}/{max_attempts})"),
            ProgressEvent::UnitFinished { index, total } => {
                write!(f, "Finished render {}/{total}", index + 1)
            }
        }
    }
}

/// Cloneable handle used by the pipeline to publish progress events.
///
/// A disabled sink drops every event; a channel sink forwards them to the
/// paired receiver. Sends never block and a closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl StatusSink {
    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A sink/receiver pair for observers.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_wait_message() {
        let event = ProgressEvent::RetryWait {
            attempt: 3,
            max_attempts: 10,
            delay_secs: 10,
        };
        assert_eq!(
            event.to_string(),
            "High traffic, retrying in 10s (attempt 3/10)"
        );
    }

    #[test]
    fn test_disabled_sink_is_noop() {
        let sink = StatusSink::disabled();
        sink.emit(ProgressEvent::Stage {
            message: "ignored".into(),
        });
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (sink, mut rx) = StatusSink::channel();
        sink.emit(ProgressEvent::UnitFinished { index: 0, total: 2 });
        sink.emit(ProgressEvent::UnitFinished { index: 1, total: 2 });
        drop(sink);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].to_string(), "Finished render 1/2");
    }
}
