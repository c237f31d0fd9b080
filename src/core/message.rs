//! Message types carrying task events to the presentation layer.

use crate::core::abort::AbortToken;
use crate::types::{MatchLocation, ProgressReport, TaskOutcome};
use tokio::sync::mpsc;

/// A generic message: a method name plus a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<T> {
    /// The method name for this message
    pub method: String,
    /// The message payload
    pub payload: T,
}

impl<T> Message<T> {
    pub fn new(method: impl Into<String>, payload: T) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }
}

/// Events emitted by a running task, in order.
#[derive(Debug)]
pub enum TaskEvent {
    Matches(Vec<MatchLocation>),
    Progress(ProgressReport),
    Finished(TaskOutcome),
}

impl TaskEvent {
    pub fn method(&self) -> &'static str {
        match self {
            TaskEvent::Matches(_) => "pushMatches",
            TaskEvent::Progress(_) => "reportProgress",
            TaskEvent::Finished(_) => "finishTask",
        }
    }
}

impl From<TaskEvent> for Message<TaskEvent> {
    fn from(event: TaskEvent) -> Self {
        Message::new(event.method(), event)
    }
}

/// Sending half of a task's event stream.
///
/// Matches and progress are dropped once the task is aborted, so the only
/// event that can follow an abort is the terminal `Finished`.
pub struct TaskReporter {
    sender: mpsc::UnboundedSender<Message<TaskEvent>>,
    abort: AbortToken,
}

impl TaskReporter {
    pub fn new(sender: mpsc::UnboundedSender<Message<TaskEvent>>, abort: AbortToken) -> Self {
        Self { sender, abort }
    }

    /// Create a reporter together with its receiving end.
    pub fn channel(abort: AbortToken) -> (Self, mpsc::UnboundedReceiver<Message<TaskEvent>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender, abort), receiver)
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn push_matches(&self, matches: Vec<MatchLocation>) {
        if matches.is_empty() {
            return;
        }
        self.send(TaskEvent::Matches(matches));
    }

    pub fn report_progress(&self, report: ProgressReport) {
        self.send(TaskEvent::Progress(report));
    }

    /// Emit the terminal outcome. Consumes the reporter so it happens once.
    pub fn finish(self, outcome: TaskOutcome) {
        log::info!("Task #{} finished: {:?}", self.abort.id(), outcome);
        if self.sender.send(TaskEvent::Finished(outcome).into()).is_err() {
            log::debug!("Task #{} outcome dropped, receiver closed", self.abort.id());
        }
    }

    fn send(&self, event: TaskEvent) {
        if self.abort.is_aborted() {
            log::trace!("Task #{} aborted, dropping {}", self.abort.id(), event.method());
            return;
        }
        let _ = self.sender.send(event.into());
    }
}
