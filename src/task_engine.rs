//! Task engine: the user-facing entry point.
//!
//! Each operation runs as its own tokio task and reports through a
//! `TaskHandle`. The engine keeps no business state beyond one active abort
//! token per `TaskKind`. Starting a task aborts the running task of the same
//! kind and waits for it to finish before doing any work.

use crate::backend::{Confirm, SearchEngine};
use crate::core::{AbortToken, Message, TaskEvent, TaskReporter};
use crate::error::EngineError;
use crate::types::{ChangedFile, MatchLocation, ProgressReport, SearchInputs, TaskKind, TaskOutcome};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

enum Operation {
    Search(SearchInputs),
    Replace(SearchInputs),
    Sync(SearchInputs, Vec<ChangedFile>),
}

impl Operation {
    fn kind(&self) -> TaskKind {
        match self {
            Operation::Search(_) => TaskKind::Search,
            Operation::Replace(_) => TaskKind::Replace,
            Operation::Sync(..) => TaskKind::Sync,
        }
    }
}

/// Per-kind bookkeeping: the active abort token and a lane lock held by the
/// running task until its outcome has been emitted.
#[derive(Default)]
struct Lanes {
    active: Mutex<[Option<AbortToken>; 3]>,
    running: [Arc<tokio::sync::Mutex<()>>; 3],
}

impl Lanes {
    fn with_active<T>(&self, f: impl FnOnce(&mut [Option<AbortToken>; 3]) -> T) -> T {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut active)
    }

    /// Clear the slot if it still belongs to the task `id`.
    fn release(&self, kind: TaskKind, id: u64) {
        self.with_active(|active| {
            let slot = &mut active[kind.index()];
            if slot.as_ref().map(AbortToken::id) == Some(id) {
                *slot = None;
            }
        });
    }
}

pub struct TaskEngine<E: SearchEngine> {
    engine: Arc<E>,
    confirm: Arc<dyn Confirm>,
    lanes: Arc<Lanes>,
}

impl<E: SearchEngine> TaskEngine<E> {
    pub fn new(engine: E, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            engine: Arc::new(engine),
            confirm,
            lanes: Arc::new(Lanes::default()),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Search with a snapshot of `inputs`. Must be called inside a tokio runtime.
    pub fn search(&self, inputs: &SearchInputs) -> TaskHandle {
        self.start(Operation::Search(inputs.clone()))
    }

    /// Enumerate matching files, then rewrite them.
    pub fn replace(&self, inputs: &SearchInputs) -> TaskHandle {
        self.start(Operation::Replace(inputs.clone()))
    }

    /// Write edited lines back to disk.
    pub fn sync(&self, inputs: &SearchInputs, changed: Vec<ChangedFile>) -> TaskHandle {
        self.start(Operation::Sync(inputs.clone(), changed))
    }

    pub fn prefill_from_selection(&self, inputs: &SearchInputs, selection: &str) -> SearchInputs {
        self.engine.prefill_from_selection(inputs, selection)
    }

    /// Abort the active task of `kind`. Returns false if none was running.
    pub fn abort(&self, kind: TaskKind) -> bool {
        match self.lanes.with_active(|active| active[kind.index()].take()) {
            Some(token) => {
                token.abort();
                true
            }
            None => false,
        }
    }

    pub fn abort_all(&self) {
        for kind in TaskKind::ALL {
            self.abort(kind);
        }
    }

    pub fn is_active(&self, kind: TaskKind) -> bool {
        self.lanes.with_active(|active| active[kind.index()].is_some())
    }

    fn start(&self, operation: Operation) -> TaskHandle {
        let kind = operation.kind();
        let abort = AbortToken::new();

        let previous = self
            .lanes
            .with_active(|active| active[kind.index()].replace(abort.clone()));
        if let Some(previous) = previous {
            log::info!("Replacing running {} task #{}", kind, previous.id());
            previous.abort();
        }

        log::info!("Starting {} task #{} ({})", kind, abort.id(), self.engine.name());

        let (reporter, events) = TaskReporter::channel(abort.clone());
        let engine = Arc::clone(&self.engine);
        let confirm = Arc::clone(&self.confirm);
        let lanes = Arc::clone(&self.lanes);
        let lane = Arc::clone(&lanes.running[kind.index()]);

        tokio::spawn(async move {
            let guard = tokio::select! {
                biased;
                _ = reporter.abort_token().aborted() => None,
                guard = lane.lock_owned() => Some(guard),
            };

            let result = match guard {
                Some(_) if reporter.is_aborted() => Err(EngineError::Aborted),
                Some(_) => run_operation(&*engine, &*confirm, operation, &reporter).await,
                None => Err(EngineError::Aborted),
            };

            lanes.release(kind, reporter.abort_token().id());
            reporter.finish(TaskOutcome::from(result));
            drop(guard);
        });

        TaskHandle {
            kind,
            abort,
            events,
        }
    }
}

async fn run_operation<E: SearchEngine>(
    engine: &E,
    confirm: &dyn Confirm,
    operation: Operation,
    reporter: &TaskReporter,
) -> Result<(), EngineError> {
    match operation {
        Operation::Search(inputs) => engine.search(&inputs, reporter).await,
        Operation::Replace(inputs) => engine.replace(&inputs, confirm, reporter).await,
        Operation::Sync(inputs, changed) => engine.sync(&inputs, &changed, reporter).await,
    }
}

/// Receiving side of one task.
pub struct TaskHandle {
    kind: TaskKind,
    abort: AbortToken,
    events: mpsc::UnboundedReceiver<Message<TaskEvent>>,
}

/// Everything a task reported, collected by `TaskHandle::wait`.
#[derive(Debug)]
pub struct TaskSummary {
    pub matches: Vec<MatchLocation>,
    pub progress: Vec<ProgressReport>,
    pub outcome: TaskOutcome,
}

impl TaskHandle {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Next event, `None` once the terminal outcome has been consumed.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.events.recv().await.map(|message| message.payload)
    }

    /// Drain all events until the terminal outcome.
    pub async fn wait(mut self) -> TaskSummary {
        let mut matches = Vec::new();
        let mut progress = Vec::new();
        while let Some(event) = self.next_event().await {
            match event {
                TaskEvent::Matches(batch) => matches.extend(batch),
                TaskEvent::Progress(report) => progress.push(report),
                TaskEvent::Finished(outcome) => {
                    return TaskSummary {
                        matches,
                        progress,
                        outcome,
                    }
                }
            }
        }
        TaskSummary {
            matches,
            progress,
            outcome: TaskOutcome::Error(EngineError::Process(
                "task stopped without reporting an outcome".to_string(),
            )),
        }
    }
}
