//! Worker thread driving one state machine

use crate::error::{SchedulerError, SchedulerResult};
use crossbeam_channel::{bounded, Receiver, Sender};
use neu_primitives::WorkerId;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Command sent from the coordinator to a worker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvokerCommand {
    /// Prepare for a new batch
    Start,
    /// Execute the assigned transactions
    Exec,
    /// Run one commit round
    Commit,
    /// Run only the callback
    Custom,
    /// Tear down and stop the thread
    Exit,
}

/// State reported by a worker after handling a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReceiverState {
    /// Created, waiting for work
    Ready,
    /// Exec done
    FinishedExec,
    /// Commit round done
    FinishedCommit,
    /// Custom command done
    FinishedCustom,
    /// Destroyed; terminal
    Exited,
    /// The transition failed; the batch cannot continue
    Failed,
}

/// Per-worker state machine
///
/// Every method runs on the worker's own thread with exclusive access to
/// the state machine.
pub trait WorkerStateMachine: Send + 'static {
    /// Set up for a new batch
    fn on_create(&mut self) -> ReceiverState;

    /// Execute the assigned transactions
    fn on_execute_transaction(&mut self) -> ReceiverState;

    /// Run one commit round
    fn on_commit_transaction(&mut self) -> ReceiverState;

    /// Release resources
    fn on_destroy(&mut self) -> ReceiverState;
}

type CommandCallback<F> = Box<dyn FnMut(&mut F, ReceiverState) + Send>;
type SharedCallback<F> = Arc<Mutex<Option<CommandCallback<F>>>>;

/// One thread and one state machine
///
/// Commands go through a channel of capacity one. After each transition the
/// installed callback runs on the worker thread with the state machine and
/// the resulting state.
pub struct Worker<F: WorkerStateMachine> {
    id: WorkerId,
    fsm: Arc<Mutex<F>>,
    callback: SharedCallback<F>,
    sender: Option<Sender<InvokerCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl<F: WorkerStateMachine> Worker<F> {
    /// Wrap a state machine; the thread starts with `check_and_start_service`
    pub fn new(id: WorkerId, fsm: F) -> Self {
        Self {
            id,
            fsm: Arc::new(Mutex::new(fsm)),
            callback: Arc::new(Mutex::new(None)),
            sender: None,
            handle: None,
        }
    }

    /// Worker id
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The state machine
    ///
    /// Locking it while the worker runs a transition blocks until the
    /// transition and its callback are done.
    pub fn state_machine(&self) -> &Arc<Mutex<F>> {
        &self.fsm
    }

    /// Install the callback invoked after every transition
    pub fn set_command_callback<C>(&self, callback: C)
    where
        C: FnMut(&mut F, ReceiverState) + Send + 'static,
    {
        *self.callback.lock() = Some(Box::new(callback));
    }

    /// Remove the callback
    pub fn clear_command_callback(&self) {
        *self.callback.lock() = None;
    }

    /// Whether the thread is running
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the worker thread named `name`
    pub fn check_and_start_service(&mut self, name: &str) -> SchedulerResult<()> {
        if self.handle.is_some() {
            return Err(SchedulerError::AlreadyStarted(self.id));
        }
        let (sender, receiver) = bounded(1);
        let id = self.id;
        let fsm = Arc::clone(&self.fsm);
        let callback = Arc::clone(&self.callback);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(id, receiver, fsm, callback))
            .map_err(|source| SchedulerError::WorkerSpawn { worker: id, source })?;
        self.sender = Some(sender);
        self.handle = Some(handle);
        tracing::debug!(worker = id, name, "worker started");
        Ok(())
    }

    /// Hand a command to the worker thread
    ///
    /// Blocks only while a previous command has not been picked up yet.
    pub fn execute(&self, command: InvokerCommand) -> SchedulerResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(SchedulerError::NotStarted(self.id))?;
        sender
            .send(command)
            .map_err(|_| SchedulerError::WorkerDisconnected(self.id))
    }

    /// Send `Exit` and join the thread
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.sender.take() {
            // thread may already be gone
            let _ = sender.send(InvokerCommand::Exit);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = self.id, "worker thread panicked");
            }
        }
    }
}

impl<F: WorkerStateMachine> Drop for Worker<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch<F: WorkerStateMachine>(fsm: &mut F, command: InvokerCommand) -> ReceiverState {
    match command {
        InvokerCommand::Start => fsm.on_create(),
        InvokerCommand::Exec => fsm.on_execute_transaction(),
        InvokerCommand::Commit => fsm.on_commit_transaction(),
        InvokerCommand::Custom => ReceiverState::FinishedCustom,
        InvokerCommand::Exit => fsm.on_destroy(),
    }
}

fn run<F: WorkerStateMachine>(
    id: WorkerId,
    receiver: Receiver<InvokerCommand>,
    fsm: Arc<Mutex<F>>,
    callback: SharedCallback<F>,
) {
    for command in receiver.iter() {
        let mut fsm = fsm.lock();
        let state = match panic::catch_unwind(AssertUnwindSafe(|| dispatch(&mut *fsm, command))) {
            Ok(state) => state,
            Err(_) => {
                tracing::error!(worker = id, ?command, "state machine panicked");
                ReceiverState::Failed
            }
        };
        tracing::trace!(worker = id, ?command, ?state, "transition done");
        if let Some(callback) = callback.lock().as_mut() {
            callback(&mut *fsm, state);
        }
        if command == InvokerCommand::Exit {
            break;
        }
    }
    tracing::debug!(worker = id, "worker stopped");
}
