//! Load/save execution: inline on the caller's thread or deferred to workers.
//!
//! Every codec call in the process goes through one codec lane. The lane
//! admits a single task at a time across all sessions and all dispatchers,
//! because codec handles are not safe for concurrent use.
//!
//! ## Deferred tasks
//!
//! [`Dispatcher::submit`] packages a task with a clone of its [`Image`] and
//! runs it on the rayon global pool. The finished task travels back over a
//! channel owned by the dispatcher; nothing is delivered until the caller
//! drives [`Dispatcher::run_pending`] or [`Dispatcher::run_until_idle`], so
//! handlers always run on the caller's thread. Each handler is called exactly
//! once, and the session clone is released right after it returns.
//!
//! Handlers for one session are delivered in the order the lane finished
//! them. Tasks from different sessions may run in any order.

use crate::error::{Result, WandError};
use crate::imaging::operations;
use crate::session::{Image, Session};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A request against one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Load(PathBuf),
    Save(PathBuf),
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Load(_) => "load",
            Task::Save(_) => "save",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Task::Load(path) | Task::Save(path) => path,
        }
    }
}

/// Completion callback of a deferred task.
pub type Handler = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// The single serialization point for codec work.
struct CodecLane {
    busy: Mutex<()>,
}

static LANE: CodecLane = CodecLane::new();

impl CodecLane {
    const fn new() -> Self {
        Self {
            busy: Mutex::new(()),
        }
    }

    /// Wait for the lane. It stays held until the returned guard drops.
    fn enter(&self) -> LaneGuard<'_> {
        match self.busy.lock() {
            Ok(held) => LaneGuard {
                _held: held,
                poisoned: false,
            },
            Err(poison) => LaneGuard {
                _held: poison.into_inner(),
                poisoned: true,
            },
        }
    }
}

struct LaneGuard<'a> {
    _held: MutexGuard<'a, ()>,
    poisoned: bool,
}

impl LaneGuard<'_> {
    /// Run `job` on the held lane. A panic inside `job` is reported as a
    /// resource error and does not poison the lane.
    fn run<R>(&self, job: impl FnOnce() -> Result<R>) -> Result<R> {
        if self.poisoned {
            return Err(WandError::Resource("codec lane is poisoned".into()));
        }
        panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
            Err(WandError::Resource(format!(
                "codec call aborted: {}",
                panic_message(payload.as_ref())
            )))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn execute(image: &Image, task: &Task) -> Result<()> {
    let mut session = image.lock();
    let Session { state, codec } = &mut *session;
    match task {
        Task::Load(path) => operations::load_image(codec, image.factory(), state, path),
        Task::Save(path) => operations::save_image(codec.as_mut(), state, path),
    }
}

fn log_outcome(task: &Task, result: &Result<()>) {
    match result {
        Ok(()) => tracing::debug!(
            task = task.name(),
            path = %task.path().display(),
            "task finished"
        ),
        Err(err) => tracing::debug!(
            task = task.name(),
            path = %task.path().display(),
            error = %err,
            "task failed"
        ),
    }
}

/// Run `task` on the calling thread, holding the lane for its duration.
pub(crate) fn run_inline(image: &Image, task: &Task) -> Result<()> {
    let lane = LANE.enter();
    let result = lane.run(|| execute(image, task));
    log_outcome(task, &result);
    result
}

struct Completion {
    image: Image,
    task: Task,
    result: Result<()>,
    handler: Handler,
}

/// How long [`Dispatcher::run_until_idle`] waits before re-checking the
/// outstanding count.
const IDLE_POLL: Duration = Duration::from_millis(10);

static GLOBAL: LazyLock<Dispatcher> = LazyLock::new(Dispatcher::new);

/// Runs deferred tasks and hands their results back to the caller.
pub struct Dispatcher {
    sender: Sender<Completion>,
    receiver: Mutex<Receiver<Completion>>,
    outstanding: AtomicUsize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Dispatcher used by [`Image::load_deferred`] and [`Image::save_deferred`].
    ///
    /// There is one completion queue per process. Handlers submitted from any
    /// thread run on whichever thread next drives
    /// [`run_pending`](Self::run_pending) or
    /// [`run_until_idle`](Self::run_until_idle), and a handler that panics
    /// unwinds through that caller. Programs with several independent drivers
    /// should give each its own [`Dispatcher`] and call [`submit`](Self::submit).
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    /// Queue `task` against `image`. `handler` runs once, during a later
    /// [`run_pending`](Self::run_pending) or
    /// [`run_until_idle`](Self::run_until_idle).
    pub fn submit(&self, image: Image, task: Task, handler: Handler) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(task = task.name(), path = %task.path().display(), "task submitted");

        let sender = self.sender.clone();
        rayon::spawn(move || {
            let lane = LANE.enter();
            let result = lane.run(|| execute(&image, &task));
            log_outcome(&task, &result);
            // Queued before the lane is released, so completions keep lane order
            let completion = Completion {
                image,
                task,
                result,
                handler,
            };
            if let Err(SendError(lost)) = sender.send(completion) {
                tracing::error!(
                    task = lost.task.name(),
                    path = %lost.task.path().display(),
                    "dispatcher gone before delivery"
                );
            }
            drop(lane);
        });
    }

    /// Tasks submitted whose handlers have not run yet.
    pub fn pending(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Deliver every finished task without blocking. Returns how many
    /// handlers ran.
    pub fn run_pending(&self) -> usize {
        let mut delivered = 0;
        while let Some(completion) = self.next_completion(None) {
            self.deliver(completion);
            delivered += 1;
        }
        delivered
    }

    /// Block until every submitted task has been delivered. Returns how many
    /// handlers ran on this call.
    pub fn run_until_idle(&self) -> usize {
        let mut delivered = 0;
        while self.pending() > 0 {
            if let Some(completion) = self.next_completion(Some(IDLE_POLL)) {
                self.deliver(completion);
                delivered += 1;
            }
        }
        delivered
    }

    /// The receiver lock is released before the handler runs, so handlers
    /// may submit or drive this dispatcher themselves.
    fn next_completion(&self, wait: Option<Duration>) -> Option<Completion> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match wait {
            None => receiver.try_recv().ok(),
            Some(timeout) => receiver.recv_timeout(timeout).ok(),
        }
    }

    fn deliver(&self, completion: Completion) {
        let Completion {
            image,
            task,
            result,
            handler,
        } = completion;
        tracing::debug!(
            task = task.name(),
            path = %task.path().display(),
            ok = result.is_ok(),
            "delivering result"
        );
        handler(result);
        drop(image);
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.run_until_idle();
        }
    }
}
