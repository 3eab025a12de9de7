use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// Runs fire-and-forget load completions.
pub trait Spawn: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

impl<F> Spawn for F
where
    F: Fn(BoxFuture<'static, ()>) + Send + Sync,
{
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self(task)
    }
}

/// Spawns onto a tokio runtime.
///
/// Uses the handle captured at construction, else the runtime current at
/// spawn time. Without either, the task is driven on a detached thread.
#[derive(Clone, Debug, Default)]
pub struct TokioSpawner {
    handle: Option<Handle>,
}

impl TokioSpawner {
    /// Always spawn onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Capture the current runtime if there is one.
    pub fn current() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        let handle = self.handle.clone().or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => {
                handle.spawn(task);
            }
            None => {
                tracing::debug!("no tokio runtime available, driving load on a thread");
                std::thread::spawn(move || futures::executor::block_on(task));
            }
        }
    }
}
