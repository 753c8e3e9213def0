use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An object that knows how to tear down what a module's init set up.
#[async_trait]
pub trait Dispose: Send {
    async fn dispose(self: Box<Self>) -> anyhow::Result<()>;
}

type DisposeFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// What a module's init hands back for its later stop.
#[derive(Default)]
pub enum Disposer {
    /// Nothing to undo.
    #[default]
    None,
    Callable(DisposeFn),
    Handle(Box<dyn Dispose>),
}

impl Disposer {
    /// Teardown written as an async closure. Use `async { .. }` for synchronous work too.
    pub fn callable<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Callable(Box::new(move || Box::pin(f())))
    }

    pub fn handle<D: Dispose + 'static>(handle: D) -> Self {
        Self::Handle(Box::new(handle))
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Consumes the disposer and runs it to completion.
    ///
    /// # Errors
    /// Whatever the callable or handle reports.
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Callable(f) => f().await,
            Self::Handle(handle) => handle.dispose().await,
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Disposer::None"),
            Self::Callable(_) => f.write_str("Disposer::Callable(..)"),
            Self::Handle(_) => f.write_str("Disposer::Handle(..)"),
        }
    }
}

impl From<()> for Disposer {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Option<Self>> for Disposer {
    fn from(value: Option<Self>) -> Self {
        value.unwrap_or_default()
    }
}

impl From<Box<dyn Dispose>> for Disposer {
    fn from(handle: Box<dyn Dispose>) -> Self {
        Self::Handle(handle)
    }
}

/// Type-erased module initializer. Every call starts a fresh boot.
pub type InitFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Disposer>> + Send + Sync>;

/// Wraps an async initializer, normalizing whatever it returns into a [`Disposer`].
///
/// ```rust
/// use veneer_modules::{Disposer, init_fn};
///
/// let plain = init_fn(|| async { Ok(()) });
/// let with_cleanup = init_fn(|| async { Ok(Disposer::callable(|| async { Ok(()) })) });
/// # let _ = (plain, with_cleanup);
/// ```
pub fn init_fn<F, Fut, D>(f: F) -> InitFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<D>> + Send + 'static,
    D: Into<Disposer>,
{
    Arc::new(move || {
        let fut = f();
        Box::pin(async move { fut.await.map(Into::into) })
    })
}
