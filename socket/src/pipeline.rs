use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// An interceptor continued the chain more than once.
    #[error("next() was called more than once by the same interceptor")]
    NextCalledTwice,
    #[error("interceptor failed: {0}")]
    Interceptor(String),
}

/// How far a context travelled through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Every interceptor continued; the terminal action should run.
    Completed,
    /// Some interceptor returned without calling [`Next::run`].
    Stopped,
}

/// One step of a [`Pipeline`]. Not calling `next.run(ctx)` stops the chain.
#[async_trait]
pub trait Middleware<C: Send>: Send + Sync {
    async fn handle(&self, ctx: &mut C, next: Next<'_, C>) -> Result<(), PipelineError>;
}

/// Continuation handed to each interceptor. It runs at most once.
pub struct Next<'a, C: Send> {
    rest: &'a [Arc<dyn Middleware<C>>],
    called: &'a AtomicBool,
    reached_end: &'a AtomicBool,
}

impl<C: Send> Next<'_, C> {
    pub async fn run(&self, ctx: &mut C) -> Result<(), PipelineError> {
        if self.called.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::NextCalledTwice);
        }
        let Some((head, tail)) = self.rest.split_first() else {
            self.reached_end.store(true, Ordering::SeqCst);
            return Ok(());
        };
        let called = AtomicBool::new(false);
        head.handle(
            ctx,
            Next {
                rest: tail,
                called: &called,
                reached_end: self.reached_end,
            },
        )
        .await
    }
}

/// Ordered chain of interceptors run over a context before it is committed.
pub struct Pipeline<C: Send> {
    middleware: Vec<Arc<dyn Middleware<C>>>,
}

impl<C: Send> Default for Pipeline<C> {
    fn default() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }
}

impl<C: Send> Pipeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: impl Middleware<C> + 'static) {
        self.middleware.push(Arc::new(middleware));
    }

    pub fn with(mut self, middleware: impl Middleware<C> + 'static) -> Self {
        self.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub async fn execute(&self, ctx: &mut C) -> Result<Flow, PipelineError> {
        let called = AtomicBool::new(false);
        let reached_end = AtomicBool::new(false);
        Next {
            rest: &self.middleware,
            called: &called,
            reached_end: &reached_end,
        }
        .run(ctx)
        .await?;
        if reached_end.load(Ordering::SeqCst) {
            Ok(Flow::Completed)
        } else {
            Ok(Flow::Stopped)
        }
    }
}
