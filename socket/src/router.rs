use arcade_protocol::DecodeError;
use arcade_protocol::Message;
use arcade_protocol::RequestEnvelope;
use arcade_protocol::ResponseEnvelope;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Failure of a single request; serialized into the response `error`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("no handler registered for {0}")]
    NoHandler(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        HandlerError::Failed(message.to_string())
    }
}

pub type HandlerResult = Result<Value, HandlerError>;

type HandlerFn<M, C> = Arc<dyn Fn(C, M) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
type ObserverFn<C> = Arc<dyn Fn(&C, &RequestEnvelope) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observers<C> {
    next_id: u64,
    entries: Vec<(ObserverId, ObserverFn<C>)>,
}

/// Maps each message kind to exactly one handler and runs an ordered list
/// of observers over every inbound request.
///
/// Registration goes through `&self`, so a router can be shared with the
/// connection that dispatches into it and still be changed afterwards.
pub struct Router<M: Message, C> {
    handlers: RwLock<HashMap<M::Kind, HandlerFn<M, C>>>,
    observers: RwLock<Observers<C>>,
}

impl<M: Message, C> Default for Router<M, C> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            observers: RwLock::new(Observers {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }
}

impl<M, C> Router<M, C>
where
    M: Message,
    C: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the handler for `kind`. A second registration replaces the
    /// first and is reported.
    pub fn register<F, Fut>(&self, kind: M::Kind, handler: F)
    where
        F: Fn(C, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: HandlerFn<M, C> = Arc::new(move |ctx, message| handler(ctx, message).boxed());
        if write(&self.handlers).insert(kind, handler).is_some() {
            warn!(%kind, "replacing existing handler");
        }
    }

    pub fn unregister(&self, kind: M::Kind) -> bool {
        write(&self.handlers).remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: M::Kind) -> bool {
        read(&self.handlers).contains_key(&kind)
    }

    /// Adds an observer that sees every inbound request before its handler.
    pub fn register_any<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&C, &RequestEnvelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut observers = write(&self.observers);
        let id = ObserverId(observers.next_id);
        observers.next_id += 1;
        observers.entries.push((id, Arc::new(observer)));
        id
    }

    pub fn unregister_any(&self, id: ObserverId) -> bool {
        let mut observers = write(&self.observers);
        let before = observers.entries.len();
        observers.entries.retain(|(entry, _)| *entry != id);
        observers.entries.len() != before
    }

    /// Runs observers and the matching handler for one request.
    ///
    /// Returns the response to send back, which exists only when the request
    /// carried an id. Handler errors and panics end up in its `error` field.
    pub async fn dispatch(&self, ctx: C, request: RequestEnvelope) -> Option<ResponseEnvelope> {
        self.notify_observers(&ctx, &request);
        let id = request.id;
        let outcome = self.invoke(ctx, request).await;
        if let Err(err) = &outcome {
            debug!(?id, "request failed: {err}");
        }
        let id = id?;
        Some(match outcome {
            Ok(value) => ResponseEnvelope::ok(id, value),
            Err(err) => ResponseEnvelope::err(id, err.to_string()),
        })
    }

    fn notify_observers(&self, ctx: &C, request: &RequestEnvelope) {
        let observers: Vec<ObserverFn<C>> = read(&self.observers)
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for (index, observer) in observers.iter().enumerate() {
            match std::panic::catch_unwind(AssertUnwindSafe(|| observer(ctx, request))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(index, kind = %request.kind, "observer failed: {err}"),
                Err(panic) => warn!(
                    index,
                    kind = %request.kind,
                    "observer panicked: {}",
                    panic_message(panic.as_ref())
                ),
            }
        }
    }

    async fn invoke(&self, ctx: C, request: RequestEnvelope) -> HandlerResult {
        let kind = M::kind_from_tag(&request.kind)?;
        let handler = read(&self.handlers)
            .get(&kind)
            .cloned()
            .ok_or_else(|| HandlerError::NoHandler(kind.to_string()))?;
        let message = M::decode(kind, request.args)?;
        match AssertUnwindSafe(async move { handler(ctx, message).await })
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_protocol::BackIn;
    use arcade_protocol::BackInKind;
    use arcade_protocol::game::LogEntry;
    use arcade_protocol::game::LogLevel;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    fn request(id: Option<u64>, message: BackIn) -> RequestEnvelope {
        message.into_request(id).unwrap()
    }

    #[tokio::test]
    async fn handler_result_becomes_response() {
        let router: Router<BackIn, ()> = Router::new();
        router.register(BackInKind::GetLogs, |_, _| async { Ok(json!(["a"])) });
        let response = router
            .dispatch((), request(Some(3), BackIn::GetLogs))
            .await
            .unwrap();
        assert_eq!(response, ResponseEnvelope::ok(3, json!(["a"])));
    }

    #[tokio::test]
    async fn fire_and_forget_produces_no_response() {
        let router: Router<BackIn, ()> = Router::new();
        router.register(BackInKind::GetLogs, |_, _| async { Ok(Value::Null) });
        assert_eq!(router.dispatch((), request(None, BackIn::GetLogs)).await, None);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let router: Router<BackIn, ()> = Router::new();
        router.register(BackInKind::GetLogs, |_, _| async { Ok(json!(1)) });
        router.register(BackInKind::GetLogs, |_, _| async { Ok(json!(2)) });
        let response = router
            .dispatch((), request(Some(0), BackIn::GetLogs))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!(2)));
    }

    #[tokio::test]
    async fn unregistered_kind_falls_back_to_error() {
        let router: Router<BackIn, ()> = Router::new();
        router.register(BackInKind::GetLogs, |_, _| async { Ok(json!(1)) });
        assert!(router.is_registered(BackInKind::GetLogs));

        assert!(router.unregister(BackInKind::GetLogs));
        assert!(!router.unregister(BackInKind::GetLogs));
        assert!(!router.is_registered(BackInKind::GetLogs));
        let response = router
            .dispatch((), request(Some(4), BackIn::GetLogs))
            .await
            .unwrap();
        assert_eq!(
            response.error.as_deref(),
            Some("no handler registered for get_logs")
        );
    }

    #[tokio::test]
    async fn missing_handler_and_bad_args_are_errors() {
        let router: Router<BackIn, ()> = Router::new();
        let response = router
            .dispatch((), request(Some(1), BackIn::GetPlaylists))
            .await
            .unwrap();
        assert_eq!(
            response.error.as_deref(),
            Some("no handler registered for get_playlists")
        );

        router.register(BackInKind::AddLog, |_, _| async { Ok(Value::Null) });
        let bad = RequestEnvelope {
            id: Some(2),
            kind: "add_log".into(),
            args: vec![json!(42)],
        };
        let response = router.dispatch((), bad).await.unwrap();
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn handler_panic_is_reported_not_propagated() {
        let router: Router<BackIn, ()> = Router::new();
        router.register(BackInKind::GetLogs, |_, _| async {
            let logs: Vec<String> = Vec::new();
            if logs.is_empty() {
                panic!("log store exploded");
            }
            Ok(json!(logs))
        });
        let response = router
            .dispatch((), request(Some(9), BackIn::GetLogs))
            .await
            .unwrap();
        assert_eq!(
            response.error.as_deref(),
            Some("handler panicked: log store exploded")
        );
    }

    #[tokio::test]
    async fn observers_run_in_order_and_are_isolated() {
        let router: Router<BackIn, ()> = Router::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&seen);
        router.register_any(move |_, req| {
            first.lock().unwrap().push(format!("first:{}", req.kind));
            Err(HandlerError::failed("telemetry offline"))
        });
        router.register_any(|_, _| panic!("bad observer"));
        let last = Arc::clone(&seen);
        let last_id = router.register_any(move |_, req| {
            last.lock().unwrap().push(format!("last:{}", req.kind));
            Ok(())
        });
        let handled = Arc::clone(&seen);
        router.register(BackInKind::AddLog, move |_, message| {
            let handled = Arc::clone(&handled);
            async move {
                if let BackIn::AddLog(entry) = message {
                    handled.lock().unwrap().push(format!("handler:{}", entry.content));
                }
                Ok(Value::Null)
            }
        });

        let entry = LogEntry::now("test", LogLevel::Info, "hello");
        router
            .dispatch((), request(None, BackIn::AddLog(entry.clone())))
            .await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first:add_log".to_string(),
                "last:add_log".to_string(),
                "handler:hello".to_string(),
            ]
        );

        assert!(router.unregister_any(last_id));
        seen.lock().unwrap().clear();
        router.dispatch((), request(None, BackIn::AddLog(entry))).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
