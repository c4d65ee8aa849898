// Method Invoker Port
// Invocation contract provided by the registry for each remote method

use crate::domain::{ArgMap, RemoteError, RemoteValue};
use crate::port::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Receiver a method is invoked against
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// Static method: the class itself
    Static,
    /// Instance method: value produced by the shared constructor
    Instance(RemoteValue),
}

/// Transport state reachable from an invoked method
pub trait CallContext: Send {
    /// Protocol name, for diagnostics
    fn protocol(&self) -> &'static str;

    fn request(&self) -> Option<&dyn HttpRequest>;

    fn response(&mut self) -> Option<&mut dyn HttpResponse>;
}

/// Invocation contract of a remote method
///
/// Completion is reported exactly once, through the returned result.
#[async_trait]
pub trait MethodInvoker: Send + Sync {
    async fn invoke(
        &self,
        receiver: Receiver,
        args: ArgMap,
        ctx: &mut dyn CallContext,
    ) -> Result<RemoteValue, RemoteError>;

    /// Number of positional parameters when no argument specs are declared
    fn arity(&self) -> usize {
        0
    }
}

pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<RemoteValue, RemoteError>> + Send>>;

type InvokeFn = dyn Fn(Receiver, ArgMap) -> InvokeFuture + Send + Sync;

/// Closure-backed invoker for methods that need no transport state
#[derive(Clone)]
pub struct FnInvoker {
    f: Arc<InvokeFn>,
    arity: usize,
}

impl FnInvoker {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Receiver, ArgMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RemoteValue, RemoteError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |receiver, args| Box::pin(f(receiver, args)) as InvokeFuture),
            arity: 0,
        }
    }

    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Receiver, ArgMap) -> Result<RemoteValue, RemoteError> + Send + Sync + 'static,
    {
        Self::new(move |receiver, args| std::future::ready(f(receiver, args)))
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }
}

#[async_trait]
impl MethodInvoker for FnInvoker {
    async fn invoke(
        &self,
        receiver: Receiver,
        args: ArgMap,
        _ctx: &mut dyn CallContext,
    ) -> Result<RemoteValue, RemoteError> {
        (self.f)(receiver, args).await
    }

    fn arity(&self) -> usize {
        self.arity
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed outcome
    pub struct RecordingInvoker {
        outcome: Result<RemoteValue, RemoteError>,
        calls: Mutex<Vec<(Receiver, ArgMap)>>,
    }

    impl RecordingInvoker {
        pub fn returning(value: RemoteValue) -> Self {
            Self {
                outcome: Ok(value),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(err: RemoteError) -> Self {
            Self {
                outcome: Err(err),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(Receiver, ArgMap)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MethodInvoker for RecordingInvoker {
        async fn invoke(
            &self,
            receiver: Receiver,
            args: ArgMap,
            _ctx: &mut dyn CallContext,
        ) -> Result<RemoteValue, RemoteError> {
            self.calls.lock().unwrap().push((receiver, args));
            self.outcome.clone()
        }
    }

    /// Context with no transport behind it
    pub struct DetachedContext;

    impl CallContext for DetachedContext {
        fn protocol(&self) -> &'static str {
            "detached"
        }

        fn request(&self) -> Option<&dyn HttpRequest> {
            None
        }

        fn response(&mut self) -> Option<&mut dyn HttpResponse> {
            None
        }
    }
}
