use super::config::ProxyConfig;
use crate::driver::TargetKind;
use crate::error::DbResult;
use crate::identity::ConnectionInfo;
use crate::observer::{CallEnvelope, CallResult, ExecutionRecord};
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Next process-wide call number, starting at 1.
pub(crate) fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1
}

/// Method identity and arguments of one intercepted call.
#[derive(Debug)]
pub(crate) struct Call {
    method: &'static str,
    args: Vec<Value>,
    execution: Option<ExecutionRecord>,
}

impl Call {
    pub(crate) fn new(method: &'static str) -> Self {
        Self {
            method,
            args: Vec::new(),
            execution: None,
        }
    }

    pub(crate) fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub(crate) fn execution(mut self, record: ExecutionRecord) -> Self {
        self.execution = Some(record);
        self
    }
}

/// Routes calls of one proxied object through the observer chain.
///
/// Every proxy owns one. Children (statements from a connection, result sets
/// from a statement) get a copy pointing at the same config and identity.
#[derive(Debug, Clone)]
pub(crate) struct Interceptor {
    config: Arc<ProxyConfig>,
    connection: Option<Arc<ConnectionInfo>>,
    target: TargetKind,
}

impl Interceptor {
    pub(crate) fn new(
        config: Arc<ProxyConfig>,
        connection: Option<Arc<ConnectionInfo>>,
        target: TargetKind,
    ) -> Self {
        Self {
            config,
            connection,
            target,
        }
    }

    /// Interceptor for an object derived from this one.
    pub(crate) fn child(&self, target: TargetKind) -> Self {
        Self {
            config: self.config.clone(),
            connection: self.connection.clone(),
            target,
        }
    }

    pub(crate) fn config(&self) -> &Arc<ProxyConfig> {
        &self.config
    }

    pub(crate) fn connection(&self) -> Option<&Arc<ConnectionInfo>> {
        self.connection.as_ref()
    }

    pub(crate) fn data_source_name(&self) -> &str {
        self.config.name()
    }

    fn envelope(&self, call: Call) -> CallEnvelope<'_> {
        CallEnvelope {
            sequence: next_sequence(),
            connection: self.connection.as_deref(),
            data_source_name: self.config.name(),
            target: self.target,
            method: call.method,
            args: call.args,
            execution: call.execution,
            elapsed: std::time::Duration::ZERO,
            result: None,
            thrown: None,
        }
    }

    /// Run a synchronous delegate between the before and after notifications.
    ///
    /// The delegate's outcome is returned as is.
    pub(crate) fn invoke<T>(
        &self,
        call: Call,
        summarize: impl FnOnce(&T) -> CallResult,
        delegate: impl FnOnce() -> DbResult<T>,
    ) -> DbResult<T> {
        let observers = self.config.observers();
        let mut envelope = self.envelope(call);
        observers.notify_before(&envelope);

        let start = Instant::now();
        let outcome = delegate();
        envelope.elapsed = start.elapsed();

        match &outcome {
            Ok(value) => envelope.result = Some(summarize(value)),
            Err(err) => envelope.thrown = Some(err),
        }
        observers.notify_after(&envelope);
        outcome
    }

    /// Async counterpart of [`invoke`](Self::invoke).
    ///
    /// The delegate future is only created after the before notification, so
    /// drivers that start work eagerly are still observed in order.
    pub(crate) async fn invoke_async<T, F, Fut>(
        &self,
        call: Call,
        summarize: impl FnOnce(&T) -> CallResult,
        delegate: F,
    ) -> DbResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let observers = self.config.observers();
        let mut envelope = self.envelope(call);
        observers.notify_before(&envelope);

        let start = Instant::now();
        let outcome = delegate().await;
        envelope.elapsed = start.elapsed();

        match &outcome {
            Ok(value) => envelope.result = Some(summarize(value)),
            Err(err) => envelope.thrown = Some(err),
        }
        observers.notify_after(&envelope);
        outcome
    }
}
