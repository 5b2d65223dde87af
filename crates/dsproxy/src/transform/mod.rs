//! Query and parameter rewriting applied before the real driver call.
//!
//! A [`QueryTransformer`] runs once per query-producing call (plain execute,
//! prepare, batch add) and decides the SQL text the driver receives. A
//! [`ParameterTransformer`] runs when a prepared or callable statement is
//! executed or batched and decides the parameters the driver receives.
//!
//! Both answer with a [`TransformAction`]; `Abort` fails the call before the
//! driver is touched.
//!
//! # Example
//!
//! ```rust,ignore
//! use dsproxy::transform::{TransformAction, TransformContext};
//!
//! let tag = |ctx: &TransformContext<'_>| {
//!     TransformAction::Replace(format!("/* app=billing */ {}", ctx.query))
//! };
//! let config = ProxyConfig::new().with_query_transformer(tag);
//! ```

use crate::driver::StatementKind;
use crate::error::{DbError, DbResult};
use crate::sql::QueryType;
use crate::value::Parameters;
use std::sync::Arc;


/// What a transformer decided.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformAction<T> {
    /// Keep the input unchanged.
    Continue,
    /// Use this value instead.
    Replace(T),
    /// Fail the call with a transform error; the driver is not called.
    Abort(String),
}

/// Input handed to transformers.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Statement flavour the query goes through.
    pub statement: StatementKind,
    /// Configured data source name.
    pub data_source_name: &'a str,
    /// Query text.
    pub query: &'a str,
    /// Whether this call adds a batch entry.
    pub is_batch: bool,
    /// Zero-based index of the batch entry being added (entries already queued).
    pub batch_count: usize,
    /// Parameters bound so far (empty for plain statements).
    pub parameters: &'a Parameters,
}

impl<'a> TransformContext<'a> {
    /// Context for a non-batch call.
    pub fn new(
        statement: StatementKind,
        data_source_name: &'a str,
        query: &'a str,
        parameters: &'a Parameters,
    ) -> Self {
        Self {
            statement,
            data_source_name,
            query,
            is_batch: false,
            batch_count: 0,
            parameters,
        }
    }

    /// Mark this context as adding batch entry number `batch_count`.
    pub fn batch(mut self, batch_count: usize) -> Self {
        self.is_batch = true;
        self.batch_count = batch_count;
        self
    }

    /// Detected query type.
    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(self.query)
    }
}

/// Rewrites query text before it reaches the driver.
pub trait QueryTransformer: Send + Sync {
    /// Decide the query text to send.
    fn transform_query(&self, ctx: &TransformContext<'_>) -> TransformAction<String>;
}

impl<F> QueryTransformer for F
where
    F: Fn(&TransformContext<'_>) -> TransformAction<String> + Send + Sync,
{
    fn transform_query(&self, ctx: &TransformContext<'_>) -> TransformAction<String> {
        self(ctx)
    }
}

/// Rewrites bound parameters before a prepared statement runs.
pub trait ParameterTransformer: Send + Sync {
    /// Decide the parameters to send; `ctx.parameters` holds the current bindings.
    fn transform_parameters(&self, ctx: &TransformContext<'_>) -> TransformAction<Parameters>;
}

impl<F> ParameterTransformer for F
where
    F: Fn(&TransformContext<'_>) -> TransformAction<Parameters> + Send + Sync,
{
    fn transform_parameters(&self, ctx: &TransformContext<'_>) -> TransformAction<Parameters> {
        self(ctx)
    }
}

/// Transformer that never changes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransformer;

impl QueryTransformer for NoopTransformer {
    fn transform_query(&self, _ctx: &TransformContext<'_>) -> TransformAction<String> {
        TransformAction::Continue
    }
}

impl ParameterTransformer for NoopTransformer {
    fn transform_parameters(&self, _ctx: &TransformContext<'_>) -> TransformAction<Parameters> {
        TransformAction::Continue
    }
}

/// Runs several query transformers in sequence, each seeing the previous output.
pub struct CompositeQueryTransformer {
    transformers: Vec<Arc<dyn QueryTransformer>>,
}

impl CompositeQueryTransformer {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Add a transformer.
    #[allow(clippy::should_implement_trait)]
    pub fn add<T: QueryTransformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Add an Arc-wrapped transformer.
    pub fn add_arc(mut self, transformer: Arc<dyn QueryTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }
}

impl Default for CompositeQueryTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryTransformer for CompositeQueryTransformer {
    fn transform_query(&self, ctx: &TransformContext<'_>) -> TransformAction<String> {
        let mut current: Option<String> = None;
        for transformer in &self.transformers {
            let action = {
                let step = TransformContext {
                    query: current.as_deref().unwrap_or(ctx.query),
                    ..*ctx
                };
                transformer.transform_query(&step)
            };
            match action {
                TransformAction::Continue => {}
                TransformAction::Replace(query) => current = Some(query),
                abort @ TransformAction::Abort(_) => return abort,
            }
        }
        match current {
            Some(query) if query != ctx.query => TransformAction::Replace(query),
            _ => TransformAction::Continue,
        }
    }
}

/// Runs several parameter transformers in sequence, each seeing the previous output.
pub struct CompositeParameterTransformer {
    transformers: Vec<Arc<dyn ParameterTransformer>>,
}

impl CompositeParameterTransformer {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Add a transformer.
    #[allow(clippy::should_implement_trait)]
    pub fn add<T: ParameterTransformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Add an Arc-wrapped transformer.
    pub fn add_arc(mut self, transformer: Arc<dyn ParameterTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }
}

impl Default for CompositeParameterTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterTransformer for CompositeParameterTransformer {
    fn transform_parameters(&self, ctx: &TransformContext<'_>) -> TransformAction<Parameters> {
        let mut current: Option<Parameters> = None;
        for transformer in &self.transformers {
            let action = {
                let step = TransformContext {
                    parameters: current.as_ref().unwrap_or(ctx.parameters),
                    ..*ctx
                };
                transformer.transform_parameters(&step)
            };
            match action {
                TransformAction::Continue => {}
                TransformAction::Replace(params) => current = Some(params),
                abort @ TransformAction::Abort(_) => return abort,
            }
        }
        match current {
            Some(params) if params != *ctx.parameters => TransformAction::Replace(params),
            _ => TransformAction::Continue,
        }
    }
}

/// Apply `transformer`, returning the query text to forward.
pub(crate) fn rewrite_query(
    transformer: &dyn QueryTransformer,
    ctx: &TransformContext<'_>,
) -> DbResult<String> {
    match transformer.transform_query(ctx) {
        TransformAction::Continue => Ok(ctx.query.to_string()),
        TransformAction::Replace(query) => {
            tracing::trace!(
                target: "dsproxy",
                statement = ?ctx.statement,
                is_batch = ctx.is_batch,
                batch_count = ctx.batch_count,
                original = ctx.query,
                rewritten = %query,
                "query rewritten"
            );
            Ok(query)
        }
        TransformAction::Abort(reason) => {
            tracing::debug!(target: "dsproxy", query = ctx.query, %reason, "query rejected by transformer");
            Err(DbError::transform(format!("query rejected: {reason}")))
        }
    }
}

/// Apply `transformer`; `None` means the bindings stay as they are.
pub(crate) fn rewrite_parameters(
    transformer: &dyn ParameterTransformer,
    ctx: &TransformContext<'_>,
) -> DbResult<Option<Parameters>> {
    match transformer.transform_parameters(ctx) {
        TransformAction::Continue => Ok(None),
        TransformAction::Replace(params) => {
            tracing::trace!(
                target: "dsproxy",
                query = ctx.query,
                before = ctx.parameters.len(),
                after = params.len(),
                "parameters rewritten"
            );
            Ok(Some(params))
        }
        TransformAction::Abort(reason) => {
            tracing::debug!(target: "dsproxy", query = ctx.query, %reason, "parameters rejected by transformer");
            Err(DbError::transform(format!("parameters rejected: {reason}")))
        }
    }
}
