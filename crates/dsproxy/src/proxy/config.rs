use crate::identity::{ConnectionIdGenerator, SequentialIdGenerator};
use crate::observer::{Observer, ObserverChain};
use crate::transform::{NoopTransformer, ParameterTransformer, QueryTransformer};
use std::fmt;
use std::sync::Arc;

/// Configuration shared by every proxy derived from one data source.
///
/// Built once with the `with_*` methods, then frozen behind an `Arc` when the
/// first proxy is created. Proxies only read it.
///
/// Defaults: empty name, no observers, no-op transformers, sequential ids.
pub struct ProxyConfig {
    name: String,
    observers: ObserverChain,
    query_transformer: Arc<dyn QueryTransformer>,
    parameter_transformer: Arc<dyn ParameterTransformer>,
    id_generator: Arc<dyn ConnectionIdGenerator>,
}

impl ProxyConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logical data source name reported to transformers and observers.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append an observer; observers are notified in the order added.
    pub fn with_observer<O: Observer + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Append an Arc-wrapped observer.
    pub fn with_observer_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Set the query transformer.
    pub fn with_query_transformer<T: QueryTransformer + 'static>(mut self, transformer: T) -> Self {
        self.query_transformer = Arc::new(transformer);
        self
    }

    /// Set the query transformer from an Arc.
    pub fn with_query_transformer_arc(mut self, transformer: Arc<dyn QueryTransformer>) -> Self {
        self.query_transformer = transformer;
        self
    }

    /// Set the parameter transformer.
    pub fn with_parameter_transformer<T: ParameterTransformer + 'static>(
        mut self,
        transformer: T,
    ) -> Self {
        self.parameter_transformer = Arc::new(transformer);
        self
    }

    /// Set the parameter transformer from an Arc.
    pub fn with_parameter_transformer_arc(
        mut self,
        transformer: Arc<dyn ParameterTransformer>,
    ) -> Self {
        self.parameter_transformer = transformer;
        self
    }

    /// Set the connection id policy.
    pub fn with_id_generator<G: ConnectionIdGenerator + 'static>(mut self, generator: G) -> Self {
        self.id_generator = Arc::new(generator);
        self
    }

    /// Data source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered observers.
    pub fn observers(&self) -> &ObserverChain {
        &self.observers
    }

    /// Query transformer.
    pub fn query_transformer(&self) -> &dyn QueryTransformer {
        self.query_transformer.as_ref()
    }

    /// Parameter transformer.
    pub fn parameter_transformer(&self) -> &dyn ParameterTransformer {
        self.parameter_transformer.as_ref()
    }

    /// Connection id policy.
    pub fn id_generator(&self) -> &dyn ConnectionIdGenerator {
        self.id_generator.as_ref()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            observers: ObserverChain::new(),
            query_transformer: Arc::new(NoopTransformer),
            parameter_transformer: Arc::new(NoopTransformer),
            id_generator: Arc::new(SequentialIdGenerator::new()),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("name", &self.name)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}
