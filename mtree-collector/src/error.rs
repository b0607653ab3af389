use mtree_pattern::ParseError;
use mtree_tree::FilterError;
use thiserror::Error;

/// An error returned by [`CollectContext::add_metric`](crate::CollectContext::add_metric).
///
/// Metrics that are valid but not requested by the task are not an error, see
/// [`Admission::Filtered`](crate::Admission::Filtered).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddMetricError {
    /// The namespace could not be parsed.
    #[error("invalid namespace '{namespace}'")]
    InvalidNamespace {
        /// The namespace as passed by the collector.
        namespace: String,
        /// The reason parsing failed.
        #[source]
        source: ParseError,
    },

    /// The namespace contains elements that cannot be used when adding metrics.
    #[error("namespace '{namespace}' cannot be used for adding metrics: {reason}")]
    Unusable {
        /// The namespace as passed by the collector.
        namespace: String,
        /// What makes the namespace unusable.
        reason: &'static str,
    },

    /// The namespace matches none of the metric definitions.
    #[error("namespace '{namespace}' does not match any metric definition")]
    NoDefinitionMatch {
        /// The namespace as passed by the collector.
        namespace: String,
    },
}

/// An error returned by [`CollectContext::always_apply`](crate::CollectContext::always_apply).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid modifier selector '{selector}'")]
pub struct SelectorError {
    /// The selector as passed by the collector.
    pub selector: String,
    /// The reason parsing failed.
    #[source]
    pub source: ParseError,
}

/// An error returned by [`TaskContext::new`](crate::TaskContext::new).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("task configuration must be a JSON object, found {found}")]
pub struct TaskConfigError {
    /// The kind of JSON value that was passed instead.
    pub found: &'static str,
}

/// An error returned by [`TaskContext::load`](crate::TaskContext::load).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Nothing is stored under the key.
    #[error("no state stored under '{0}'")]
    NotFound(String),

    /// The stored value has a different type than requested.
    #[error("state stored under '{key}' is not of type {expected}")]
    TypeMismatch {
        /// The key of the stored value.
        key: String,
        /// The name of the requested type.
        expected: &'static str,
    },
}

/// An error returned by the task operations of [`ContextManager`](crate::ContextManager).
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task with this id has been loaded already.
    #[error("task '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// No task with this id has been loaded.
    #[error("task '{0}' is not loaded")]
    UnknownTask(String),

    /// Another request for the same task is in progress.
    #[error("another request for task '{0}' is in progress")]
    Busy(String),

    /// The task configuration is not a JSON object.
    #[error("invalid configuration for task '{task}'")]
    InvalidConfig {
        /// The id of the task.
        task: String,
        /// The reason the configuration was rejected.
        #[source]
        source: TaskConfigError,
    },

    /// A filter rule is invalid and filters are configured to be strict.
    #[error("invalid filters for task '{task}'")]
    InvalidFilter {
        /// The id of the task.
        task: String,
        /// The first rejected rule.
        #[source]
        source: FilterError,
    },

    /// The collector failed to set up the task.
    #[error("loading task '{task}' failed")]
    Load {
        /// The id of the task.
        task: String,
        /// The error returned by [`Collector::load`](crate::Collector::load).
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The collector failed to release the task. The task stays loaded.
    #[error("unloading task '{task}' failed")]
    Unload {
        /// The id of the task.
        task: String,
        /// The error returned by [`Collector::unload`](crate::Collector::unload).
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The collector returned an error.
    #[error("collection of task '{task}' failed")]
    Collect {
        /// The id of the task.
        task: String,
        /// The error returned by the collector.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
