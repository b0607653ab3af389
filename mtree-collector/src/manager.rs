use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use mtree_log::LogError;
use mtree_tree::{FilterError, FilterTree};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CollectContext, Collection, Definitions, TaskContext, TaskError};

/// The filter rule sent for tasks that do not request specific metrics.
pub const REQUEST_ALL_METRICS: &str = "/*";

/// Controls how filter rules of a task are loaded.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Rejects loading a task if any of its filter rules is invalid.
    ///
    /// By default, invalid rules are logged and skipped.
    pub strict: bool,
}

/// Custom code gathering metrics.
pub trait Collector {
    /// The error returned when a hook or a collection fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepares a task before its first collection.
    ///
    /// Runs after the filters of the task have been loaded. An error rejects the task. The
    /// default implementation does nothing.
    fn load(&self, _task: &TaskContext) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Releases the resources of a task.
    ///
    /// An error keeps the task loaded. The default implementation does nothing.
    fn unload(&self, _task: &TaskContext) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Adds the metrics of one collection to `context`.
    fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error>;
}

/// Summary of a successful [`ContextManager::load_task`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Filter rules that were skipped because they are invalid.
    pub skipped: Vec<FilterError>,
}

impl LoadReport {
    /// Returns `true` if all filter rules were loaded.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug)]
struct Task {
    context: Arc<TaskContext>,
    filters: Arc<FilterTree>,
    busy: Arc<AtomicBool>,
}

/// Marks a task as busy until dropped.
struct TaskGuard(Arc<AtomicBool>);

impl TaskGuard {
    fn acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(Arc::clone(busy)))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Registry of the tasks loaded into a plugin.
///
/// Every task has its own configuration, state and filters, while the plugin's [`Definitions`]
/// and [`Collector`] are shared by all of them. Collections of different tasks can run
/// concurrently, but each task runs at most one collection at a time.
///
/// The registry is locked while the [`Collector::load`] and [`Collector::unload`] hooks run, so
/// hooks must not call back into the manager.
#[derive(Debug)]
pub struct ContextManager<C> {
    collector: C,
    definitions: Arc<Definitions>,
    options: FilterOptions,
    tasks: Mutex<HashMap<String, Task>>,
}

impl<C: Collector> ContextManager<C> {
    /// Creates a manager without tasks.
    pub fn new(collector: C, definitions: Definitions, options: FilterOptions) -> Self {
        Self {
            collector,
            definitions: Arc::new(definitions),
            options,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the collector run for all tasks.
    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// Returns the plugin's definitions.
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Loads a task with its configuration and the metrics it requests.
    ///
    /// `config` must be a JSON object or `null`, see [`TaskContext`]. Every rule is checked
    /// against the definitions. Invalid rules are skipped and listed in the returned report,
    /// unless [`FilterOptions::strict`] is set, in which case the task is not loaded. A task
    /// without rules, or with only [`REQUEST_ALL_METRICS`], receives all metrics.
    ///
    /// Once the filters are loaded, [`Collector::load`] runs. If it fails, the task is not loaded.
    pub fn load_task<I, S>(
        &self,
        id: &str,
        config: Value,
        rules: I,
    ) -> Result<LoadReport, TaskError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(id) {
            return Err(TaskError::AlreadyLoaded(id.to_owned()));
        }

        let context = TaskContext::new(id, config).map_err(|source| TaskError::InvalidConfig {
            task: id.to_owned(),
            source,
        })?;

        let tree = self.definitions.tree();
        let mut filters = FilterTree::with_separator(tree.options().separator);
        let mut report = LoadReport::default();

        for rule in rules {
            let rule = rule.as_ref();
            if rule == REQUEST_ALL_METRICS {
                continue;
            }

            let Err(error) = filters.add_compatible_rule(rule, tree) else {
                continue;
            };

            if self.options.strict {
                return Err(TaskError::InvalidFilter {
                    task: id.to_owned(),
                    source: error,
                });
            }

            mtree_log::warn!(task = id, error = %LogError(&error), "filter rule skipped");
            report.skipped.push(error);
        }

        if let Err(error) = self.collector.load(&context) {
            mtree_log::warn!(task = id, error = %LogError(&error), "task setup failed");
            return Err(TaskError::Load {
                task: id.to_owned(),
                source: Box::new(error),
            });
        }

        mtree_log::info!(
            task = id,
            rules = filters.list_rules().len(),
            skipped = report.skipped.len(),
            "task loaded"
        );

        tasks.insert(
            id.to_owned(),
            Task {
                context: Arc::new(context),
                filters: Arc::new(filters),
                busy: Arc::new(AtomicBool::new(false)),
            },
        );

        Ok(report)
    }

    /// Unloads a task after running [`Collector::unload`].
    ///
    /// Fails if the task is not loaded, a collection is in progress, or the hook fails. In all
    /// of these cases the task stays loaded.
    pub fn unload_task(&self, id: &str) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock();

        let task = match tasks.get(id) {
            None => return Err(TaskError::UnknownTask(id.to_owned())),
            Some(task) if task.busy.load(Ordering::Acquire) => {
                return Err(TaskError::Busy(id.to_owned()));
            }
            Some(task) => task,
        };

        if let Err(error) = self.collector.unload(&task.context) {
            mtree_log::warn!(task = id, error = %LogError(&error), "task release failed");
            return Err(TaskError::Unload {
                task: id.to_owned(),
                source: Box::new(error),
            });
        }

        tasks.remove(id);
        mtree_log::info!(task = id, "task unloaded");
        Ok(())
    }

    /// Returns `true` if a task with this id is loaded.
    pub fn is_loaded(&self, id: &str) -> bool {
        self.tasks.lock().contains_key(id)
    }

    /// Returns the context of a loaded task.
    pub fn task(&self, id: &str) -> Option<Arc<TaskContext>> {
        self.tasks.lock().get(id).map(|task| Arc::clone(&task.context))
    }

    /// Runs one collection of a task and returns the collected metrics and warnings.
    ///
    /// The task is locked for the duration of the collection. Other requests for the same task
    /// fail with [`TaskError::Busy`] in the meantime.
    pub fn collect(&self, id: &str) -> Result<Collection, TaskError> {
        let (task, filters, _guard) = {
            let tasks = self.tasks.lock();
            let task = tasks
                .get(id)
                .ok_or_else(|| TaskError::UnknownTask(id.to_owned()))?;
            let guard =
                TaskGuard::acquire(&task.busy).ok_or_else(|| TaskError::Busy(id.to_owned()))?;
            (Arc::clone(&task.context), Arc::clone(&task.filters), guard)
        };

        let mut context = CollectContext::new(task, Arc::clone(&self.definitions), filters);

        if let Err(error) = self.collector.collect(&mut context) {
            mtree_log::warn!(task = id, error = %LogError(&error), "collection failed");
            return Err(TaskError::Collect {
                task: id.to_owned(),
                source: Box::new(error),
            });
        }

        let collection = context.finish();
        mtree_log::debug!(
            task = id,
            metrics = collection.metrics.len(),
            warnings = collection.warnings.len(),
            "collection completed"
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use mtree_test::kubernetes;
    use serde_json::json;
    use similar_asserts::assert_eq;

    use crate::{AddMetricError, StateError};

    use super::*;

    struct Kubernetes;

    impl Collector for Kubernetes {
        type Error = AddMetricError;

        fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error> {
            for raw in kubernetes::ADMITTED.iter().chain(kubernetes::FILTERED) {
                context.add_metric(raw, 1, &[])?;
            }
            Ok(())
        }
    }

    struct Failing;

    impl Collector for Failing {
        type Error = AddMetricError;

        fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error> {
            context.add_metric("/kubernetes/pod/unknown", 1, &[])?;
            Ok(())
        }
    }

    /// Blocks inside the collection until the test releases it.
    struct Gate {
        entered: Barrier,
        release: Barrier,
    }

    impl Collector for Gate {
        type Error = AddMetricError;

        fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error> {
            self.entered.wait();
            self.release.wait();
            Kubernetes.collect(context)
        }
    }

    #[derive(Debug, thiserror::Error)]
    enum AgentError {
        #[error("missing config key '{0}'")]
        MissingConfig(&'static str),
        #[error("agent of user '{0}' cannot be stopped")]
        Locked(String),
        #[error(transparent)]
        State(#[from] StateError),
    }

    /// Connects to an address from the task config and counts its collections.
    #[derive(Default)]
    struct Agent {
        unloaded: Mutex<Vec<String>>,
    }

    impl Collector for Agent {
        type Error = AgentError;

        fn load(&self, task: &TaskContext) -> Result<(), Self::Error> {
            let ip = task
                .config("address.ip")
                .ok_or(AgentError::MissingConfig("address.ip"))?;
            task.store("address", ip.to_owned());
            task.store("collections", Arc::new(AtomicUsize::new(0)));
            Ok(())
        }

        fn unload(&self, task: &TaskContext) -> Result<(), Self::Error> {
            if task.config("user") == Some("root") {
                return Err(AgentError::Locked("root".to_owned()));
            }
            self.unloaded.lock().push(task.id().to_owned());
            Ok(())
        }

        fn collect(&self, context: &mut CollectContext) -> Result<(), Self::Error> {
            let collections = context.task().load::<Arc<AtomicUsize>>("collections")?;
            let count = collections.fetch_add(1, Ordering::Relaxed) + 1;
            let address = context.task().load::<String>("address")?;

            context.add_warning(format!("collection {count} of {address}"));
            let _ = context.add_metric("/agent/requests", count as u64, &[]);
            Ok(())
        }
    }

    fn agent_config() -> Value {
        json!({
            "address": {
                "ip": "192.153.25.123",
                "port": 34245
            },
            "rights": ["admin", "logger", "runner", "reader", "writer"],
            "user": "admin"
        })
    }

    fn kubernetes_definitions() -> Definitions {
        let mut definitions = Definitions::default();
        for metric in kubernetes::METRICS {
            definitions
                .define_metric(
                    metric.namespace,
                    metric.unit,
                    metric.is_default,
                    metric.description,
                )
                .unwrap();
        }
        for (name, description) in kubernetes::GROUPS {
            definitions.define_group(name, description);
        }
        definitions
    }

    fn manager<C: Collector>(collector: C, options: FilterOptions) -> ContextManager<C> {
        ContextManager::new(collector, kubernetes_definitions(), options)
    }

    fn agent_manager() -> ContextManager<Agent> {
        let mut definitions = Definitions::default();
        definitions
            .define_metric("/agent/requests", "count", true, "")
            .unwrap();
        ContextManager::new(Agent::default(), definitions, FilterOptions::default())
    }

    #[test]
    fn test_collect_kubernetes() {
        mtree_test::setup!();
        let manager = manager(Kubernetes, FilterOptions::default());

        let report = manager
            .load_task("task-1", Value::Null, kubernetes::FILTERS)
            .unwrap();
        assert!(report.is_complete());

        let collection = manager.collect("task-1").unwrap();
        assert_eq!(collection.metrics.len(), 8);
        assert!(collection.warnings.is_empty());

        // The task can be collected again once the previous collection has finished.
        let collection = manager.collect("task-1").unwrap();
        assert_eq!(collection.metrics.len(), 8);
    }

    #[test]
    fn test_request_all_metrics() {
        let manager = manager(Kubernetes, FilterOptions::default());
        manager
            .load_task("task-1", Value::Null, [REQUEST_ALL_METRICS])
            .unwrap();
        manager
            .load_task("task-2", Value::Null, Vec::<String>::new())
            .unwrap();

        for task in ["task-1", "task-2"] {
            let collection = manager.collect(task).unwrap();
            assert_eq!(collection.metrics.len(), 9);
        }
    }

    #[test]
    fn test_misconfigured_filters() {
        let mut rules = kubernetes::FILTERS.to_vec();
        rules[3] = "kubernetes/deployment/[namespace={appoptics[0-9]+}]/*/status/*";
        rules.push("/kubernetes/pod/[container]/*/*/status/*/*");

        let strict = manager(Kubernetes, FilterOptions { strict: true });
        let error = strict.load_task("task-1", Value::Null, &rules).unwrap_err();
        insta::assert_snapshot!(error.to_string(), @"invalid filters for task 'task-1'");
        assert!(matches!(
            error,
            TaskError::InvalidFilter {
                source: FilterError::Parse { .. },
                ..
            }
        ));
        assert!(!strict.is_loaded("task-1"));

        let lenient = manager(Kubernetes, FilterOptions::default());
        let report = lenient.load_task("task-1", Value::Null, &rules).unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(
            report.skipped[1],
            FilterError::NoMatchingDefinition {
                rule: "/kubernetes/pod/[container]/*/*/status/*/*".to_owned(),
            }
        );

        // The appoptics rule is missing, so its deployment is filtered now.
        let collection = lenient.collect("task-1").unwrap();
        assert_eq!(collection.metrics.len(), 7);
    }

    #[test]
    fn test_task_lifecycle() {
        let manager = manager(Kubernetes, FilterOptions::default());

        assert!(matches!(
            manager.collect("task-1"),
            Err(TaskError::UnknownTask(_))
        ));
        assert!(matches!(
            manager.unload_task("task-1"),
            Err(TaskError::UnknownTask(_))
        ));
        assert!(manager.task("task-1").is_none());

        manager
            .load_task("task-1", Value::Null, kubernetes::FILTERS)
            .unwrap();
        assert!(matches!(
            manager.load_task("task-1", Value::Null, kubernetes::FILTERS),
            Err(TaskError::AlreadyLoaded(_))
        ));

        manager.unload_task("task-1").unwrap();
        assert!(!manager.is_loaded("task-1"));
        manager
            .load_task("task-1", Value::Null, kubernetes::FILTERS)
            .unwrap();
    }

    #[test]
    fn test_busy_task() {
        let gate = Gate {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        };
        let manager = manager(gate, FilterOptions::default());
        manager
            .load_task("task-1", Value::Null, kubernetes::FILTERS)
            .unwrap();

        thread::scope(|scope| {
            let collecting = scope.spawn(|| manager.collect("task-1"));
            manager.collector().entered.wait();

            assert!(matches!(
                manager.collect("task-1"),
                Err(TaskError::Busy(_))
            ));
            assert!(matches!(
                manager.unload_task("task-1"),
                Err(TaskError::Busy(_))
            ));

            // Other tasks are independent.
            manager
                .load_task("task-2", Value::Null, kubernetes::FILTERS)
                .unwrap();
            manager.unload_task("task-2").unwrap();

            manager.collector().release.wait();
            let collection = collecting.join().unwrap().unwrap();
            assert_eq!(collection.metrics.len(), 8);
        });

        manager.unload_task("task-1").unwrap();
    }

    #[test]
    fn test_failing_collector() {
        let manager = manager(Failing, FilterOptions::default());
        manager
            .load_task("task-1", Value::Null, kubernetes::FILTERS)
            .unwrap();

        let error = manager.collect("task-1").unwrap_err();
        insta::assert_snapshot!(
            mtree_log::LogError(&error).to_string(),
            @r###"
        collection of task 'task-1' failed
          caused by: namespace '/kubernetes/pod/unknown' does not match any metric definition
        "###
        );

        // A failed collection releases the task.
        assert!(matches!(
            manager.collect("task-1"),
            Err(TaskError::Collect { .. })
        ));
    }

    #[test]
    fn test_task_config() {
        let manager = agent_manager();
        manager
            .load_task("task-1", agent_config(), ["/agent/*"])
            .unwrap();

        let task = manager.task("task-1").unwrap();
        assert_eq!(task.id(), "task-1");
        assert_eq!(
            task.config_keys(),
            vec!["address.ip", "address.port", "rights", "user"]
        );
        assert_eq!(task.config("address.port"), Some("34245"));
        assert_eq!(task.raw_config(), &agent_config());

        let error = manager
            .load_task("task-2", json!([1, 2]), ["/agent/*"])
            .unwrap_err();
        insta::assert_snapshot!(
            mtree_log::LogError(&error).to_string(),
            @r###"
        invalid configuration for task 'task-2'
          caused by: task configuration must be a JSON object, found an array
        "###
        );
        assert!(!manager.is_loaded("task-2"));
    }

    #[test]
    fn test_task_state() {
        let manager = agent_manager();
        manager
            .load_task("task-1", agent_config(), Vec::<String>::new())
            .unwrap();

        let first = manager.collect("task-1").unwrap();
        let second = manager.collect("task-1").unwrap();

        assert_eq!(first.warnings[0].message, "collection 1 of 192.153.25.123");
        assert_eq!(second.warnings[0].message, "collection 2 of 192.153.25.123");
        assert_eq!(second.metrics[0].value, mtree_metrics::MetricValue::Uint(2));

        // State is dropped with the task.
        manager.unload_task("task-1").unwrap();
        manager
            .load_task("task-1", agent_config(), Vec::<String>::new())
            .unwrap();
        let collection = manager.collect("task-1").unwrap();
        assert_eq!(collection.warnings[0].message, "collection 1 of 192.153.25.123");
    }

    #[test]
    fn test_load_hook_failure() {
        let manager = agent_manager();

        let error = manager
            .load_task("task-1", json!({"user": "admin"}), ["/agent/*"])
            .unwrap_err();
        insta::assert_snapshot!(
            mtree_log::LogError(&error).to_string(),
            @r###"
        loading task 'task-1' failed
          caused by: missing config key 'address.ip'
        "###
        );
        assert!(!manager.is_loaded("task-1"));

        manager
            .load_task("task-1", agent_config(), ["/agent/*"])
            .unwrap();
        assert!(manager.is_loaded("task-1"));
    }

    #[test]
    fn test_unload_hook() {
        let manager = agent_manager();

        let mut root = agent_config();
        root["user"] = json!("root");
        manager
            .load_task("task-1", agent_config(), Vec::<String>::new())
            .unwrap();
        manager
            .load_task("task-2", root, Vec::<String>::new())
            .unwrap();

        manager.unload_task("task-1").unwrap();
        assert_eq!(*manager.collector().unloaded.lock(), vec!["task-1".to_owned()]);

        let error = manager.unload_task("task-2").unwrap_err();
        insta::assert_snapshot!(
            mtree_log::LogError(&error).to_string(),
            @r###"
        unloading task 'task-2' failed
          caused by: agent of user 'root' cannot be stopped
        "###
        );
        assert!(manager.is_loaded("task-2"));
        assert_eq!(manager.collector().unloaded.lock().len(), 1);
    }

    #[test]
    fn test_default_hooks() {
        // Collectors without hooks accept any configuration object.
        let manager = manager(Kubernetes, FilterOptions::default());
        manager
            .load_task("task-1", json!({"interval": 10}), kubernetes::FILTERS)
            .unwrap();
        assert_eq!(
            manager.task("task-1").unwrap().config("interval"),
            Some("10")
        );
        manager.unload_task("task-1").unwrap();
    }
}
