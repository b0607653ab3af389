use std::sync::Arc;

use chrono::{DateTime, Utc};
use mtree_metrics::{Metric, MetricNamespace, MetricValue, Modifier, NamespaceElement};
use mtree_pattern::{Element, Namespace, match_ns_to_filter_with_separator};
use mtree_tree::{FilterTree, Resolution};
use serde::{Deserialize, Serialize};

use crate::{AddMetricError, Definitions, SelectorError, TaskContext};

/// The maximum number of warnings kept per collection.
pub const MAX_WARNINGS: usize = 40;

/// The maximum length of a warning message in bytes.
pub const MAX_WARNING_LEN: usize = 256;

/// Outcome of a successful [`CollectContext::add_metric`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// The metric passed definitions and filters and was recorded.
    Added,
    /// The metric is defined, but the task did not request it. It was dropped.
    Filtered,
}

/// A problem reported by a collector that did not fail the collection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Warning {
    /// The message, at most [`MAX_WARNING_LEN`] bytes long.
    pub message: String,
    /// When the warning was added.
    pub timestamp: DateTime<Utc>,
}

/// The result of one collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    /// The added metrics in order.
    pub metrics: Vec<Metric>,
    /// The warnings added by the collector.
    pub warnings: Vec<Warning>,
}

/// Identifies modifiers registered with [`CollectContext::always_apply`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ModifierHandle(usize);

#[derive(Debug)]
struct Registration {
    selector: String,
    modifiers: Vec<Modifier>,
    active: bool,
}

/// State of a single collection of a task.
///
/// The context validates every added metric against the plugin's [`Definitions`] and the task's
/// [`FilterTree`], and records the metrics that pass both. Modifiers registered during the
/// collection are dropped together with the context, while configuration and stored state of the
/// task are reachable through [`task`](Self::task).
#[derive(Debug)]
pub struct CollectContext {
    task: Arc<TaskContext>,
    definitions: Arc<Definitions>,
    filters: Arc<FilterTree>,
    metrics: Vec<Metric>,
    warnings: Vec<Warning>,
    registrations: Vec<Registration>,
}

impl CollectContext {
    /// Creates a context for one collection of `task`.
    pub fn new(
        task: Arc<TaskContext>,
        definitions: Arc<Definitions>,
        filters: Arc<FilterTree>,
    ) -> Self {
        Self {
            task,
            definitions,
            filters,
            metrics: Vec::new(),
            warnings: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// Returns the collected task.
    pub fn task(&self) -> &TaskContext {
        &self.task
    }

    /// Adds a metric.
    ///
    /// The namespace may consist of static names and bound dynamic elements (`[group=value]`).
    /// Static names at dynamic positions of the definition are bound to that position's group.
    /// `modifiers` are applied first, followed by all active modifiers registered with
    /// [`always_apply`](Self::always_apply) whose selector matches the metric.
    ///
    /// A metric that matches a definition but none of the task's filters is dropped and
    /// reported as [`Admission::Filtered`].
    pub fn add_metric(
        &mut self,
        namespace: &str,
        value: impl Into<MetricValue>,
        modifiers: &[Modifier],
    ) -> Result<Admission, AddMetricError> {
        let tree = self.definitions.tree();

        let parsed = tree
            .parse(namespace)
            .map_err(|source| AddMetricError::InvalidNamespace {
                namespace: namespace.to_owned(),
                source,
            })?;

        check_usable(&parsed, tree.has_rules(), false).map_err(|reason| {
            AddMetricError::Unusable {
                namespace: namespace.to_owned(),
                reason,
            }
        })?;

        let Some(resolution) = tree.is_valid(&parsed) else {
            return Err(AddMetricError::NoDefinitionMatch {
                namespace: namespace.to_owned(),
            });
        };

        if !self.filters.is_valid(&parsed) {
            mtree_log::trace!(task = self.task.id(), namespace, "metric filtered");
            return Ok(Admission::Filtered);
        }

        let mut metric = Metric::new(self.metric_namespace(&parsed, &resolution), value);
        if let Some(meta) = self.definitions.metric(&resolution.definition_key(&parsed)) {
            metric.unit.clone_from(&meta.unit);
            metric.description.clone_from(&meta.description);
        }

        for modifier in modifiers {
            modifier.apply(&mut metric);
        }

        if self.registrations.iter().any(|r| r.active) {
            let bound = bound_namespace(&parsed, &resolution);
            let separator = parsed.separator();

            for registration in self.registrations.iter().filter(|r| r.active) {
                let matched =
                    match_ns_to_filter_with_separator(&bound, &registration.selector, separator)
                        .unwrap_or(false);

                if matched {
                    for modifier in &registration.modifiers {
                        modifier.apply(&mut metric);
                    }
                }
            }
        }

        self.metrics.push(metric);
        Ok(Admission::Added)
    }

    fn metric_namespace(&self, parsed: &Namespace, resolution: &Resolution<'_>) -> MetricNamespace {
        parsed
            .iter()
            .zip(resolution.groups())
            .map(|(element, group)| {
                let value = element.value().unwrap_or_default();
                match group {
                    Some(group) => NamespaceElement::dynamic(
                        *group,
                        value,
                        self.definitions.group_description(group),
                    ),
                    None => NamespaceElement::new(value),
                }
            })
            .collect()
    }

    /// Returns `true` if metrics below `namespace` can pass definitions and filters.
    ///
    /// Collectors use this to skip expensive work for metrics that would be dropped. Besides the
    /// elements accepted by [`add_metric`](Self::add_metric), the namespace may contain `*` to
    /// stand for any element at that position.
    pub fn should_process(&self, namespace: &str) -> bool {
        let tree = self.definitions.tree();

        let parsed = match tree.parse(namespace) {
            Ok(parsed) => parsed,
            Err(error) => {
                mtree_log::debug!(namespace, %error, "invalid namespace, not processing");
                return false;
            }
        };

        if let Err(reason) = check_usable(&parsed, tree.has_rules(), true) {
            mtree_log::debug!(namespace, reason, "unusable namespace, not processing");
            return false;
        }

        tree.is_partially_valid(&parsed) && self.filters.is_partially_valid(&parsed)
    }

    /// Returns the filter rules of the task, sorted.
    ///
    /// Metrics are filtered automatically. This is for collectors that derive the namespaces
    /// they collect from the requested rules.
    pub fn requested_metrics(&self) -> Vec<String> {
        self.filters.list_rules()
    }

    /// Registers modifiers for all metrics matching `selector` that are added afterwards.
    ///
    /// The selector is matched as a prefix of the metric namespace with dynamic elements bound
    /// to their groups, see [`match_ns_to_filter`](mtree_pattern::match_ns_to_filter). An empty
    /// selector matches every metric.
    pub fn always_apply(
        &mut self,
        selector: &str,
        modifiers: Vec<Modifier>,
    ) -> Result<ModifierHandle, SelectorError> {
        let separator = self.definitions.tree().options().separator;

        if !selector.is_empty() && !selector.chars().eq([separator]) {
            Namespace::builder(selector)
                .separator(separator)
                .filter(true)
                .parse()
                .map_err(|source| SelectorError {
                    selector: selector.to_owned(),
                    source,
                })?;
        }

        self.registrations.push(Registration {
            selector: selector.to_owned(),
            modifiers,
            active: true,
        });

        Ok(ModifierHandle(self.registrations.len() - 1))
    }

    /// Stops applying the modifiers registered under `handle`.
    pub fn dismiss(&mut self, handle: ModifierHandle) {
        if let Some(registration) = self.registrations.get_mut(handle.0) {
            registration.active = false;
        }
    }

    /// Stops applying all modifiers registered with [`always_apply`](Self::always_apply).
    pub fn dismiss_all_modifiers(&mut self) {
        for registration in &mut self.registrations {
            registration.active = false;
        }
    }

    /// Reports a problem to the caller of the collection.
    ///
    /// Messages longer than [`MAX_WARNING_LEN`] bytes are truncated. Only the first
    /// [`MAX_WARNINGS`] warnings of a collection are kept.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        if self.warnings.len() >= MAX_WARNINGS {
            mtree_log::warn!(task = self.task.id(), "too many warnings, warning dropped");
            return;
        }

        let mut message = message.into();
        if message.len() > MAX_WARNING_LEN {
            let mut end = MAX_WARNING_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
            mtree_log::info!(task = self.task.id(), "warning message truncated");
        }

        self.warnings.push(Warning {
            message,
            timestamp: Utc::now(),
        });
    }

    /// Returns the metrics added so far.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Returns the warnings added so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Consumes the context and returns the added metrics in order.
    pub fn into_metrics(self) -> Vec<Metric> {
        self.metrics
    }

    /// Consumes the context and returns metrics and warnings.
    pub fn finish(self) -> Collection {
        Collection {
            metrics: self.metrics,
            warnings: self.warnings,
        }
    }
}

/// Checks that the namespace can be used to add or query metrics.
///
/// `*` is accepted if `allow_any` is set. Bound dynamic elements need definitions to resolve
/// their group.
fn check_usable(
    namespace: &Namespace,
    has_definitions: bool,
    allow_any: bool,
) -> Result<(), &'static str> {
    if namespace.len() < 2 {
        return Err("at least two elements required");
    }

    if !matches!(namespace[0], Element::StaticLiteral(_)) {
        return Err("first element must be a static name");
    }

    for element in &namespace[1..] {
        match element {
            Element::StaticLiteral(_) => (),
            Element::StaticWildcard if allow_any => (),
            Element::DynamicSpecific { .. } if has_definitions => (),
            Element::DynamicSpecific { .. } => {
                return Err("bound dynamic elements require metric definitions");
            }
            _ => return Err("only names and bound groups are allowed"),
        }
    }

    Ok(())
}

/// Renders the namespace with every dynamic position as `[group=value]`.
fn bound_namespace(parsed: &Namespace, resolution: &Resolution<'_>) -> String {
    let mut bound = String::new();

    for (element, group) in parsed.iter().zip(resolution.groups()) {
        bound.push(parsed.separator());
        let value = element.value().unwrap_or_default();
        match group {
            Some(group) => {
                bound.push('[');
                bound.push_str(group);
                bound.push('=');
                bound.push_str(value);
                bound.push(']');
            }
            None => bound.push_str(value),
        }
    }

    bound
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use mtree_metrics::MetricType;
    use mtree_test::kubernetes;
    use similar_asserts::assert_eq;

    use super::*;

    fn kubernetes_context() -> CollectContext {
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

        context(definitions, kubernetes::FILTERS)
    }

    fn context(definitions: Definitions, rules: &[&str]) -> CollectContext {
        let mut filters = FilterTree::new();
        for rule in rules {
            filters
                .add_compatible_rule(rule, definitions.tree())
                .unwrap();
        }

        let task = TaskContext::new("task-1", serde_json::Value::Null).unwrap();
        CollectContext::new(Arc::new(task), Arc::new(definitions), Arc::new(filters))
    }

    fn plugin_context() -> CollectContext {
        let mut definitions = Definitions::default();
        definitions
            .define_metric("/plugin/group1/metric1", "ms", true, "first metric")
            .unwrap();
        definitions
            .define_metric("/plugin/group3/[dyn1]/metric4", "", false, "")
            .unwrap();
        definitions.define_group("dyn1", "first dynamic group");

        context(definitions, &[])
    }

    #[test]
    fn test_kubernetes_add_metric() {
        mtree_test::setup!();
        let mut ctx = kubernetes_context();

        for raw in kubernetes::ADMITTED {
            assert_eq!(ctx.add_metric(raw, 1, &[]), Ok(Admission::Added), "{raw}");
        }
        for raw in kubernetes::FILTERED {
            assert_eq!(ctx.add_metric(raw, 1, &[]), Ok(Admission::Filtered), "{raw}");
        }
        for raw in kubernetes::UNDEFINED {
            assert_eq!(
                ctx.add_metric(raw, 1, &[]),
                Err(AddMetricError::NoDefinitionMatch {
                    namespace: (*raw).to_owned(),
                })
            );
        }

        let metrics = ctx.into_metrics();
        assert_eq!(metrics.len(), 8);

        let first = &metrics[0];
        assert_eq!(first.unit, "count");
        assert_eq!(
            first.description,
            "the pod has been bound to a node and all containers have been started"
        );
        assert_eq!(
            first.namespace.to_string(),
            "/kubernetes/pod/node-125/appoptics1/pod-124/status/phase/Running"
        );
        assert_eq!(
            first.namespace.at(2),
            Some(&NamespaceElement::dynamic(
                "node",
                "node-125",
                "kubernetes node name"
            ))
        );
        assert_eq!(first.namespace.dynamic_elements().count(), 3);

        let deployment = &metrics[5];
        assert_eq!(
            deployment.namespace.at(2),
            Some(&NamespaceElement::dynamic(
                "namespace",
                "appoptics3",
                "kubernetes namespace"
            ))
        );
        assert_eq!(
            deployment.description,
            "number of non-terminated pods targeted by the deployment"
        );
    }

    #[test]
    fn test_kubernetes_should_process() {
        let ctx = kubernetes_context();
        let cases = [
            ("/kubernetes/deployment/*/*/spec/paused", true),
            ("/kubernetes/deployment/*/*/spec/*", true),
            ("/kubernetes/deployment/*/*/*/paused", true),
            ("/kubernetes/deployment/*/*/*/*", true),
            ("/kubernetes/deployment/*/*/*/*/*", false),
            ("/kubernetes/deployment/*/*/*", true),
            ("/kubernetes/deployment/*/*/spec/paused/*", false),
            ("/kubernetes/deployment/*/depl-01/spec/paused", true),
            ("/kubernetes/deployment/papertrail15/*/spec/paused", true),
            ("/kubernetes/deployment/papertrail16/*/spec/paused", false),
            ("/kubernetes/deployment/papertrail15/depl-01/spec/paused", true),
            ("/kubernetes/deployment/papertrail15/depl-01/spec", true),
            ("/kubernetes/deployment/papertrail15/depl-01", true),
            ("/kubernetes/deployment/papertrail15", true),
            ("/kubernetes/deployment/papertrail16", false),
            ("/kubernetes/deployment/*", true),
            ("/kubernetes/deployment", true),
            ("/kubernetes", false),
            ("/kubernetes/pod/node-126/appoptics1/pod-124/status/plase/Running", false),
            ("/kubernetes/container/loggly/node-251/pod-5174/mycont155/status", true),
            ("/kubernetes/container/loggly/node-251/pod-5174/mycont155/status/checking", false),
            ("/kubernetes/deployment/[name=appoptics3]/depl-2322/status/targetedreplicas", false),
        ];

        for (raw, expected) in cases {
            assert_eq!(ctx.should_process(raw), expected, "{raw}");
        }

        for raw in kubernetes::ADMITTED {
            assert!(ctx.should_process(raw), "{raw}");
        }
        for raw in kubernetes::FILTERED {
            assert!(!ctx.should_process(raw), "{raw}");
        }
    }

    #[test]
    fn test_kubernetes_requested_metrics() {
        let ctx = kubernetes_context();
        insta::assert_debug_snapshot!(ctx.requested_metrics(), @r###"
        [
            "/kubernetes/container/*/*/*/{mycont[0-9]{3,}}/status/*",
            "/kubernetes/deployment/[namespace={appoptics[0-9]+}]/*/status/*",
            "/kubernetes/deployment/papertrail15/*/*/*",
            "/kubernetes/deployment/{loggly[0-9]+}/*/{.*}/*",
            "/kubernetes/node/*/status/**",
            "/kubernetes/pod/node-125/*/*/status/*/*",
        ]
        "###);
    }

    #[test]
    fn test_without_definitions() {
        let mut ctx = context(
            Definitions::default(),
            &[
                "/plugin/group1/subgroup1/metric1",
                "/plugin/group2/{id.*}/metric1",
                "/plugin/group3/subgroup3/{.*}",
                "/plugin/group3/subgroup4/**",
            ],
        );

        let timestamp = Utc.with_ymd_and_hms(2020, 10, 13, 12, 13, 14).unwrap();
        let tags = BTreeMap::from([
            ("a".to_owned(), "b".to_owned()),
            ("c".to_owned(), "d".to_owned()),
        ]);

        let added = [
            (
                "/plugin/group1/subgroup1/metric1",
                vec![Modifier::Description("metric1 custom description".to_owned())],
            ),
            (
                "/plugin/group2/id12/metric1",
                vec![
                    Modifier::Unit("MU".to_owned()),
                    Modifier::Timestamp(timestamp),
                ],
            ),
            (
                "/plugin/group3/subgroup3/metric4",
                vec![Modifier::Tags(tags.clone())],
            ),
            ("/plugin/group3/subgroup4/metric4", vec![]),
            ("/plugin/group3/subgroup4/sub5/metric6", vec![]),
        ];

        for (raw, modifiers) in &added {
            assert!(ctx.should_process(raw), "{raw}");
            assert_eq!(ctx.add_metric(raw, 10, modifiers), Ok(Admission::Added));
        }

        let rejected = [
            "/plugin/group3/subgroup3/metric$4",
            "/plugin/group3/subgroup4/sub()5/metric6",
            "some/plugin/group1/subgroup1/metric1",
        ];
        for raw in rejected {
            assert!(!ctx.should_process(raw), "{raw}");
            assert!(matches!(
                ctx.add_metric(raw, 10, &[]),
                Err(AddMetricError::InvalidNamespace { .. })
            ));
        }

        let bound = "/plugin/group2/[subgroup2=id12]/metric1";
        assert!(!ctx.should_process(bound));
        assert_eq!(
            ctx.add_metric(bound, 20, &[]),
            Err(AddMetricError::Unusable {
                namespace: bound.to_owned(),
                reason: "bound dynamic elements require metric definitions",
            })
        );

        let metrics = ctx.into_metrics();
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0].description, "metric1 custom description");
        assert_eq!(metrics[1].unit, "MU");
        assert_eq!(metrics[1].timestamp, timestamp);
        assert_eq!(metrics[2].tags, tags);
        assert!(metrics.iter().all(|m| m.namespace.dynamic_elements().count() == 0));
    }

    #[test]
    fn test_end_to_end() {
        let mut definitions = Definitions::default();
        definitions
            .define_metric("/plugin/group1/metric1", "", false, "")
            .unwrap();
        definitions
            .define_metric("/plugin/group3/[dyn1]/metric4", "", false, "")
            .unwrap();
        let mut ctx = context(definitions, &["/plugin/group3/[dyn1=id1]/metric4"]);

        // Once a task has filters, only metrics matching one of them are recorded.
        assert_eq!(
            ctx.add_metric("/plugin/group1/metric1", 10, &[]),
            Ok(Admission::Filtered)
        );
        assert_eq!(
            ctx.add_metric("/plugin/group3/id1/metric4", 5, &[]),
            Ok(Admission::Added)
        );
        assert_eq!(
            ctx.add_metric("/plugin/group3/id2/metric4", 5, &[]),
            Ok(Admission::Filtered)
        );

        let metrics = ctx.into_metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(
            metrics[0].namespace.at(2),
            Some(&NamespaceElement::dynamic("dyn1", "id1", ""))
        );
    }

    #[test]
    fn test_metadata_and_value() {
        let mut ctx = plugin_context();
        ctx.add_metric("/plugin/group1/metric1", 1.5, &[]).unwrap();
        ctx.add_metric("/plugin/group3/[dyn1=id7]/metric4", true, &[])
            .unwrap();

        let metrics = ctx.metrics();
        assert_eq!(metrics[0].unit, "ms");
        assert_eq!(metrics[0].description, "first metric");
        assert_eq!(metrics[0].value, MetricValue::Float(1.5));
        assert_eq!(metrics[0].ty, MetricType::Unknown);

        assert_eq!(metrics[1].value, MetricValue::Bool(true));
        assert_eq!(
            metrics[1].namespace.at(2),
            Some(&NamespaceElement::dynamic(
                "dyn1",
                "id7",
                "first dynamic group"
            ))
        );
        assert!(metrics[1].namespace.has_element_on("id7", 2));
    }

    #[test]
    fn test_unusable_namespaces() {
        let mut ctx = plugin_context();

        let cases = [
            ("/plugin", "at least two elements required"),
            ("/[dyn1=id1]/metric4", "first element must be a static name"),
            ("/plugin/group3/[dyn1]/metric4", "only names and bound groups are allowed"),
            ("/plugin/group3/*/metric4", "only names and bound groups are allowed"),
        ];

        for (raw, reason) in cases {
            assert_eq!(
                ctx.add_metric(raw, 1, &[]),
                Err(AddMetricError::Unusable {
                    namespace: raw.to_owned(),
                    reason,
                })
            );
        }

        assert!(ctx.should_process("/plugin/group3/*/metric4"));
        assert!(!ctx.should_process("/plugin/group3/[dyn1]/metric4"));
        assert!(ctx.metrics().is_empty());
    }

    #[test]
    fn test_always_apply() {
        let mut ctx = plugin_context();

        let group3 = ctx
            .always_apply("/plugin/group3", vec![Modifier::tag("scope", "group3")])
            .unwrap();
        ctx.always_apply(
            "/plugin/[dyn1={id[0-9]}]/**",
            vec![Modifier::tag("never", "matches")],
        )
        .unwrap();
        ctx.always_apply("/plugin/group3/[dyn1]", vec![Modifier::remove_tag("custom")])
            .unwrap();
        ctx.always_apply("", vec![Modifier::Type(MetricType::Sum)])
            .unwrap();

        let custom = [Modifier::tag("custom", "1")];
        ctx.add_metric("/plugin/group1/metric1", 1, &custom).unwrap();
        ctx.add_metric("/plugin/group3/id1/metric4", 1, &custom)
            .unwrap();

        ctx.dismiss(group3);
        ctx.add_metric("/plugin/group3/id2/metric4", 1, &[]).unwrap();

        ctx.dismiss_all_modifiers();
        ctx.add_metric("/plugin/group3/id3/metric4", 1, &[]).unwrap();

        let metrics = ctx.into_metrics();
        let tags: Vec<_> = metrics
            .iter()
            .map(|m| m.tags.keys().map(String::as_str).collect::<Vec<_>>())
            .collect();
        assert_eq!(
            tags,
            vec![vec!["custom"], vec!["scope"], vec![], vec![]]
        );

        let types: Vec<_> = metrics.iter().map(|m| m.ty).collect();
        assert_eq!(
            types,
            vec![
                MetricType::Sum,
                MetricType::Sum,
                MetricType::Sum,
                MetricType::Unknown
            ]
        );
    }

    #[test]
    fn test_warnings() {
        mtree_test::setup!();
        let mut ctx = plugin_context();
        let before = Utc::now();

        ctx.add_warning(format!("{}é", "a".repeat(MAX_WARNING_LEN - 1)));
        ctx.add_warning("x".repeat(MAX_WARNING_LEN));
        for i in 2..=MAX_WARNINGS {
            ctx.add_warning(format!("warning {i}"));
        }

        let warnings = ctx.warnings();
        assert_eq!(warnings.len(), MAX_WARNINGS);
        // The two-byte character would end past the limit, so it is dropped entirely.
        assert_eq!(warnings[0].message, "a".repeat(MAX_WARNING_LEN - 1));
        assert_eq!(warnings[1].message.len(), MAX_WARNING_LEN);
        assert_eq!(warnings[MAX_WARNINGS - 1].message, "warning 39");
        assert!(warnings.iter().all(|w| w.timestamp >= before));

        ctx.add_metric("/plugin/group1/metric1", 1, &[]).unwrap();
        let collection = ctx.finish();
        assert_eq!(collection.metrics.len(), 1);
        assert_eq!(collection.warnings.len(), MAX_WARNINGS);
        assert_eq!(collection.warnings[2].message, "warning 2");
    }

    #[test]
    fn test_task_context() {
        let mut definitions = Definitions::default();
        definitions
            .define_metric("/plugin/group1/metric1", "", false, "")
            .unwrap();

        let task = Arc::new(
            TaskContext::new("task-7", serde_json::json!({"interval": 30})).unwrap(),
        );
        let ctx = CollectContext::new(
            Arc::clone(&task),
            Arc::new(definitions),
            Arc::new(FilterTree::new()),
        );

        assert_eq!(ctx.task().id(), "task-7");
        assert_eq!(ctx.task().config("interval"), Some("30"));

        ctx.task().store("cursor", 12u64);
        assert_eq!(task.load::<u64>("cursor"), Ok(12));
    }

    #[test]
    fn test_invalid_selector() {
        let mut ctx = plugin_context();
        let error = ctx
            .always_apply("/plugin/{[0-9}", vec![Modifier::tag("a", "b")])
            .unwrap_err();
        assert_eq!(error.selector, "/plugin/{[0-9}");
        assert!(ctx.always_apply("/", vec![]).is_ok());
    }
}
