use hashbrown::HashMap;
use mtree_log::LogError;
use mtree_tree::{DefinitionError, DefinitionOptions, DefinitionTree};

/// Metadata of a defined metric.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MetricMeta {
    /// Unit of the metric value.
    pub unit: String,
    /// Whether the metric is collected when a task does not request metrics explicitly.
    pub is_default: bool,
    /// Human readable description.
    pub description: String,
}

/// The metrics and dynamic groups a plugin declares.
///
/// Definitions are built once at plugin startup and shared read-only with every collection
/// afterwards. Options set through the `set_allow_*` methods apply to metrics defined after the
/// call, so they should be set first.
///
/// ```
/// use mtree_collector::Definitions;
///
/// let mut definitions = Definitions::default();
/// definitions.set_allow_dynamic_last_element();
/// definitions
///     .define_metric("/plugin/disks/[disk]", "bytes", true, "used space per disk")
///     .unwrap();
/// definitions.define_group("disk", "name of the disk");
///
/// assert_eq!(definitions.list_default_metrics(), vec!["/plugin/disks/[disk]"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Definitions {
    tree: DefinitionTree,
    metadata: HashMap<String, MetricMeta>,
    groups: HashMap<String, String>,
}

impl Definitions {
    /// Creates empty definitions with the given options.
    pub fn new(options: DefinitionOptions) -> Self {
        Self {
            tree: DefinitionTree::new(options),
            ..Default::default()
        }
    }

    /// Defines a metric the plugin can emit.
    ///
    /// Rejected definitions are logged and returned as error. All previously defined metrics stay
    /// valid.
    pub fn define_metric(
        &mut self,
        namespace: &str,
        unit: &str,
        is_default: bool,
        description: &str,
    ) -> Result<(), DefinitionError> {
        if let Err(error) = self.tree.add_rule(namespace) {
            mtree_log::error!(
                namespace,
                error = %LogError(&error),
                "metric definition rejected"
            );
            return Err(error);
        }

        // Definitions contain names and `[group]` elements only, which render back unchanged.
        self.metadata.insert(
            namespace.to_owned(),
            MetricMeta {
                unit: unit.to_owned(),
                is_default,
                description: description.to_owned(),
            },
        );

        Ok(())
    }

    /// Sets the description of a dynamic group.
    pub fn define_group(&mut self, name: &str, description: &str) {
        self.groups.insert(name.to_owned(), description.to_owned());
    }

    /// Allows the last element of metrics to be dynamic.
    pub fn set_allow_dynamic_last_element(&mut self) {
        self.update_options(|options| options.allow_dynamic_last_element = true);
    }

    /// Allows adding metrics that are not defined, as long as their first element is.
    pub fn set_allow_adding_undefined_metrics(&mut self) {
        self.update_options(|options| options.allow_adding_undefined_metrics = true);
    }

    /// Allows metric values on every level of a definition.
    pub fn set_allow_values_at_any_level(&mut self) {
        self.update_options(|options| options.allow_values_at_any_level = true);
    }

    fn update_options(&mut self, f: impl FnOnce(&mut DefinitionOptions)) {
        let mut options = self.tree.options().clone();
        f(&mut options);
        self.tree.set_options(options);
    }

    /// Returns the tree of defined metrics.
    pub fn tree(&self) -> &DefinitionTree {
        &self.tree
    }

    /// Returns the metadata of a metric by its definition, such as `/plugin/[grp]/metric`.
    pub fn metric(&self, definition: &str) -> Option<&MetricMeta> {
        self.metadata.get(definition)
    }

    /// Returns the description of a dynamic group, or an empty string for unknown groups.
    pub fn group_description(&self, name: &str) -> &str {
        self.groups.get(name).map_or("", String::as_str)
    }

    /// Returns all defined metrics, sorted.
    pub fn list_metrics(&self) -> Vec<String> {
        self.tree.list_rules()
    }

    /// Returns the metrics flagged as default, sorted.
    pub fn list_default_metrics(&self) -> Vec<String> {
        let mut metrics: Vec<_> = self
            .metadata
            .iter()
            .filter(|(_, meta)| meta.is_default)
            .map(|(namespace, _)| namespace.clone())
            .collect();

        metrics.sort();
        metrics
    }
}
