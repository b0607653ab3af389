//! Metric definitions and filters of a Kubernetes collector.
//!
//! The definitions span four subtrees with up to four dynamic levels, and the filters exercise
//! every filter element kind: literals at dynamic positions, wildcards, static and dynamic regular
//! expressions, and the recursive wildcard.

/// A metric definition: namespace, unit, default flag and description.
pub struct MetricDef {
    /// The namespace of the definition.
    pub namespace: &'static str,
    /// Unit of the metric value.
    pub unit: &'static str,
    /// Whether the metric is collected by default.
    pub is_default: bool,
    /// Human readable description.
    pub description: &'static str,
}

const fn def(
    namespace: &'static str,
    unit: &'static str,
    is_default: bool,
    description: &'static str,
) -> MetricDef {
    MetricDef {
        namespace,
        unit,
        is_default,
        description,
    }
}

/// All metric definitions.
pub const METRICS: &[MetricDef] = &[
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/phase/Pending",
        "",
        true,
        "time before being bound to a node, including pulling images",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/phase/Running",
        "count",
        true,
        "the pod has been bound to a node and all containers have been started",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/phase/Succeeded",
        "",
        true,
        "all containers in the pod have terminated successfully",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/phase/Failed",
        "",
        true,
        "all containers have terminated and at least one of them failed",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/phase/Unknown",
        "",
        true,
        "the state of the pod could not be obtained",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/condition/ready",
        "",
        false,
        "specifies if the pod is ready to serve requests",
    ),
    def(
        "/kubernetes/pod/[node]/[namespace]/[pod]/status/condition/scheduled",
        "",
        false,
        "status of the scheduling process for the pod",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/status/restarts",
        "",
        true,
        "number of times the container has been restarted",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/status/ready",
        "boolean",
        true,
        "specifies whether the container has passed its readiness probe",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/status/waiting",
        "",
        true,
        "value 1 if container is waiting else value 0",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/status/running",
        "",
        true,
        "value 1 if container is running else value 0",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/status/terminated",
        "",
        true,
        "value 1 if container is terminated else value 0",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/requested/cpu/cores",
        "",
        true,
        "number of cpu cores requested by a container",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/requested/memory/bytes",
        "",
        true,
        "number of memory bytes requested by a container",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/limits/cpu/cores",
        "",
        true,
        "limit of cpu cores of a container",
    ),
    def(
        "/kubernetes/container/[namespace]/[node]/[pod]/[container]/limits/memory/bytes",
        "",
        true,
        "limit of memory bytes of a container",
    ),
    def(
        "/kubernetes/node/[node]/spec/unschedulable",
        "",
        true,
        "whether a node can schedule new pods",
    ),
    def("/kubernetes/node/[node]/status/outofdisk", "", false, ""),
    def(
        "/kubernetes/node/[node]/status/allocatable/cpu/cores",
        "bytes",
        false,
        "cpu resources of a node available for scheduling",
    ),
    def(
        "/kubernetes/node/[node]/status/allocatable/memory/bytes",
        "bytes",
        false,
        "memory resources of a node available for scheduling",
    ),
    def(
        "/kubernetes/node/[node]/status/allocatable/pods",
        "bytes",
        false,
        "pod resources of a node available for scheduling",
    ),
    def(
        "/kubernetes/node/[node]/status/capacity/cpu/cores",
        "",
        false,
        "total cpu resources of the node",
    ),
    def(
        "/kubernetes/node/[node]/status/capacity/memory/bytes",
        "",
        false,
        "total memory resources of the node",
    ),
    def(
        "/kubernetes/node/[node]/status/capacity/pods",
        "",
        false,
        "total pod resources of the node",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/metadata/generation",
        "",
        true,
        "desired generation sequence number of the deployment",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/observedgeneration",
        "",
        true,
        "generation sequence number after deployment",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/targetedreplicas",
        "",
        true,
        "number of non-terminated pods targeted by the deployment",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/availablereplicas",
        "",
        true,
        "number of available pods targeted by the deployment",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/unavailablereplicas",
        "",
        true,
        "number of unavailable pods targeted by the deployment",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/updatedreplicas",
        "",
        true,
        "",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/status/deploynotfinished",
        "",
        true,
        "desired and observed generation differ",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/spec/desiredreplicas",
        "",
        false,
        "number of desired pods",
    ),
    def(
        "/kubernetes/deployment/[namespace]/[deployment]/spec/paused",
        "",
        false,
        "",
    ),
];

/// Descriptions of all dynamic groups.
pub const GROUPS: &[(&str, &str)] = &[
    ("node", "kubernetes node name"),
    ("namespace", "kubernetes namespace"),
    ("pod", "kubernetes pod"),
    ("container", "kubernetes container"),
    ("deployment", "kubernetes deployment"),
];

/// Filters of a task collecting a subset of the metrics.
pub const FILTERS: &[&str] = &[
    "/kubernetes/pod/node-125/*/*/status/*/*",
    "/kubernetes/container/*/*/*/{mycont[0-9]{3,}}/status/*",
    "/kubernetes/node/*/status/**",
    "/kubernetes/deployment/[namespace={appoptics[0-9]+}]/*/status/*",
    "/kubernetes/deployment/{loggly[0-9]+}/*/{.*}/*",
    "/kubernetes/deployment/papertrail15/*/*/*",
];

/// Namespaces that pass definitions and filters.
pub const ADMITTED: &[&str] = &[
    "/kubernetes/pod/node-125/appoptics1/pod-124/status/phase/Running",
    "/kubernetes/container/appoptics1/node-251/pod-34/mycont155/status/ready",
    "/kubernetes/container/loggly/node-251/pod-5174/mycont155/status/ready",
    "/kubernetes/node/node-124/status/outofdisk",
    "/kubernetes/node/node-124/status/allocatable/cpu/cores",
    "/kubernetes/deployment/[namespace=appoptics3]/depl-2322/status/targetedreplicas",
    "/kubernetes/deployment/[namespace=loggly12]/depl-5402/status/availablereplicas",
    "/kubernetes/deployment/[namespace=papertrail15]/depl-52/status/updatedreplicas",
];

/// Namespaces that match a definition but no filter.
pub const FILTERED: &[&str] = &["/kubernetes/pod/node-126/appoptics1/pod-124/status/phase/Running"];

/// Namespaces that match no definition.
pub const UNDEFINED: &[&str] = &[
    "/kubernetes/pod/node-126/appoptics1/pod-124/status/plase/Running",
    "/kubernetes/container/loggly/node-251/pod-5174/mycont155/status",
    "/kubernetes/container/loggly/node-251/pod-5174/mycont155/status/checking",
    "/kubernetes/deployment/[name=appoptics3]/depl-2322/status/targetedreplicas",
];
