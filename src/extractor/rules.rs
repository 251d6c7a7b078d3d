//! Declarative extraction rules
//!
//! A [`RuleTable`] is pure data: bean matchers paired with field-to-gauge
//! mappings. The engine in [`super::engine`] interprets tables against a
//! decoded bean sequence, so supporting another Hadoop daemon means adding
//! a table, not code.

use serde::{Deserialize, Serialize};

use crate::collector::Bean;
use crate::registry::MetricSpec;

/// Which Hadoop daemon a target endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// HDFS NameNode (`/jmx` on the NameNode HTTP port)
    NameNode,
    /// HDFS DataNode
    DataNode,
    /// HDFS JournalNode
    JournalNode,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::NameNode => write!(f, "NameNode"),
            TargetKind::DataNode => write!(f, "DataNode"),
            TargetKind::JournalNode => write!(f, "JournalNode"),
        }
    }
}

/// How a rule selects beans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeanMatcher {
    /// Exact `name` equality
    Name(&'static str),
    /// `modelerType` prefix, for per-port activity beans named dynamically
    ModelerTypePrefix(&'static str),
}

impl BeanMatcher {
    /// Does this matcher select the given bean?
    pub fn matches(&self, bean: &Bean) -> bool {
        match self {
            BeanMatcher::Name(name) => bean.name == *name,
            BeanMatcher::ModelerTypePrefix(prefix) => bean.modeler_type.starts_with(prefix),
        }
    }
}

/// One field-to-gauge mapping inside a rule.
#[derive(Debug, Clone)]
pub enum FieldMapping {
    /// Numeric field into a plain gauge (or into the rule's tag-labeled
    /// series when the rule carries a tag label)
    Scalar {
        field: &'static str,
        metric: &'static MetricSpec,
    },
    /// Numeric field into one series of a label vector, with a literal
    /// label value
    Labeled {
        field: &'static str,
        metric: &'static MetricSpec,
        value: &'static str,
    },
    /// Nested-object field; each listed key becomes one series, values
    /// republished verbatim
    Composite {
        field: &'static str,
        metric: &'static MetricSpec,
        keys: &'static [&'static str],
    },
    /// Enumerated string field mapped to ordinal codes; an unrecognized
    /// value leaves the gauge unchanged
    Enum {
        field: &'static str,
        metric: &'static MetricSpec,
        states: &'static [(&'static str, f64)],
    },
}

impl FieldMapping {
    /// The gauge family this mapping writes to
    pub fn metric(&self) -> &'static MetricSpec {
        match self {
            FieldMapping::Scalar { metric, .. }
            | FieldMapping::Labeled { metric, .. }
            | FieldMapping::Composite { metric, .. }
            | FieldMapping::Enum { metric, .. } => metric,
        }
    }
}

/// A bean matcher plus its ordered field mappings.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Bean selector
    pub matcher: BeanMatcher,
    /// Tag field (e.g. `tag.port`) whose value is prepended to the label
    /// values of every datum drawn from the matched bean
    pub tag_label: Option<&'static str>,
    /// Field mappings applied in order
    pub fields: Vec<FieldMapping>,
}

/// Everything the extractor needs for one target kind.
#[derive(Debug, Clone)]
pub struct RuleTable {
    /// Metric namespace prefix for this target
    pub namespace: &'static str,
    /// Rules applied to every bean, in order
    pub rules: Vec<ExtractionRule>,
}

impl RuleTable {
    /// Built-in table for a target kind
    pub fn for_target(kind: TargetKind) -> Self {
        match kind {
            TargetKind::NameNode => namenode_table(),
            TargetKind::DataNode => datanode_table(),
            TargetKind::JournalNode => journalnode_table(),
        }
    }

    /// Distinct metric specs referenced by this table, for up-front
    /// registration
    pub fn specs(&self) -> Vec<&'static MetricSpec> {
        let mut specs: Vec<&'static MetricSpec> = Vec::new();
        for rule in &self.rules {
            for mapping in &rule.fields {
                let metric = mapping.metric();
                if !specs.iter().any(|s| std::ptr::eq(*s, metric)) {
                    specs.push(metric);
                }
            }
        }
        specs
    }
}

/// Heap memory usage is exposed identically by every Hadoop daemon.
pub static HEAP_MEMORY_USAGE: MetricSpec = MetricSpec {
    subsystem: "memory",
    name: "heap_memory_usage_bytes",
    help: "Current heap memory of each mode in bytes",
    labels: &["mode"],
};

const HEAP_KEYS: &[&str] = &["committed", "init", "max", "used"];

/// Operational-state codes for `tag.HAState`
pub static HA_STATES: &[(&str, f64)] = &[
    ("initializing", 0.0),
    ("active", 1.0),
    ("standby", 2.0),
    ("stopping", 3.0),
];

pub mod namenode {
    //! NameNode gauge families (`hdfs_namenode` namespace)

    use crate::registry::MetricSpec;

    pub static MISSING_BLOCKS: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "missing_blocks",
        help: "Current number of missing blocks",
        labels: &[],
    };
    pub static UNDER_REPLICATED_BLOCKS: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "under_replicated_blocks",
        help: "Current number of blocks under replicated",
        labels: &[],
    };
    pub static CAPACITY: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "capacity_bytes",
        help: "Current DataNodes capacity in each mode in bytes",
        labels: &["mode"],
    };
    pub static BLOCKS_TOTAL: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "blocks_total",
        help: "Current number of allocated blocks in the system",
        labels: &[],
    };
    pub static FILES_TOTAL: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "files_total",
        help: "Current number of files and directories",
        labels: &[],
    };
    pub static CORRUPT_BLOCKS: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "corrupt_blocks",
        help: "Current number of blocks with corrupt replicas",
        labels: &[],
    };
    pub static EXCESS_BLOCKS: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "excess_blocks",
        help: "Current number of excess blocks",
        labels: &[],
    };
    pub static STALE_DATANODES: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "stale_datanodes",
        help: "Current number of DataNodes marked stale due to delayed heartbeat",
        labels: &[],
    };
    pub static HA_STATE: MetricSpec = MetricSpec {
        subsystem: "fsname_system",
        name: "hastate",
        help: "Current state of the NameNode: 0.0 (initializing), 1.0 (active), 2.0 (standby) or 3.0 (stopping)",
        labels: &[],
    };
    pub static GC_COUNT: MetricSpec = MetricSpec {
        subsystem: "jvm_metrics",
        name: "gc_count",
        help: "GC count of each type",
        labels: &["type"],
    };
    pub static GC_TIME: MetricSpec = MetricSpec {
        subsystem: "jvm_metrics",
        name: "gc_time_milliseconds",
        help: "GC time of each type in milliseconds",
        labels: &["type"],
    };
    pub static LAST_HA_TRANSITION_TIME: MetricSpec = MetricSpec {
        subsystem: "namenode_status",
        name: "last_ha_transition_time",
        help: "Last HA transition time",
        labels: &[],
    };
    pub static RPC_RECEIVED_BYTES: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "received_bytes",
        help: "Total number of received bytes",
        labels: &["port"],
    };
    pub static RPC_SENT_BYTES: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "sent_bytes",
        help: "Total number of sent bytes",
        labels: &["port"],
    };
    pub static RPC_CALL_COUNT: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "call_count",
        help: "Total number of RPC calls",
        labels: &["port", "method"],
    };
    pub static RPC_AVG_TIME: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "avg_time_milliseconds",
        help: "Average RPC time in milliseconds",
        labels: &["port", "method"],
    };
    pub static RPC_OPEN_CONNECTIONS: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "open_connections_count",
        help: "Current number of open connections",
        labels: &["port"],
    };
    pub static RPC_CALL_QUEUE_LENGTH: MetricSpec = MetricSpec {
        subsystem: "rpc_activity",
        name: "call_queue_length",
        help: "Current length of the call queue",
        labels: &["port"],
    };
}

pub mod datanode {
    //! DataNode gauge families (`hadoop_datanode` namespace)

    use crate::registry::MetricSpec;

    pub static CAPACITY: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "capacity_bytes",
        help: "DataNode capacity in each mode in bytes",
        labels: &["mode"],
    };
    pub static CACHE: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "cache_bytes",
        help: "DataNode cache capacity and usage in bytes",
        labels: &["mode"],
    };
    pub static FAILED_VOLUMES: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "failed_volumes",
        help: "Number of failed volumes",
        labels: &[],
    };
    pub static ESTIMATED_CAPACITY_LOST: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "estimated_capacity_lost_bytes",
        help: "Estimated capacity lost to failed volumes in bytes",
        labels: &[],
    };
    pub static BLOCKS_CACHED: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "blocks_cached",
        help: "Number of blocks cached",
        labels: &[],
    };
    pub static BLOCKS_FAILED_TO_CACHE: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "blocks_failed_to_cache",
        help: "Number of blocks that failed to cache",
        labels: &[],
    };
    pub static BLOCKS_FAILED_TO_UNCACHE: MetricSpec = MetricSpec {
        subsystem: "fsdataset",
        name: "blocks_failed_to_uncache",
        help: "Number of blocks that failed to uncache",
        labels: &[],
    };
}

pub mod journalnode {
    //! JournalNode gauge families (`hadoop_journalnode` namespace)

    use crate::registry::MetricSpec;

    pub static GC_COUNT: MetricSpec = MetricSpec {
        subsystem: "jvm",
        name: "gc_count",
        help: "GC count of each collector type",
        labels: &["type"],
    };
    pub static GC_TIME: MetricSpec = MetricSpec {
        subsystem: "jvm",
        name: "gc_time_milliseconds",
        help: "GC time of each collector type in milliseconds",
        labels: &["type"],
    };
}

fn namenode_table() -> RuleTable {
    use namenode::*;

    RuleTable {
        namespace: "hdfs_namenode",
        rules: vec![
            ExtractionRule {
                matcher: BeanMatcher::Name("Hadoop:service=NameNode,name=FSNamesystem"),
                tag_label: None,
                fields: vec![
                    FieldMapping::Scalar { field: "MissingBlocks", metric: &MISSING_BLOCKS },
                    FieldMapping::Scalar { field: "UnderReplicatedBlocks", metric: &UNDER_REPLICATED_BLOCKS },
                    FieldMapping::Labeled { field: "CapacityTotal", metric: &CAPACITY, value: "Total" },
                    FieldMapping::Labeled { field: "CapacityUsed", metric: &CAPACITY, value: "Used" },
                    FieldMapping::Labeled { field: "CapacityRemaining", metric: &CAPACITY, value: "Remaining" },
                    FieldMapping::Labeled { field: "CapacityUsedNonDFS", metric: &CAPACITY, value: "UsedNonDFS" },
                    FieldMapping::Scalar { field: "BlocksTotal", metric: &BLOCKS_TOTAL },
                    FieldMapping::Scalar { field: "FilesTotal", metric: &FILES_TOTAL },
                    FieldMapping::Scalar { field: "CorruptBlocks", metric: &CORRUPT_BLOCKS },
                    FieldMapping::Scalar { field: "ExcessBlocks", metric: &EXCESS_BLOCKS },
                    FieldMapping::Scalar { field: "StaleDataNodes", metric: &STALE_DATANODES },
                    FieldMapping::Enum { field: "tag.HAState", metric: &HA_STATE, states: HA_STATES },
                ],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("Hadoop:service=NameNode,name=NameNodeStatus"),
                tag_label: None,
                fields: vec![FieldMapping::Scalar {
                    field: "LastHATransitionTime",
                    metric: &LAST_HA_TRANSITION_TIME,
                }],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("Hadoop:service=NameNode,name=JvmMetrics"),
                tag_label: None,
                fields: vec![
                    FieldMapping::Labeled { field: "GcCountParNew", metric: &GC_COUNT, value: "ParNew" },
                    FieldMapping::Labeled { field: "GcCountConcurrentMarkSweep", metric: &GC_COUNT, value: "ConcurrentMarkSweep" },
                    FieldMapping::Labeled { field: "GcTimeMillisParNew", metric: &GC_TIME, value: "ParNew" },
                    FieldMapping::Labeled { field: "GcTimeMillisConcurrentMarkSweep", metric: &GC_TIME, value: "ConcurrentMarkSweep" },
                ],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("java.lang:type=Memory"),
                tag_label: None,
                fields: vec![FieldMapping::Composite {
                    field: "HeapMemoryUsage",
                    metric: &HEAP_MEMORY_USAGE,
                    keys: HEAP_KEYS,
                }],
            },
            // Per-port activity beans are named dynamically per listening
            // port, hence the prefix match and the tag-derived label.
            ExtractionRule {
                matcher: BeanMatcher::ModelerTypePrefix("RpcActivityForPort"),
                tag_label: Some("tag.port"),
                fields: vec![
                    FieldMapping::Scalar { field: "ReceivedBytes", metric: &RPC_RECEIVED_BYTES },
                    FieldMapping::Scalar { field: "SentBytes", metric: &RPC_SENT_BYTES },
                    FieldMapping::Labeled { field: "RpcQueueTimeNumOps", metric: &RPC_CALL_COUNT, value: "QueueTime" },
                    FieldMapping::Labeled { field: "RpcQueueTimeAvgTime", metric: &RPC_AVG_TIME, value: "RpcQueueTime" },
                    FieldMapping::Labeled { field: "RpcProcessingTimeAvgTime", metric: &RPC_AVG_TIME, value: "RpcProcessingTime" },
                    FieldMapping::Scalar { field: "NumOpenConnections", metric: &RPC_OPEN_CONNECTIONS },
                    FieldMapping::Scalar { field: "CallQueueLength", metric: &RPC_CALL_QUEUE_LENGTH },
                ],
            },
        ],
    }
}

fn datanode_table() -> RuleTable {
    use datanode::*;

    RuleTable {
        namespace: "hadoop_datanode",
        rules: vec![
            ExtractionRule {
                matcher: BeanMatcher::Name("Hadoop:service=DataNode,name=FSDatasetState-null"),
                tag_label: None,
                fields: vec![
                    FieldMapping::Labeled { field: "Capacity", metric: &CAPACITY, value: "Total" },
                    FieldMapping::Labeled { field: "DfsUsed", metric: &CAPACITY, value: "Used" },
                    FieldMapping::Labeled { field: "Remaining", metric: &CAPACITY, value: "Remaining" },
                    FieldMapping::Labeled { field: "CacheCapacity", metric: &CACHE, value: "Capacity" },
                    FieldMapping::Labeled { field: "CacheUsed", metric: &CACHE, value: "Used" },
                    FieldMapping::Scalar { field: "NumFailedVolumes", metric: &FAILED_VOLUMES },
                    FieldMapping::Scalar { field: "EstimatedCapacityLostTotal", metric: &ESTIMATED_CAPACITY_LOST },
                    FieldMapping::Scalar { field: "NumBlocksCached", metric: &BLOCKS_CACHED },
                    FieldMapping::Scalar { field: "NumBlocksFailedToCache", metric: &BLOCKS_FAILED_TO_CACHE },
                    FieldMapping::Scalar { field: "NumBlocksFailedToUncache", metric: &BLOCKS_FAILED_TO_UNCACHE },
                ],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("java.lang:type=Memory"),
                tag_label: None,
                fields: vec![FieldMapping::Composite {
                    field: "HeapMemoryUsage",
                    metric: &HEAP_MEMORY_USAGE,
                    keys: HEAP_KEYS,
                }],
            },
        ],
    }
}

fn journalnode_table() -> RuleTable {
    use journalnode::*;

    RuleTable {
        namespace: "hadoop_journalnode",
        rules: vec![
            ExtractionRule {
                matcher: BeanMatcher::Name("java.lang:type=GarbageCollector,name=ParNew"),
                tag_label: None,
                fields: vec![
                    FieldMapping::Labeled { field: "CollectionCount", metric: &GC_COUNT, value: "ParNew" },
                    FieldMapping::Labeled { field: "CollectionTime", metric: &GC_TIME, value: "ParNew" },
                ],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("java.lang:type=GarbageCollector,name=ConcurrentMarkSweep"),
                tag_label: None,
                fields: vec![
                    FieldMapping::Labeled { field: "CollectionCount", metric: &GC_COUNT, value: "ConcurrentMarkSweep" },
                    FieldMapping::Labeled { field: "CollectionTime", metric: &GC_TIME, value: "ConcurrentMarkSweep" },
                ],
            },
            ExtractionRule {
                matcher: BeanMatcher::Name("java.lang:type=Memory"),
                tag_label: None,
                fields: vec![FieldMapping::Composite {
                    field: "HeapMemoryUsage",
                    metric: &HEAP_MEMORY_USAGE,
                    keys: HEAP_KEYS,
                }],
            },
        ],
    }
}
