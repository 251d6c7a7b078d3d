//! Metric registry
//!
//! Typed gauge storage with label-vector semantics and Prometheus text
//! exposition (version 0.0.4) rendering.
//!
//! The registry is the only shared mutable resource in the exporter: polls
//! write gauges while exposition requests read them concurrently. Gauge
//! values are atomic f64 bits, family maps sit behind `RwLock`, and
//! last-write-wins is the only ordering guarantee across overlapping polls.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the counter by a specific amount
    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe gauge using atomic operations
///
/// Stored as the bit pattern of an f64 so that `set` is a single atomic
/// store.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Set the gauge to a specific value
    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Set the gauge to the current Unix timestamp
    pub fn set_to_current_time(&self) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.set(timestamp);
    }
}

/// Static descriptor of a gauge family.
///
/// Identifies a metric by (namespace, subsystem, name) plus its label
/// dimension names. The namespace comes from the registry; rules reference
/// specs, never metric-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// Subsystem segment of the metric name; may be empty
    pub subsystem: &'static str,
    /// Final segment of the metric name
    pub name: &'static str,
    /// HELP text
    pub help: &'static str,
    /// Label dimension names; empty for a plain gauge
    pub labels: &'static [&'static str],
}

/// One registered gauge family: fixed descriptor plus its live series.
#[derive(Debug)]
struct Family {
    help: &'static str,
    label_names: &'static [&'static str],
    series: RwLock<HashMap<Vec<String>, Gauge>>,
}

impl Family {
    fn new(spec: &MetricSpec) -> Self {
        Self {
            help: spec.help,
            label_names: spec.labels,
            series: RwLock::new(HashMap::new()),
        }
    }

    fn set(&self, label_values: &[&str], value: f64) {
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        {
            let series = self.series.read().expect("registry lock poisoned");
            if let Some(gauge) = series.get(&key) {
                gauge.set(value);
                return;
            }
        }
        let mut series = self.series.write().expect("registry lock poisoned");
        series.entry(key).or_insert_with(Gauge::new).set(value);
    }

    fn get(&self, label_values: &[&str]) -> Option<f64> {
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        let series = self.series.read().expect("registry lock poisoned");
        series.get(&key).map(Gauge::get)
    }
}

/// Gauge registry with a fixed namespace prefix.
pub struct Registry {
    namespace: String,
    families: RwLock<BTreeMap<String, Family>>,
}

impl Registry {
    /// Create an empty registry; `namespace` prefixes every metric name
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            families: RwLock::new(BTreeMap::new()),
        }
    }

    /// Namespace prefix
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_name(&self, spec: &MetricSpec) -> String {
        if spec.subsystem.is_empty() {
            format!("{}_{}", self.namespace, spec.name)
        } else {
            format!("{}_{}_{}", self.namespace, spec.subsystem, spec.name)
        }
    }

    /// Register a family up front so HELP/TYPE metadata is fixed before the
    /// first poll. Idempotent.
    pub fn register(&self, spec: &MetricSpec) {
        let name = self.full_name(spec);
        let mut families = self.families.write().expect("registry lock poisoned");
        families.entry(name).or_insert_with(|| Family::new(spec));
    }

    /// Set one series of a family. Returns false when the label arity does
    /// not match the declared dimensions; the caller decides whether that
    /// is worth counting.
    pub fn set(&self, spec: &MetricSpec, label_values: &[&str], value: f64) -> bool {
        if label_values.len() != spec.labels.len() {
            return false;
        }
        let name = self.full_name(spec);
        {
            let families = self.families.read().expect("registry lock poisoned");
            if let Some(family) = families.get(&name) {
                family.set(label_values, value);
                return true;
            }
        }
        let mut families = self.families.write().expect("registry lock poisoned");
        families
            .entry(name)
            .or_insert_with(|| Family::new(spec))
            .set(label_values, value);
        true
    }

    /// Read one series back; None if the series was never set
    pub fn get(&self, spec: &MetricSpec, label_values: &[&str]) -> Option<f64> {
        let name = self.full_name(spec);
        let families = self.families.read().expect("registry lock poisoned");
        families.get(&name).and_then(|f| f.get(label_values))
    }

    /// Render every family with at least one series in Prometheus text
    /// exposition format.
    ///
    /// HELP and TYPE are emitted once per family; series are sorted by
    /// label values for deterministic output.
    pub fn render(&self) -> String {
        let families = self.families.read().expect("registry lock poisoned");
        let mut output = String::with_capacity(families.len() * 120);

        for (name, family) in families.iter() {
            let series = family.series.read().expect("registry lock poisoned");
            if series.is_empty() {
                continue;
            }

            output.push_str(&format!("# HELP {} {}\n", name, escape_help(family.help)));
            output.push_str(&format!("# TYPE {} gauge\n", name));

            let mut rows: Vec<(&Vec<String>, f64)> =
                series.iter().map(|(k, g)| (k, g.get())).collect();
            rows.sort_by(|a, b| a.0.cmp(b.0));

            for (label_values, value) in rows {
                output.push_str(name);
                if !family.label_names.is_empty() {
                    let pairs: Vec<String> = family
                        .label_names
                        .iter()
                        .zip(label_values)
                        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
                        .collect();
                    output.push('{');
                    output.push_str(&pairs.join(","));
                    output.push('}');
                }
                output.push(' ');
                output.push_str(&format_value(value));
                output.push('\n');
            }
        }

        output
    }
}

/// Format a numeric value for Prometheus
///
/// - NaN → "NaN", ±Inf → "+Inf"/"-Inf"
/// - Integers are formatted without decimal point
/// - Very large/small floats use scientific notation
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

/// Escape help text: backslash and newline
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escape a label value: backslash, double-quote, newline
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
