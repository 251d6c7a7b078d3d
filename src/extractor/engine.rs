//! Rule interpreter
//!
//! Applies a [`RuleTable`] to a decoded bean sequence, writing gauges into
//! the registry. Extraction never fails: a missing or wrong-typed field is
//! skipped, counted, and logged at debug, so one odd bean cannot poison the
//! rest of the scrape.

use tracing::debug;

use crate::collector::Bean;
use crate::extractor::rules::{ExtractionRule, FieldMapping, RuleTable};
use crate::registry::Registry;

/// Outcome of one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Beans that matched at least one rule
    pub matched: usize,
    /// Expected fields that were absent or had an unusable type
    pub suppressed: usize,
}

/// Apply every rule of `table` to every bean, in order.
///
/// Duplicate writes to the same series are last-wins, following bean order.
pub fn apply(beans: &[Bean], table: &RuleTable, registry: &Registry) -> ExtractReport {
    let mut report = ExtractReport::default();

    for bean in beans {
        let mut matched = false;
        for rule in &table.rules {
            if !rule.matcher.matches(bean) {
                continue;
            }
            matched = true;
            report.suppressed += apply_rule(bean, rule, registry);
        }
        if matched {
            report.matched += 1;
        }
    }

    report
}

/// Apply one rule to one matched bean; returns the suppression count.
fn apply_rule(bean: &Bean, rule: &ExtractionRule, registry: &Registry) -> usize {
    // A rule-level tag label (e.g. tag.port) prefixes the label values of
    // every datum drawn from this bean.
    let tag_value = match rule.tag_label {
        Some(tag) => match bean.tag(tag) {
            Some(v) => Some(v),
            None => {
                debug!(bean = %bean.name, tag, "tag label missing, bean skipped");
                return rule.fields.len();
            }
        },
        None => None,
    };

    let mut suppressed = 0;

    for mapping in &rule.fields {
        match mapping {
            FieldMapping::Scalar { field, metric } => match bean.number(field) {
                Some(value) => {
                    set(registry, metric, tag_value, &[], value);
                }
                None => {
                    suppressed += 1;
                    debug!(bean = %bean.name, field, "field absent or non-numeric");
                }
            },
            FieldMapping::Labeled {
                field,
                metric,
                value: label_value,
            } => match bean.number(field) {
                Some(value) => {
                    set(registry, metric, tag_value, &[label_value], value);
                }
                None => {
                    suppressed += 1;
                    debug!(bean = %bean.name, field, "field absent or non-numeric");
                }
            },
            FieldMapping::Composite {
                field,
                metric,
                keys,
            } => match bean.field(field) {
                Some(object) => {
                    for key in *keys {
                        match object.get(key).and_then(|v| v.as_f64()) {
                            Some(value) => {
                                set(registry, metric, tag_value, &[key], value);
                            }
                            None => {
                                suppressed += 1;
                                debug!(bean = %bean.name, field, key, "composite member absent or non-numeric");
                            }
                        }
                    }
                }
                None => {
                    suppressed += keys.len();
                    debug!(bean = %bean.name, field, "composite field absent");
                }
            },
            FieldMapping::Enum {
                field,
                metric,
                states,
            } => match bean.tag(field) {
                Some(raw) => match states.iter().find(|(name, _)| *name == raw) {
                    Some((_, code)) => {
                        set(registry, metric, tag_value, &[], *code);
                    }
                    // An unrecognized state leaves the gauge at its previous
                    // value; it is not a suppression.
                    None => {
                        debug!(bean = %bean.name, field, value = raw, "unrecognized state, gauge unchanged");
                    }
                },
                None => {
                    suppressed += 1;
                    debug!(bean = %bean.name, field, "state field absent or non-string");
                }
            },
        }
    }

    suppressed
}

fn set(
    registry: &Registry,
    metric: &'static crate::registry::MetricSpec,
    tag_value: Option<&str>,
    rest: &[&str],
    value: f64,
) {
    let mut labels: Vec<&str> = Vec::with_capacity(rest.len() + 1);
    if let Some(tag) = tag_value {
        labels.push(tag);
    }
    labels.extend_from_slice(rest);
    registry.set(metric, &labels, value);
}
