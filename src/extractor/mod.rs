//! Rule-driven field extraction
//!
//! One generic interpreter plus per-daemon rule tables. The tables are
//! data; the engine is the only code path from beans to gauges.

pub mod engine;
pub mod rules;

pub use engine::{apply, ExtractReport};
pub use rules::{BeanMatcher, ExtractionRule, FieldMapping, RuleTable, TargetKind};
