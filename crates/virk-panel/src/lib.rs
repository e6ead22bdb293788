#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/virk/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod error;
pub mod flatten;
pub mod normalize;
pub mod record;
pub mod rules;
pub mod schema;
pub mod statements;
pub mod table;
pub mod translate;
pub mod wide;

pub use assemble::{MAIN_TABLE, Panel, PanelAssembler, main_table};
pub use error::{PanelError, Result};
pub use flatten::{FlatRecord, flatten_object};
pub use normalize::{NormalizedRecord, Normalizer, RuleLayout};
pub use record::EntityKey;
pub use rules::{COMPANY, ExtractionRule, RuleCategory, RuleSet, company_rules, get_rule};
pub use statements::statements_table;
pub use table::TableBuilder;
pub use translate::translate_frame;
pub use wide::wide_table;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
