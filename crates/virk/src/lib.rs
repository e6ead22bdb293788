#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/virk/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dataset;

// Re-export the workspace libraries
pub use virk_data as data;
pub use virk_output as output;
pub use virk_panel as panel;

pub use dataset::{Dataset, OutputMode, resolve_folder};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
