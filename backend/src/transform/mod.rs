//! Table transformation.
//!
//! - Coerce: raw cell → typed value per declared column type
//! - Filter: AND of predicates over coerced values
//! - Grouper: composite-key grouping, per-group and grand-total aggregation
//! - Columns: output column derivation
//! - View: the pure recomputation tying the above together
//! - Pipeline: upload → configuration → view

pub mod coerce;
pub mod columns;
pub mod config;
pub mod filter;
pub mod grouper;
pub mod pipeline;
pub mod view;

pub use coerce::{coerce, TypedValue};
pub use columns::derive_columns;
pub use config::{
    example_config, kinds_description, AggregationKind, FilterSpec, GroupingSpec, PredicateKind,
    SummarizationSpec, ViewConfig,
};
pub use filter::apply_filters;
pub use grouper::{group_and_aggregate, GroupedData, GROUP_KEY_SEPARATOR};
pub use pipeline::*;
pub use view::process_table;
