//! Classification and cascading faceted filtering for border-infrastructure
//! construction works.
//!
//! Raw sheet rows are normalized by [`loader`], classified once by
//! [`classify`] into status, health, risk, priority and efficiency, and then
//! filtered through a [`filter::FilterState`]. [`facets`] computes, for each
//! facet, the values still reachable under every other active constraint.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod facets;
pub mod filter;
pub mod loader;
pub mod output;
pub mod predicate;
pub mod reports;
pub mod types;
pub mod util;

pub use config::EngineConfig;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use filter::{Facet, FilterState, QuickFilter, RangeField};
