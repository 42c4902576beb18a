//! # Metrik-RS: Software Metrics Analysis Core
//!
//! A metrics-analyzer framework for a namespace-aware object-oriented
//! language. The crate consumes a materialized AST (namespaces containing
//! classes, interfaces, and traits; types containing methods, properties,
//! and constants; plus free functions) and runs a suite of software-metric
//! analyzers over it:
//!
//! - **Structural metrics**: node counts, lines of code, hierarchy shape,
//!   inheritance depth, namespace-level dependency ratios, object coupling
//! - **Complexity metrics**: cyclomatic complexity, NPath complexity,
//!   Halstead software-science measures
//! - **Composite metrics**: maintainability index, CRAP index (complexity
//!   combined with Clover test coverage)
//! - **Code rank**: a damped PageRank-style importance score over the
//!   type/function dependency graph, forward and reversed
//!
//! Analyzers declare their prerequisites and are wired and ordered by an
//! [`AnalysisSession`](metrics::session::AnalysisSession). Per-callable
//! results for the expensive analyzers are cached through a pluggable
//! [`CacheDriver`](io::cache::CacheDriver), keyed by node identity and a
//! content fingerprint, so re-analysis of an unmodified AST restores
//! bit-identical metric values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metrik_rs::analyzers::cyclomatic::CyclomaticComplexityAnalyzer;
//! use metrik_rs::metrics::session::AnalysisSession;
//! use metrik_rs::model::Project;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let project = Project::new(); // populated by an external AST builder
//!     let mut session = AnalysisSession::new();
//!     session.register(CyclomaticComplexityAnalyzer::new());
//!     session.run(&project)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Core infrastructure modules
pub mod core {
    //! Core infrastructure: errors and configuration.

    pub mod config;
    pub mod errors;
}

// The materialized AST consumed by the analyzers
pub mod model {
    //! The AST data model and traversal facade.

    mod project;
    pub mod stmt;
    pub mod visitor;

    pub use project::*;
}

// Metric value types, the analyzer contract, and the session runner
pub mod metrics {
    //! Metric values, the analyzer contract, and analyzer orchestration.

    mod types;
    pub mod session;

    pub use types::*;
}

// Metric analyzers
pub mod analyzers {
    //! The metric analyzer suite.

    pub mod coderank;
    pub mod coupling;
    pub mod crap;
    pub mod cyclomatic;
    pub mod dependency;
    pub mod halstead;
    pub mod hierarchy;
    pub mod inheritance;
    pub mod maintainability;
    pub mod node_count;
    pub mod node_loc;
    pub mod npath;
}

// I/O: result caching and coverage report parsing
pub mod io {
    //! I/O operations: metric caching and coverage reports.

    pub mod cache;
    pub mod coverage;
}

// Re-export primary types for convenience
pub use crate::core::config::MetrikConfig;
pub use crate::core::errors::{MetrikError, Result};
pub use crate::metrics::session::AnalysisSession;
pub use crate::metrics::{AnalyzerId, MetricSet, MetricValue, MetricsAnalyzer};
pub use crate::model::Project;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
