//! Per-request configuration subsystem.
//!
//! # Data Flow
//! ```text
//! client connection (line-oriented key = value stream)
//!     → parser.rs (flat key matching, occurrence counts)
//!     → validation.rs (exactly-once rule, confidence list)
//!     → RequestConfig (resolved, defaults applied)
//!     → handed to the decode pipeline for this connection only
//! ```
//!
//! # Design Decisions
//! - A descriptor is built fresh per connection and never shared
//! - Defaults live on the schema types; the parser only overwrites
//! - Validation failures are reported to the client verbatim and leave
//!   no side effects beyond a diagnostic log line

pub mod parser;
pub mod schema;
pub mod validation;

pub use parser::parse_request;
pub use schema::{CoverageConfig, DecoderConfig, InputConfig, RequestConfig, ScoreWeights};
pub use validation::{ConfigError, MANDATORY_KEYS};
