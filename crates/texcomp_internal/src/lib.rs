//! Internal crate for `texcomp`.
//!
//! This module is separated into its own crate to enable simple dynamic
//! linking for `texcomp`, and should not be used directly.
//!
//! # Examples
//!
//! ```rust
//! use texcomp_internal::prelude::*;
//!
//! let rgba = vec![128u8, 64, 32, 255].repeat(16);
//! let encoded = compress(Format::Dxt1, &rgba, 4, 4, &BptcConfig::default(), DispatchStrategy::Serial).unwrap();
//! let decoded = decompress(Format::Dxt1, &encoded, 4, 4, DispatchStrategy::Serial).unwrap();
//! assert_eq!(decoded.len(), rgba.len());
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;

/// `use texcomp_internal::prelude::*;` to import commonly used items.
pub mod prelude;

pub use codec::{compress, compress_bc7_with_stats, decompress};
pub use config::BptcConfig;
pub use dispatcher::{BlockStat, CompressionTask, StatsSink, DispatchStrategy};

// Re-export texcomp_types for convenience.
pub use texcomp_types;
