//! Prelude module for `texcomp_internal`.
//!
//! # Examples
//!
//! ```rust
//! use texcomp_internal::prelude::*;
//!
//! let strategy = DispatchStrategy::Serial;
//! let config = BptcConfig::default();
//! ```

#[doc(inline)]
pub use crate::codec::{compress, compress_bc7_with_stats, decompress};
#[doc(inline)]
pub use crate::config::BptcConfig;
#[doc(inline)]
pub use crate::dispatcher::{BlockStat, DispatchStrategy};
#[doc(inline)]
pub use texcomp_types::{CodecError, CompressionJob, DecompressionJob, Format, Pixel};
