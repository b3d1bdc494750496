#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `texcomp` is a GPU texture block codec: BPTC/BC7, PVRTC and DXT/ETC1
//! encoders and decoders, plus a work dispatcher for spreading block-level
//! jobs across threads.
//!
//! This crate is a thin facade over `texcomp_internal`; see that crate's
//! documentation (and `texcomp_types` underneath it) for the actual codec
//! implementations.

pub use texcomp_internal::*;
