//! Simpler 4x4-block formats that share the framework with BPTC and PVRTC
//! but need no mode search: an endpoint pair plus a fixed-width index table.

pub mod dxt1;
pub mod dxt5;
pub mod etc1;
