//! Pixel storage and format mapping.

pub(crate) mod bitmap;
pub(crate) mod format;
