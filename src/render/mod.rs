pub(crate) mod canvas;
pub(crate) mod composite;
pub(crate) mod cpu;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;
pub(crate) mod image;
pub(crate) mod ops;
pub(crate) mod target;
