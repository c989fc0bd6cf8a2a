#[allow(clippy::module_inception)]
pub mod cluster;
