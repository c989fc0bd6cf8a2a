pub mod kafka;
pub mod persistence;
