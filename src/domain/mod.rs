pub mod cluster;
pub mod outcome;
pub mod ports;
pub mod record;
pub mod topic;
