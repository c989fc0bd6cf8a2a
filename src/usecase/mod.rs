pub mod consumer_loop;
pub mod harness_usecase;
pub mod producer_loop;
