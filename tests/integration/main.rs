//! Integration test suite

mod config_test;
mod engine_test;
mod feed_test;
