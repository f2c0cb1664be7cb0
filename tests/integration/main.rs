#[path = "../common/mod.rs"]
mod common;

mod degradation_tests;
mod recovery_tests;
