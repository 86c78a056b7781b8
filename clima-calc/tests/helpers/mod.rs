//! Test helpers for clima-calc integration tests
//!
//! - SurveyFixture: seeds an in-memory database
//! - FailingStore: store wrapper that fails selected writes

#![allow(dead_code)]

pub mod failing_store;
pub mod fixture;

pub use failing_store::FailingStore;
pub use fixture::SurveyFixture;
