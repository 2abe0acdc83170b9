//! Common test utilities for integration tests

#![allow(dead_code)]

use depthstore_core::{Item, ItemStream, Repository, Result, Scenario};
use depthstore_test_utils::TestBacking;
use futures::TryStreamExt;

/// Drain a query stream into a vector
pub async fn collect(stream: ItemStream) -> Result<Vec<Item>> {
    stream.try_collect().await
}

/// Connect `scenario` against `backing`, panicking on failure
pub async fn connected(backing: &TestBacking, scenario: Scenario) -> Repository {
    backing
        .selector()
        .connect(scenario)
        .await
        .unwrap_or_else(|e| panic!("{scenario} failed to connect: {e}"))
}
