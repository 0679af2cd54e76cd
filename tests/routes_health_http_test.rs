// ABOUTME: HTTP integration tests for health and readiness endpoints
// ABOUTME: Verifies liveness is static and readiness reflects database reachability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod helpers;

use anyhow::Result;
use helpers::axum_test::AxumTestRequest;
use serde_json::Value;

use common::{create_test_resources, test_router};

#[tokio::test]
async fn test_health_endpoint_is_public() -> Result<()> {
    let resources = create_test_resources().await?;

    let response = AxumTestRequest::get("/health")
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_pings_database() -> Result<()> {
    let resources = create_test_resources().await?;

    let response = AxumTestRequest::get("/ready")
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    Ok(())
}
