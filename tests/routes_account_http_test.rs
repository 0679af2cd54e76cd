// ABOUTME: HTTP integration tests for account deletion
// ABOUTME: Verifies the account and all owned data are removed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod helpers;

use anyhow::Result;
use helpers::axum_test::AxumTestRequest;
use serde_json::json;

use common::{create_test_resources, create_verified_user, test_router, TEST_PASSWORD};

#[tokio::test]
async fn test_delete_account_requires_authentication() -> Result<()> {
    let resources = create_test_resources().await?;

    let response = AxumTestRequest::delete("/api/account")
        .send(test_router(&resources))
        .await;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_delete_account_removes_user_and_data() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "leaver@example.com").await?;
    let app = test_router(&resources);

    // Seed some owned data first
    AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Last entry" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;

    let deleted = AxumTestRequest::delete("/api/account")
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(deleted.status(), 204);

    assert_eq!(resources.database.get_user_count().await?, 0);

    // Login is now impossible
    let login = AxumTestRequest::post("/api/auth/login")
        .json(&json!({ "email": "leaver@example.com", "password": TEST_PASSWORD }))
        .send(app)
        .await;
    assert_eq!(login.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_delete_account_leaves_other_users_untouched() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, leaver) = create_verified_user(&resources, "going@example.com").await?;
    let (_, stayer) = create_verified_user(&resources, "staying@example.com").await?;
    let app = test_router(&resources);

    AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Staying put" }))
        .header("Authorization", &stayer)
        .send(app.clone())
        .await;

    AxumTestRequest::delete("/api/account")
        .header("Authorization", &leaver)
        .send(app.clone())
        .await;

    let listed = AxumTestRequest::get("/api/conversations")
        .header("Authorization", &stayer)
        .send(app)
        .await;
    assert_eq!(listed.status(), 200);
    let body: serde_json::Value = listed.json();
    assert_eq!(body["total"], 1);
    Ok(())
}
