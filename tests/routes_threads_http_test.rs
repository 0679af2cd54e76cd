// ABOUTME: HTTP integration tests for thread routes
// ABOUTME: Covers listing, rename permanence, deletion, and owner scoping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod helpers;

use anyhow::Result;
use axum::Router;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

use common::{create_test_resources_with_replies, create_verified_user, test_router};

/// Open a thread with one message and return its id
async fn open_thread(app: Router, bearer: &str, label: &str, message: &str) -> String {
    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "action": "new_thread", "thread_label": label, "message": message }))
        .header("Authorization", bearer)
        .send(app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    body["thread_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_list_threads_shows_label_and_counts() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Sure."]).await?;
    let (_, bearer) = create_verified_user(&resources, "lister@example.com").await?;
    let app = test_router(&resources);

    open_thread(app.clone(), &bearer, "Planning", "Let's plan the week").await;

    let response = AxumTestRequest::get("/api/threads")
        .header("Authorization", &bearer)
        .send(app)
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    let thread = &body["threads"][0];
    assert_eq!(thread["label"], "Planning");
    // Registration event is excluded from the bearing count
    assert_eq!(thread["message_count"], 2);
    assert_eq!(thread["active_days"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rename_thread_applies_everywhere() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Ok.", "Still here."]).await?;
    let (_, bearer) = create_verified_user(&resources, "rename@example.com").await?;
    let app = test_router(&resources);

    let thread_id = open_thread(app.clone(), &bearer, "Draft", "First entry").await;

    let renamed = AxumTestRequest::post("/api/threads/rename")
        .json(&json!({ "thread_id": thread_id, "label": "Final" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(renamed.status(), 200);
    let renamed_body: Value = renamed.json();
    assert_eq!(renamed_body["label"], "Final");

    // Later turns keep the new label
    let followup = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Second entry", "thread_id": thread_id }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(followup.status(), 200);

    let detail = AxumTestRequest::get(&format!("/api/threads/{thread_id}"))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    let detail_body: Value = detail.json();
    assert_eq!(detail_body["thread"]["label"], "Final");
    Ok(())
}

#[tokio::test]
async fn test_rename_rejects_empty_label() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Ok."]).await?;
    let (_, bearer) = create_verified_user(&resources, "blank@example.com").await?;
    let app = test_router(&resources);

    let thread_id = open_thread(app.clone(), &bearer, "Kept", "Entry").await;

    let response = AxumTestRequest::post("/api/threads/rename")
        .json(&json!({ "thread_id": thread_id, "label": "   " }))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_delete_thread_removes_entries() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Ok."]).await?;
    let (_, bearer) = create_verified_user(&resources, "deleter@example.com").await?;
    let app = test_router(&resources);

    let thread_id = open_thread(app.clone(), &bearer, "Doomed", "Entry").await;

    let deleted = AxumTestRequest::post("/api/threads/delete")
        .json(&json!({ "thread_id": thread_id }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(deleted.status(), 204);

    let gone = AxumTestRequest::get(&format!("/api/threads/{thread_id}"))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    assert_eq!(gone.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_threads_are_owner_scoped() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Ok."]).await?;
    let (_, owner) = create_verified_user(&resources, "th-owner@example.com").await?;
    let (_, other) = create_verified_user(&resources, "th-other@example.com").await?;
    let app = test_router(&resources);

    let thread_id = open_thread(app.clone(), &owner, "Private", "Entry").await;

    let read = AxumTestRequest::get(&format!("/api/threads/{thread_id}"))
        .header("Authorization", &other)
        .send(app.clone())
        .await;
    assert_eq!(read.status(), 404);

    let rename = AxumTestRequest::post("/api/threads/rename")
        .json(&json!({ "thread_id": thread_id, "label": "Hijacked" }))
        .header("Authorization", &other)
        .send(app)
        .await;
    assert_eq!(rename.status(), 404);
    Ok(())
}
