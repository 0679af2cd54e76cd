// ABOUTME: HTTP integration tests for the chat endpoint and conversation CRUD
// ABOUTME: Covers target resolution, title derivation, threading, and user isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod helpers;

use anyhow::Result;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

use common::{
    create_test_resources, create_test_resources_with_provider, create_test_resources_with_replies,
    create_verified_user, test_router, FailingProvider,
};
use std::sync::Arc;

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn test_chat_requires_authentication() -> Result<()> {
    let resources = create_test_resources().await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "hello" }))
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_fresh_chat_creates_conversation_with_derived_title() -> Result<()> {
    let resources =
        create_test_resources_with_replies(vec!["Good morning! How was your day?"]).await?;
    let (_, bearer) = create_verified_user(&resources, "chat@example.com").await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Hello" }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["conversation"]["title"], "Hello");
    assert!(body["conversation"]["day"].is_null());

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["kind"], "user_message");
    assert_eq!(messages[0]["content"], "Hello");
    assert_eq!(messages[1]["kind"], "ai_message");
    assert_eq!(messages[1]["content"], "Good morning! How was your day?");
    Ok(())
}

#[tokio::test]
async fn test_long_first_message_truncates_title() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "long@example.com").await?;

    let message = "a".repeat(60);
    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": message }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    let expected = format!("{}…", "a".repeat(50));
    assert_eq!(body["conversation"]["title"], expected);
    Ok(())
}

#[tokio::test]
async fn test_chat_into_existing_conversation_appends() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["First reply", "Second reply"]).await?;
    let (_, bearer) = create_verified_user(&resources, "appender@example.com").await?;
    let app = test_router(&resources);

    let first = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Opening line" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    let first_body: Value = first.json();
    let conversation_id = first_body["conversation"]["id"].as_str().unwrap().to_owned();

    let second = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Follow up", "conversation_id": conversation_id }))
        .header("Authorization", &bearer)
        .send(app)
        .await;

    assert_eq!(second.status(), 200);
    let body: Value = second.json();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3]["content"], "Second reply");
    // Title stays derived from the first message
    assert_eq!(body["conversation"]["title"], "Opening line");
    Ok(())
}

#[tokio::test]
async fn test_chat_with_date_lands_on_day_tape() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "diarist@example.com").await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Dear diary", "date": "2025-03-01" }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["conversation"]["day"], "2025-03-01");
    Ok(())
}

#[tokio::test]
async fn test_chat_rejects_invalid_date() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "baddate@example.com").await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "hi", "date": "03/01/2025" }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_empty_message_rejected_outside_thread_registration() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "empty@example.com").await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "   " }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_new_thread_without_message_is_control_only() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "threader@example.com").await?;

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "action": "new_thread", "thread_label": "Planning" }))
        .header("Authorization", &bearer)
        .send(test_router(&resources))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert!(body["thread_id"].as_str().is_some());
    assert_eq!(body["thread_label"], "Planning");
    assert_eq!(body["conversation"]["day"], today());

    // Only the registration event exists, no assistant turn
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["kind"], "fresh_chat");
    Ok(())
}

#[tokio::test]
async fn test_thread_chat_appends_to_todays_tape() -> Result<()> {
    let resources = create_test_resources_with_replies(vec!["Reply one", "Reply two"]).await?;
    let (_, bearer) = create_verified_user(&resources, "spanner@example.com").await?;
    let app = test_router(&resources);

    let opened = AxumTestRequest::post("/api/chat")
        .json(&json!({ "action": "new_thread", "message": "Thread start" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(opened.status(), 200);
    let opened_body: Value = opened.json();
    let thread_id = opened_body["thread_id"].as_str().unwrap().to_owned();
    assert_eq!(opened_body["conversation"]["day"], today());

    let followup = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "More thoughts", "thread_id": thread_id }))
        .header("Authorization", &bearer)
        .send(app)
        .await;

    assert_eq!(followup.status(), 200);
    let body: Value = followup.json();
    assert_eq!(body["thread_id"].as_str().unwrap(), thread_id);
    let messages = body["messages"].as_array().unwrap();
    // Registration event + two user/assistant exchanges
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[4]["content"], "Reply two");
    Ok(())
}

#[tokio::test]
async fn test_chat_into_foreign_conversation_is_not_found() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, owner) = create_verified_user(&resources, "owner@example.com").await?;
    let (_, intruder) = create_verified_user(&resources, "intruder@example.com").await?;
    let app = test_router(&resources);

    let created = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Mine" }))
        .header("Authorization", &owner)
        .send(app.clone())
        .await;
    let body: Value = created.json();
    let conversation_id = body["conversation"]["id"].as_str().unwrap().to_owned();

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Theirs", "conversation_id": conversation_id }))
        .header("Authorization", &intruder)
        .send(app)
        .await;

    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_conversation_crud_lifecycle() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "crud@example.com").await?;
    let app = test_router(&resources);

    let created = AxumTestRequest::post("/api/conversations")
        .json(&json!({ "title": "Ideas" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(created.status(), 201);
    let created_body: Value = created.json();
    let id = created_body["id"].as_str().unwrap().to_owned();

    let listed = AxumTestRequest::get("/api/conversations")
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(listed.status(), 200);
    let listed_body: Value = listed.json();
    assert_eq!(listed_body["total"], 1);

    let renamed = AxumTestRequest::put(&format!("/api/conversations/{id}"))
        .json(&json!({ "title": "Better ideas" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(renamed.status(), 200);

    let fetched = AxumTestRequest::get(&format!("/api/conversations/{id}"))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(fetched.status(), 200);
    let fetched_body: Value = fetched.json();
    assert_eq!(fetched_body["conversation"]["title"], "Better ideas");

    let deleted = AxumTestRequest::delete(&format!("/api/conversations/{id}"))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(deleted.status(), 204);

    let gone = AxumTestRequest::get(&format!("/api/conversations/{id}"))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    assert_eq!(gone.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_provider_failure_keeps_user_turn() -> Result<()> {
    let resources = create_test_resources_with_provider(Arc::new(FailingProvider)).await?;
    let (_, bearer) = create_verified_user(&resources, "outage@example.com").await?;
    let app = test_router(&resources);

    let response = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Lost to the void?" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 502);

    // The user turn survives the failed completion
    let listed = AxumTestRequest::get("/api/conversations")
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    let listed_body: Value = listed.json();
    assert_eq!(listed_body["total"], 1);
    let id = listed_body["conversations"][0]["id"].as_str().unwrap().to_owned();

    let detail = AxumTestRequest::get(&format!("/api/conversations/{id}"))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    let detail_body: Value = detail.json();
    let messages = detail_body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Lost to the void?");
    Ok(())
}

#[tokio::test]
async fn test_manual_rename_is_permanent() -> Result<()> {
    let resources = create_test_resources().await?;
    let (_, bearer) = create_verified_user(&resources, "renamer@example.com").await?;
    let app = test_router(&resources);

    let created = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Original opener" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    let body: Value = created.json();
    let id = body["conversation"]["id"].as_str().unwrap().to_owned();

    let renamed = AxumTestRequest::put(&format!("/api/conversations/{id}"))
        .json(&json!({ "title": "My journal" }))
        .header("Authorization", &bearer)
        .send(app.clone())
        .await;
    assert_eq!(renamed.status(), 200);

    // Further chat must not re-derive the title
    let followup = AxumTestRequest::post("/api/chat")
        .json(&json!({ "message": "Another message entirely", "conversation_id": id }))
        .header("Authorization", &bearer)
        .send(app)
        .await;
    let followup_body: Value = followup.json();
    assert_eq!(followup_body["conversation"]["title"], "My journal");
    Ok(())
}
