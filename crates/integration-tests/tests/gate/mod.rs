use std::time::Duration;

use indoc::indoc;
use integration_tests::TestServer;
use serde_json::json;

const OUTREACH: &str = "/v1/permits/ai-outreach";

#[tokio::test]
async fn burst_then_rejected() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 0.001
        burst = 3
    "#};

    let server = TestServer::start(config).await;

    let mut results = Vec::new();

    for i in 1..=3 {
        let response = server.client.permit(OUTREACH, "org-1", "agent-1").await;
        let status = response.status().as_u16();
        let body: serde_json::Value = response.json().await.unwrap();

        results.push(json!({ "request": i, "status": status, "body": body }));
    }

    insta::assert_json_snapshot!(results, @r#"
    [
      {
        "body": {
          "action": "ai-outreach",
          "remaining": 2
        },
        "request": 1,
        "status": 200
      },
      {
        "body": {
          "action": "ai-outreach",
          "remaining": 1
        },
        "request": 2,
        "status": 200
      },
      {
        "body": {
          "action": "ai-outreach",
          "remaining": 0
        },
        "request": 3,
        "status": 200
      }
    ]
    "#);

    let response = server.client.permit(OUTREACH, "org-1", "agent-1").await;

    assert_eq!(response.status(), 429);
    assert_eq!(response.headers()["retry-after"], "1000");
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "Rate limit exceeded");
}

#[tokio::test]
async fn callers_have_independent_budgets() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 0.001
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 200);
    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 429);

    // Same user id in another organization
    assert_eq!(server.client.permit(OUTREACH, "org-2", "agent-1").await.status(), 200);

    // Another user in the same organization
    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-2").await.status(), 200);
}

#[tokio::test]
async fn action_classes_have_separate_budgets() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 0.001
        burst = 1

        [gate]
        actions = ["ai-outreach", "ai-voice-call"]
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 200);
    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 429);

    let response = server
        .client
        .permit("/v1/permits/ai-voice-call", "org-1", "agent-1")
        .await;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["action"], "ai-voice-call");
}

#[tokio::test]
async fn tokens_refill_over_time() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 20.0
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 200);

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 200);
}

#[tokio::test]
async fn missing_identity_is_rejected() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(reqwest::Method::POST, OUTREACH)
        .header("x-user-id", "agent-1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Missing or invalid caller identity");

    let response = server
        .client
        .request(reqwest::Method::POST, OUTREACH)
        .header("x-organization-id", "org-1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn custom_identity_headers() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 0.001
        burst = 1

        [gate]
        path_prefix = "/permits"
        organization_header = "x-brokerage"
        user_header = "x-agent"
    "#};

    let server = TestServer::start(config).await;

    let send = || {
        server
            .client
            .request(reqwest::Method::POST, "/permits/ai-outreach")
            .header("x-brokerage", "org-1")
            .header("x-agent", "agent-1")
            .send()
    };

    assert_eq!(send().await.unwrap().status(), 200);
    assert_eq!(send().await.unwrap().status(), 429);

    // The default headers are not consulted anymore.
    let response = server.client.permit("/permits/ai-outreach", "org-1", "agent-1").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_action_is_not_found() {
    let server = TestServer::start("").await;

    let response = server.client.permit("/v1/permits/ai-email", "org-1", "agent-1").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn wrong_method_does_not_consume_tokens() {
    let config = indoc! {r#"
        [rate_limit]
        rate_per_second = 0.001
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    let response = server
        .client
        .request(reqwest::Method::GET, OUTREACH)
        .header("x-organization-id", "org-1")
        .header("x-user-id", "agent-1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
    assert_eq!(server.client.permit(OUTREACH, "org-1", "agent-1").await.status(), 200);
}
