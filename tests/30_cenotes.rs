mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::{keys, TestServer};

async fn seeded() -> Result<TestServer> {
    let server = TestServer::start().await?;
    server.seed_cenote("c1", "Dos Ojos", true, (2022, 1, 10)).await?;
    server.seed_cenote("c2", "Sac Actun", false, (2022, 2, 10)).await?;
    server.seed_cenote("c3", "Gran Cenote", true, (2022, 3, 10)).await?;
    server.seed_cenote("c4", "Zacil Ha", false, (2022, 4, 10)).await?;
    Ok(server)
}

#[tokio::test]
async fn anonymous_sees_only_touristic_cenotes() -> Result<()> {
    let server = seeded().await?;

    let (status, body) = server.get_json("/api/cenotes", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys(&body), vec!["c1", "c3"]);
    assert_eq!(body["data"]["hasMore"], false);

    let (status, _) = server.get_json("/api/cenotes/c2", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.get_json("/api/cenotes/c1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Dos Ojos");
    Ok(())
}

#[tokio::test]
async fn signed_in_users_see_every_cenote() -> Result<()> {
    let server = seeded().await?;
    let token = server.regular_token().await?;

    let (status, body) = server.get_json("/api/cenotes", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys(&body), vec!["c1", "c2", "c3", "c4"]);

    let (status, _) = server.get_json("/api/cenotes/c2", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn continuation_tokens_walk_every_cenote_once() -> Result<()> {
    let server = seeded().await?;
    let token = server.admin_token().await?;

    let mut seen = Vec::new();
    let mut path = "/api/cenotes?limit=3".to_string();
    loop {
        let (status, body) = server.get_json(&path, Some(&token)).await?;
        assert_eq!(status, StatusCode::OK);
        seen.extend(keys(&body));
        match body["data"]["continuationToken"].as_str() {
            Some(next) => {
                assert_eq!(body["data"]["hasMore"], true);
                path = format!("/api/cenotes?limit=3&continuation_token={}", next);
            }
            None => break,
        }
    }
    assert_eq!(seen, vec!["c1", "c2", "c3", "c4"]);
    Ok(())
}

#[tokio::test]
async fn writes_map_to_auth_then_not_implemented() -> Result<()> {
    let server = seeded().await?;
    let regular = server.regular_token().await?;
    let admin = server.admin_token().await?;
    let body = json!({ "name": "New cenote", "touristic": true });

    let (status, _) = server
        .send_json(Method::POST, "/api/cenotes", None, body.clone())
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, err) = server
        .send_json(Method::POST, "/api/cenotes", Some(&regular), body.clone())
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "FORBIDDEN");

    let (status, err) = server
        .send_json(Method::POST, "/api/cenotes", Some(&admin), body)
        .await?;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(err["code"], "NOT_IMPLEMENTED");

    let res = server
        .client
        .delete(server.url("/api/cenotes/c1"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    Ok(())
}

#[tokio::test]
async fn csv_export_respects_visibility() -> Result<()> {
    let server = seeded().await?;

    let res = server.client.get(server.url("/api/cenotes/csv")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/csv")));
    let csv = res.text().await?;
    let mut lines = csv.lines();
    assert!(lines.next().is_some_and(|header| header.starts_with("_key,")));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| !r.contains("Sac Actun") && !r.contains("Zacil Ha")));
    Ok(())
}
