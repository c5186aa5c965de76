mod common;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde_json::json;

use cenoteando::database::models::{AccessLevel, MeasurementOrFact, Variable};
use cenoteando::database::Repository;
use common::{keys, TestServer};

#[tokio::test]
async fn species_writes_are_admin_only() -> Result<()> {
    let server = TestServer::start().await?;
    let regular = server.regular_token().await?;
    let admin = server.admin_token().await?;
    let body = json!({ "_key": "astyanax", "scientific_name": "Astyanax altior", "inaturalist_id": 47178 });

    let (status, _) = server
        .send_json(Method::POST, "/api/species", Some(&regular), body.clone())
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = server
        .send_json(Method::POST, "/api/species", Some(&admin), body.clone())
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["_key"], "astyanax");

    let (status, _) = server
        .send_json(Method::POST, "/api/species", Some(&admin), body)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Reads are open to everyone
    let (status, found) = server.get_json("/api/species/inaturalist/47178", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["data"]["scientific_name"], "Astyanax altior");

    let (status, _) = server.get_json("/api/species/aphia/1", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn species_update_merges_and_delete_returns_no_content() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let (status, _) = server
        .send_json(
            Method::PUT,
            "/api/species/s1",
            Some(&admin),
            json!({ "scientific_name": "Typhlias pearsei", "family": "Bythitidae" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, merged) = server
        .send_json(Method::PUT, "/api/species/s1", Some(&admin), json!({ "aphia_id": 1012345 }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["data"]["family"], "Bythitidae");
    assert_eq!(merged["data"]["aphia_id"], 1012345);

    let (status, err) = server
        .send_json(Method::PUT, "/api/species/s1", Some(&admin), json!({ "_key": "other" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let res = server
        .client
        .delete(server.url("/api/species/s1"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = server.get_json("/api/species/s1", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn reference_csv_round_trip() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    for (key, title, year) in [("r1", "Cenotes of Yucatan", 2019), ("r2", "Karst hydrology, revisited", 2021)] {
        let (status, _) = server
            .send_json(
                Method::POST,
                "/api/references",
                Some(&admin),
                json!({ "_key": key, "title": title, "year": year }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let exported = server
        .client
        .get(server.url("/api/references/csv"))
        .send()
        .await?
        .text()
        .await?;
    assert!(exported.contains("\"Karst hydrology, revisited\""));

    // Wipe and re-import from the export
    for key in ["r1", "r2"] {
        server
            .client
            .delete(server.url(&format!("/api/references/{}", key)))
            .bearer_auth(&admin)
            .send()
            .await?;
    }
    let res = server
        .client
        .put(server.url("/api/references/csv"))
        .bearer_auth(&admin)
        .header("content-type", "text/csv")
        .body(exported.clone())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (_, body) = server.get_json("/api/references", None).await?;
    assert_eq!(keys(&body), vec!["r1", "r2"]);
    assert_eq!(body["data"]["data"][1]["year"], 2021);

    let again = server
        .client
        .get(server.url("/api/references/csv"))
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(again, exported);
    Ok(())
}

#[tokio::test]
async fn bad_csv_row_reports_row_number() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let res = server
        .client
        .put(server.url("/api/species/csv"))
        .bearer_auth(&admin)
        .header("content-type", "text/csv")
        .body("_key,inaturalist_id\ns1,12\ns2,not-a-number\n")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await?;
    assert!(body["message"].as_str().is_some_and(|m| m.starts_with("Row 2")));
    Ok(())
}

#[tokio::test]
async fn users_see_only_themselves() -> Result<()> {
    let server = TestServer::start().await?;
    let regular = server.regular_token().await?;
    let admin = server.admin_token().await?;

    let own = format!("/api/users/{}", server.regular_key);
    let (status, body) = server.get_json(&own, Some(&regular)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("password").is_none());

    let other = format!("/api/users/{}", server.admin_key);
    let (status, _) = server.get_json(&other, Some(&regular)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = server.get_json("/api/users", Some(&regular)).await?;
    assert_eq!(keys(&body), vec![server.regular_key.clone()]);

    let (_, body) = server.get_json("/api/users", None).await?;
    assert!(keys(&body).is_empty());

    let (_, body) = server.get_json("/api/users", Some(&admin)).await?;
    assert_eq!(keys(&body).len(), 2);

    let res = server.client.get(server.url("/api/users/csv")).bearer_auth(&regular).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn variable_data_follows_access_levels() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_cenote("c1", "Dos Ojos", true, (2022, 1, 1)).await?;

    let variables = Repository::<Variable>::new(server.state.store.clone());
    for (key, level) in [("temp", AccessLevel::Public), ("ph", AccessLevel::Private), ("owner", AccessLevel::Sensitive)] {
        variables
            .insert(&Variable {
                key: key.to_string(),
                name: key.to_uppercase(),
                description: None,
                theme: "WATER".to_string(),
                units: None,
                access_level: level,
            })
            .await?;
    }
    let measurements = Repository::<MeasurementOrFact>::new(server.state.store.clone());
    for (idx, variable) in ["temp", "ph", "owner"].iter().enumerate() {
        measurements
            .insert(&MeasurementOrFact {
                key: format!("m{}", idx),
                from: format!("Variables/{}", variable),
                to: "Cenotes/c1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap(),
                value: json!(idx),
            })
            .await?;
    }

    let series_keys = |body: &serde_json::Value| -> Vec<String> {
        body["data"]
            .as_array()
            .map(|s| s.iter().filter_map(|v| v["variable"]["_key"].as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    let (status, body) = server.get_json("/api/cenotes/c1/data/WATER", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series_keys(&body), vec!["temp"]);

    let regular = server.regular_token().await?;
    let (_, body) = server.get_json("/api/cenotes/c1/data/WATER", Some(&regular)).await?;
    assert_eq!(series_keys(&body), vec!["ph", "temp"]);

    let admin = server.admin_token().await?;
    let (_, body) = server.get_json("/api/cenotes/c1/data/WATER", Some(&admin)).await?;
    assert_eq!(series_keys(&body), vec!["owner", "ph", "temp"]);

    let (status, _) = server.get_json("/api/cenotes/missing/data/WATER", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
