use anyhow::Result;
use httpmock::prelude::*;
use sprint_metrics::config::{EndpointPaths, SourceConfig};
use sprint_metrics::domain::ports::ScrumBackend;
use sprint_metrics::{ItemStatus, MetricsError, RestBackend};
use std::collections::HashMap;
use std::time::Duration;

fn source(server: &MockServer) -> SourceConfig {
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer test-token".to_string());
    SourceConfig {
        base_url: server.url("/api"),
        timeout_seconds: Some(5),
        retry_attempts: None,
        retry_delay_seconds: None,
        headers: Some(headers),
        endpoints: EndpointPaths::default(),
    }
}

#[tokio::test]
async fn test_fetch_sprint_sends_headers_and_normalizes() -> Result<()> {
    let server = MockServer::start();
    let sprint_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/sprints/7")
            .header("Authorization", "Bearer test-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "data": {
                    "id": 7,
                    "nombre": "Sprint 7",
                    "objetivo": "Checkout",
                    "fecha_inicio": "2025-02-01",
                    "fecha_fin": "2025-02-15",
                    "estado": "activo"
                }
            }));
    });

    let backend = RestBackend::from_config(&source(&server))?;
    let sprint = backend.fetch_sprint("7").await?;

    sprint_mock.assert();
    assert_eq!(sprint.id.as_deref(), Some("7"));
    assert_eq!(sprint.name, "Sprint 7");
    assert_eq!(sprint.goal.as_deref(), Some("Checkout"));
    assert!(sprint.start_date.is_some());
    assert!(sprint.end_date.is_some());
    Ok(())
}

#[tokio::test]
async fn test_fetch_sprint_fills_missing_id() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sprints/abc");
        then.status(200).json_body(serde_json::json!({"name": "No id"}));
    });

    let backend = RestBackend::from_config(&source(&server))?;
    let sprint = backend.fetch_sprint("abc").await?;
    assert_eq!(sprint.id.as_deref(), Some("abc"));
    Ok(())
}

#[tokio::test]
async fn test_fetch_missing_sprint_is_not_found() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sprints/404");
        then.status(404);
    });

    let backend = RestBackend::from_config(&source(&server))?;
    let result = backend.fetch_sprint("404").await;

    assert!(matches!(result, Err(MetricsError::NotFoundError { .. })));
    Ok(())
}

#[tokio::test]
async fn test_fetch_items_accepts_wrapped_lists() -> Result<()> {
    let server = MockServer::start();
    let items_mock = server.mock(|when, then| {
        when.method(GET).path("/api/sprints/7/backlog");
        then.status(200).json_body(serde_json::json!({
            "items": [
                {"id": 1, "titulo": "Login", "estado": "completado", "puntos_historia": 5},
                {"id": 2, "title": "Logout", "status": "in_progress", "storyPoints": null}
            ]
        }));
    });

    let backend = RestBackend::from_config(&source(&server))?;
    let items = backend.fetch_sprint_items("7").await?;

    items_mock.assert();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, ItemStatus::Completed);
    assert_eq!(items[0].story_points, 5.0);
    assert_eq!(items[1].status, ItemStatus::InProgress);
    assert_eq!(items[1].story_points, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_unexpected_payload_is_payload_error() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sprints/7/backlog");
        then.status(200).body("<html>oops</html>");
    });

    let backend = RestBackend::from_config(&source(&server))?;
    let result = backend.fetch_sprint_items("7").await;

    assert!(matches!(result, Err(MetricsError::PayloadError { .. })));
    Ok(())
}

#[tokio::test]
async fn test_server_errors_are_retried() -> Result<()> {
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(GET).path("/api/team-members");
        then.status(503);
    });

    let backend =
        RestBackend::from_config(&source(&server))?.with_retry(2, Duration::from_millis(10));
    let result = backend.fetch_team_members().await;

    failing.assert_hits(3);
    assert!(matches!(
        result,
        Err(MetricsError::HttpStatusError { status: 503, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let server = MockServer::start();
    let unauthorized = server.mock(|when, then| {
        when.method(GET).path("/api/team-members");
        then.status(401);
    });

    let backend =
        RestBackend::from_config(&source(&server))?.with_retry(3, Duration::from_millis(10));
    let result = backend.fetch_team_members().await;

    unauthorized.assert_hits(1);
    assert!(matches!(
        result,
        Err(MetricsError::HttpStatusError { status: 401, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_missing_burndown_and_bug_stats_are_empty() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sprints/7/burndown");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/bugs/stats").query_param("sprint_id", "7");
        then.status(404);
    });

    let backend = RestBackend::from_config(&source(&server))?;

    assert!(backend.fetch_burndown("7").await?.is_empty());
    assert!(backend.fetch_bug_stats("7").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_recorded_burndown_and_bug_stats() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/sprints/7/burndown");
        then.status(200).json_body(serde_json::json!([
            {"dia": 1, "ideal": 20, "real": 20},
            {"dia": 2, "ideal": 18, "real": 19}
        ]));
    });
    let stats_mock = server.mock(|when, then| {
        when.method(GET).path("/api/bugs/stats").query_param("sprint_id", "7");
        then.status(200).json_body(serde_json::json!({
            "data": {"abiertos": 3, "en_progreso": 1, "resueltos": 6}
        }));
    });

    let backend = RestBackend::from_config(&source(&server))?;

    let burndown = backend.fetch_burndown("7").await?;
    assert_eq!(burndown.len(), 2);
    assert_eq!(burndown[1].actual, 19);

    let stats = backend.fetch_bug_stats("7").await?.expect("bug stats");
    stats_mock.assert();
    assert_eq!(stats.total, 10);
    assert_eq!(stats.resolved, 6);
    Ok(())
}

#[test]
fn test_custom_endpoint_paths_with_blocking_runtime() {
    let server = MockServer::start();
    let roster_mock = server.mock(|when, then| {
        when.method(GET).path("/api/v2/usuarios").query_param("rol", "dev");
        then.status(200).json_body(serde_json::json!([
            {"id": 1, "nombre": "Ana", "rol": "developer"},
            {"_id": "u2", "username": "bo", "correo": "bo@example.com"}
        ]));
    });

    let mut config = source(&server);
    config.endpoints.team = "v2/usuarios?rol=dev".to_string();
    let backend = RestBackend::from_config(&config).unwrap();

    let team = tokio_test::block_on(backend.fetch_team_members()).unwrap();

    roster_mock.assert();
    assert_eq!(team.len(), 2);
    assert_eq!(team[0].name.as_deref(), Some("Ana"));
    assert_eq!(team[1].id.as_deref(), Some("u2"));
    assert_eq!(team[1].email.as_deref(), Some("bo@example.com"));
}
