//! End-to-end orchestration against a mocked Webdock API

use mockito::{Matcher, Mock, Server, ServerGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use webdock_api::{ClientConfig, WebdockClient};
use webdock_provider::{
    CreateBackoff, Provider, ProviderError, ProviderSettings, PublicKeySpec, Resource, ServerSpec,
    ShellUserSpec, WaitConfig, WaitError,
};

fn settings(server_up_port: u16) -> ProviderSettings {
    ProviderSettings {
        wait: WaitConfig {
            delay: Duration::from_millis(5),
            min_interval: Duration::ZERO,
            connect_timeout: Duration::from_secs(1),
            per_page: 50,
            max_pages: 5,
        },
        server_up_port,
        server_timeout: Duration::from_secs(5),
        shell_user_timeout: Duration::from_secs(5),
        backoff: CreateBackoff {
            retries: 0,
            step: Duration::ZERO,
        },
        stagger: Duration::ZERO,
    }
}

fn provider(server: &ServerGuard, server_up_port: u16) -> Provider<WebdockClient> {
    let client = WebdockClient::new(ClientConfig::new(server.url(), "test-token")).unwrap();
    Provider::new(client, settings(server_up_port))
}

fn server_json(status: &str, profile: &str) -> String {
    format!(
        r#"{{
            "slug": "web01",
            "name": "Web 01",
            "date": "2024-03-21 10:15:00",
            "location": "dk",
            "image": "ubuntu2204",
            "profile": "{profile}",
            "ipv4": "127.0.0.1",
            "ipv6": null,
            "status": "{status}",
            "virtualization": "container",
            "webServer": "nginx",
            "aliases": ["web01.vps.webdock.cloud"],
            "snapshotRunTime": 0
        }}"#
    )
}

fn server_json_without_ipv4(status: &str) -> String {
    server_json(status, "webdockbit-2022").replace(r#""ipv4": "127.0.0.1""#, r#""ipv4": null"#)
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn event_mock(server: &mut ServerGuard, token: &str, status: &str) -> Mock {
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::UrlEncoded("callbackId".into(), token.into()))
        .with_status(200)
        .with_body(format!(
            r#"[{{"id": 1, "callbackId": "{token}", "status": "{status}", "startTime": "21/03/2024 10:15:00", "endTime": null, "message": "{status}"}}]"#
        ))
        .expect_at_least(1)
        .create_async()
        .await
}

fn server_spec() -> ServerSpec {
    ServerSpec {
        name: "Web 01".to_string(),
        location_id: "dk".to_string(),
        profile_slug: "webdockbit-2022".to_string(),
        image_slug: Some("ubuntu2204".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_server_create_waits_for_event_and_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/servers")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-create")
        .with_body(server_json("provisioning", "webdockbit-2022"))
        .create_async()
        .await;
    let events = event_mock(&mut server, "cb-create", "finished").await;
    let read = server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json("running", "webdockbit-2022"))
        .create_async()
        .await;

    let provider = provider(&server, port);
    let state = provider.servers().create(&server_spec()).await.unwrap();

    assert_eq!(state.id, "web01");
    assert_eq!(state.get_str("status"), Some("running"));
    assert_eq!(state.get_str("ipv4"), Some("127.0.0.1"));
    let connection = state.connection.unwrap();
    assert_eq!(connection.port, port);
    assert_eq!(provider.throttle().created(), 1);

    create.assert_async().await;
    events.assert_async().await;
    read.assert_async().await;
}

#[tokio::test]
async fn test_server_create_rereads_address_and_still_gates() {
    let port = closed_port().await;

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/servers")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-noaddr")
        .with_body(server_json_without_ipv4("provisioning"))
        .create_async()
        .await;
    let reread = server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json("running", "webdockbit-2022"))
        .expect_at_least(1)
        .create_async()
        .await;
    event_mock(&mut server, "cb-noaddr", "finished").await;

    let client = WebdockClient::new(ClientConfig::new(server.url(), "test-token")).unwrap();
    let provider = Provider::new(
        client,
        ProviderSettings {
            server_timeout: Duration::from_millis(300),
            ..settings(port)
        },
    );

    let err = provider.servers().create(&server_spec()).await.unwrap_err();

    assert!(err.is_timeout());
    match err {
        ProviderError::Wait {
            source: WaitError::Unreachable { address, .. },
            ..
        } => assert_eq!(address, format!("127.0.0.1:{port}")),
        other => panic!("expected unreachable, got {other:?}"),
    }
    reread.assert_async().await;
}

#[tokio::test]
async fn test_server_create_without_any_address_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/servers")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-noaddr")
        .with_body(server_json_without_ipv4("provisioning"))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json_without_ipv4("provisioning"))
        .create_async()
        .await;

    let err = provider(&server, 22)
        .servers()
        .create(&server_spec())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProviderError::MissingAddress { ref id, .. } if id == "web01"
    ));
}

#[tokio::test]
async fn test_server_create_without_token_is_fatal() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/servers")
        .with_status(202)
        .with_body(server_json("provisioning", "webdockbit-2022"))
        .create_async()
        .await;
    let events = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = provider(&server, 22)
        .servers()
        .create(&server_spec())
        .await
        .unwrap_err();

    match err {
        ProviderError::Wait { id, source, .. } => {
            assert_eq!(id, "web01");
            assert!(matches!(source, WaitError::MissingHandle));
        }
        other => panic!("expected missing handle, got {other:?}"),
    }
    events.assert_async().await;
}

#[tokio::test]
async fn test_server_create_rejected_by_platform() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/servers")
        .with_status(400)
        .with_body(r#"{"id": 400, "message": "Invalid profile"}"#)
        .create_async()
        .await;

    let err = provider(&server, 22)
        .servers()
        .create(&server_spec())
        .await
        .unwrap_err();

    match err {
        ProviderError::Api { source, .. } => {
            assert_eq!(source.platform_message(), Some("Invalid profile"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_update_resizes_then_renames() {
    let mut server = Server::new_async().await;
    let dry_run = server
        .mock("POST", "/v1/servers/web01/actions/resize/dryrun")
        .match_body(Matcher::Json(
            serde_json::json!({"profileSlug": "webdockepyc-2022"}),
        ))
        .with_status(200)
        .with_body(r#"{"warnings": [], "chargeSummary": null}"#)
        .create_async()
        .await;
    let resize = server
        .mock("POST", "/v1/servers/web01/actions/resize")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-resize")
        .create_async()
        .await;
    let events = event_mock(&mut server, "cb-resize", "finished").await;
    let patch = server
        .mock("PATCH", "/v1/servers/web01")
        .match_body(Matcher::Json(serde_json::json!({"name": "Web One"})))
        .with_status(200)
        .with_body(server_json("running", "webdockepyc-2022"))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json("running", "webdockepyc-2022"))
        .create_async()
        .await;

    let current = server_spec();
    let desired = ServerSpec {
        name: "Web One".to_string(),
        profile_slug: "webdockepyc-2022".to_string(),
        ..server_spec()
    };

    let state = provider(&server, 22)
        .servers()
        .update("web01", &current, &desired)
        .await
        .unwrap();

    assert_eq!(state.get_str("profile_slug"), Some("webdockepyc-2022"));
    dry_run.assert_async().await;
    resize.assert_async().await;
    events.assert_async().await;
    patch.assert_async().await;
}

#[tokio::test]
async fn test_server_update_reinstalls_on_image_change() {
    let mut server = Server::new_async().await;
    let reinstall = server
        .mock("POST", "/v1/servers/web01/actions/reinstall")
        .match_body(Matcher::Json(serde_json::json!({"imageSlug": "debian12"})))
        .with_status(202)
        .with_header("X-Callback-ID", "cb-reinstall")
        .create_async()
        .await;
    let events = event_mock(&mut server, "cb-reinstall", "finished").await;
    let patch = server
        .mock("PATCH", "/v1/servers/web01")
        .expect(0)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json("running", "webdockbit-2022").replace("ubuntu2204", "debian12"))
        .create_async()
        .await;

    let desired = ServerSpec {
        image_slug: Some("debian12".to_string()),
        ..server_spec()
    };

    let state = provider(&server, 22)
        .servers()
        .update("web01", &server_spec(), &desired)
        .await
        .unwrap();

    assert_eq!(state.get_str("image_slug"), Some("debian12"));
    reinstall.assert_async().await;
    events.assert_async().await;
    patch.assert_async().await;
}

#[tokio::test]
async fn test_server_from_snapshot_can_be_renamed() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/v1/servers/web01")
        .match_body(Matcher::Json(serde_json::json!({"name": "Web One"})))
        .with_status(200)
        .with_body(server_json("running", "webdockbit-2022"))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/servers/web01")
        .with_status(200)
        .with_body(server_json("running", "webdockbit-2022"))
        .create_async()
        .await;

    let current = ServerSpec {
        image_slug: None,
        ..server_spec()
    };
    let desired = ServerSpec {
        name: "Web One".to_string(),
        ..current.clone()
    };

    provider(&server, 22)
        .servers()
        .update("web01", &current, &desired)
        .await
        .unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn test_server_update_location_requires_replacement() {
    let server = Server::new_async().await;
    let desired = ServerSpec {
        location_id: "fi".to_string(),
        ..server_spec()
    };

    let err = provider(&server, 22)
        .servers()
        .update("web01", &server_spec(), &desired)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProviderError::ReplaceRequired { ref fields, .. } if fields == &vec!["location_id"]
    ));
}

#[tokio::test]
async fn test_server_delete_surfaces_failed_action() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/servers/web01")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-delete")
        .create_async()
        .await;
    event_mock(&mut server, "cb-delete", "error").await;

    let err = provider(&server, 22)
        .servers()
        .delete("web01")
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("delete server 'web01'"));
    assert!(message.contains("cb-delete"));
    assert!(matches!(
        err,
        ProviderError::Wait {
            source: WaitError::ActionFailed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_delete_already_gone() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/servers/web01")
        .with_status(404)
        .with_body(r#"{"id": 404, "message": "Not Found"}"#)
        .create_async()
        .await;

    provider(&server, 22)
        .servers()
        .delete("web01")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_read_missing_is_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/servers/web01")
        .with_status(404)
        .with_body(r#"{"id": 404, "message": "Not Found"}"#)
        .create_async()
        .await;

    let state = provider(&server, 22).servers().read("web01").await.unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn test_wait_times_out_while_working() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/servers/web01")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-slow")
        .create_async()
        .await;
    event_mock(&mut server, "cb-slow", "working").await;

    let client = WebdockClient::new(ClientConfig::new(server.url(), "test-token")).unwrap();
    let provider = Provider::new(
        client,
        ProviderSettings {
            server_timeout: Duration::from_millis(100),
            ..settings(22)
        },
    );

    let err = provider.servers().delete("web01").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("last status: working"));
}

#[tokio::test]
async fn test_cancelled_provider_stops_waiting() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/servers/web01")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-cancel")
        .create_async()
        .await;
    event_mock(&mut server, "cb-cancel", "working").await;

    let provider = provider(&server, 22);
    let cancel = provider.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = provider.servers().delete("web01").await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_shell_user_lifecycle() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/servers/web01/shellUsers")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "username": "deploy",
            "group": "sudo",
            "shell": "/bin/bash",
            "publicKeys": [11]
        })))
        .with_status(202)
        .with_header("X-Callback-ID", "cb-user")
        .with_body(r#"{"id": 3, "username": "deploy", "group": "sudo", "shell": "/bin/bash", "publicKeys": [11]}"#)
        .create_async()
        .await;
    event_mock(&mut server, "cb-user", "finished").await;
    server
        .mock("GET", "/v1/servers/web01/shellUsers")
        .with_status(200)
        .with_body(r#"[{"id": 2, "username": "admin"}, {"id": 3, "username": "deploy", "group": "sudo", "shell": "/bin/bash", "publicKeys": [11]}]"#)
        .create_async()
        .await;
    server
        .mock("DELETE", "/v1/servers/web01/shellUsers/3")
        .with_status(202)
        .with_header("X-Callback-ID", "cb-user-delete")
        .create_async()
        .await;
    event_mock(&mut server, "cb-user-delete", "finished").await;

    let provider = provider(&server, 22);
    let users = provider.shell_users();
    let spec = ShellUserSpec::new("web01", "deploy", "hunter22").with_public_keys(vec![11]);

    let state = users.create(&spec).await.unwrap();
    assert_eq!(state.id, "web01/3");

    let read = users.read("web01/3").await.unwrap().unwrap();
    assert_eq!(read.get_str("username"), Some("deploy"));
    assert!(users.read("web01/99").await.unwrap().is_none());

    users.delete("web01/3").await.unwrap();
}

#[tokio::test]
async fn test_public_key_is_synchronous() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/account/publicKeys")
        .with_status(200)
        .with_body(r#"{"id": 11, "name": "laptop", "key": "ssh-ed25519 AAAA laptop"}"#)
        .create_async()
        .await;
    let events = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let provider = provider(&server, 22);
    let spec = PublicKeySpec {
        name: "laptop".to_string(),
        key: "ssh-ed25519 AAAA laptop".to_string(),
    };
    let state = provider.public_keys().create(&spec).await.unwrap();
    assert_eq!(state.id, "11");

    let renamed = PublicKeySpec {
        name: "desktop".to_string(),
        ..spec.clone()
    };
    let err = provider
        .public_keys()
        .update("11", &spec, &renamed)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ReplaceRequired { .. }));

    events.assert_async().await;
}

#[tokio::test]
async fn test_data_sources() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/images")
        .with_status(200)
        .with_body(r#"[{"slug": "ubuntu2204", "name": "Ubuntu 22.04", "webServer": null, "phpVersion": null}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/servers")
        .match_query(Matcher::UrlEncoded("status".into(), "running".into()))
        .with_status(200)
        .with_body(format!("[{}]", server_json("running", "webdockbit-2022")))
        .create_async()
        .await;

    let provider = provider(&server, 2222);
    let data = provider.data();

    let images = data.images().await.unwrap();
    assert_eq!(images[0].id, "ubuntu2204");

    let servers = data.servers(Some("running")).await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].connection.as_ref().unwrap().port, 2222);
}
