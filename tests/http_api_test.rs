use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wardrobe_pairing::core::{BindResponse, EntityStore, ScanOutcome};
use wardrobe_pairing::{JsonFileStore, PairingCoordinator, PairingServer, ReaderClient, ServerConfig};

struct TestServer {
    base_url: String,
    coordinator: Arc<PairingCoordinator<JsonFileStore>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<wardrobe_pairing::Result<()>>>,
    _dir: TempDir,
}

impl TestServer {
    async fn start(bind_timeout_seconds: u64) -> Result<Self> {
        let dir = TempDir::new()?;
        let store_path = dir.path().join("wardrobe.json");
        let seed = json!({
            "items": [
                {"id": "i1", "name": "Jean vert délavé", "category": "Jeans"},
                {"id": "i2", "name": "Jupe plissée marine", "category": "Jupes"},
                {"id": "a/b"},
                {"id": "x?y#z"}
            ],
            "hangers": [
                {"id": "h1", "tagId": "TAGH", "mqttTopic": "hanger_a085e3e834c8/leds"}
            ]
        });
        std::fs::write(&store_path, serde_json::to_vec_pretty(&seed)?)?;

        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            store_path: store_path.to_string_lossy().into_owned(),
            bind_timeout_seconds,
            ..Default::default()
        };

        let server = PairingServer::bind(&config).await?;
        let addr = server.local_addr()?;
        let coordinator = server.coordinator();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));

        Ok(Self {
            base_url: format!("http://{}", addr),
            coordinator,
            shutdown: Some(tx),
            task: Some(task),
            _dir: dir,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_for_pending(&self, item_id: &str) {
        for _ in 0..200 {
            if self.coordinator.snapshot().pending_item_id.as_deref() == Some(item_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("bind request for {} was never parked", item_id);
    }

    async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await??;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_scan_endpoint_reports_outcomes() -> Result<()> {
    let server = TestServer::start(0).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/scan"))
        .json(&json!({"tagId": "TAGH"}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "wait_item", "hangerId": "h1"}));

    let body: Value = client
        .post(server.url("/scan"))
        .json(&json!({"tagId": "UNKNOWN"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body, json!({"status": "unrecognized", "tagId": "UNKNOWN"}));

    let response = client
        .post(server.url("/scan"))
        .json(&json!({"tagId": "  "}))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    server.stop().await
}

#[tokio::test]
async fn test_long_poll_bind_then_pairing_ritual() -> Result<()> {
    let server = TestServer::start(0).await?;
    let reader = ReaderClient::new(&server.base_url)?;

    let bind = {
        let reader = reader.clone();
        tokio::spawn(async move { reader.await_bind("i1").await })
    };
    server.wait_for_pending("i1").await;

    let outcome = reader.report_scan("TAGI").await?;
    assert_eq!(outcome, ScanOutcome::tag_bound("TAGI", "i1"));

    let response = bind.await??;
    assert_eq!(
        response,
        BindResponse::AssociationComplete {
            item_id: "i1".to_string(),
            tag_id: "TAGI".to_string()
        }
    );

    assert_eq!(
        reader.report_scan("TAGH").await?,
        ScanOutcome::WaitingForItem {
            hanger_id: "h1".to_string()
        }
    );
    assert_eq!(
        reader.report_scan("TAGI").await?,
        ScanOutcome::hanger_bound("i1", "h1")
    );

    let item = server.coordinator.store().get_item("i1").await?.unwrap();
    assert_eq!(item.tag_id.as_deref(), Some("TAGI"));
    assert_eq!(item.hanger_id.as_deref(), Some("h1"));

    // The bindings are on disk, not only in memory.
    let raw = std::fs::read_to_string(server.coordinator.store().path())?;
    assert!(raw.contains("\"hangerId\": \"h1\""));

    server.stop().await
}

#[tokio::test]
async fn test_bind_unknown_item_is_404() -> Result<()> {
    let server = TestServer::start(0).await?;

    let response = reqwest::get(server.url("/bind/ghost")).await?;
    assert_eq!(response.status(), 404);
    assert!(server.coordinator.snapshot().is_idle());

    server.stop().await
}

#[tokio::test]
async fn test_superseded_long_poll_gets_conflict() -> Result<()> {
    let server = TestServer::start(0).await?;
    let client = reqwest::Client::new();

    let first = {
        let url = server.url("/bind/i1");
        let client = client.clone();
        tokio::spawn(async move { client.get(url).send().await })
    };
    server.wait_for_pending("i1").await;

    let second = {
        let url = server.url("/bind/i2");
        let client = client.clone();
        tokio::spawn(async move { client.get(url).send().await })
    };
    server.wait_for_pending("i2").await;

    let response = first.await??;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "superseded", "itemId": "i1"}));

    let reset: Value = client
        .delete(server.url("/pairing"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(reset["pendingItemId"], "i2");

    let response = second.await??;
    assert_eq!(response.status(), 410);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "cancelled", "itemId": "i2"}));

    server.stop().await
}

#[tokio::test]
async fn test_bind_timeout_answers_and_clears_slot() -> Result<()> {
    let server = TestServer::start(1).await?;

    let response = reqwest::get(server.url("/bind/i1")).await?;
    assert_eq!(response.status(), 408);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "timeout", "itemId": "i1"}));

    let snapshot: Value = reqwest::get(server.url("/pairing")).await?.json().await?;
    assert_eq!(snapshot["pendingItemId"], Value::Null);

    let item = server.coordinator.store().get_item("i1").await?.unwrap();
    assert!(item.tag_id.is_none());

    server.stop().await
}

#[tokio::test]
async fn test_shutdown_releases_waiting_bind() -> Result<()> {
    let server = TestServer::start(0).await?;

    let bind = {
        let url = server.url("/bind/i1");
        tokio::spawn(async move { reqwest::get(url).await })
    };
    server.wait_for_pending("i1").await;

    server.stop().await?;

    let response = bind.await??;
    assert_eq!(response.status(), 410);
    Ok(())
}

#[tokio::test]
async fn test_bind_item_id_with_reserved_characters() -> Result<()> {
    let server = TestServer::start(0).await?;
    let reader = ReaderClient::new(&server.base_url)?;

    for (item_id, tag_id) in [("a/b", "TAGAB"), ("x?y#z", "TAGXYZ")] {
        let bind = {
            let reader = reader.clone();
            let item_id = item_id.to_string();
            tokio::spawn(async move { reader.await_bind(&item_id).await })
        };
        server.wait_for_pending(item_id).await;

        reader.report_scan(tag_id).await?;
        assert_eq!(
            bind.await??,
            BindResponse::AssociationComplete {
                item_id: item_id.to_string(),
                tag_id: tag_id.to_string()
            }
        );
    }

    let item = server.coordinator.store().get_item("a/b").await?.unwrap();
    assert_eq!(item.tag_id.as_deref(), Some("TAGAB"));

    server.stop().await
}

#[tokio::test]
async fn test_bind_after_shutdown_began_is_cancelled() -> Result<()> {
    let server = TestServer::start(0).await?;
    server.coordinator.close().await;

    let response = reqwest::get(server.url("/bind/i1")).await?;
    assert_eq!(response.status(), 410);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "cancelled", "itemId": "i1"}));
    assert!(server.coordinator.snapshot().is_idle());

    server.stop().await
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let server = TestServer::start(0).await?;

    let body: Value = reqwest::get(server.url("/health")).await?.json().await?;
    assert_eq!(body, json!({"status": "ok"}));

    server.stop().await
}
