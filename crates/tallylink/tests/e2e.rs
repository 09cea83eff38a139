// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end: real HTTP clients against mock Tally and cloud servers, with
//! the SQLite queue on disk.

use std::sync::Arc;

use serde_json::json;
use tallylink_agent::{AgentLog, EngineParts, SyncEngine};
use tallylink_cloud::{HttpCloudClient, POLL_PATH, RESULT_PATH, StaticCredentials};
use tallylink_config::model::{CloudConfig, PollingConfig, TallyConfig};
use tallylink_core::{CredentialsProvider, OfflineQueue};
use tallylink_storage::SqliteQueue;
use tallylink_tally::{TallyClient, TallyConnector};
use tallylink_test_utils::{CREATED_RESPONSE, RecordingObserver};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Stack {
    engine: SyncEngine,
    queue: Arc<SqliteQueue>,
    _dir: tempfile::TempDir,
}

async fn stack(tally: &MockServer, cloud: &MockServer) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueue::at_path(
        dir.path().join("queue.db").to_string_lossy().to_string(),
    ));
    queue.initialize().await.unwrap();

    let tally_client = TallyClient::new(&TallyConfig::default())
        .unwrap()
        .with_base_url(tally.uri());
    let connector = Arc::new(TallyConnector::with_client(tally_client));

    let cloud_config = CloudConfig {
        url: cloud.uri(),
        api_key: Some("tk_e2e".into()),
        agent_id: Some("agent-e2e".into()),
        shop_id: Some("shop-e2e".into()),
        request_timeout_secs: 5,
    };
    let credentials: Arc<dyn CredentialsProvider> =
        Arc::new(StaticCredentials::from_config(&cloud_config));
    let cloud_client = Arc::new(HttpCloudClient::new(&cloud_config, credentials.clone()).unwrap());

    let engine = SyncEngine::new(
        &PollingConfig::default(),
        EngineParts {
            connector,
            queue: queue.clone(),
            cloud: cloud_client,
            credentials,
            log: AgentLog::new(Arc::new(RecordingObserver::new())),
        },
    );
    Stack {
        engine,
        queue,
        _dir: dir,
    }
}

async fn mount_tally(tally: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>SysInfo</ID>"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE>TallyPrime</ENVELOPE>"))
        .mount(tally)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<ID>CompanyInfo</ID>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<ENVELOPE><COMPANY><NAME>Acme Traders</NAME></COMPANY></ENVELOPE>"),
        )
        .mount(tally)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Acme &amp; Co"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CREATED_RESPONSE))
        .mount(tally)
        .await;
    // Liveness probe and anything else.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ENVELOPE></ENVELOPE>"))
        .mount(tally)
        .await;
}

#[tokio::test]
async fn job_flows_from_cloud_through_tally_and_back() {
    let tally = MockServer::start().await;
    let cloud = MockServer::start().await;
    mount_tally(&tally).await;

    Mock::given(method("POST"))
        .and(path(POLL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "poll_interval": 15,
            "jobs": [{
                "id": "J1",
                "type": "ledger.create",
                "payload": {"name": "Acme & Co", "parent": "Sundry Debtors"}
            }]
        })))
        .expect(1)
        .mount(&cloud)
        .await;
    Mock::given(method("POST"))
        .and(path(RESULT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&cloud)
        .await;

    let stack = stack(&tally, &cloud).await;
    assert_eq!(stack.engine.poll_once().await.unwrap(), 1);

    let requests = cloud.received_requests().await.unwrap();
    let poll: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(poll["status"], "idle");
    assert_eq!(poll["tally_version"], "Prime");
    assert_eq!(poll["tally_company"], "Acme Traders");
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer tk_e2e"
    );

    let report: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(report["job_id"], "J1");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["result"], json!({"created": true, "masterId": "101"}));

    assert!(stack.queue.get_unreported_jobs(50).await.unwrap().is_empty());
    assert_eq!(stack.engine.current_interval().await.as_secs(), 15);
}

#[tokio::test]
async fn cloud_rejection_halts_engine() {
    let tally = MockServer::start().await;
    let cloud = MockServer::start().await;
    mount_tally(&tally).await;
    Mock::given(method("POST"))
        .and(path(POLL_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&cloud)
        .await;

    let stack = stack(&tally, &cloud).await;
    let mut status = stack.engine.subscribe();
    assert!(stack.engine.start().await.unwrap());
    status
        .wait_for(|s| matches!(s, tallylink_agent::EngineStatus::AuthenticationHalted(_)))
        .await
        .unwrap();

    assert!(!stack.engine.stats().await.running);
}
