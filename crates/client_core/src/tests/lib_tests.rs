use super::*;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{ProcessingStatus, ThoughtPhase},
    protocol::ReasoningStep,
};
use tokio::net::TcpListener;

#[derive(Clone)]
struct EngineStub {
    script: Arc<Vec<EngineEvent>>,
    received: Arc<Mutex<Vec<ClientCommand>>>,
    connections: Arc<Mutex<u32>>,
    drop_after_script: bool,
}

async fn spawn_engine_stub(
    script: Vec<EngineEvent>,
    drop_after_script: bool,
) -> Result<(String, EngineStub)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let stub = EngineStub {
        script: Arc::new(script),
        received: Arc::new(Mutex::new(Vec::new())),
        connections: Arc::new(Mutex::new(0)),
        drop_after_script,
    };
    let app = Router::new()
        .route("/ws", get(stub_ws_handler))
        .route("/api/reports", get(stub_reports_handler))
        .with_state(stub.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), stub))
}

async fn stub_ws_handler(
    State(stub): State<EngineStub>,
    ws: WebSocketUpgrade,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| stub_session(socket, stub))
}

async fn stub_session(mut socket: WebSocket, stub: EngineStub) {
    {
        let mut connections = stub.connections.lock().await;
        *connections += 1;
    }
    for event in stub.script.iter() {
        let text = serde_json::to_string(event).expect("encode scripted event");
        if socket.send(WsMessage::Text(text)).await.is_err() {
            return;
        }
    }
    if stub.drop_after_script {
        return;
    }
    while let Some(Ok(frame)) = socket.recv().await {
        if let WsMessage::Text(text) = frame {
            let command = serde_json::from_str::<ClientCommand>(&text).expect("decode command");
            stub.received.lock().await.push(command);
        }
    }
}

async fn stub_reports_handler() -> Json<serde_json::Value> {
    Json(json!({
        "reports": [
            { "id": "run-7", "date": "2025-03-02 14:05", "path": "reports/run-7.html" },
            { "id": "run-6", "date": "2025-03-01 09:30", "path": "reports/run-6.html" },
        ]
    }))
}

async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("event channel closed")
}

async fn wait_for_connected(rx: &mut broadcast::Receiver<ClientEvent>) {
    loop {
        if let ClientEvent::ConnectionChanged(ConnectionState::Connected) = next_event(rx).await {
            return;
        }
    }
}

async fn wait_for_received(stub: &EngineStub, count: usize) -> Vec<ClientCommand> {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let received = stub.received.lock().await;
                if received.len() >= count {
                    return received.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for engine to receive commands")
}

#[tokio::test]
async fn streams_engine_events_in_order() {
    let script = vec![
        EngineEvent::ProcessingState {
            status: ProcessingStatus::Running,
        },
        EngineEvent::AgentThought(ReasoningStep {
            phase: ThoughtPhase::Plan,
            detail: "survey the landing page".into(),
            strategy: None,
        }),
        EngineEvent::Response {
            data: "done".into(),
        },
        EngineEvent::ProcessingState {
            status: ProcessingStatus::Idle,
        },
    ];
    let (engine_url, _stub) = spawn_engine_stub(script.clone(), false)
        .await
        .expect("spawn engine stub");

    let client = EngineClient::new(engine_url);
    let mut rx = client.subscribe_events();
    client.connect().await;

    wait_for_connected(&mut rx).await;
    for expected in script {
        match next_event(&mut rx).await {
            ClientEvent::Engine(event) => assert_eq!(event, expected),
            other => panic!("expected engine event, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn commands_rejected_locally_while_disconnected() {
    let client = EngineClient::new("http://127.0.0.1:1");
    assert_eq!(
        client.connection_state().await,
        ConnectionState::Disconnected
    );
    assert_eq!(
        client.submit_request("open the login page").await,
        Err(CommandRejected::NotConnected)
    );
    assert_eq!(client.stop().await, Err(CommandRejected::NotConnected));
    assert_eq!(
        client.load_cases().await,
        Err(CommandRejected::NotConnected)
    );
    assert_eq!(
        client.replay_case(CaseId(4)).await,
        Err(CommandRejected::NotConnected)
    );
}

#[tokio::test]
async fn blank_request_rejected_before_transport() {
    let (engine_url, stub) = spawn_engine_stub(Vec::new(), false)
        .await
        .expect("spawn engine stub");
    let client = EngineClient::new(engine_url);
    let mut rx = client.subscribe_events();
    client.connect().await;
    wait_for_connected(&mut rx).await;

    assert_eq!(
        client.submit_request("   ").await,
        Err(CommandRejected::EmptyRequest)
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(stub.received.lock().await.is_empty());
}

#[tokio::test]
async fn commands_reach_engine_verbatim() {
    let (engine_url, stub) = spawn_engine_stub(Vec::new(), false)
        .await
        .expect("spawn engine stub");
    let client = EngineClient::new(engine_url);
    let mut rx = client.subscribe_events();
    client.connect().await;
    wait_for_connected(&mut rx).await;

    client
        .submit_request("go to example.com")
        .await
        .expect("submit");
    client.interact(0.25, 0.75).await.expect("interact");
    client
        .update_config("iphone-14-pro")
        .await
        .expect("update config");
    client
        .update_env_config("BASE_URL", "https://staging.example.com")
        .await
        .expect("update env config");

    let received = wait_for_received(&stub, 4).await;
    assert_eq!(
        received,
        vec![
            ClientCommand::Message {
                data: "go to example.com".into()
            },
            ClientCommand::Interact { x: 0.25, y: 0.75 },
            ClientCommand::UpdateConfig {
                preset: "iphone-14-pro".into()
            },
            ClientCommand::UpdateEnvConfig {
                key: "BASE_URL".into(),
                value: "https://staging.example.com".into()
            },
        ]
    );
}

#[tokio::test]
async fn save_case_guards_apply_before_send() {
    let client = EngineClient::new("http://127.0.0.1:1");
    assert_eq!(
        client.save_case("  ", "", vec!["step".into()]).await,
        Err(CommandRejected::BlankCaseName)
    );
    assert_eq!(
        client.save_case("login flow", "", Vec::new()).await,
        Err(CommandRejected::EmptyCase)
    );
}

#[tokio::test]
async fn drop_broadcasts_disconnected_then_retries() {
    let script = vec![EngineEvent::ProcessingState {
        status: ProcessingStatus::Idle,
    }];
    let (engine_url, stub) = spawn_engine_stub(script, true)
        .await
        .expect("spawn engine stub");
    let client = EngineClient::new(engine_url);
    let mut rx = client.subscribe_events();
    client.connect().await;

    wait_for_connected(&mut rx).await;
    loop {
        if let ClientEvent::ConnectionChanged(ConnectionState::Disconnected) =
            next_event(&mut rx).await
        {
            break;
        }
    }
    assert_eq!(
        client.submit_request("anything").await,
        Err(CommandRejected::NotConnected)
    );

    wait_for_connected(&mut rx).await;
    assert!(*stub.connections.lock().await >= 2);
}

#[tokio::test]
async fn fetch_reports_decodes_listing_envelope() {
    let (engine_url, _stub) = spawn_engine_stub(Vec::new(), false)
        .await
        .expect("spawn engine stub");
    let client = EngineClient::new(engine_url.clone());

    let reports = client.fetch_reports().await.expect("fetch reports");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, "run-7");
    assert_eq!(reports[0].path, "reports/run-7.html");
    assert_eq!(
        client.report_url(&reports[0].path),
        format!("{engine_url}/reports/run-7.html")
    );
}
