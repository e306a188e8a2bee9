use anyhow::Result;
use iothub_fixtures::domain::model::{PipelineOp, PipelineOpKind};
use iothub_fixtures::fixtures::{self, ConnectionStringVariant};
use iothub_fixtures::{
    AuthenticationProvider, DeviceClient, FakePipelineAdapter, Feature, FixtureError,
    FixtureValues, Message, MethodRequest, MethodResponse, ModuleClient, PipelineAdapter,
    ReceiveMode,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn method_request(name: &str) -> MethodRequest {
    MethodRequest {
        request_id: "42".to_string(),
        name: name.to_string(),
        payload: serde_json::json!({"spell": "lumos"}),
    }
}

fn device_client() -> (Arc<FakePipelineAdapter>, DeviceClient<FakePipelineAdapter>) {
    let pipeline = fixtures::pipeline();
    let client = DeviceClient::new(Arc::clone(&pipeline));
    (pipeline, client)
}

fn module_client() -> (Arc<FakePipelineAdapter>, ModuleClient<FakePipelineAdapter>) {
    let pipeline = fixtures::pipeline();
    let client = ModuleClient::new(Arc::clone(&pipeline));
    (pipeline, client)
}

/// 測試用連線字串建立 client，pipeline factory 收到解析後的身分
#[test]
fn test_create_from_connection_string() -> Result<()> {
    let values = FixtureValues::default();
    for variant in ConnectionStringVariant::ALL {
        let pipeline = fixtures::pipeline();
        let mut seen = None;
        let client = ModuleClient::create_from_connection_string(
            &fixtures::module_connection_string(&values, variant),
            |auth| {
                seen = Some(auth);
                Arc::clone(&pipeline)
            },
        )?;

        let auth = seen.expect("factory not called");
        assert!(matches!(auth, AuthenticationProvider::SymmetricKey(_)));
        assert_eq!(auth.module_id(), Some("Divination"));
        assert!(Arc::ptr_eq(client.pipeline(), &pipeline));
    }
    Ok(())
}

#[test]
fn test_create_from_bad_connection_string() {
    for bad in ["not-a-connection-string", ""] {
        let result = DeviceClient::create_from_connection_string(bad, |_| fixtures::pipeline());
        assert!(matches!(result, Err(FixtureError::ConnectionStringError { .. })));
    }
}

#[test]
fn test_create_from_shared_access_signature() -> Result<()> {
    let values = FixtureValues::default();
    let mut device_id = String::new();
    DeviceClient::create_from_shared_access_signature(
        &fixtures::device_sas_token_string(&values),
        |auth| {
            device_id = auth.device_id().to_string();
            fixtures::pipeline()
        },
    )?;
    assert_eq!(device_id, "MyPensieve");

    let bad = DeviceClient::create_from_shared_access_signature(
        "SharedAccessSignature sr=Invalid&sig=Invalid&se=Invalid",
        |_| fixtures::pipeline(),
    );
    assert!(bad.is_err());
    Ok(())
}

#[test]
fn test_create_from_encoded_shared_access_signature() -> Result<()> {
    let mut device_id = String::new();
    DeviceClient::create_from_shared_access_signature(
        "SharedAccessSignature sig=abc&se=1539043658&skn=policy&sr=beauxbatons.academy-net%2Fdevices%2FMyPensieve",
        |auth| {
            device_id = auth.device_id().to_string();
            fixtures::pipeline()
        },
    )?;
    assert_eq!(device_id, "MyPensieve");
    Ok(())
}

#[test]
fn test_create_from_edge_environment() -> Result<()> {
    let vars = fixtures::edge_container_env_vars();
    let client = ModuleClient::create_from_edge_environment(&vars, |auth| {
        assert!(matches!(auth, AuthenticationProvider::IotEdge(_)));
        assert_eq!(auth.gateway_hostname(), Some("__FAKE_GATEWAY_HOSTNAME__"));
        fixtures::pipeline()
    })?;
    assert!(!client.is_connected());

    let mut incomplete = vars.clone();
    incomplete.remove("IOTEDGE_APIVERSION");
    let result = ModuleClient::create_from_edge_environment(&incomplete, |_| fixtures::pipeline());
    assert!(matches!(result, Err(FixtureError::EdgeError { .. })));
    Ok(())
}

#[test]
fn test_operations_begin_pipeline_ops() -> Result<()> {
    let (pipeline, client) = module_client();

    client.connect()?;
    client.send_event(Message::new("event").with_message_id("m-1"))?;
    client.send_to_output("to output", "alerts")?;
    client.send_method_response(MethodResponse::create_from_method_request(
        &method_request("reboot"),
        200,
        None,
    ))?;
    client.disconnect()?;

    let kinds: Vec<PipelineOpKind> = pipeline.calls().iter().map(PipelineOp::kind).collect();
    assert_eq!(
        kinds,
        vec![
            PipelineOpKind::Connect,
            PipelineOpKind::SendEvent,
            PipelineOpKind::SendOutputEvent,
            PipelineOpKind::SendMethodResponse,
            PipelineOpKind::Disconnect,
        ]
    );

    match pipeline.last_call(PipelineOpKind::SendOutputEvent) {
        Some(PipelineOp::SendOutputEvent(message)) => {
            assert_eq!(message.data, b"to output".to_vec());
            assert_eq!(message.output_name.as_deref(), Some("alerts"));
        }
        other => panic!("unexpected call {:?}", other),
    }
    Ok(())
}

/// manual callback 模式下，操作要等到 callback 被觸發才返回
#[test]
fn test_each_operation_waits_for_completion() {
    let pipeline = fixtures::pipeline_manual_cb();
    let client = Arc::new(ModuleClient::new(Arc::clone(&pipeline)));

    type Op = fn(&ModuleClient<FakePipelineAdapter>) -> iothub_fixtures::Result<()>;
    let ops: [(PipelineOpKind, Op); 5] = [
        (PipelineOpKind::Connect, |c| c.connect()),
        (PipelineOpKind::Disconnect, |c| c.disconnect()),
        (PipelineOpKind::SendEvent, |c| c.send_event("payload")),
        (PipelineOpKind::SendOutputEvent, |c| c.send_to_output("payload", "out")),
        (PipelineOpKind::SendMethodResponse, |c| {
            c.send_method_response(MethodResponse {
                request_id: "1".to_string(),
                status: 200,
                payload: None,
            })
        }),
    ];

    for (kind, op) in ops {
        let worker = {
            let client = Arc::clone(&client);
            thread::spawn(move || op(&client))
        };

        assert!(pipeline.wait_for_pending(1, WAIT), "{:?} never started", kind);
        assert!(!worker.is_finished(), "{:?} returned before completion", kind);
        assert_eq!(pipeline.complete_next(), Some(kind));
        worker.join().unwrap().unwrap();
    }
}

#[test]
fn test_receive_method_request_enables_methods_once() -> Result<()> {
    let (pipeline, client) = device_client();

    pipeline.deliver_method_request(method_request("reboot"));
    pipeline.deliver_method_request(method_request("reboot"));
    client.receive_method_request(None, ReceiveMode::non_blocking())?;
    client.receive_method_request(None, ReceiveMode::non_blocking())?;

    assert_eq!(pipeline.call_count(PipelineOpKind::EnableFeature), 1);
    assert_eq!(
        pipeline.last_call(PipelineOpKind::EnableFeature),
        Some(PipelineOp::EnableFeature(Feature::Methods))
    );
    Ok(())
}

#[test]
fn test_named_method_inbox() -> Result<()> {
    let (pipeline, client) = device_client();

    // 先建立具名 inbox，之後的同名請求才會導向它
    assert!(matches!(
        client.receive_method_request(Some("reboot"), ReceiveMode::non_blocking()),
        Err(FixtureError::InboxEmpty)
    ));

    pipeline.deliver_method_request(method_request("reboot"));
    pipeline.deliver_method_request(method_request("status"));

    let named = client.receive_method_request(Some("reboot"), ReceiveMode::non_blocking())?;
    assert_eq!(named.name, "reboot");
    let generic = client.receive_method_request(None, ReceiveMode::non_blocking())?;
    assert_eq!(generic.name, "status");
    Ok(())
}

#[test]
fn test_blocking_receive_waits_for_message() -> Result<()> {
    let (pipeline, client) = device_client();

    let producer = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            pipeline.deliver_c2d_message(Message::new("owl post"));
        })
    };

    let message = client.receive_c2d_message(ReceiveMode::default())?;
    assert_eq!(message.data, b"owl post".to_vec());
    producer.join().unwrap();
    Ok(())
}

#[test]
fn test_receive_timeouts() {
    let (_pipeline, client) = module_client();

    assert!(matches!(
        client.receive_input_message("in", ReceiveMode::with_timeout(Duration::from_millis(20))),
        Err(FixtureError::InboxEmpty)
    ));
    assert!(matches!(
        client.receive_input_message("in", ReceiveMode::non_blocking()),
        Err(FixtureError::InboxEmpty)
    ));
}

/// 極大的 timeout 等同無期限等待
#[test]
fn test_receive_with_unbounded_timeout() -> Result<()> {
    let (pipeline, client) = module_client();

    pipeline.deliver_input_message("in", Message::new("queued"));
    let message = client.receive_input_message("in", ReceiveMode::with_timeout(Duration::MAX))?;
    assert_eq!(message.data, b"queued".to_vec());

    pipeline.deliver_method_request(method_request("reboot"));
    let request = client.receive_method_request(None, ReceiveMode::with_timeout(Duration::MAX))?;
    assert_eq!(request.name, "reboot");
    Ok(())
}

#[test]
fn test_input_messages_routed_by_name() -> Result<()> {
    let (pipeline, client) = module_client();

    pipeline.deliver_input_message("sensors", Message::new("temp"));
    pipeline.deliver_input_message("commands", Message::new("stop"));

    let message = client.receive_input_message("commands", ReceiveMode::non_blocking())?;
    assert_eq!(message.data, b"stop".to_vec());
    assert_eq!(message.input_name.as_deref(), Some("commands"));
    assert!(pipeline.is_feature_enabled(Feature::InputMessages));
    Ok(())
}

/// 斷線時清空所有待處理的 method request
#[test]
fn test_disconnect_event_clears_method_requests() {
    let (pipeline, client) = device_client();

    pipeline.fire_connected();
    assert!(client.is_connected());
    pipeline.deliver_method_request(method_request("reboot"));
    assert_eq!(client.inbox_manager().get_method_request_inbox(None).len(), 1);

    pipeline.fire_disconnected();
    assert!(!client.is_connected());
    assert!(client.inbox_manager().get_method_request_inbox(None).empty());
}
