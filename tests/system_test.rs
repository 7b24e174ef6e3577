//! 通知系统端到端测试：配置 -> 解析 -> 组装 -> 队列 -> 发送

use std::time::Duration;

use run_notify::{EventContext, FailureInfo, NotificationBuilder, NotifyConfig, NotifyOptions};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bot_config(server: &MockServer) -> NotifyConfig {
    NotifyConfig::from_value(json!({
        "bot": { "token": "xoxb-e2e", "channel": "C0E2E" },
        "onStart": { "message": "Run started" },
        "onError": {
            "message": {
                "text": "Run failed",
                "includeFields": ["runName", "errorMessage", "failedProcess"]
            }
        },
        "delivery": { "rateLimitMs": 0, "apiBaseUrl": server.uri() }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_lifecycle_and_adhoc_messages_are_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-e2e"))
        .and(body_partial_json(json!({ "channel": "C0E2E" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(3)
        .mount(&server)
        .await;

    let system = NotificationBuilder::new(bot_config(&server)).build().unwrap();
    assert!(system.is_active());

    let ctx = EventContext::builder()
        .run_id("nightly-42")
        .workflow_name("nightly")
        .build();
    let mut failed = ctx.clone();
    failed.error_message = Some("disk full".to_string());

    assert!(system.dispatcher.on_start(&ctx));
    assert!(system.dispatcher.on_error(
        &failed,
        FailureInfo {
            step: Some("compile".to_string()),
            exit_code: Some(2),
        },
    ));
    assert!(system
        .notifier
        .notify(NotifyOptions::new("Checkpoint reached").with_color("#00FF00")));
    // 空文本被拒绝，不会发出请求
    assert!(!system.notifier.notify(""));

    assert!(system.shutdown(Duration::from_secs(5)).await);

    let bodies: Vec<serde_json::Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(bodies[0]["text"], "Run started");
    assert!(bodies[0].get("attachments").is_none());

    assert_eq!(bodies[1]["text"], "Run failed");
    let fields = bodies[1]["attachments"][0]["fields"].as_array().unwrap();
    let titles: Vec<&str> = fields.iter().map(|f| f["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Run Name", "Error Message", "Failed Process"]);
    assert_eq!(fields[2]["value"], "compile (exit code 2)");

    assert_eq!(bodies[2]["text"], "Checkpoint reached");
    assert_eq!(bodies[2]["attachments"][0]["color"], "#00FF00");
}

#[tokio::test]
async fn test_disabled_event_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = bot_config(&server);
    config.on_start.enabled = false;
    let system = NotificationBuilder::new(config).build().unwrap();

    let ctx = EventContext::builder().run_id("r1").build();
    assert!(!system.dispatcher.on_start(&ctx));
    assert!(system.dispatcher.on_complete(&ctx));
    assert!(system.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_delivery_failure_never_reaches_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let system = NotificationBuilder::new(bot_config(&server)).build().unwrap();
    assert!(system.notifier.notify("hello"));
    assert!(system.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_without_credentials_everything_is_noop() {
    let system = NotificationBuilder::new(NotifyConfig::default()).build().unwrap();
    assert!(!system.is_active());
    assert!(!system.notifier.notify("hello"));
    assert!(!system.dispatcher.on_start(&EventContext::minimal()));
    assert!(system.shutdown(Duration::from_millis(10)).await);
}
