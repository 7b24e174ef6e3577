//! 发送客户端集成测试（wiremock 模拟 Slack）

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use run_notify::notification::{BotTarget, Field, WebhookTarget};
use run_notify::{DeliveryClient, DeliveryConfig, DeliveryTarget, EventKind, Message, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn fast_config() -> DeliveryConfig {
    DeliveryConfig {
        rate_limit_interval: Duration::ZERO,
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(200),
        },
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn webhook_client(server: &MockServer, config: DeliveryConfig) -> DeliveryClient {
    let target = DeliveryTarget::Webhook(WebhookTarget {
        endpoint: format!("{}/services/T/B/X", server.uri()).parse().unwrap(),
    });
    DeliveryClient::new(target, config).unwrap()
}

fn bot_client(server: &MockServer) -> DeliveryClient {
    let target = DeliveryTarget::Bot(BotTarget {
        token: "xoxb-test".to_string(),
        destination: "C0123".to_string(),
    });
    let config = DeliveryConfig {
        api_base_url: server.uri(),
        ..fast_config()
    };
    DeliveryClient::new(target, config).unwrap()
}

fn message() -> Message {
    let mut message = Message::new(EventKind::Completed, "hello").with_footer("demo");
    message.fields.push(Field::new("Run Name", "nightly", true));
    message
}

/// 记录每次请求到达的时间，并以固定状态码响应
struct RecordTimes {
    times: Arc<Mutex<Vec<Instant>>>,
    status: u16,
}

impl RecordTimes {
    fn new(status: u16) -> (Self, Arc<Mutex<Vec<Instant>>>) {
        let times = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                times: times.clone(),
                status,
            },
            times,
        )
    }
}

impl Respond for RecordTimes {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.times.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(self.status).set_body_string("ok")
    }
}

#[tokio::test]
async fn test_webhook_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T/B/X"))
        .and(body_partial_json(json!({ "text": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = webhook_client(&server, fast_config());
    assert!(client.deliver(&message()).await);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("channel").is_none());
    assert_eq!(body["attachments"][0]["fields"][0]["title"], "Run Name");
}

#[tokio::test]
async fn test_server_error_retried_with_exponential_backoff() {
    let server = MockServer::start().await;
    let (responder, times) = RecordTimes::new(500);
    Mock::given(method("POST"))
        .respond_with(responder)
        .expect(4)
        .mount(&server)
        .await;

    let client = webhook_client(&server, fast_config());
    assert!(!client.deliver(&message()).await);

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 4);
    // 20ms, 40ms, 80ms，与默认 1s/2s/4s 同比例
    let expected = [20, 40, 80];
    for (pair, delay) in times.windows(2).zip(expected) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(delay), "gap {:?} < {}ms", gap, delay);
        assert!(
            gap < Duration::from_millis(delay + 150),
            "gap {:?} too long for {}ms",
            gap,
            delay
        );
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
        .expect(1)
        .mount(&server)
        .await;

    let client = webhook_client(&server, fast_config());
    assert!(!client.deliver(&message()).await);
}

#[tokio::test]
async fn test_retry_after_hint_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = webhook_client(&server, fast_config());
    let start = Instant::now();
    assert!(client.deliver(&message()).await);
    assert!(start.elapsed() >= Duration::from_millis(950));
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = webhook_client(&server, fast_config());
    assert!(client.deliver(&message()).await);
    assert!(client.error_log().is_empty());
}

#[tokio::test]
async fn test_bot_success_requires_ok_true() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({ "channel": "C0123", "text": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "ts": "1.2" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(bot_client(&server).deliver(&message()).await);
}

#[tokio::test]
async fn test_bot_logical_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = bot_client(&server);
    assert!(!client.deliver(&message()).await);
    assert_eq!(client.error_log().len(), 1);
}

#[tokio::test]
async fn test_bot_rate_limited_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "rate_limited" })),
        )
        .expect(4)
        .mount(&server)
        .await;

    assert!(!bot_client(&server).deliver(&message()).await);
}

#[tokio::test]
async fn test_bot_malformed_response_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!bot_client(&server).deliver(&message()).await);
}

#[tokio::test]
async fn test_timeout_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = DeliveryConfig {
        request_timeout: Duration::from_millis(200),
        retry: RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        },
        ..fast_config()
    };
    let client = webhook_client(&server, config);
    assert!(!client.deliver(&message()).await);
}

#[tokio::test]
async fn test_connection_refused_returns_false() {
    let target = DeliveryTarget::Webhook(WebhookTarget {
        endpoint: "http://127.0.0.1:9/services/T/B/X".parse().unwrap(),
    });
    let client = DeliveryClient::new(target, fast_config()).unwrap();
    assert!(!client.deliver(&message()).await);
    assert_eq!(client.error_log().len(), 1);
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = DeliveryConfig {
        dry_run: true,
        ..fast_config()
    };
    assert!(webhook_client(&server, config).deliver(&message()).await);
}

#[tokio::test]
async fn test_rate_limit_spaces_sends() {
    let server = MockServer::start().await;
    let (responder, times) = RecordTimes::new(200);
    Mock::given(method("POST"))
        .respond_with(responder)
        .expect(2)
        .mount(&server)
        .await;

    let config = DeliveryConfig {
        rate_limit_interval: Duration::from_millis(1000),
        ..fast_config()
    };
    let client = webhook_client(&server, config);

    assert!(client.deliver(&message()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.deliver(&message()).await);

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 2);
    assert!(times[1].duration_since(times[0]) >= Duration::from_millis(950));
}

#[tokio::test]
async fn test_identical_concurrent_failures_logged_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("channel_is_archived"))
        .expect(2)
        .mount(&server)
        .await;

    let client = Arc::new(webhook_client(&server, fast_config()));
    let first = tokio::spawn({
        let client = client.clone();
        async move { client.deliver(&message()).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.deliver(&message()).await }
    });

    assert!(!first.await.unwrap());
    assert!(!second.await.unwrap());
    assert_eq!(client.error_log().len(), 1);
}

#[tokio::test]
async fn test_many_concurrent_callers_all_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(10)
        .mount(&server)
        .await;

    let client = Arc::new(webhook_client(&server, fast_config()));
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .deliver(&Message::new(EventKind::Custom, format!("msg {}", i)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
}
