//! HTTP gateway tests against a local one-shot responder

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use core_kernel::{AdapterHealth, ExternalAuthConfig, HealthCheckable, PortError};
use domain_arbitration::AgentGateway;
use infra_gateway::{GatewayConfig, HttpAgentGateway};

struct CapturedRequest {
    head: String,
    body: String,
}

/// Answers exactly one request with the given status, extra headers and body
async fn serve_once(
    status_line: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\n{}content-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            extra_headers,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request was complete");
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = content_length(&head);
            if buf.len() >= end + 4 + length {
                let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).to_string();
                return CapturedRequest { head, body };
            }
        }
    }
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

fn gateway(base_url: &str) -> HttpAgentGateway {
    HttpAgentGateway::new(GatewayConfig::new(base_url)).unwrap()
}

mod role_call_tests {
    use super::*;

    #[tokio::test]
    async fn test_judge_call_posts_arguments_and_unwraps_result() {
        let body = serde_json::json!({
            "result": "{\"final_decision\":\"DENIED\",\"confidence_score\":0.9}"
        })
        .to_string();
        let (base_url, captured) = serve_once("200 OK", "", body).await;
        let config = GatewayConfig::new(&base_url).with_auth(ExternalAuthConfig::BearerToken {
            token: "secret-token".to_string(),
        });
        let gateway = HttpAgentGateway::new(config).unwrap();

        let payload = gateway
            .judge("{\"claim\":1}", "{\"case\":2}", "P001", "70553")
            .await
            .unwrap();

        assert_eq!(payload, "{\"final_decision\":\"DENIED\",\"confidence_score\":0.9}");

        let request = captured.await.unwrap();
        assert!(request.head.starts_with("POST /ai_judge_decision HTTP/1.1"));
        assert!(request
            .head
            .to_lowercase()
            .contains("authorization: bearer secret-token"));
        let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(sent["claim_json"], "{\"claim\":1}");
        assert_eq!(sent["insurance_case_json"], "{\"case\":2}");
        assert_eq!(sent["patient_id"], "P001");
        assert_eq!(sent["procedure_code"], "70553");
    }

    #[tokio::test]
    async fn test_appeal_call_carries_round() {
        let body = serde_json::json!({ "result": { "appeal_summary": "Necessary" } }).to_string();
        let (base_url, captured) = serve_once("200 OK", "", body).await;

        let payload = gateway(&base_url)
            .doctor_appeal("{}", "{}", "{}", 2)
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["appeal_summary"], "Necessary");

        let request = captured.await.unwrap();
        assert!(request.head.starts_with("POST /doctor_appeal_generator "));
        let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(sent["round"], 2);
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_server_error_is_service_unavailable() {
        let (base_url, _captured) =
            serve_once("503 Service Unavailable", "", "{}".to_string()).await;

        let err = gateway(&base_url).build_claim("P001", "70553", "notes").await.unwrap_err();

        assert!(matches!(err, PortError::ServiceUnavailable { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let (base_url, _captured) =
            serve_once("429 Too Many Requests", "retry-after: 12\r\n", "{}".to_string()).await;

        let err = gateway(&base_url).review_claim("{}", "70553").await.unwrap_err();

        assert!(matches!(err, PortError::RateLimited { retry_after_secs: 12 }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = gateway(&format!("http://{}", addr))
            .build_claim("P001", "70553", "notes")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut config = GatewayConfig::new(format!("http://{}", addr));
        config.request_timeout_secs = 1;
        let err = HttpAgentGateway::new(config)
            .unwrap()
            .judge("{}", "{}", "P001", "70553")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Timeout { .. }));
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_healthy() {
        let (base_url, captured) = serve_once("200 OK", "", "{\"status\":\"ok\"}".to_string()).await;

        let result = gateway(&base_url).health_check().await;

        assert_eq!(result.status, AdapterHealth::Healthy);
        assert!(result.message.is_none());
        let request = captured.await.unwrap();
        assert!(request.head.starts_with("GET /health "));
    }

    #[tokio::test]
    async fn test_health_check_degraded_on_error_status() {
        let (base_url, _captured) =
            serve_once("500 Internal Server Error", "", "{}".to_string()).await;

        let result = gateway(&base_url).health_check().await;

        assert_eq!(result.status, AdapterHealth::Degraded);
        assert!(result.message.unwrap().contains("500"));
    }
}
