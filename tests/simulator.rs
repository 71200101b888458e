//! End-to-end tests against a running listener.

use bytes::Bytes;
use generic_sim::{Dispatcher, RequestLog, RouteTable, Server};
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

const CONFIG: &str = r#"
widgets:
  get:
    statusCode: 200
    body: "[]"
  post:
    statusCode: 201
/gadgets/1:
  put:
    statusCode: 202
    contentType: text/plain
    body: updated
    headers:
      X-Sim: generic
      content-type: application/xml
"#;

struct Running {
    addr: SocketAddr,
    log_path: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    _dir: tempfile::TempDir,
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn start(config: &str) -> Running {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("generic_sim").join("output.log");

    let table = RouteTable::from_yaml(config).unwrap();
    let log = RequestLog::open(&log_path).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(log));

    let server = Server::bind("127.0.0.1:0".parse().unwrap(), dispatcher)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    Running {
        addr,
        log_path,
        stop: Some(stop),
        _dir: dir,
    }
}

async fn send(
    addr: SocketAddr,
    method: Method,
    path: &str,
    body: &str,
) -> (StatusCode, HeaderMap, String) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(HOST, addr.to_string())
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap();

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_widgets_over_http() {
    let sim = start(CONFIG).await;

    let (status, headers, body) = send(sim.addr, Method::GET, "/widgets", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "application/json");
    assert_eq!(body, "[]");

    let (status, _, body) = send(sim.addr, Method::POST, "/widgets", r#"{"name":"w"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "{}");

    let (status, _, _) = send(sim.addr, Method::DELETE, "/widgets", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(sim.addr, Method::GET, "/gadgets", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(sim.addr, Method::OPTIONS, "/widgets", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_query_string_ignored() {
    let sim = start(CONFIG).await;
    let (status, _, body) = send(sim.addr, Method::GET, "/widgets?page=2", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_headers_and_content_type_over_http() {
    let sim = start(CONFIG).await;

    let (status, headers, body) = send(sim.addr, Method::PUT, "/gadgets/1", "payload").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(headers["x-sim"], "generic");
    assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
    assert_eq!(headers[CONTENT_TYPE], "text/plain");
    assert_eq!(body, "updated");
}

#[tokio::test]
async fn test_request_bodies_logged() {
    let sim = start(CONFIG).await;

    send(sim.addr, Method::POST, "/widgets", r#"{"id":1}"#).await;
    send(sim.addr, Method::DELETE, "/unknown", "gone").await;

    assert_eq!(log_lines(&sim.log_path), vec![r#"{"id":1}"#, "gone"]);
}

#[tokio::test]
async fn test_concurrent_requests_no_cross_talk() {
    let sim = start(CONFIG).await;

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let addr = sim.addr;
            tokio::spawn(async move {
                let payload = format!("request-{:02}-", i).repeat(512);
                if i % 2 == 0 {
                    let (status, _, body) = send(addr, Method::GET, "/widgets", &payload).await;
                    assert_eq!(status, StatusCode::OK);
                    assert_eq!(body, "[]");
                } else {
                    let (status, _, body) = send(addr, Method::PUT, "/gadgets/1", &payload).await;
                    assert_eq!(status, StatusCode::ACCEPTED);
                    assert_eq!(body, "updated");
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut lines = log_lines(&sim.log_path);
    assert_eq!(lines.len(), 32);
    lines.sort();
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("request-{:02}-", i).repeat(512));
    }
}

#[test]
fn test_missing_status_code_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("responses.yml");
    std::fs::write(&config, "widgets:\n  get:\n    body: \"[]\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_generic-sim"))
        .arg("--config")
        .arg(&config)
        .arg("--listen")
        .arg("127.0.0.1:0")
        .arg("--request-log")
        .arg(dir.path().join("output.log"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("statusCode"));
    // The request log is only opened once the table has loaded
    assert!(!dir.path().join("output.log").exists());
}

#[test]
fn test_missing_config_file_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_generic-sim"))
        .arg("--config")
        .arg(dir.path().join("absent.yml"))
        .arg("--listen")
        .arg("127.0.0.1:0")
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn test_validate_sample_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_generic-sim"))
        .arg("--config")
        .arg(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/responses.yml"))
        .arg("--validate")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("GET /widgets -> 200"));
    assert!(stdout.contains("Configuration is valid (4 routes defined)"));
}
