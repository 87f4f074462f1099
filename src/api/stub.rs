//! In-process HTTP stub for exercising the client against canned responses.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::ApiClient;
use crate::models::Rol;
use crate::session::{Session, SessionStore, UsuarioSesion};

#[derive(Debug, Clone)]
pub(crate) struct StubRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub(crate) type RequestLog = Arc<Mutex<Vec<StubRequest>>>;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(sock: &mut TcpStream) -> Option<StubRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.clone(), String::new()),
    };

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim().to_ascii_lowercase();
            if k == "content-length" {
                content_length = v.trim().parse().unwrap_or(0);
            } else if k == "authorization" {
                authorization = Some(v.trim().to_string());
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(StubRequest {
        method,
        path,
        query,
        authorization,
        body,
    })
}

/// Serves every connection with `handler`. `None` keeps the connection open
/// without answering, which is how timeouts are simulated.
pub(crate) async fn serve<F>(handler: F) -> (String, RequestLog)
where
    F: Fn(&StubRequest) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let accept_log = log.clone();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let handler = handler.clone();
            let log = accept_log.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut sock).await else {
                    return;
                };
                log.lock().unwrap().push(req.clone());
                match handler(&req) {
                    Some((status, body)) => {
                        let resp = format!(
                            "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = sock.write_all(resp.as_bytes()).await;
                        let _ = sock.shutdown().await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    });

    (format!("http://{addr}/api/v1"), log)
}

pub(crate) fn admin_session() -> Session {
    Session::new(
        "tok-123".to_string(),
        UsuarioSesion {
            username: "admin".to_string(),
            rol: Rol::Administrador,
        },
    )
}

/// Client logged in as an administrator, with a short logout delay.
pub(crate) fn test_client(base_url: &str, timeout_ms: u64) -> ApiClient {
    let mut cfg = crate::config::default_config();
    cfg.api_url = base_url.to_string();
    cfg.timeout_ms = timeout_ms;
    cfg.logout_delay_ms = 50;
    ApiClient::new(&cfg, SessionStore::with_session(admin_session())).unwrap()
}
