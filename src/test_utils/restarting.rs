//! A bare-bones HTTP service that restarts on apply.
//!
//! Mock servers always answer, but a real service often goes down before it
//! can respond to the apply request. This server speaks just enough
//! HTTP/1.1 over a raw [`TcpListener`] to serve the other endpoints, and
//! closes the connection without a response when the update is triggered.

use crate::constants::{APPLY_PATH, CLEANUP_PATH, HEALTH_PATH, PACKAGE_INFO_PATH, UPLOAD_PATH};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const PACKAGE_INFO: &str = r#"{"version":{"version":"1.2.3","buildTime":"2024-05-01T10:00:00Z","appType":"aspnetcore","releaseNotes":"Bug fixes"},"packagePath":"packages/update.zip","packageSize":2097152,"uploadTime":"2024-05-01T10:05:00Z"}"#;

type RequestLog = Arc<Mutex<Vec<String>>>;

/// Local service that accepts uploads and drops the apply connection.
///
/// Every request is logged as `"METHOD /path"`. The server stops when the
/// value is dropped.
#[derive(Debug)]
pub struct RestartingService {
    addr: SocketAddr,
    requests: RequestLog,
    handle: JoinHandle<()>,
}

impl RestartingService {
    /// Bind to a free local port and start serving.
    pub async fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = RequestLog::default();

        let log = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(stream, log).await;
                });
            }
        });

        Ok(Self {
            addr,
            requests,
            handle,
        })
    }

    /// Base URL of the service.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received for `method` and `path`.
    pub fn count(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        self.requests().iter().filter(|r| **r == wanted).count()
    }
}

impl Drop for RestartingService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Handle one request per connection.
async fn serve(mut stream: TcpStream, log: RequestLog) -> io::Result<()> {
    let Some((method, path)) = read_request(&mut stream).await? else {
        return Ok(());
    };
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(format!("{method} {path}"));

    let (status, body) = match (method.as_str(), path.as_str()) {
        ("GET", HEALTH_PATH) => ("200 OK", r#"{"status":"healthy"}"#.to_string()),
        ("POST", UPLOAD_PATH) => (
            "200 OK",
            format!(r#"{{"success":true,"message":"Package uploaded","packageInfo":{PACKAGE_INFO}}}"#),
        ),
        ("GET", PACKAGE_INFO_PATH) => {
            ("200 OK", format!(r#"{{"success":true,"packageInfo":{PACKAGE_INFO}}}"#))
        }
        // The updater kills the process before the response goes out.
        ("POST", APPLY_PATH) => return Ok(()),
        ("POST", CLEANUP_PATH) => (
            "200 OK",
            r#"{"success":true,"message":"Removed 2 old packages"}"#.to_string(),
        ),
        _ => ("404 Not Found", r#"{"success":false,"error":"not found"}"#.to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Read a full request and return its method and path.
///
/// The body is consumed and discarded, so that closing the socket does not
/// reset the connection under the client.
async fn read_request(stream: &mut TcpStream) -> io::Result<Option<(String, String)>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut chunked = false;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "transfer-encoding" => chunked = value.to_ascii_lowercase().contains("chunked"),
                _ => {}
            }
        }
    }

    let mut body = buf.split_off(head_end);
    loop {
        let complete = if chunked {
            body.ends_with(b"0\r\n\r\n")
        } else {
            body.len() >= content_length
        };
        if complete {
            break;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(Some((method, path)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
