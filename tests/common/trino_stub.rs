//! A single-threaded HTTP server that answers `/v1/statement` requests the way
//! a Trino coordinator does, recording every request it receives.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;
use url::form_urlencoded;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

pub struct StubServer {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Serves `handler` on an ephemeral local port. The handler also receives
    /// the server's base URL so it can hand out `nextUri` links.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest, &str) -> StubResponse + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let port = listener.local_addr().expect("stub address").port();
        let base_url = format!("http://127.0.0.1:{port}");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let Some(request) = read_request(&stream) else {
                    continue;
                };
                let response = handler(&request, &base_url);
                recorded.lock().expect("request log").push(request);
                write_response(stream, &response);
            }
        });
        Self { port, requests }
    }

    /// A coordinator whose only table has `columns`. Catalog lookups are
    /// paged over two `nextUri` hops; any `EXECUTE` binding `'boom'` fails.
    pub fn fake_trino(columns: &[&str]) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        Self::start(move |request, base_url| fake_trino_response(&columns, request, base_url))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("request log").clone()
    }

    /// Submitted SQL, in order. Paging requests are left out.
    pub fn statements(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == "POST")
            .map(|request| request.body)
            .collect()
    }

    /// The submitted request whose SQL starts with `prefix`.
    pub fn statement(&self, prefix: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .find(|request| request.method == "POST" && request.body.starts_with(prefix))
            .unwrap_or_else(|| panic!("no statement starting with {prefix:?}"))
    }
}

fn fake_trino_response(columns: &[String], request: &RecordedRequest, base_url: &str) -> StubResponse {
    let rows = |names: &[String]| names.iter().map(|n| json!([n])).collect::<Vec<_>>();
    let half = columns.len() / 2;
    if request.method == "GET" {
        return if request.path.ends_with("/columns/1") {
            StubResponse::json(json!({
                "id": "columns",
                "nextUri": format!("{base_url}/v1/statement/executing/columns/2"),
                "data": rows(&columns[..half]),
            }))
        } else {
            StubResponse::json(json!({"id": "columns", "data": rows(&columns[half..])}))
        };
    }

    let sql = request.body.trim();
    let finished = || StubResponse::json(json!({"id": "statement", "updateCount": 0}));
    if sql.contains("information_schema.columns") {
        StubResponse::json(json!({
            "id": "columns",
            "nextUri": format!("{base_url}/v1/statement/executing/columns/1"),
        }))
    } else if sql.starts_with("START TRANSACTION") {
        finished().with_header("X-Trino-Started-Transaction-Id", "tx-1")
    } else if let Some((name, statement)) = sql
        .strip_prefix("PREPARE ")
        .and_then(|rest| rest.split_once(" FROM "))
    {
        let encoded: String = form_urlencoded::byte_serialize(statement.as_bytes()).collect();
        finished().with_header("X-Trino-Added-Prepare", format!("{name}={encoded}"))
    } else if sql.starts_with("EXECUTE") && sql.contains("'boom'") {
        StubResponse::json(json!({
            "id": "statement",
            "stats": {"state": "FAILED"},
            "error": {
                "message": "Cannot cast 'boom' to DATE",
                "errorName": "INVALID_CAST_ARGUMENT"
            }
        }))
    } else if sql == "COMMIT" || sql == "ROLLBACK" {
        finished().with_header("X-Trino-Clear-Transaction-Id", "true")
    } else if let Some(name) = sql.strip_prefix("DEALLOCATE PREPARE ") {
        finished().with_header("X-Trino-Deallocated-Prepare", name)
    } else {
        StubResponse::json(json!({"id": "statement", "updateCount": 1}))
    }
}

fn read_request(stream: &TcpStream) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;
    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: TcpStream, response: &StubResponse) {
    let reason = match response.status {
        200 => "OK",
        503 => "Service Unavailable",
        _ => "Error",
    };
    let mut head = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}
