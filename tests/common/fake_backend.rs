#![allow(dead_code)]
//! Minimal HTTP server standing in for the Ivy backend
use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub struct FakeBackend {
    server: Arc<Server>,
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeBackend {
    /// Serve `fetch_body` on every GET; 404 on DELETE of `missing_paths`;
    /// 500 for any path in `failing_paths`; 200 otherwise
    pub fn start(
        fetch_body: String,
        missing_paths: HashSet<String>,
        failing_paths: HashSet<String>,
    ) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("Failed to start fake backend"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("Fake backend not on ip")
            .port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = server.clone();
            let requests = requests.clone();
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let method = request.method().as_str().to_uppercase();
                    let url = request.url().to_string();
                    let authorization = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string());

                    requests.lock().unwrap().push(RecordedRequest {
                        method: method.clone(),
                        url: url.clone(),
                        authorization,
                        body,
                    });

                    let path = url.split('?').next().unwrap_or_default().to_string();
                    let json = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("valid header");
                    let response = if failing_paths.contains(&path) {
                        Response::from_string("{}").with_status_code(500)
                    } else if method == "DELETE" && missing_paths.contains(&path) {
                        Response::from_string("{}").with_status_code(404)
                    } else if method == "GET" {
                        Response::from_string(fetch_body.clone())
                    } else {
                        Response::from_string("{}")
                    };
                    let _ = request.respond(response.with_header(json));
                }
            })
        };

        Self {
            server,
            base_url: format!("http://127.0.0.1:{}", port),
            requests,
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
