use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use reqwest::Method;

use crate::api::{ApiClient, ApiContext, ApiError, ListQuery, Resource};
use crate::export::ExportError;
use crate::screen::ListScreen;

#[derive(Clone, Debug)]
struct Canned {
    status: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
    declared_len: Option<usize>,
}

impl Canned {
    fn json(status: &'static str, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap(),
            declared_len: None,
        }
    }

    fn empty(status: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            declared_len: None,
        }
    }

    /// Announce a longer body than is sent, so the client's read fails.
    fn cut_short(mut self, declared_len: usize) -> Self {
        self.declared_len = Some(declared_len);
        self
    }
}

#[derive(Clone, Debug)]
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Serve the canned responses in order, one connection each, and hand back
/// what the client sent.
async fn fake_api(responses: Vec<Canned>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed before sending headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    break end;
                }
            };

            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let mut lines = head.split("\r\n");
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|l| l.split_once(':'))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect();
            let content_length = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

            let mut response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                canned.status,
                canned.declared_len.unwrap_or(canned.body.len())
            );
            for (k, v) in canned.headers.iter() {
                response.push_str(&format!("{k}: {v}\r\n"));
            }
            response.push_str("\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.write_all(&canned.body).await.unwrap();
            socket.shutdown().await.ok();

            captured.push(Captured {
                request_line,
                headers,
                body,
            });
        }
        captured
    });
    (format!("http://{addr}/api"), handle)
}

fn client_for(base_url: &str, token: Option<&str>) -> ApiClient {
    let ctx = ApiContext::new(
        base_url,
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap();
    ApiClient::new(ctx).unwrap()
}

#[tokio::test]
async fn list_sends_page_search_and_bearer_token() {
    let (base, server) = fake_api(vec![Canned::json(
        "200 OK",
        json!({ "result": [{ "id": 1, "material": "Cement" }], "pages": 4 }),
    )])
    .await;
    let client = client_for(&base, Some("tok-123"));

    let query = ListQuery {
        page: 2,
        search: Some("cement".to_string()),
    };
    let page = client.list(Resource::Arrivals, &query).await.unwrap();
    assert_eq!(page.pages, 4);
    assert_eq!(page.result[0].cell("material"), "Cement");

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line, "GET /api/arrivals?page=2&search=cement HTTP/1.1");
    assert_eq!(seen[0].header("authorization"), Some("Bearer tok-123"));
}

#[tokio::test]
async fn anonymous_requests_omit_authorization() {
    let (base, server) = fake_api(vec![Canned::json(
        "200 OK",
        json!({ "id": 9, "name": "Acme" }),
    )])
    .await;
    let client = client_for(&base, None);

    let record = client.get(Resource::Suppliers, "9").await.unwrap();
    assert_eq!(record.id().as_deref(), Some("9"));

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line, "GET /api/suppliers/9 HTTP/1.1");
    assert!(seen[0].header("authorization").is_none());
}

#[tokio::test]
async fn create_posts_json_and_accepts_empty_reply() {
    let (base, server) = fake_api(vec![Canned::empty("201 Created")]).await;
    let client = client_for(&base, Some("t"));

    let body = crate::model::parse_field_assignments(&["name=Sand", "qty=12"]).unwrap();
    let record = client.create(Resource::Materials, &body).await.unwrap();
    assert!(record.0.is_empty());

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line, "POST /api/materials HTTP/1.1");
    assert_eq!(seen[0].header("content-type"), Some("application/json"));
    let sent: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(sent, json!({ "name": "Sand", "qty": 12 }));
}

#[tokio::test]
async fn update_and_delete_use_record_paths() {
    let (base, server) = fake_api(vec![
        Canned::json("200 OK", json!({ "id": 5, "amount": 300 })),
        Canned::empty("204 No Content"),
    ])
    .await;
    let client = client_for(&base, None);

    let body = crate::model::parse_field_assignments(&["amount=300"]).unwrap();
    let updated = client.update(Resource::Payments, "5", &body).await.unwrap();
    assert_eq!(updated.cell("amount"), "300");
    client.delete(Resource::Payments, "5").await.unwrap();

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line, "PUT /api/payments/5 HTTP/1.1");
    assert_eq!(seen[1].request_line, "DELETE /api/payments/5 HTTP/1.1");
}

#[tokio::test]
async fn error_status_carries_code_and_body() {
    let (base, server) = fake_api(vec![Canned::json(
        "404 Not Found",
        json!({ "message": "no such foreman" }),
    )])
    .await;
    let client = client_for(&base, None);

    let err = client.get(Resource::Foremen, "77").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("no such foreman"));
    server.await.unwrap();
}

#[tokio::test]
async fn undecodable_list_is_a_decode_error() {
    let (base, server) = fake_api(vec![Canned {
        status: "200 OK",
        headers: vec![("Content-Type", "text/html".to_string())],
        body: b"<html>login</html>".to_vec(),
        declared_len: None,
    }])
    .await;
    let client = client_for(&base, None);

    let err = client
        .list(Resource::Expenses, &ListQuery::page(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn screen_keeps_previous_rows_when_refetch_fails() {
    let (base, server) = fake_api(vec![
        Canned::json(
            "200 OK",
            json!({ "result": [{ "id": 1 }, { "id": 2 }], "pages": 3 }),
        ),
        Canned::json("500 Internal Server Error", json!({ "message": "db down" })),
    ])
    .await;
    let client = client_for(&base, None);

    let mut screen = ListScreen::new(Resource::Kitchen);
    screen.refresh(&client).await.unwrap();
    assert_eq!(screen.records().len(), 2);

    assert!(screen.next());
    let err = screen.refresh(&client).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(screen.records().len(), 2);
    assert_eq!(screen.page(), 2);
    assert!(screen.last_error().unwrap().contains("db down"));

    let seen = server.await.unwrap();
    assert_eq!(seen[1].request_line, "GET /api/kitchen?page=2 HTTP/1.1");
}

#[tokio::test]
async fn export_downloads_blob_with_server_file_name() {
    let payload = b"PK\x03\x04fake-xlsx".to_vec();
    let (base, server) = fake_api(vec![Canned {
        status: "200 OK",
        headers: vec![
            (
                "Content-Type",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                "Content-Disposition",
                "attachment; filename=\"arrivals-2026-10.xlsx\"".to_string(),
            ),
        ],
        body: payload.clone(),
        declared_len: None,
    }])
    .await;
    let client = client_for(&base, Some("t"));

    let dir = std::env::temp_dir().join(format!("stockdesk-export-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let path = crate::export::export_to_file(&client, Resource::Arrivals, Some(dir.as_path()), false)
        .await
        .unwrap();
    assert_eq!(path, dir.join("arrivals-2026-10.xlsx"));
    assert_eq!(std::fs::read(&path).unwrap(), payload);

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line, "GET /api/arrivals/export HTTP/1.1");
    assert_eq!(seen[0].header("accept"), Some("*/*"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn body_read_failure_names_the_request_method() {
    let (base, server) = fake_api(vec![Canned {
        status: "201 Created",
        headers: vec![("Content-Type", "application/json".to_string())],
        body: b"{\"id\":".to_vec(),
        declared_len: None,
    }
    .cut_short(64)])
    .await;
    let client = client_for(&base, None);

    let body = crate::model::parse_field_assignments(&["name=Gravel"]).unwrap();
    let err = client.create(Resource::Materials, &body).await.unwrap_err();
    match &err {
        ApiError::Transport { method, .. } => assert_eq!(*method, Method::POST),
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("POST "));
    server.await.unwrap();
}

#[tokio::test]
async fn export_creates_a_missing_output_directory() {
    let (base, server) = fake_api(vec![Canned {
        status: "200 OK",
        headers: vec![(
            "Content-Disposition",
            "attachment; filename=\"suppliers.xlsx\"".to_string(),
        )],
        body: b"PK\x03\x04".to_vec(),
        declared_len: None,
    }])
    .await;
    let client = client_for(&base, None);

    let dir = std::env::temp_dir().join(format!("stockdesk-outdir-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let out = std::path::PathBuf::from(format!("{}/reports/", dir.display()));

    let path = crate::export::export_to_file(&client, Resource::Suppliers, Some(out.as_path()), false)
        .await
        .unwrap();
    assert_eq!(path, dir.join("reports").join("suppliers.xlsx"));
    assert!(path.is_file());
    server.await.unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn export_refuses_existing_file_before_downloading() {
    let (base, server) = fake_api(Vec::new()).await;
    let client = client_for(&base, None);

    let dir = std::env::temp_dir().join(format!("stockdesk-existing-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("payments.xlsx");
    std::fs::write(&file, b"keep me").unwrap();

    let err = crate::export::export_to_file(&client, Resource::Payments, Some(file.as_path()), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Exists { .. }));
    assert_eq!(std::fs::read(&file).unwrap(), b"keep me");
    assert!(server.await.unwrap().is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}
