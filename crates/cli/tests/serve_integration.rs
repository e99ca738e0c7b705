//! Integration tests for the `krishi serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// A running `krishi serve` process, killed on drop.
struct Server {
    port: u16,
    child: Child,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Helper: start the krishi serve process on a fresh port.
fn start_server(extra_args: &[&str]) -> Server {
    let port = next_port();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_krishi"));
    cmd.env_remove("KRISHI_DATA").env_remove("KRISHI_PORT");
    cmd.arg("serve").arg("--port").arg(port.to_string());
    cmd.args(extra_args);
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());

    let child = cmd.spawn().expect("failed to start krishi serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server { port, child }
}

/// Helper: make an HTTP request and return (status, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut headers = String::new();
    if let Some(token) = token {
        headers.push_str(&format!("Authorization: Bearer {}\r\n", token));
    }
    let body = body.unwrap_or("");
    if !body.is_empty() || method != "GET" {
        headers.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        ));
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n{}",
        method, path, port, headers, body
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

fn get(server: &Server, path: &str) -> (u16, Value) {
    let (status, body) = http_request(server.port, "GET", path, None, None);
    (status, serde_json::from_str(&body).expect("valid JSON"))
}

fn send(
    server: &Server,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &Value,
) -> (u16, Value) {
    let (status, body) = http_request(
        server.port,
        method,
        path,
        token,
        Some(&body.to_string()),
    );
    (status, serde_json::from_str(&body).expect("valid JSON"))
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    // Handle chunked transfer encoding
    let body = if headers.to_lowercase().contains("transfer-encoding: chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = (chunk_start + size).min(remaining.len());
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

/// Sign up an account with the given role and return a session token.
fn account(server: &Server, email: &str, role: &str, name: &str) -> String {
    let (status, body) = send(
        server,
        "POST",
        "/auth/signup",
        None,
        &json!({
            "email": email,
            "password": "secret1",
            "role": role,
            "name": name,
            "address": format!("{} HQ", name),
        }),
    );
    assert_eq!(status, 201, "signup failed: {}", body);

    let (status, body) = send(
        server,
        "POST",
        "/auth/signin",
        None,
        &json!({ "email": email, "password": "secret1" }),
    );
    assert_eq!(status, 200, "signin failed: {}", body);
    body["token"].as_str().expect("token").to_string()
}

fn rice_harvest() -> Value {
    json!({
        "commodity_name": "Rice",
        "weight": 500,
        "harvest_date": "2024-01-15",
        "location": "Village Rampur, Uttar Pradesh",
        "expected_price": 25
    })
}

// ──────────────────────────────────────────────
// Basics
// ──────────────────────────────────────────────

#[test]
fn health_returns_200_with_version() {
    let server = start_server(&[]);
    let (status, json) = get(&server, "/health");
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some(), "version field must be present");
}

#[test]
fn not_found_returns_404() {
    let server = start_server(&[]);
    let (status, json) = get(&server, "/no/such/route");
    assert_eq!(status, 404);
    assert_eq!(json["error"], "not found");
}

// ──────────────────────────────────────────────
// Prices
// ──────────────────────────────────────────────

#[test]
fn prices_table_and_lookup() {
    let server = start_server(&[]);

    let (status, json) = get(&server, "/prices");
    assert_eq!(status, 200);
    assert_eq!(json.as_array().unwrap().len(), 8);

    let (status, json) = get(&server, "/prices/Rice");
    assert_eq!(status, 200);
    assert_eq!(json["commodity"], "Rice");
    assert_eq!(json["suggested_price_per_kg"], "28");

    let (status, json) = get(&server, "/prices/saffron");
    assert_eq!(status, 404);
    assert!(json["error"].as_str().unwrap().contains("saffron"));
}

#[test]
fn price_search_suggestions() {
    let server = start_server(&[]);

    let (status, json) = get(&server, "/prices/search?q=ri");
    assert_eq!(status, 200);
    assert_eq!(json["results"], json!(["Rice"]));

    let (_, json) = get(&server, "/prices/search?q=o");
    assert_eq!(json["results"], json!([]));
}

// ──────────────────────────────────────────────
// Trails over the demo dataset
// ──────────────────────────────────────────────

#[test]
fn demo_trail_has_three_holders() {
    let server = start_server(&["--seed-demo"]);

    let (status, json) = get(&server, "/trace/ret001");
    assert_eq!(status, 200);
    assert_eq!(json["lookup_code"], "RET001");
    assert_eq!(json["commodity_name"], "Rice");
    assert_eq!(json["current_location"], "Connaught Place, Delhi");
    let holders: Vec<&str> = json["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["holder"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(holders, ["Raj Kumar", "AgriFlow Logistics", "Fresh Mart"]);
}

#[test]
fn unknown_trail_returns_404() {
    let server = start_server(&["--seed-demo"]);
    let (status, json) = get(&server, "/trace/QR999");
    assert_eq!(status, 404);
    assert!(json["error"].as_str().unwrap().contains("QR999"));
}

#[test]
fn record_lookup_and_unknown_record() {
    let server = start_server(&["--seed-demo"]);

    let (status, json) = get(&server, "/records/DIST002");
    assert_eq!(status, 200);
    assert_eq!(json["stage"], "purchase");
    assert_eq!(json["status"], "delivered");
    assert_eq!(json["upstream_record_id"], "BC002");

    let (status, _) = get(&server, "/records/DIST404");
    assert_eq!(status, 404);
}

// ──────────────────────────────────────────────
// Recording stages
// ──────────────────────────────────────────────

#[test]
fn farm_to_shelf_over_http() {
    let server = start_server(&[]);
    let farmer = account(&server, "raj@example.com", "farmer", "Raj Kumar");
    let dist = account(&server, "ops@agriflow.example", "distributor", "AgriFlow Logistics");
    let retailer = account(&server, "shop@freshmart.example", "retailer", "Fresh Mart");

    let (status, harvest) = send(&server, "POST", "/harvests", Some(&farmer), &rice_harvest());
    assert_eq!(status, 201, "{}", harvest);
    assert_eq!(harvest["record_id"], "BC001");

    let (status, purchase) = send(
        &server,
        "POST",
        "/purchases",
        Some(&dist),
        &json!({
            "harvest_record_id": "BC001",
            "purchase_date": "2024-01-16",
            "buying_price": 25,
            "other_charges": 500,
            "status": "in_transit"
        }),
    );
    assert_eq!(status, 201, "{}", purchase);
    assert_eq!(purchase["record_id"], "DIST001");
    assert_eq!(purchase["weight"], "500");
    assert_eq!(purchase["location"], "AgriFlow Logistics HQ");

    let (status, sale) = send(
        &server,
        "POST",
        "/sales",
        Some(&retailer),
        &json!({
            "purchase_record_id": "DIST001",
            "sale_date": "2024-01-22",
            "location": "Connaught Place, Delhi",
            "selling_price": 35
        }),
    );
    assert_eq!(status, 201, "{}", sale);
    assert_eq!(sale["record_id"], "RET001");
    assert_eq!(sale["purchase_price"], "25");

    let (status, trail) = get(&server, "/trace/RET001");
    assert_eq!(status, 200);
    assert_eq!(trail["steps"].as_array().unwrap().len(), 3);

    let retailer_uid = sale["actor_id"].as_str().unwrap();
    let (status, summary) = get(&server, &format!("/actors/{}/summary", retailer_uid));
    assert_eq!(status, 200);
    assert_eq!(summary["average_margin"], "10");

    let (status, records) = get(&server, &format!("/actors/{}/records", retailer_uid));
    assert_eq!(status, 200);
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[test]
fn purchase_of_unknown_harvest_returns_422() {
    let server = start_server(&[]);
    let dist = account(&server, "ops@agriflow.example", "distributor", "AgriFlow Logistics");
    let (status, json) = send(
        &server,
        "POST",
        "/purchases",
        Some(&dist),
        &json!({
            "harvest_record_id": "BC999",
            "purchase_date": "2024-01-16",
            "buying_price": 25
        }),
    );
    assert_eq!(status, 422);
    assert!(json["error"].as_str().unwrap().contains("BC999"));

    let (status, _) = get(&server, "/records/DIST001");
    assert_eq!(status, 404);
}

#[test]
fn invalid_harvest_returns_400() {
    let server = start_server(&[]);
    let farmer = account(&server, "raj@example.com", "farmer", "Raj Kumar");

    let mut harvest = rice_harvest();
    harvest["weight"] = json!(0);
    let (status, _) = send(&server, "POST", "/harvests", Some(&farmer), &harvest);
    assert_eq!(status, 400);

    let mut harvest = rice_harvest();
    harvest["harvest_date"] = json!("15/01/2024");
    let (status, json) = send(&server, "POST", "/harvests", Some(&farmer), &harvest);
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("15/01/2024"));
}

#[test]
fn malformed_body_returns_400() {
    let server = start_server(&[]);
    let farmer = account(&server, "raj@example.com", "farmer", "Raj Kumar");
    let (status, body) =
        http_request(server.port, "POST", "/harvests", Some(&farmer), Some("{ nope"));
    assert_eq!(status, 400);
    let json: Value = serde_json::from_str(&body).expect("valid JSON");
    assert!(json.get("error").is_some());
}

// ──────────────────────────────────────────────
// Sessions and roles
// ──────────────────────────────────────────────

#[test]
fn recording_requires_session() {
    let server = start_server(&[]);
    let (status, _) = send(&server, "POST", "/harvests", None, &rice_harvest());
    assert_eq!(status, 401);
    let (status, _) = send(&server, "POST", "/harvests", Some("bogus"), &rice_harvest());
    assert_eq!(status, 401);
}

#[test]
fn customer_cannot_record_harvest() {
    let server = start_server(&[]);
    let customer = account(&server, "asha@example.com", "customer", "Asha");
    let (status, json) = send(&server, "POST", "/harvests", Some(&customer), &rice_harvest());
    assert_eq!(status, 403);
    assert!(json["error"].as_str().unwrap().contains("customer"));
}

#[test]
fn wrong_password_returns_401() {
    let server = start_server(&[]);
    account(&server, "raj@example.com", "farmer", "Raj Kumar");
    let (status, _) = send(
        &server,
        "POST",
        "/auth/signin",
        None,
        &json!({ "email": "raj@example.com", "password": "wrong-password" }),
    );
    assert_eq!(status, 401);
}

#[test]
fn profile_update_keeps_role() {
    let server = start_server(&[]);
    let farmer = account(&server, "raj@example.com", "farmer", "Raj Kumar");

    let (status, me) = http_request(server.port, "GET", "/me", Some(&farmer), None);
    assert_eq!(status, 200);
    let me: Value = serde_json::from_str(&me).unwrap();
    assert_eq!(me["role"], "farmer");

    let (status, updated) = send(
        &server,
        "PUT",
        "/me",
        Some(&farmer),
        &json!({ "phone": "+91 98765 43210" }),
    );
    assert_eq!(status, 200);
    assert_eq!(updated["phone"], "+91 98765 43210");

    let (status, _) = send(&server, "PUT", "/me", Some(&farmer), &json!({ "role": "retailer" }));
    assert_eq!(status, 400);
}

#[test]
fn signout_ends_session() {
    let server = start_server(&[]);
    let farmer = account(&server, "raj@example.com", "farmer", "Raj Kumar");

    let (status, _) = send(&server, "POST", "/auth/signout", Some(&farmer), &json!({}));
    assert_eq!(status, 200);
    let (status, _) = http_request(server.port, "GET", "/me", Some(&farmer), None);
    assert_eq!(status, 401);
}
