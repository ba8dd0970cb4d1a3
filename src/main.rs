mod books;
mod config;
mod error;
mod join;
mod library;
mod locator;
mod store;
mod tools;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::StorePaths;
use crate::library::AppleBooks;
use crate::tools::{call_tool, tool_definitions};

const PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Deserialize, Debug)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Serialize, Debug)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(json!({ "code": code, "message": message.into() })),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Stdout carries JSON-RPC only; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("apple_books_mcp=info")),
        )
        .init();

    let books = AppleBooks::new(StorePaths::from_env()?);
    info!("Library stores: {}", books.paths().library_dir.display());
    info!("Annotation stores: {}", books.paths().annotations_dir.display());
    info!("Apple Books MCP server running on stdio");

    serve(&books, io::stdin().lock(), io::stdout())?;

    info!("stdin closed, shutting down");
    Ok(())
}

/// Answer newline-delimited requests from `reader` until EOF.
///
/// Lines are taken as raw bytes so a line that is not UTF-8 gets a parse
/// error reply instead of ending the loop. Only I/O errors are returned.
fn serve<R: BufRead, W: Write>(books: &AppleBooks, mut reader: R, mut writer: W) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        if let Some(resp) = handle_line(books, line) {
            let json_str = serde_json::to_string(&resp)?;
            writer.write_all(json_str.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }
}

/// Handle one line of input. Returns `None` for notifications.
fn handle_line(books: &AppleBooks, line: &[u8]) -> Option<JsonRpcResponse> {
    let req: JsonRpcRequest = match serde_json::from_slice(line) {
        Ok(r) => r,
        Err(e) => {
            warn!("Failed to parse JSON: {}", e);
            return Some(JsonRpcResponse::error(
                Some(Value::Null),
                -32700,
                format!("Parse error: {}", e),
            ));
        }
    };

    debug!("Received: {} ({:?})", req.method, req.id);

    match req.method.as_str() {
        "initialize" => Some(handle_initialize(&req)),
        "ping" => Some(JsonRpcResponse::success(req.id.clone(), json!({}))),
        "tools/list" => Some(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tool_definitions() }),
        )),
        "tools/call" => Some(handle_call_tool(&req, books)),
        _ => handle_unknown(&req),
    }
}

fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::success(
        req.id.clone(),
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "apple-books-mcp", "version": env!("CARGO_PKG_VERSION") }
        }),
    )
}

fn handle_call_tool(req: &JsonRpcRequest, books: &AppleBooks) -> JsonRpcResponse {
    let Some(name) = req
        .params
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
    else {
        return JsonRpcResponse::error(req.id.clone(), -32602, "Missing tool name in params");
    };
    let args = req
        .params
        .as_ref()
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    info!("Calling tool {}", name);
    JsonRpcResponse::success(req.id.clone(), call_tool(books, name, &args))
}

fn handle_unknown(req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    // Notifications (no id) never get a reply, known or not.
    req.id
        .as_ref()
        .map(|_| JsonRpcResponse::error(req.id.clone(), -32601, "Method not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> AppleBooks {
        AppleBooks::new(StorePaths::new("/nonexistent/BKLibrary", "/nonexistent/AEAnnotation"))
    }

    fn roundtrip(line: &str) -> Option<Value> {
        handle_line(&books(), line.as_bytes()).map(|r| serde_json::to_value(r).unwrap())
    }

    #[test]
    fn test_initialize() {
        let resp = roundtrip(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["serverInfo"]["name"], "apple-books-mcp");
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp.get("error").is_none());
    }

    #[test]
    fn test_initialized_notification_has_no_reply() {
        assert!(roundtrip(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
    }

    #[test]
    fn test_ping() {
        let resp = roundtrip(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).unwrap();
        assert_eq!(resp["result"], json!({}));
    }

    #[test]
    fn test_tools_list() {
        let resp = roundtrip(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).unwrap();
        assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_tools_call_failure_is_a_result() {
        let resp = roundtrip(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_books"}}"#,
        )
        .unwrap();
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: Directory does not exist"));
    }

    #[test]
    fn test_tools_call_unknown_tool() {
        let resp = roundtrip(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
        )
        .unwrap();
        assert_eq!(resp["result"]["content"][0]["text"], "Error: Unknown tool: nope");
    }

    #[test]
    fn test_tools_call_without_name() {
        let resp = roundtrip(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{}}"#).unwrap();
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[test]
    fn test_unknown_method() {
        let resp = roundtrip(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#).unwrap();
        assert_eq!(resp["error"]["code"], -32601);
        assert!(roundtrip(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#).is_none());
    }

    #[test]
    fn test_parse_error() {
        let resp = roundtrip("{not json").unwrap();
        assert_eq!(resp["error"]["code"], -32700);
        assert_eq!(resp["id"], Value::Null);
    }

    #[test]
    fn test_invalid_utf8_line_is_a_parse_error() {
        let resp = handle_line(&books(), b"\xff\xfe").unwrap();
        let resp = serde_json::to_value(resp).unwrap();
        assert_eq!(resp["error"]["code"], -32700);
    }

    #[test]
    fn test_serve_keeps_going_after_bad_bytes() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}");

        let mut output = Vec::new();
        serve(&books(), io::Cursor::new(input), &mut output).unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["error"]["code"], -32700);
        assert_eq!(replies[2]["id"], 2);
        assert_eq!(replies[2]["result"], json!({}));
    }
}
