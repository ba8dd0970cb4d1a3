use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{BooksError, Result};
use crate::library::{AppleBooks, SearchResult};

pub fn text_tool_result(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

pub fn error_tool_result(err: &BooksError) -> Value {
    json!({
        "isError": true,
        "content": [{ "type": "text", "text": format!("Error: {}", err) }]
    })
}

/// Tool descriptors returned by `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "get_books",
            "description": "Get all books from the Apple Books library: asset id, title, author, language and file path.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "get_collections",
            "description": "Get all user collections from Apple Books, each with the books it contains.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "get_annotations",
            "description": "Get all highlights and notes from Apple Books, each with the book it belongs to.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "get_book_list",
            "description": "Get a plain list of books, one per line, in 'Author - Title' format.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "search_books",
            "description": "Search books by title or author (case-insensitive substring match).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to look for in the title or author." }
                },
                "required": ["query"]
            }
        }
    ])
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn tool_search_books(books: &AppleBooks, args: &Value) -> Result<String> {
    let query = args
        .get("query")
        .and_then(|q| q.as_str())
        .ok_or_else(|| BooksError::InvalidArgument("Missing required argument: query (string)".to_string()))?;

    match books.search_books(query)? {
        SearchResult::Found(found) => pretty(&found),
        SearchResult::NoMatches { query } => Ok(SearchResult::no_matches_message(&query)),
    }
}

fn run_tool(books: &AppleBooks, name: &str, args: &Value) -> Result<String> {
    match name {
        "get_books" => pretty(&books.list_books()?),
        "get_collections" => pretty(&books.list_collections()?),
        "get_annotations" => pretty(&books.list_annotations()?),
        "get_book_list" => books.list_book_summaries(),
        "search_books" => tool_search_books(books, args),
        _ => Err(BooksError::UnknownTool(name.to_string())),
    }
}

/// Invoke tool `name` and wrap the outcome as an MCP tool result.
///
/// Failures never escape: they come back as an `isError` result carrying the message.
pub fn call_tool(books: &AppleBooks, name: &str, args: &Value) -> Value {
    match run_tool(books, name, args) {
        Ok(text) => {
            info!("Tool {} succeeded ({} bytes)", name, text.len());
            text_tool_result(text)
        }
        Err(e) => {
            warn!("Tool {} failed [{}]: {}", name, e.kind().as_str(), e);
            error_tool_result(&e)
        }
    }
}
