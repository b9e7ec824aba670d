//! Tool definitions and implementations for the research agents.
//!
//! The planner gets delegation/reporting tools; the executor gets the
//! web tools (`web_search`, `fetch_url`) it needs to ground its answers
//! in sources.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Tool definition for the Ollama tool-calling API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn function(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// The text fed back into the conversation as the tool message.
    pub fn into_message(self) -> String {
        if self.success {
            self.output
        } else {
            format!("Error: {}", self.error.unwrap_or_default())
        }
    }
}

/// Tools available to the executor role.
pub fn executor_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        function(
            "web_search",
            "Busca en la web y devuelve títulos y URLs de los primeros resultados.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Consulta de búsqueda"
                    }
                },
                "required": ["query"]
            }),
        ),
        function(
            "fetch_url",
            "Descarga una página y devuelve su texto visible (recortado).",
            json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "URL a descargar"
                    },
                    "max_chars": {
                        "type": "integer",
                        "description": "Máximo de caracteres a devolver (por defecto 4000)"
                    }
                },
                "required": ["url"]
            }),
        ),
    ]
}

/// Tools available to the planner role.
pub fn planner_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        function(
            "delegate_to_executor",
            "Delega una subtarea concreta al agente EXECUTOR y devuelve su respuesta final.",
            json!({
                "type": "object",
                "properties": {
                    "subtask": {
                        "type": "string",
                        "description": "Descripción concreta de la subtarea"
                    }
                },
                "required": ["subtask"]
            }),
        ),
        function(
            "submit_report",
            "Entrega el informe final estructurado. Llamar una sola vez, al terminar.",
            json!({
                "type": "object",
                "properties": {
                    "input_program": { "type": "string" },
                    "input_description": { "type": "string" },
                    "coverage": {
                        "type": "object",
                        "properties": {
                            "local": { "type": "integer" },
                            "national": { "type": "integer" },
                            "international": { "type": "integer" }
                        }
                    },
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "program_name": { "type": "string" },
                                "university": { "type": "string" },
                                "country": { "type": "string" },
                                "url": { "type": "string" },
                                "courses_examples": {
                                    "type": "array",
                                    "items": { "type": "string" }
                                },
                                "tuition": { "type": "string" },
                                "intake_per_year": { "type": "string" },
                                "sources": {
                                    "type": "array",
                                    "items": { "type": "string" }
                                }
                            }
                        }
                    },
                    "insights": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["input_program", "items", "insights"]
            }),
        ),
    ]
}

const DEFAULT_FETCH_MAX_CHARS: usize = 4000;
const SEARCH_RESULT_LIMIT: usize = 8;

/// Web toolkit backing the executor's tools.
pub struct ResearchToolkit {
    http: reqwest::Client,
}

impl ResearchToolkit {
    pub fn new(timeout_seconds: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.min(30)))
            .user_agent("oportuna/0.1 (academic program research)")
            .build()
            .unwrap_or_default();
        Self { http }
    }

    /// Executes one executor tool call.
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        debug!("executing tool {} with args {:?}", name, args);
        match name {
            "web_search" => match args.get("query").and_then(Value::as_str) {
                Some(query) => self.web_search(query).await,
                None => ToolResult::error("Missing required parameter: query".to_string()),
            },
            "fetch_url" => match args.get("url").and_then(Value::as_str) {
                Some(url) => {
                    let max_chars = args
                        .get("max_chars")
                        .and_then(Value::as_u64)
                        .map(|v| v as usize)
                        .unwrap_or(DEFAULT_FETCH_MAX_CHARS);
                    self.fetch_url(url, max_chars).await
                }
                None => ToolResult::error("Missing required parameter: url".to_string()),
            },
            other => ToolResult::error(format!("Unknown tool: {}", other)),
        }
    }

    /// Searches DuckDuckGo's HTML endpoint and returns "title — url"
    /// lines for the first few results.
    async fn web_search(&self, query: &str) -> ToolResult {
        let response = self
            .http
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)])
            .send()
            .await;

        let html = match response.and_then(|r| r.error_for_status()) {
            Ok(r) => match r.text().await {
                Ok(body) => body,
                Err(e) => return ToolResult::error(format!("Error leyendo resultados: {}", e)),
            },
            Err(e) => return ToolResult::error(format!("Error en la búsqueda: {}", e)),
        };

        let results = parse_search_results(&html, SEARCH_RESULT_LIMIT);
        if results.is_empty() {
            ToolResult::success("Sin resultados.".to_string())
        } else {
            ToolResult::success(results.join("\n"))
        }
    }

    /// Downloads a page and returns its visible text, truncated.
    async fn fetch_url(&self, url: &str, max_chars: usize) -> ToolResult {
        let response = self.http.get(url).send().await;

        match response.and_then(|r| r.error_for_status()) {
            Ok(r) => match r.text().await {
                Ok(body) => {
                    let text = visible_text(&body);
                    let truncated: String = text.chars().take(max_chars).collect();
                    ToolResult::success(truncated)
                }
                Err(e) => ToolResult::error(format!("Error al acceder a la URL: {}", e)),
            },
            Err(e) => ToolResult::error(format!("Error al acceder a la URL: {}", e)),
        }
    }
}

/// Pulls result anchors out of the DuckDuckGo HTML page.
fn parse_search_results(html: &str, limit: usize) -> Vec<String> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__a\"").skip(1) {
        if results.len() >= limit {
            break;
        }

        let href = chunk
            .split_once("href=\"")
            .and_then(|(_, rest)| rest.split_once('"'))
            .map(|(url, _)| url.to_string());

        let title = chunk
            .split_once('>')
            .and_then(|(_, rest)| rest.split_once('<'))
            .map(|(text, _)| text.trim().to_string());

        if let (Some(title), Some(href)) = (title, href) {
            if !title.is_empty() {
                results.push(format!("{} — {}", title, href));
            }
        }
    }

    results
}

/// Strips tags, scripts and styles, collapsing whitespace. Crude but
/// enough to give the model readable page text.
fn visible_text(html: &str) -> String {
    // drop script/style blocks wholesale
    let mut cleaned = String::with_capacity(html.len());
    let mut rest = html;
    loop {
        let open = match (rest.find("<script"), rest.find("<style")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let Some(open) = open else {
            cleaned.push_str(rest);
            break;
        };
        cleaned.push_str(&rest[..open]);
        let tail = &rest[open..];
        let close_tag = if tail.starts_with("<script") {
            "</script>"
        } else {
            "</style>"
        };
        match tail.find(close_tag) {
            Some(end) => rest = &tail[end + close_tag.len()..],
            None => break,
        }
    }

    let mut text = String::with_capacity(cleaned.len() / 2);
    let mut in_tag = false;
    for ch in cleaned.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
