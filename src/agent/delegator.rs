//! Planner–executor delegation loop.
//!
//! The planner decomposes the benchmark request into subtasks and
//! delegates each one through the `delegate_to_executor` tool; every
//! delegation runs a fresh executor conversation with the web tools and
//! is awaited before the planner continues. The planner finishes by
//! submitting a structured report, which degrades to a placeholder when
//! it cannot be interpreted — the pipeline still renders a deck.

use crate::agent::client::{ChatMessage, OllamaClient};
use crate::agent::tools::{
    executor_tool_definitions, planner_tool_definitions, ResearchToolkit, ToolDefinition,
};
use crate::error::AgentError;
use crate::models::TrendReport;
use serde_json::Value;
use tracing::{info, warn};

/// Configuration for the research agents.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Planner turns before giving up.
    pub max_iterations: usize,
    /// Executor turns per delegated subtask.
    pub max_subtask_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.2,
            timeout_seconds: 300,
            max_iterations: 25,
            max_subtask_iterations: 10,
        }
    }
}

/// The two-role research agent.
pub struct TrendAgent {
    config: AgentConfig,
    client: OllamaClient,
    toolkit: ResearchToolkit,
    planner_tools: Vec<ToolDefinition>,
    executor_tools: Vec<ToolDefinition>,
}

impl TrendAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let client = OllamaClient::new(
            config.ollama_url.clone(),
            config.model_name.clone(),
            config.temperature,
            config.timeout_seconds,
        )?;
        let toolkit = ResearchToolkit::new(config.timeout_seconds);

        Ok(Self {
            config,
            client,
            toolkit,
            planner_tools: planner_tool_definitions(),
            executor_tools: executor_tool_definitions(),
        })
    }

    /// Runs the planner until it submits a report (or the iteration
    /// budget runs out, which yields the placeholder report).
    pub async fn research(
        &self,
        program: &str,
        description: &str,
        snies_digest: &str,
    ) -> Result<TrendReport, AgentError> {
        info!("starting trend research for '{}'", program);

        let mut messages = vec![
            ChatMessage::system(PLANNER_INSTRUCTIONS),
            ChatMessage::user(planner_prompt(program, description, snies_digest)),
        ];

        for iteration in 0..self.config.max_iterations {
            let response = self.client.chat(&messages, &self.planner_tools).await?;
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            let Some(tool_calls) = response.tool_calls else {
                // plain text turn: the model may have emitted the report
                // inline instead of calling submit_report
                if let Some(report) = extract_report_json(&response.content) {
                    return Ok(finalize_report(report, program, description));
                }
                messages.push(ChatMessage::user(
                    "Continúa con las subtareas pendientes o entrega el informe final con submit_report.",
                ));
                continue;
            };

            for call in tool_calls {
                match call.function.name.as_str() {
                    "delegate_to_executor" => {
                        let subtask = call
                            .function
                            .arguments
                            .get("subtask")
                            .and_then(Value::as_str)
                            .unwrap_or("");
                        info!("planner iteration {}: delegating '{}'", iteration + 1, subtask);
                        let answer = self.run_executor(subtask).await?;
                        messages.push(ChatMessage::tool(answer));
                    }
                    "submit_report" => {
                        info!("planner submitted final report");
                        return Ok(parse_report(&call.function.arguments, program, description));
                    }
                    other => {
                        messages.push(ChatMessage::tool(format!("Error: Unknown tool: {}", other)));
                    }
                }
            }
        }

        warn!("planner exhausted its iteration budget without a report");
        Ok(TrendReport::unavailable(program, description))
    }

    /// One delegated subtask: a fresh executor conversation with the web
    /// tools, awaited to completion.
    async fn run_executor(&self, subtask: &str) -> Result<String, AgentError> {
        let mut messages = vec![
            ChatMessage::system(EXECUTOR_INSTRUCTIONS),
            ChatMessage::user(subtask),
        ];

        for _ in 0..self.config.max_subtask_iterations {
            let response = self.client.chat(&messages, &self.executor_tools).await?;
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            let Some(tool_calls) = response.tool_calls else {
                return Ok(response.content);
            };

            for call in tool_calls {
                let result = self
                    .toolkit
                    .execute(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(ChatMessage::tool(result.into_message()));
            }
        }

        warn!("executor exhausted its iteration budget for '{}'", subtask);
        Ok("No se obtuvo una respuesta concluyente para esta subtarea.".to_string())
    }
}

/// Interprets `submit_report` arguments. A malformed payload degrades
/// to the placeholder report instead of aborting the pipeline.
pub fn parse_report(arguments: &Value, program: &str, description: &str) -> TrendReport {
    match serde_json::from_value::<TrendReport>(arguments.clone()) {
        Ok(report) => finalize_report(report, program, description),
        Err(e) => {
            warn!("agent returned a malformed report: {}", e);
            TrendReport::unavailable(program, description)
        }
    }
}

/// Fills in the echo fields the model sometimes leaves out.
fn finalize_report(mut report: TrendReport, program: &str, description: &str) -> TrendReport {
    if report.input_program.is_empty() {
        report.input_program = program.to_string();
    }
    if report.input_description.is_empty() {
        report.input_description = description.to_string();
    }
    report
}

/// Tries to read a `TrendReport` out of free text (the model answering
/// in prose with an embedded JSON object).
pub fn extract_report_json(content: &str) -> Option<TrendReport> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let report: TrendReport = serde_json::from_str(&content[start..=end]).ok()?;
    // an arbitrary JSON object deserializes to an all-default report;
    // require some substance before trusting it
    if report.items.is_empty() && report.insights.is_empty() {
        return None;
    }
    Some(report)
}

fn planner_prompt(program: &str, description: &str, snies_digest: &str) -> String {
    format!(
        r#"Quiero mapear programas similares a: "{program}".
Descripción corta: "{description}".

Ya tengo una lista de programas locales (Colombia) gracias a SNIES, así que NO BUSQUES EN COLOMBIA.
La lista local es: "{snies_digest}" (úsala solo como contexto).

Tareas:
- Encontrar 2-3 programas similares en LATAM (ej. México, Chile, Argentina, Brasil).
- Encontrar 2-3 programas similares en EE.UU. y/o Europa (ej. España, Alemania).
- Para cada programa internacional encontrado: nombre, universidad, país, sitio web, y 2-3 cursos representativos del plan de estudios.
- Buscar el costo (tuition) de esos programas.
- Analizar tendencias generales del nombre del programa.

Al terminar, entrega el informe final con la herramienta submit_report."#
    )
}

const PLANNER_INSTRUCTIONS: &str = r#"Eres un PLANNER. Tu objetivo es:
1) Descomponer la solicitud del usuario en subtareas claras para analizar un programa académico.
2) Delegar cada subtarea al EXECUTOR con la herramienta delegate_to_executor.
3) Integrar los hallazgos y entregar el informe final con la herramienta submit_report.

Reglas:
- Define subtareas para cubrir: programas similares en LATAM (fuera de Colombia),
  programas similares en EE.UU. o Europa, costos de matrícula de cada programa
  encontrado, y tendencias generales del nombre del programa.
- 'coverage' indica cuántos programas encontraste en cada región.
- 'insights' debe resumir las tendencias de palabras clave.
- No inventes datos: todo programa del informe debe venir de una subtarea delegada."#;

const EXECUTOR_INSTRUCTIONS: &str = r#"Eres un EXECUTOR. Tu trabajo es resolver subtareas CONCRETAS que te delega un Planner.
Sigue este patrón simple de verificación:
- Si necesitas fuentes, usa primero web_search para localizar URLs confiables.
- Luego, usa fetch_url para extraer el contenido clave y verificar.
- Devuelve SIEMPRE una respuesta breve, precisa y con 1-3 URLs como evidencia.
No inventes datos. Si hay incertidumbre, dilo explícitamente.
Formato de salida recomendado:
- Hallazgos clave en 3-6 viñetas.
- Fuentes: lista de URLs."#;
