//! Runner - Tool execution engine
//!
//! This module wraps a [`ToolTransport`] with:
//! - Alias normalization of incoming tool ids
//! - Parameter validation and defaults
//! - Timeout handling

use crate::catalog::{ToolCatalog, ToolDefinition, ToolKind};
use crate::error::{Error, Result};
use crate::transport::ToolTransport;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Configuration for the tool runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout for a single tool call
    pub default_timeout: Duration,
    /// Whether unknown parameters are dropped before the call
    pub strip_unknown_params: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            strip_unknown_params: false,
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with the given timeout
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..Default::default()
        }
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Drop parameters the schema does not declare
    #[must_use]
    pub fn with_strip_unknown(mut self, strip: bool) -> Self {
        self.strip_unknown_params = strip;
        self
    }
}

/// Outcome of one collaborator call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that ran
    pub tool: ToolKind,
    /// Parameters actually sent (defaults filled in)
    pub params: Value,
    /// Whether the collaborator reported success
    pub success: bool,
    /// Raw response body
    pub output: Value,
    /// Error reported by the collaborator, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// The tool-specific payload: `data` when the body is wrapped, the body otherwise
    #[must_use]
    pub fn data(&self) -> &Value {
        self.output.get("data").unwrap_or(&self.output)
    }

    /// Background session id reported by a capture-style tool
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        [&self.output, self.data()]
            .into_iter()
            .find_map(|v| {
                v.get("session_id")
                    .or_else(|| v.get("sessionId"))
                    .and_then(Value::as_str)
            })
            .filter(|id| !id.is_empty())
    }
}

/// Tool runner: validates, fills defaults, calls the transport under a timeout
#[derive(Clone)]
pub struct ToolRunner {
    catalog: Arc<ToolCatalog>,
    transport: Arc<dyn ToolTransport>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Create a new tool runner
    #[must_use]
    pub fn new(
        catalog: Arc<ToolCatalog>,
        transport: Arc<dyn ToolTransport>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            catalog,
            transport,
            config,
        }
    }

    /// Create with the builtin catalog and default configuration
    #[must_use]
    pub fn with_defaults(transport: Arc<dyn ToolTransport>) -> Self {
        Self::new(
            Arc::new(ToolCatalog::builtin()),
            transport,
            RunnerConfig::default(),
        )
    }

    /// Get the catalog
    #[must_use]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Shared handle to the catalog
    #[must_use]
    pub fn shared_catalog(&self) -> Arc<ToolCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute a tool by (possibly aliased) id
    #[instrument(skip(self, input), fields(tool = %tool_id))]
    pub async fn execute(&self, tool_id: &str, input: Value) -> Result<ToolResult> {
        let definition = self
            .catalog
            .resolve(tool_id)
            .ok_or_else(|| Error::NotFound(tool_id.to_string()))?;

        let params = self.prepare_params(definition, input)?;
        let kind = definition.kind;

        let start = Instant::now();
        debug!(
            tool = %kind,
            timeout_ms = %self.config.default_timeout.as_millis(),
            "Executing tool"
        );

        let output = match timeout(
            self.config.default_timeout,
            self.transport.invoke(&definition.endpoint, &params),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(tool = %kind, error = %e, "Tool execution failed");
                return Err(e);
            }
            Err(_) => {
                warn!(
                    tool = %kind,
                    timeout_ms = %self.config.default_timeout.as_millis(),
                    "Tool execution timed out"
                );
                return Err(Error::Timeout(self.config.default_timeout.as_millis() as u64));
            }
        };

        let success = output
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let error = if success {
            None
        } else {
            Some(
                output
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("tool reported failure")
                    .to_string(),
            )
        };

        let result = ToolResult {
            tool: kind,
            params,
            success,
            output,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            tool = %kind,
            success = %result.success,
            duration_ms = %result.duration_ms,
            "Tool execution completed"
        );

        Ok(result)
    }

    /// Validate an input object against the schema and fill defaults
    pub fn prepare_params(&self, definition: &ToolDefinition, input: Value) -> Result<Value> {
        let mut params = match input {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidInput(format!(
                    "parameters for {} must be an object, got {}",
                    definition.kind, other
                )))
            }
        };

        if self.config.strip_unknown_params {
            params.retain(|name, _| definition.parameter(name).is_some());
        }

        for spec in &definition.parameters {
            match params.get(&spec.name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &spec.default {
                        params.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        return Err(Error::InvalidInput(format!(
                            "missing required parameter '{}' for {}",
                            spec.name, definition.kind
                        )));
                    } else {
                        params.remove(&spec.name);
                    }
                }
                Some(value) if !spec.param_type.accepts(value) => {
                    return Err(Error::InvalidInput(format!(
                        "parameter '{}' for {} has the wrong type",
                        spec.name, definition.kind
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Value::Object(params))
    }
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("tools", &self.catalog.len())
            .field("config", &self.config)
            .finish()
    }
}
