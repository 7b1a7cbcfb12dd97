use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::CoreError;

/// Integer status reported by the analysis server for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryStatus(u16);

impl QueryStatus {
    pub const OK: Self = Self(200);
    pub const NOT_FOUND: Self = Self(404);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }

    pub const fn is_not_found(self) -> bool {
        self.0 == Self::NOT_FOUND.0
    }

    /// 2xx replies; anything else is a server-side refusal or failure.
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tagged request understood by the analysis server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryDescriptor {
    /// Free-form analysis command typed into the console.
    RunCommand { command: String },
    /// Disassembly and control-flow data for one function.
    FetchFunctionView { function: String },
    /// The function list of the loaded binary.
    FetchFunctions,
}

impl QueryDescriptor {
    pub fn run_command(command: impl Into<String>) -> Self {
        Self::RunCommand {
            command: command.into(),
        }
    }

    pub fn fetch_function_view(function: impl Into<String>) -> Self {
        Self::FetchFunctionView {
            function: function.into(),
        }
    }

    pub const fn wire_tag(&self) -> &'static str {
        match self {
            Self::RunCommand { .. } => "command",
            Self::FetchFunctionView { .. } => "cfg-disasm",
            Self::FetchFunctions => "functions",
        }
    }

    /// The `args` query parameter sent alongside [`Self::wire_tag`].
    pub fn wire_args(&self) -> String {
        match self {
            Self::RunCommand { command } => json!({ "command": command }).to_string(),
            Self::FetchFunctionView { function } => function.clone(),
            Self::FetchFunctions => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub status: QueryStatus,
    pub payload: Value,
}

impl QueryResponse {
    pub fn new(status: QueryStatus, payload: Value) -> Self {
        Self { status, payload }
    }

    pub fn ok(payload: Value) -> Self {
        Self::new(QueryStatus::OK, payload)
    }

    pub fn not_found() -> Self {
        Self::new(QueryStatus::NOT_FOUND, Value::Null)
    }
}

#[async_trait]
pub trait RemoteQueryClient: Send + Sync {
    async fn query(&self, descriptor: QueryDescriptor) -> Result<QueryResponse, CoreError>;
}

/// Null, empty strings, empty arrays and empty objects carry nothing to show.
pub fn payload_is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Text appended to the transcript for a pass-through command result.
pub fn payload_display_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
