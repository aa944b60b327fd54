use serde_json::Value;
use std::fmt;

/// Failure detail kept for logs and error reporting only.
#[derive(Debug, Clone)]
pub struct OracleDiagnosticsError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for OracleDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "oracle error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for OracleDiagnosticsError {}
