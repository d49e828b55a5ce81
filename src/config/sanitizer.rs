use serde::{Deserialize, Serialize};

/// Extra names to redact from logged payloads and headers.
///
/// These extend the built-in lists; they never replace them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionConfig {
    /// Additional JSON field names (case-insensitive).
    #[serde(default)]
    pub extra_fields: Vec<String>,

    /// Additional header names (case-insensitive).
    #[serde(default)]
    pub extra_headers: Vec<String>,
}
