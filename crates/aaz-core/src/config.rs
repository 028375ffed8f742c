use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Top-level project configuration loaded from `.aaz.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AazConfig {
    /// Type graph files, one per API version.
    pub input: Vec<String>,
    pub output: String,
    pub operation: EmitOperation,
    /// Version whose graph `get-resources-operations` converts.
    pub api_version: Option<String>,
    /// Resource ids requested by `get-resources-operations`.
    pub resources: Vec<String>,
}

impl Default for AazConfig {
    fn default() -> Self {
        Self {
            input: vec!["typegraph.yaml".to_string()],
            output: "aaz-output".to_string(),
            operation: EmitOperation::ListResources,
            api_version: None,
            resources: Vec::new(),
        }
    }
}

/// Which emitter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmitOperation {
    ListResources,
    GetResourcesOperations,
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".aaz.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<AazConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: AazConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# aaz configuration
input:
  - typegraph.yaml
output: aaz-output
operation: list-resources   # list-resources | get-resources-operations

# api_version: "2024-01-01"   # graph used by get-resources-operations
resources: []
  # - /subscriptions/{}/resourcegroups/{}/providers/microsoft.contoso/widgets/{}
"#
}
