use cashflow_metrics_core::EngineConfig;
use std::path::Path;

use super::file;

/// Load the engine configuration, or defaults when no path is given.
///
/// `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let canonical = file::resolve_path(path)?;
    let contents = file::read_to_string(&canonical)?;
    let config = parse_config(&canonical, &contents)
        .map_err(|e| format!("Invalid config '{}': {}", canonical.display(), e))?;
    tracing::debug!(path = %canonical.display(), "loaded engine configuration");
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config: EngineConfig = if is_yaml {
        serde_yaml::from_str(contents)?
    } else {
        serde_json::from_str(contents)?
    };
    config.validate()?;
    Ok(config)
}
