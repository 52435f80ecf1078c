use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;

pub fn config_output(config_path: &Path, config: &Config) -> Result<serde_json::Value> {
    let resolved = serde_json::to_value(config).context("Failed to serialize config")?;
    Ok(serde_json::json!({
        "config_file": config_path.display().to_string(),
        "config_file_exists": config_path.exists(),
        "config": resolved,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reports_path_and_resolved_sections() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("coinboard.toml");

        let output = config_output(&path, &Config::default())?;
        assert_eq!(output["config_file_exists"], false);
        assert_eq!(output["config"]["fx"]["fallback_rate"], 1400.0);
        assert_eq!(output["config"]["refresh"]["ticker_interval"], "5s");
        assert_eq!(output["config"]["venues"]["listing_failure"], "skip_venue");

        Ok(())
    }
}
