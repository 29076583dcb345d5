use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for (name, path) in [
        ("tesseract_path", &config.parsing.tesseract_path),
        ("pdftotext_path", &config.parsing.pdftotext_path),
        ("pdftoppm_path", &config.parsing.pdftoppm_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", name),
            });
        }
    }

    if config.parsing.dpi == 0 {
        return Err(ConfigError::Validation {
            message: "parsing.dpi must be greater than 0".to_string(),
        });
    }

    let threshold = config.pipeline.confidence_threshold;
    if !(0.0..=100.0).contains(&threshold) {
        return Err(ConfigError::Validation {
            message: format!("confidence_threshold must be in 0..=100, got {}", threshold),
        });
    }

    if config.pipeline.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "pipeline.max_attempts must be at least 1".to_string(),
        });
    }

    if config.pipeline.stage_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "pipeline.stage_timeout_secs must be greater than 0".to_string(),
        });
    }

    if let Some(workers) = config.workers {
        if workers == 0 {
            return Err(ConfigError::Validation {
                message: "workers must be at least 1".to_string(),
            });
        }
    }

    Ok(())
}
