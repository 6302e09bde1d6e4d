// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DocpipeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DocpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_stylesheet(cfg)?;
    validate_commands(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths = [
        ("theme_dir", &cfg.paths.theme_dir),
        ("css_output_dir", &cfg.paths.css_output_dir),
        ("html_output_dir", &cfg.paths.html_output_dir),
    ];
    for (key, value) in paths {
        if value.trim().is_empty() {
            return Err(DocpipeError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_stylesheet(cfg: &RawConfigFile) -> Result<()> {
    Glob::new(&cfg.stylesheet.glob).map_err(|e| {
        DocpipeError::ConfigError(format!(
            "[stylesheet].glob is not a valid glob ({}): {e}",
            cfg.stylesheet.glob
        ))
    })?;

    if cfg.stylesheet.lessc.trim().is_empty() {
        return Err(DocpipeError::ConfigError(
            "[stylesheet].lessc must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.docs.command.trim().is_empty() {
        return Err(DocpipeError::ConfigError(
            "[docs].command must not be empty".to_string(),
        ));
    }
    if cfg.versions.command.trim().is_empty() {
        return Err(DocpipeError::ConfigError(
            "[versions].command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(DocpipeError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.debounce_ms == 0 {
        return Err(DocpipeError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
