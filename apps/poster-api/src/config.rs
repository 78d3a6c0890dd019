use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::layout::solver::SolverConfig;
use crate::layout::DEFAULT_TEMPLATE_ID;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Font file to render with; system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    /// Template id (or `auto`) used when a request names none.
    pub default_template: String,
    pub lenient_overflow: f32,
    pub data_overlap_tolerance: f32,
    pub strict_data_bounds: bool,
}

impl Default for Config {
    fn default() -> Self {
        let solver = SolverConfig::default();
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            font_path: None,
            max_upload_bytes: 16 * 1024 * 1024,
            default_template: DEFAULT_TEMPLATE_ID.to_string(),
            lenient_overflow: solver.lenient_overflow,
            data_overlap_tolerance: solver.data_overlap_tolerance,
            strict_data_bounds: solver.strict_data_bounds,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        Ok(Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            font_path: std::env::var("FONT_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            default_template: std::env::var("DEFAULT_TEMPLATE")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.default_template),
            lenient_overflow: parse_env("LENIENT_OVERFLOW", defaults.lenient_overflow)?,
            data_overlap_tolerance: parse_env(
                "DATA_OVERLAP_TOLERANCE",
                defaults.data_overlap_tolerance,
            )?,
            strict_data_bounds: parse_env("STRICT_DATA_BOUNDS", defaults.strict_data_bounds)?,
        })
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            lenient_overflow: self.lenient_overflow.max(0.0),
            data_overlap_tolerance: self.data_overlap_tolerance.max(0.0),
            strict_data_bounds: self.strict_data_bounds,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
