use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
    std::env::var("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("recipebridge")
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("recipebridge")
}

fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn default_interpreter() -> String {
    bridge::config::DEFAULT_INTERPRETER.to_string()
}

fn default_join_timeout_secs() -> u64 {
    bridge::config::DEFAULT_JOIN_TIMEOUT.as_secs()
}

fn default_recipe_dirs() -> Vec<PathBuf> {
    vec![config_dir().join("recipes")]
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Interpreter path or command line.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
    /// Directories searched recursively for recipe modules.
    #[serde(default = "default_recipe_dirs")]
    pub recipe_dirs: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            join_timeout_secs: default_join_timeout_secs(),
            recipe_dirs: default_recipe_dirs(),
        }
    }
}

pub fn load_config() -> Result<Config> {
    let path = config_file_path();
    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config: Config = toml::from_str("interpreter = 'python3'\n").unwrap();
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.join_timeout_secs, 10);
        assert_eq!(config.recipe_dirs.len(), 1);
        assert!(config.recipe_dirs[0].ends_with("recipebridge/recipes"));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(toml::from_str::<Config>("join_timeout_secs = 'soon'\n").is_err());
    }
}
