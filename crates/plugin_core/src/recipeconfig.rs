use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};

/// Frame count limits of an input tag accepted alongside a primary tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    pub tag: String,
    pub min: i64,
    pub max: i64,
}

/// Configuration entry for one primary frame tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfig {
    pub tag: String,
    pub min: i64,
    pub max: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

/// Which frame tags a recipe accepts and which it produces.
///
/// A count of `-1` leaves the corresponding bound unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TagConfig>", into = "Vec<TagConfig>")]
pub struct RecipeConfig {
    entries: Vec<TagConfig>,
}

impl RecipeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primary tag, replacing the counts if it already exists.
    pub fn set_tag(&mut self, tag: &str, min: i64, max: i64) -> Result<()> {
        if tag.is_empty() {
            return Err(PluginError::IllegalInput("Tag is an empty string.".into()));
        }
        match self.entries.iter_mut().find(|e| e.tag == tag) {
            Some(entry) => {
                entry.min = min;
                entry.max = max;
            }
            None => self.entries.push(TagConfig {
                tag: tag.to_string(),
                min,
                max,
                inputs: Vec::new(),
                outputs: Vec::new(),
            }),
        }
        Ok(())
    }

    pub fn set_input(&mut self, tag: &str, input: &str, min: i64, max: i64) -> Result<()> {
        if input.is_empty() {
            return Err(PluginError::IllegalInput("Input tag is an empty string.".into()));
        }
        let entry = self.entry_mut(tag)?;
        match entry.inputs.iter_mut().find(|i| i.tag == input) {
            Some(existing) => {
                existing.min = min;
                existing.max = max;
            }
            None => entry.inputs.push(InputConfig {
                tag: input.to_string(),
                min,
                max,
            }),
        }
        Ok(())
    }

    pub fn set_output(&mut self, tag: &str, output: &str) -> Result<()> {
        if output.is_empty() {
            return Err(PluginError::IllegalInput("Output tag is an empty string.".into()));
        }
        let entry = self.entry_mut(tag)?;
        if !entry.outputs.iter().any(|o| o == output) {
            entry.outputs.push(output.to_string());
        }
        Ok(())
    }

    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tag.as_str()).collect()
    }

    pub fn inputs(&self, tag: &str) -> Option<Vec<&str>> {
        self.entry(tag)
            .map(|e| e.inputs.iter().map(|i| i.tag.as_str()).collect())
    }

    pub fn outputs(&self, tag: &str) -> Option<Vec<&str>> {
        self.entry(tag)
            .map(|e| e.outputs.iter().map(String::as_str).collect())
    }

    /// Minimum number of `requested` frames for the primary `tag`. Asking
    /// for the primary tag itself returns the primary count.
    pub fn min_count(&self, tag: &str, requested: &str) -> Option<i64> {
        self.count(tag, requested).map(|(min, _)| min)
    }

    pub fn max_count(&self, tag: &str, requested: &str) -> Option<i64> {
        self.count(tag, requested).map(|(_, max)| max)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn count(&self, tag: &str, requested: &str) -> Option<(i64, i64)> {
        let entry = self.entry(tag)?;
        if requested == tag {
            return Some((entry.min, entry.max));
        }
        entry
            .inputs
            .iter()
            .find(|i| i.tag == requested)
            .map(|i| (i.min, i.max))
    }

    fn entry(&self, tag: &str) -> Option<&TagConfig> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    fn entry_mut(&mut self, tag: &str) -> Result<&mut TagConfig> {
        self.entries
            .iter_mut()
            .find(|e| e.tag == tag)
            .ok_or_else(|| PluginError::DataNotFound(format!("Tag '{tag}' is not configured.")))
    }
}

impl TryFrom<Vec<TagConfig>> for RecipeConfig {
    type Error = String;

    fn try_from(entries: Vec<TagConfig>) -> Result<Self, Self::Error> {
        let mut config = RecipeConfig::new();
        for entry in entries {
            config
                .set_tag(&entry.tag, entry.min, entry.max)
                .map_err(|e| e.to_string())?;
            for input in &entry.inputs {
                config
                    .set_input(&entry.tag, &input.tag, input.min, input.max)
                    .map_err(|e| e.to_string())?;
            }
            for output in &entry.outputs {
                config
                    .set_output(&entry.tag, output)
                    .map_err(|e| e.to_string())?;
            }
        }
        Ok(config)
    }
}

impl From<RecipeConfig> for Vec<TagConfig> {
    fn from(config: RecipeConfig) -> Self {
        config.entries
    }
}
