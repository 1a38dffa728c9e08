//! JSON encoding of plugins as exchanged with the interpreter worker.
//!
//! Decoding works on sub documents of a larger response text: every error
//! names the line and column in the full text, not in the fragment.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{PluginError, Result};
use crate::frame::FrameSet;
use crate::parameter::Parameter;
use crate::plugin::{Plugin, PluginType};
use crate::recipeconfig::RecipeConfig;

const UNKNOWN: &str = "unknown";

#[derive(Serialize, Deserialize)]
struct PluginDocument {
    class: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    copyright: Option<String>,
    parameters: Vec<Parameter>,
    #[serde(default)]
    frames: Option<FrameSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipeconfig: Option<RecipeConfig>,
}

impl PluginDocument {
    fn from_plugin(plugin: &Plugin) -> Self {
        Self {
            class: UNKNOWN.to_string(),
            name: Some(plugin.name.clone()),
            version: Some(plugin.version),
            synopsis: Some(plugin.synopsis.clone()),
            description: Some(plugin.description.clone()),
            author: Some(plugin.author.clone()),
            email: Some(plugin.email.clone()),
            copyright: Some(plugin.copyright.clone()),
            parameters: plugin.parameters.clone().unwrap_or_default(),
            frames: Some(plugin.frames.clone().unwrap_or_default()),
            recipeconfig: plugin.config.clone(),
        }
    }

    fn into_plugin(self) -> Plugin {
        let kind = if self.recipeconfig.is_some() {
            PluginType::RECIPE_V2
        } else {
            PluginType::RECIPE
        };
        let or_unknown = |s: Option<String>| s.unwrap_or_else(|| UNKNOWN.to_string());
        let mut parameters = self.parameters;
        parameters.push(Parameter::class_marker(&self.class));

        let name = self.name.unwrap_or_else(|| self.class.clone());
        let mut plugin = Plugin::new(kind, name, self.version.unwrap_or(0));
        plugin.synopsis = or_unknown(self.synopsis);
        plugin.description = or_unknown(self.description);
        plugin.author = or_unknown(self.author);
        plugin.email = or_unknown(self.email);
        plugin.copyright = or_unknown(self.copyright);
        plugin.parameters = Some(parameters);
        plugin.frames = self.frames;
        plugin.config = self.recipeconfig;
        plugin
    }
}

/// Serializes a plugin, including its parameters and frames, as pretty
/// printed JSON.
pub fn plugin_to_json(plugin: &Plugin) -> Result<String> {
    serde_json::to_string_pretty(&PluginDocument::from_plugin(plugin)).map_err(|e| {
        PluginError::IllegalInput(format!(
            "Failed to encode plugin '{}' as JSON: {e}",
            plugin.name
        ))
    })
}

/// Decodes a single plugin object.
///
/// The decoded parameter list ends with the class marker parameter.
pub fn json_to_plugin(text: &str) -> Result<Plugin> {
    let raw = parse_raw(text)?;
    json_to_plugin_in(raw, text)
}

/// Decodes an array of plugin objects.
pub fn json_to_plugin_list(text: &str) -> Result<Vec<Plugin>> {
    let raw = parse_raw(text)?;
    json_to_plugin_list_in(raw, text)
}

/// Decodes a plugin object found inside `source`.
pub fn json_to_plugin_in(raw: &RawValue, source: &str) -> Result<Plugin> {
    expect_shape(raw, source, '{', "an object")?;
    let doc: PluginDocument = decode_in(raw, source)?;
    Ok(doc.into_plugin())
}

/// Decodes an array of plugin objects found inside `source`.
pub fn json_to_plugin_list_in(raw: &RawValue, source: &str) -> Result<Vec<Plugin>> {
    expect_shape(raw, source, '[', "an array")?;
    let docs: Vec<PluginDocument> = decode_in(raw, source)?;
    Ok(docs.into_iter().map(PluginDocument::into_plugin).collect())
}

/// Parses `source` as a JSON object, keeping each member as raw text so it
/// can be decoded on its own later.
pub fn parse_object(source: &str) -> Result<BTreeMap<String, &RawValue>> {
    let raw = parse_raw(source)?;
    expect_shape(raw, source, '{', "an object")?;
    decode_borrowed(raw, source)
}

/// Decodes a member value previously returned by [`parse_object`].
pub fn decode_in<T: DeserializeOwned>(raw: &RawValue, source: &str) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|e| located_error(&e, raw, source))
}

fn decode_borrowed<'a, T: Deserialize<'a>>(raw: &'a RawValue, source: &str) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|e| located_error(&e, raw, source))
}

fn parse_raw(text: &str) -> Result<&RawValue> {
    serde_json::from_str::<&RawValue>(text).map_err(|e| {
        PluginError::IllegalInput(format!(
            "Failed to parse JSON: {} at line {} column {}.",
            strip_position(&e),
            e.line(),
            e.column()
        ))
    })
}

fn expect_shape(raw: &RawValue, source: &str, opening: char, what: &str) -> Result<()> {
    if raw.get().starts_with(opening) {
        return Ok(());
    }
    let (line, column) = location_of(raw, source);
    Err(PluginError::IllegalInput(format!(
        "Expected {what} at line {line} column {column}."
    )))
}

/// Line and column in `source` at which `raw` starts.
pub fn location_of(raw: &RawValue, source: &str) -> (usize, usize) {
    find_line_column(source, offset_in(raw.get(), source))
}

fn offset_in(fragment: &str, source: &str) -> usize {
    let start = source.as_ptr() as usize;
    (fragment.as_ptr() as usize)
        .checked_sub(start)
        .filter(|offset| *offset <= source.len())
        .unwrap_or(0)
}

/// One-based line and column of byte `offset` within `text`.
pub fn find_line_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = text.get(..offset).unwrap_or(text);
    let mut line = 1;
    let mut column = 1;
    for ch in prefix.chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn located_error(err: &serde_json::Error, raw: &RawValue, source: &str) -> PluginError {
    let (base_line, base_column) = location_of(raw, source);
    let (line, column) = match err.line() {
        0 => (base_line, base_column),
        1 => (base_line, base_column + err.column().saturating_sub(1)),
        n => (base_line + n - 1, err.column()),
    };
    PluginError::IllegalInput(format!(
        "{} at line {line} column {column}.",
        strip_position(err).trim_end_matches('.')
    ))
}

fn strip_position(err: &serde_json::Error) -> String {
    let text = err.to_string();
    let suffix = format!(" at line {} column {}", err.line(), err.column());
    match text.strip_suffix(&suffix) {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
