//! Plugin interface backed by a Python recipe class.

use std::path::Path;
use std::sync::{Arc, Weak};

use plugin_core::{
    json, ParameterValue, Plugin, PluginError, PluginInterface, PluginType, RecipeConfig, Result,
    CLASS_PARAMETER, PLUGIN_API,
};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::command::run_python_command;
use crate::config::BridgeConfig;
use crate::registry::RegistryTables;
use crate::scripts::{bootstrap_command, execute_script};

/// Runs the lifecycle of plugins handed out by
/// [`RecipeBridge`](crate::RecipeBridge). Each call looks the plugin up in
/// the loaded tables by its descriptive fields.
pub struct PythonAdapter {
    tables: Weak<RegistryTables>,
    config: Arc<BridgeConfig>,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    script: &'a str,
    modulepath: &'a str,
    plugin: &'a RawValue,
}

impl PythonAdapter {
    pub(crate) fn new(tables: Weak<RegistryTables>, config: Arc<BridgeConfig>) -> Self {
        Self { tables, config }
    }

    fn tables(&self) -> Result<Arc<RegistryTables>> {
        self.tables.upgrade().ok_or_else(|| {
            PluginError::DataNotFound("Python modules are no longer loaded.".into())
        })
    }

    fn run(&self, plugin: &mut Plugin) -> Result<()> {
        check_api(plugin)?;
        let tables = self.tables()?;
        let (preloaded, module_path) = tables.find(plugin).ok_or_else(|| not_preloaded(plugin))?;
        check_type(plugin.kind)?;

        let parameters = preloaded.parameters.as_ref().ok_or_else(|| {
            PluginError::DataNotFound(format!(
                "Missing parameter list in preloaded Python plugin object for '{}'.",
                plugin.name
            ))
        })?;
        let marker = parameters.last().ok_or_else(|| {
            PluginError::DataNotFound(format!(
                "Parameter list in preloaded Python plugin object for '{}' is empty.",
                plugin.name
            ))
        })?;
        let class_name = match (&marker.name, &marker.value) {
            (name, ParameterValue::String(class)) if name == CLASS_PARAMETER => class.as_str(),
            _ => {
                return Err(PluginError::DataNotFound(format!(
                    "Could not find the Python class name for plugin '{}'.",
                    plugin.name
                )))
            }
        };

        let (module_dir, module_name) = split_module_path(module_path);
        let script = execute_script(&module_name, class_name)?;
        let plugin_json = RawValue::from_string(json::plugin_to_json(plugin)?)
            .map_err(|err| PluginError::IllegalInput(format!("Failed to encode plugin: {err}")))?;
        let input = serde_json::to_string_pretty(&ExecuteRequest {
            script: &script,
            modulepath: &module_dir,
            plugin: &plugin_json,
        })
        .map_err(|err| PluginError::IllegalInput(format!("Failed to encode plugin: {err}")))?;

        let output = run_python_command(&self.config, &bootstrap_command(), &input)?;
        let returned = decode_response(&output)?;
        update_plugin(plugin, &returned)
    }
}

impl PluginInterface for PythonAdapter {
    /// Allocates the parameter list and, for version 2 recipes, the recipe
    /// configuration, copying both from the preloaded plugin.
    fn initialize(&self, plugin: &mut Plugin) -> Result<()> {
        check_api(plugin)?;
        let tables = self.tables()?;
        let (preloaded, _) = tables.find(plugin).ok_or_else(|| not_preloaded(plugin))?;
        check_type(plugin.kind)?;

        let parameters = preloaded
            .parameters
            .as_deref()
            .map(|params| match params.split_last() {
                Some((last, rest)) if last.name == CLASS_PARAMETER => rest.to_vec(),
                _ => params.to_vec(),
            })
            .unwrap_or_default();
        plugin.parameters = Some(parameters);

        if plugin.kind == PluginType::RECIPE_V2 {
            let mut config = RecipeConfig::new();
            if let Some(source) = &preloaded.config {
                copy_recipe_config(source, &mut config)?;
            }
            plugin.config = Some(config);
        }
        Ok(())
    }

    /// Runs the recipe's `execute` method in a fresh interpreter and merges
    /// the returned frames into `plugin`.
    fn execute(&self, plugin: &mut Plugin) -> Result<()> {
        self.run(plugin)
    }

    fn deinitialize(&self, plugin: &mut Plugin) -> Result<()> {
        check_api(plugin)?;
        check_type(plugin.kind)?;
        plugin.parameters = None;
        if plugin.kind == PluginType::RECIPE_V2 {
            plugin.config = None;
        }
        Ok(())
    }
}

fn check_api(plugin: &Plugin) -> Result<()> {
    if plugin.api != PLUGIN_API {
        return Err(PluginError::UnsupportedMode(format!(
            "Plugin API version {} is not supported.",
            plugin.api
        )));
    }
    Ok(())
}

fn check_type(kind: PluginType) -> Result<()> {
    if !kind.is_recipe() {
        return Err(PluginError::UnsupportedMode(format!(
            "Plugin type {kind} is not supported."
        )));
    }
    Ok(())
}

fn not_preloaded(plugin: &Plugin) -> PluginError {
    PluginError::DataNotFound(format!(
        "Failed to find preloaded Python plugin object for '{}'.",
        plugin.name
    ))
}

fn copy_recipe_config(source: &RecipeConfig, target: &mut RecipeConfig) -> Result<()> {
    for tag in source.tags() {
        let min = source.min_count(tag, tag).unwrap_or(-1);
        let max = source.max_count(tag, tag).unwrap_or(-1);
        target.set_tag(tag, min, max)?;
        for input in source.inputs(tag).unwrap_or_default() {
            let min = source.min_count(tag, input).unwrap_or(-1);
            let max = source.max_count(tag, input).unwrap_or(-1);
            target.set_input(tag, input, min, max)?;
        }
        for output in source.outputs(tag).unwrap_or_default() {
            target.set_output(tag, output)?;
        }
    }
    Ok(())
}

/// Directory of a module file and its import name, which is the file name
/// up to the first dot.
fn split_module_path(path: &str) -> (String, String) {
    let path = Path::new(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    };
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let module = file.split('.').next().unwrap_or_default().to_string();
    (dir, module)
}

/// Checks the execution answer and decodes the plugin it returns.
fn decode_response(output: &str) -> Result<Plugin> {
    let members = json::parse_object(output)?;
    let start = output.len() - output.trim_start().len();
    let (line, column) = json::find_line_column(output, start);
    let missing = |key: &str| {
        PluginError::IllegalInput(format!(
            "Missing a '{key}' key in output object at line {line} column {column}."
        ))
    };

    let raw_result = members.get("result").ok_or_else(|| missing("result"))?;
    let result: Value = json::decode_in(raw_result, output)?;
    let code = result.as_i64().or_else(|| result.as_f64().map(|v| v as i64));
    let Some(code) = code else {
        let (line, column) = json::location_of(raw_result, output);
        return Err(PluginError::IllegalInput(format!(
            "Expected a number for key 'result' in output object at line {line} column {column}."
        )));
    };
    if code != 0 {
        let code = i32::try_from(code).unwrap_or(i32::MAX);
        let message = match members.get("error") {
            Some(raw) => json::decode_in::<Value>(raw, output)?
                .as_str()
                .map(str::to_string),
            None => None,
        };
        return Err(PluginError::Recipe {
            code,
            message: message
                .unwrap_or_else(|| format!("Plugin execution failed with error code {code}")),
        });
    }

    let raw_plugin = members.get("plugin").ok_or_else(|| missing("plugin"))?;
    json::json_to_plugin_in(raw_plugin, output)
}

/// Copies the results of a recipe run from `source` into `target`.
///
/// Both must describe the same plugin. Existing frames are updated in place
/// and frames only present in `source` are appended. A `source` frameset
/// shorter than the target is an error, reported after the common frames
/// were updated.
pub fn update_plugin(target: &mut Plugin, source: &Plugin) -> Result<()> {
    if target.api != source.api {
        return Err(PluginError::TypeMismatch(format!(
            "Plugin API number {} for the returned plugin does not correspond to the original value {}.",
            source.api, target.api
        )));
    }
    if target.version != source.version {
        return Err(PluginError::TypeMismatch(format!(
            "Plugin version {} for the returned plugin does not correspond to the original value {}.",
            source.version, target.version
        )));
    }
    if target.kind != source.kind {
        return Err(PluginError::TypeMismatch(format!(
            "Plugin type code {} for the returned plugin does not correspond to the original value {}.",
            source.kind, target.kind
        )));
    }
    if target.name != source.name {
        return Err(PluginError::TypeMismatch(format!(
            "Plugin name '{}' for the returned plugin does not correspond to the original value '{}'.",
            source.name, target.name
        )));
    }
    check_type(target.kind)?;

    let returned = source.frames.as_ref().ok_or_else(|| {
        PluginError::IllegalInput(
            "Received an empty frameset from the recipe plugin as output.".into(),
        )
    })?;
    let frames = target.frames.as_mut().ok_or_else(|| {
        PluginError::IllegalInput(
            "Plugin does not have its frameset initialised for updating.".into(),
        )
    })?;

    let mut shortfall = None;
    for (index, frame) in frames.iter_mut().enumerate() {
        let Some(update) = returned.get(index) else {
            shortfall = Some(PluginError::IllegalInput(
                "The frameset returned from the plugin recipe is shorter than what was given to it."
                    .into(),
            ));
            break;
        };
        if frame.filename != update.filename {
            frame.filename.clone_from(&update.filename);
        }
        if frame.tag != update.tag {
            frame.tag.clone_from(&update.tag);
        }
        frame.kind = update.kind;
        frame.group = update.group;
        frame.level = update.level;
    }
    if let Some(extra) = returned.get(frames.len()..) {
        frames.extend(extra.iter().cloned());
    }

    match shortfall {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
