//! The `list`, `man` and `exec` commands.

use anyhow::{anyhow, bail, Context, Result};
use bridge::{find_modules, BridgeConfig, RecipeBridge};
use plugin_core::{Parameter, ParameterClass, ParameterValue, Plugin, PluginError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::args::ExecArgs;
use crate::config::Config;
use crate::output::{format_version, print_colored, print_error, print_heading, print_success};
use crate::sof::load_sof;

/// Options shared by every command once flags and config are merged.
pub struct Session {
    pub bridge_config: BridgeConfig,
    pub recipe_dirs: Vec<PathBuf>,
}

impl Session {
    /// Command-line values win over the configuration file.
    pub fn new(
        config: Config,
        interpreter: Option<String>,
        timeout: Option<u64>,
        recipe_dirs: Vec<PathBuf>,
    ) -> Self {
        let bridge_config = BridgeConfig::default()
            .with_interpreter(interpreter.unwrap_or(config.interpreter))
            .with_join_timeout(Duration::from_secs(
                timeout.unwrap_or(config.join_timeout_secs),
            ));
        let recipe_dirs = if recipe_dirs.is_empty() {
            config.recipe_dirs
        } else {
            recipe_dirs
        };
        Self {
            bridge_config,
            recipe_dirs,
        }
    }

    /// Loads every module found in the recipe directories plus `extra`.
    ///
    /// Modules that fail to load are reported and skipped, as long as at
    /// least one module could be loaded.
    fn load(&self, extra: &[PathBuf]) -> Result<RecipeBridge> {
        let mut paths: Vec<_> = self.recipe_dirs.iter().chain(extra).collect();
        paths.dedup();
        let mut modules = find_modules(&paths);
        debug!(count = modules.len(), "Recipe modules found");

        let mut bridge = RecipeBridge::new(self.bridge_config.clone());
        debug!(
            interpreter = %bridge.config().interpreter,
            timeout_secs = bridge.config().join_timeout.as_secs(),
            "Loading recipe modules"
        );
        if let Err(err) = bridge.load_modules(&mut modules) {
            if bridge.modules().is_empty() {
                return Err(anyhow!(err)).context("failed to load recipe modules");
            }
            warn!(error = %err, "Some recipe modules could not be loaded");
        }
        info!(count = modules.len(), "Recipe modules loaded");
        Ok(bridge)
    }
}

/// Header copies of every loaded recipe, grouped by module.
fn all_recipes(bridge: &mut RecipeBridge) -> Result<Vec<(String, Vec<Plugin>)>> {
    let modules: Vec<String> = bridge.modules().into_iter().map(String::from).collect();
    let mut found = Vec::with_capacity(modules.len());
    for module in modules {
        bridge.select_module(Some(&module))?;
        let mut plugins = Vec::new();
        bridge.get_plugin_list(&mut plugins)?;
        found.push((module, plugins));
    }
    bridge.select_module(None)?;
    Ok(found)
}

fn find_recipe(bridge: &mut RecipeBridge, name: &str) -> Result<Plugin> {
    all_recipes(bridge)?
        .into_iter()
        .flat_map(|(_, plugins)| plugins)
        .find(|plugin| plugin.name == name)
        .ok_or_else(|| anyhow!("recipe '{name}' not found in any loaded module"))
}

pub fn list_recipes(session: &Session, extra: &[PathBuf]) -> Result<ExitCode> {
    let mut bridge = session.load(extra)?;
    let recipes = all_recipes(&mut bridge)?;
    if recipes.iter().all(|(_, plugins)| plugins.is_empty()) {
        print_colored("INFO", "No recipes found");
        return Ok(ExitCode::SUCCESS);
    }
    for (module, plugins) in recipes {
        if plugins.is_empty() {
            continue;
        }
        print_heading(&module);
        for plugin in plugins {
            println!(
                "  {:<24} {:<10} {}",
                plugin.name,
                format_version(plugin.version),
                plugin.synopsis
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn show_manual(session: &Session, name: &str) -> Result<ExitCode> {
    let mut bridge = session.load(&[])?;
    let mut plugin = find_recipe(&mut bridge, name)?;
    plugin
        .initialize()
        .with_context(|| format!("failed to initialise recipe '{name}'"))?;

    print_heading(&format!("{} {}", plugin.name, format_version(plugin.version)));
    println!("{}", plugin.synopsis);
    println!();
    println!("{}", plugin.description);
    println!();
    println!("Author:    {} <{}>", plugin.author, plugin.email);
    println!("Copyright: {}", plugin.copyright);

    let parameters = plugin.parameters.as_deref().unwrap_or_default();
    println!();
    if parameters.is_empty() {
        println!("The recipe has no parameters.");
    } else {
        print_heading("Parameters");
        for parameter in parameters {
            print_parameter(parameter);
        }
    }

    if let Some(config) = plugin.config.as_ref().filter(|config| !config.is_empty()) {
        println!();
        print_heading("Frame tags");
        for tag in config.tags() {
            let inputs = config.inputs(tag).unwrap_or_default();
            let outputs = config.outputs(tag).unwrap_or_default();
            println!("  {tag}");
            if !inputs.is_empty() {
                println!("    inputs:  {}", inputs.join(", "));
            }
            if !outputs.is_empty() {
                println!("    outputs: {}", outputs.join(", "));
            }
        }
    }

    plugin.deinitialize()?;
    Ok(ExitCode::SUCCESS)
}

fn print_parameter(parameter: &Parameter) {
    let constraint = match &parameter.class {
        ParameterClass::Value => String::new(),
        ParameterClass::Range { min, max } => format!(" in [{min}, {max}]"),
        ParameterClass::Enum { choices } => {
            let choices: Vec<String> = choices.iter().map(ToString::to_string).collect();
            format!(" one of {{{}}}", choices.join(", "))
        }
    };
    println!(
        "  --{:<22} {} [{}{constraint}]",
        parameter.cli.alias, parameter.description, parameter.default
    );
}

pub fn execute_recipe(session: &Session, args: &ExecArgs) -> Result<ExitCode> {
    let frames = load_sof(&args.sof)?;
    let mut bridge = session.load(&[])?;
    let mut plugin = find_recipe(&mut bridge, &args.recipe)?;
    plugin
        .initialize()
        .with_context(|| format!("failed to initialise recipe '{}'", args.recipe))?;
    for (name, value) in &args.params {
        set_parameter(&mut plugin, name, value)?;
    }
    plugin.frames = Some(frames);

    info!(recipe = %plugin.name, "Executing recipe");
    let outcome = plugin.execute();
    let deinit = plugin.deinitialize();
    match outcome {
        Ok(()) => {}
        Err(PluginError::Recipe { code, message }) => {
            print_error("FAILED", &format!("{}: {message}", plugin.name));
            return Ok(ExitCode::from(recipe_exit_status(code)));
        }
        Err(err) => {
            return Err(anyhow!(err)).with_context(|| format!("recipe '{}' failed", plugin.name))
        }
    }
    deinit?;

    print_success("DONE", &format!("{} finished", plugin.name));
    for frame in plugin.frames.as_deref().unwrap_or_default() {
        println!(
            "  {:<40} {:<12} {}",
            frame.filename,
            frame.tag,
            frame.group_name()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn set_parameter(plugin: &mut Plugin, name: &str, text: &str) -> Result<()> {
    let recipe = plugin.name.clone();
    let parameters = plugin.parameters.as_mut().map(Vec::as_mut_slice).unwrap_or_default();
    let Some(parameter) = parameters
        .iter_mut()
        .find(|p| p.name == name || (p.cli.enabled && p.cli.alias == name))
    else {
        bail!("recipe '{recipe}' has no parameter '{name}'");
    };
    let value = ParameterValue::parse_as(text, parameter.kind()).ok_or_else(|| {
        anyhow!(
            "value '{text}' for parameter '{name}' is not a valid {}",
            parameter.kind()
        )
    })?;
    parameter
        .set_value(value)
        .map_err(|msg| anyhow!("parameter '{name}': {msg}"))
}

/// Process status for a recipe failure. Codes outside `1..=255` become 1.
fn recipe_exit_status(code: i32) -> u8 {
    u8::try_from(code).ok().filter(|code| *code != 0).unwrap_or(1)
}
