//! Discovery and selection of Python recipe modules.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use plugin_core::{json, Plugin, PluginError, PluginIdentity, PluginInterface, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::adapter::PythonAdapter;
use crate::command::run_python_command;
use crate::config::BridgeConfig;
use crate::scripts::{bootstrap_command, discovery_script};

/// Plugins reported by the interpreter, keyed by module path, plus a
/// reverse index from plugin identity to the module that provides it.
#[derive(Debug, Default)]
pub(crate) struct RegistryTables {
    modules: BTreeMap<String, Vec<Plugin>>,
    providers: BTreeMap<PluginIdentity, (String, usize)>,
}

impl RegistryTables {
    pub(crate) fn insert(&mut self, module: String, plugins: Vec<Plugin>) {
        for (index, plugin) in plugins.iter().enumerate() {
            // The first module to provide an identity keeps it.
            self.providers
                .entry(plugin.identity())
                .or_insert_with(|| (module.clone(), index));
        }
        self.modules.insert(module, plugins);
    }

    /// Returns the preloaded plugin matching `plugin` and the path of its
    /// module.
    pub(crate) fn find(&self, plugin: &Plugin) -> Option<(&Plugin, &str)> {
        let (module, index) = self.providers.get(&plugin.identity())?;
        let preloaded = self.modules.get(module)?.get(*index)?;
        Some((preloaded, module.as_str()))
    }
}

#[derive(Serialize)]
struct DiscoveryRequest<'a> {
    script: &'a str,
    paths: &'a [String],
}

/// Loads Python recipe modules once and hands out plugins backed by them.
///
/// Plugins returned by [`RecipeBridge::get_plugin_list`] only hold a weak
/// reference to the loaded tables. After [`RecipeBridge::cleanup`] or a new
/// [`RecipeBridge::load_modules`] they fail with a data-not-found error.
#[derive(Debug)]
pub struct RecipeBridge {
    config: Arc<BridgeConfig>,
    tables: Option<Arc<RegistryTables>>,
    selected: Option<String>,
}

impl Default for RecipeBridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl RecipeBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
            tables: None,
            selected: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Imports every module in `paths` in one interpreter run and records
    /// the recipes each one provides.
    ///
    /// Previous state is discarded first. On return `paths` only holds the
    /// modules that were loaded. Modules whose description cannot be
    /// decoded are skipped, and the error of the last such module is
    /// returned after all others were registered.
    pub fn load_modules(&mut self, paths: &mut Vec<String>) -> Result<()> {
        self.cleanup();
        self.tables = Some(Arc::default());
        if paths.is_empty() {
            return Ok(());
        }

        let script = discovery_script();
        let input = serde_json::to_string_pretty(&DiscoveryRequest {
            script: &script,
            paths: paths.as_slice(),
        })
        .map_err(|err| {
            PluginError::IllegalInput(format!("Failed to encode module discovery request: {err}"))
        })?;
        let output = run_python_command(&self.config, &bootstrap_command(), &input)?;
        let members = json::parse_object(&output)?;

        let mut tables = RegistryTables::default();
        let mut loaded = BTreeSet::new();
        let mut last_error = None;
        for (module, raw) in members {
            match json::json_to_plugin_list_in(raw, &output) {
                Ok(plugins) => {
                    debug!(module = %module, plugins = plugins.len(), "Loaded Python module");
                    loaded.insert(module.clone());
                    tables.insert(module, plugins);
                }
                Err(err) => {
                    warn!(module = %module, error = %err, "Skipping Python module");
                    last_error = Some(err);
                }
            }
        }
        paths.retain(|path| loaded.contains(path));
        self.tables = Some(Arc::new(tables));

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Makes `name` the module whose plugins are listed. `None` clears the
    /// selection.
    pub fn select_module(&mut self, name: Option<&str>) -> Result<()> {
        let Some(name) = name else {
            self.selected = None;
            return Ok(());
        };
        let tables = self.tables.as_ref().ok_or_else(|| {
            PluginError::DataNotFound(
                "Python modules need to be loaded first with load_modules.".into(),
            )
        })?;
        if !tables.modules.contains_key(name) {
            return Err(PluginError::DataNotFound(format!(
                "Failed to find preloaded Python module: {name}"
            )));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    /// Appends a header copy of every plugin of the selected module to
    /// `list`, each wired to run through the interpreter.
    pub fn get_plugin_list(&self, list: &mut Vec<Plugin>) -> Result<()> {
        let not_selected = || {
            PluginError::DataNotFound(
                "Python module has not been selected yet with select_module.".into(),
            )
        };
        let (Some(tables), Some(selected)) = (&self.tables, &self.selected) else {
            return Err(not_selected());
        };
        let plugins = tables.modules.get(selected).ok_or_else(not_selected)?;

        let adapter: Arc<dyn PluginInterface> =
            Arc::new(PythonAdapter::new(Arc::downgrade(tables), Arc::clone(&self.config)));
        list.reserve(plugins.len());
        for plugin in plugins {
            let mut copy = plugin.copy_header();
            copy.set_interface(Arc::clone(&adapter));
            list.push(copy);
        }
        Ok(())
    }

    /// Drops every loaded module and the selection.
    pub fn cleanup(&mut self) {
        self.selected = None;
        self.tables = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.tables.is_some()
    }

    /// Paths of the loaded modules, in sorted order.
    pub fn modules(&self) -> Vec<&str> {
        self.tables
            .as_ref()
            .map(|tables| tables.modules.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn selected_module(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn with_tables(config: BridgeConfig, tables: RegistryTables) -> Self {
        Self {
            config: Arc::new(config),
            tables: Some(Arc::new(tables)),
            selected: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn weak_tables(&self) -> std::sync::Weak<RegistryTables> {
        self.tables.as_ref().map(Arc::downgrade).unwrap_or_default()
    }
}
