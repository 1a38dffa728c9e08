use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PluginError, Result};
use crate::frame::FrameSet;
use crate::parameter::Parameter;
use crate::recipeconfig::RecipeConfig;

/// Plugin API version understood by this crate.
pub const PLUGIN_API: u32 = 1;

/// Open set of plugin type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PluginType(pub u64);

impl PluginType {
    pub const NONE: PluginType = PluginType(0);
    pub const RECIPE: PluginType = PluginType(1);
    pub const RECIPE_V2: PluginType = PluginType(3);

    /// Whether the adapter knows how to drive plugins of this type.
    pub fn is_recipe(self) -> bool {
        self == PluginType::RECIPE || self == PluginType::RECIPE_V2
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry points through which a host drives a plugin.
///
/// Hosts only see this trait, so plugins served by an external interpreter
/// and plugins implemented in-process are interchangeable.
pub trait PluginInterface: Send + Sync {
    /// Prepares `plugin` for execution, filling in its parameters and
    /// recipe configuration.
    fn initialize(&self, plugin: &mut Plugin) -> Result<()>;

    /// Runs the plugin once against its current frame set.
    ///
    /// # Errors
    ///
    /// [`PluginError::Recipe`] when the plugin ran and reported a non-zero
    /// status, any other variant when the plugin could not be run.
    fn execute(&self, plugin: &mut Plugin) -> Result<()>;

    /// Releases what [`initialize`](PluginInterface::initialize) allocated.
    fn deinitialize(&self, plugin: &mut Plugin) -> Result<()>;
}

/// Descriptive fields of a plugin, ordered for use as a lookup key.
///
/// Fields are compared in declaration order: api, version, type, name,
/// author, email, synopsis, description, copyright.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginIdentity {
    pub api: u32,
    pub version: u64,
    pub kind: PluginType,
    pub name: String,
    pub author: String,
    pub email: String,
    pub synopsis: String,
    pub description: String,
    pub copyright: String,
}

/// A recipe plugin together with the data it operates on.
#[derive(Clone, Default)]
pub struct Plugin {
    pub api: u32,
    pub version: u64,
    pub kind: PluginType,
    pub name: String,
    pub synopsis: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub copyright: String,
    /// Parameter list, `None` until allocated by initialisation or decoding.
    pub parameters: Option<Vec<Parameter>>,
    /// Input and output frames, owned by the caller.
    pub frames: Option<FrameSet>,
    /// Recipe configuration, only used by [`PluginType::RECIPE_V2`].
    pub config: Option<RecipeConfig>,
    interface: Option<Arc<dyn PluginInterface>>,
}

impl Plugin {
    pub fn new(kind: PluginType, name: impl Into<String>, version: u64) -> Self {
        Self {
            api: PLUGIN_API,
            version,
            kind,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            api: self.api,
            version: self.version,
            kind: self.kind,
            name: self.name.clone(),
            author: self.author.clone(),
            email: self.email.clone(),
            synopsis: self.synopsis.clone(),
            description: self.description.clone(),
            copyright: self.copyright.clone(),
        }
    }

    /// Copies the descriptive fields and the attached interface, leaving
    /// parameters, frames and configuration unallocated.
    pub fn copy_header(&self) -> Plugin {
        Plugin {
            api: self.api,
            version: self.version,
            kind: self.kind,
            name: self.name.clone(),
            synopsis: self.synopsis.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            email: self.email.clone(),
            copyright: self.copyright.clone(),
            parameters: None,
            frames: None,
            config: None,
            interface: self.interface.clone(),
        }
    }

    pub fn set_interface(&mut self, interface: Arc<dyn PluginInterface>) {
        self.interface = Some(interface);
    }

    pub fn has_interface(&self) -> bool {
        self.interface.is_some()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .as_ref()
            .and_then(|params| params.iter().find(|p| p.name == name))
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .as_mut()
            .and_then(|params| params.iter_mut().find(|p| p.name == name))
    }

    pub fn initialize(&mut self) -> Result<()> {
        let interface = self.require_interface()?;
        debug!(plugin = %self.name, "initialize");
        interface.initialize(self)
    }

    pub fn execute(&mut self) -> Result<()> {
        let interface = self.require_interface()?;
        debug!(plugin = %self.name, "execute");
        interface.execute(self)
    }

    pub fn deinitialize(&mut self) -> Result<()> {
        let interface = self.require_interface()?;
        debug!(plugin = %self.name, "deinitialize");
        interface.deinitialize(self)
    }

    fn require_interface(&self) -> Result<Arc<dyn PluginInterface>> {
        self.interface.clone().ok_or_else(|| {
            PluginError::UnsupportedMode(format!(
                "Plugin '{}' has no interface attached.",
                self.name
            ))
        })
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("api", &self.api)
            .field("version", &self.version)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("synopsis", &self.synopsis)
            .field("author", &self.author)
            .field("parameters", &self.parameters)
            .field("frames", &self.frames)
            .field("config", &self.config)
            .field("interface", &self.interface.is_some())
            .finish()
    }
}
