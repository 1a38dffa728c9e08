//! Plugin data model shared by the recipe bridge and its hosts.

pub mod error;
pub mod frame;
pub mod json;
pub mod parameter;
pub mod plugin;
pub mod recipeconfig;

pub use error::{ErrorKind, PluginError, Result};
pub use frame::{Frame, FrameSet};
pub use parameter::{
    Parameter, ParameterClass, ParameterMode, ParameterType, ParameterValue, CLASS_PARAMETER,
    CLASS_PARAMETER_CONTEXT,
};
pub use plugin::{Plugin, PluginIdentity, PluginInterface, PluginType, PLUGIN_API};
pub use recipeconfig::{InputConfig, RecipeConfig, TagConfig};
