//! Python source sent to the interpreter.
//!
//! The interpreter is started with [`bootstrap_command`], which reads a JSON
//! document from descriptor 3 and runs its `script` member. Scripts see the
//! whole document as `_data` and answer with one JSON document written to
//! descriptor 4.

use plugin_core::{PluginError, Result};

use crate::{PYTHON_INPUT_FD, PYTHON_OUTPUT_FD};

/// Program passed to `python -c`.
pub fn bootstrap_command() -> String {
    format!(
        "import sys, os, json; \
         _data = json.load(os.fdopen({PYTHON_INPUT_FD},'r')); \
         exec(_data['script'])"
    )
}

/// Imports every file listed in `_data['paths']` and describes the recipe
/// classes found in it.
///
/// A module lists its recipes explicitly in `CPL_PLUGINS`. Without that
/// list every class with a `CplPlugin` class in its method resolution order
/// is taken. The answer maps each path with at least one recipe class to a
/// list of plugin objects. Import problems are printed as tracebacks on
/// stderr and the module is skipped. An attribute that cannot be read, for
/// whatever reason, gets its default.
pub fn discovery_script() -> String {
    format!(
        r#"import inspect, traceback
candidates = {{}}
for path in _data['paths']:
  module_name = os.path.splitext(os.path.basename(path))[0]
  sys.path.append(os.path.dirname(path))
  try:
    __import__(module_name)
    namespace = sys.modules[module_name]
    registered = getattr(namespace, 'CPL_PLUGINS', None)
    if registered is not None:
      classes = [cls for cls in registered if inspect.isclass(cls)]
    else:
      classes = [cls for _, cls in inspect.getmembers(namespace, inspect.isclass)
                 if any(base.__name__ == 'CplPlugin' for base in cls.__mro__)]
    classes = list(dict.fromkeys(classes))
    if classes:
      candidates[path] = classes
  except Exception:
    traceback.print_exc()
  del sys.path[-1]
_missing = object()
def _attribute(instance, key, fallback=None):
  try:
    return getattr(instance, key)
  except Exception:
    return fallback
found = {{}}
for path, classes in candidates.items():
  plugins = []
  for cls in classes:
    try:
      instance = cls()
    except Exception:
      continue
    try:
      doc = inspect.getdoc(instance)
    except Exception:
      doc = None
    plugin = {{'class': cls.__name__}}
    plugin['name'] = _attribute(instance, 'name', cls.__name__)
    plugin['version'] = _attribute(instance, 'version')
    plugin['synopsis'] = _attribute(instance, 'synopsis', doc.splitlines()[0] if doc else None)
    plugin['description'] = _attribute(instance, 'description', doc)
    for key in ('author', 'email', 'copyright'):
      plugin[key] = _attribute(instance, key)
    for key in ('parameters', 'recipeconfig'):
      value = _attribute(instance, key, _missing)
      if value is not _missing:
        plugin[key] = value
    plugins.append(plugin)
  found[path] = plugins
json.dump(found, os.fdopen({PYTHON_OUTPUT_FD}, 'w'), indent=2)
"#
    )
}

/// Runs `execute` of class `class_name` from module `module_name` on the
/// plugin object in `_data['plugin']`, after adding `_data['modulepath']`
/// to the import path.
pub fn execute_script(module_name: &str, class_name: &str) -> Result<String> {
    for name in [module_name, class_name] {
        if !is_identifier(name) {
            return Err(PluginError::IllegalInput(format!(
                "'{name}' is not a valid Python identifier."
            )));
        }
    }
    Ok(format!(
        r#"sys.path.append(_data['modulepath'])
import {module_name}
plugin = {module_name}.{class_name}()
result = plugin.execute(_data['plugin'])
error_message = plugin.error_message if hasattr(plugin, 'error_message') else None
json.dump({{'result': result, 'error': error_message, 'plugin': _data['plugin']}}, os.fdopen({PYTHON_OUTPUT_FD}, 'w'), indent=2)
"#
    ))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_reads_protocol_descriptor() {
        assert_eq!(
            bootstrap_command(),
            "import sys, os, json; _data = json.load(os.fdopen(3,'r')); exec(_data['script'])"
        );
    }

    #[test]
    fn scripts_answer_on_output_descriptor() {
        assert!(discovery_script().ends_with("os.fdopen(4, 'w'), indent=2)\n"));
        let script = execute_script("testrecipe", "TestRecipe").unwrap();
        assert!(script.contains("import testrecipe\n"));
        assert!(script.contains("plugin = testrecipe.TestRecipe()\n"));
        assert!(script.contains("os.fdopen(4, 'w')"));
    }

    #[test]
    fn discovery_reads_attributes_defensively() {
        let script = discovery_script();
        assert!(script.contains("  except Exception:\n    return fallback\n"));
        assert!(!script.contains("getattr(instance, 'synopsis'"));
    }

    #[test]
    fn names_must_be_identifiers() {
        assert!(execute_script("my-recipe", "Recipe").is_err());
        assert!(execute_script("recipe", "Recipe(); import os").is_err());
        assert!(execute_script("", "Recipe").is_err());
        assert!(execute_script("_private2", "Ümlaut").is_ok());
    }
}
