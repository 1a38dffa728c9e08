#![cfg(unix)]

mod common;

use bridge::RecipeBridge;
use common::{answering_interpreter, captured_request, mock_interpreter};
use plugin_core::{ErrorKind, Plugin, PluginType, CLASS_PARAMETER};
use tempfile::TempDir;

const TEST_RECIPE: &str = r#"{
  "class": "TestRecipe",
  "name": "test",
  "version": 1,
  "synopsis": "Test recipe",
  "description": "Adds a number to the value read from the input file.",
  "author": "Someone",
  "email": "someone@example.org",
  "copyright": "GPL",
  "parameters": [
    {"name": "test.par1", "class": "value", "default": 3, "description": "Increment"}
  ]
}"#;

fn paths(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn interpreter_failure_keeps_paths() {
    let dir = TempDir::new().unwrap();
    let mut bridge = RecipeBridge::new(mock_interpreter(&dir, "cat <&3 >/dev/null\nexit 1"));
    let mut modules = paths(&["./test.py"]);

    let err = bridge.load_modules(&mut modules).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileIo);
    assert_eq!(modules, paths(&["./test.py"]));
    assert!(bridge.modules().is_empty());
}

#[test]
fn empty_answer_drops_every_path() {
    let dir = TempDir::new().unwrap();
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, "{}"));
    let mut modules = paths(&["./test.py"]);

    bridge.load_modules(&mut modules).unwrap();
    assert!(modules.is_empty());
    assert!(bridge.is_loaded());
}

#[test]
fn answer_must_be_an_object() {
    let dir = TempDir::new().unwrap();
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, "\"./test.py\""));
    let mut modules = paths(&["./test.py"]);

    let err = bridge.load_modules(&mut modules).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalInput);
    assert_eq!(err.message(), "Expected an object at line 1 column 1.");
    assert_eq!(modules, paths(&["./test.py"]));
}

#[test]
fn malformed_answer_is_illegal_input() {
    let dir = TempDir::new().unwrap();
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, "{\"./test.py\": [}"));
    let mut modules = paths(&["./test.py"]);

    let err = bridge.load_modules(&mut modules).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalInput);
    assert_eq!(modules, paths(&["./test.py"]));
}

#[test]
fn undecodable_module_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, r#"{"./test.py": "xyz"}"#));
    let mut modules = paths(&["./test.py"]);

    let err = bridge.load_modules(&mut modules).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalInput);
    assert!(modules.is_empty());
}

#[test]
fn valid_modules_survive_a_bad_neighbour() {
    let dir = TempDir::new().unwrap();
    let answer = format!(r#"{{"./test1.py": [{TEST_RECIPE}], "./test2.py": "xyz"}}"#);
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, &answer));
    let mut modules = paths(&["./test1.py", "./test2.py"]);

    let err = bridge.load_modules(&mut modules).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalInput);
    assert_eq!(modules, paths(&["./test1.py"]));
    assert_eq!(bridge.modules(), vec!["./test1.py"]);
    bridge.select_module(Some("./test1.py")).unwrap();
}

#[test]
fn loaded_recipes_are_listed_and_initialised() {
    let dir = TempDir::new().unwrap();
    let answer = format!(r#"{{"./test.py": [{TEST_RECIPE}]}}"#);
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, &answer));
    let mut modules = paths(&["./test.py"]);
    bridge.load_modules(&mut modules).unwrap();
    assert_eq!(modules, paths(&["./test.py"]));

    let request = captured_request(&dir);
    assert_eq!(request["paths"], serde_json::json!(["./test.py"]));
    assert!(request["script"].as_str().unwrap().contains("CPL_PLUGINS"));

    bridge.select_module(Some("./test.py")).unwrap();
    let mut list = Vec::new();
    bridge.get_plugin_list(&mut list).unwrap();
    assert_eq!(list.len(), 1);

    let plugin: &mut Plugin = &mut list[0];
    assert_eq!(plugin.name, "test");
    assert_eq!(plugin.kind, PluginType::RECIPE);
    assert_eq!(plugin.author, "Someone");
    assert!(plugin.parameters.is_none());

    plugin.initialize().unwrap();
    let params = plugin.parameters.as_ref().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "test.par1");
    assert!(params.iter().all(|p| p.name != CLASS_PARAMETER));
    plugin.deinitialize().unwrap();
    assert!(plugin.parameters.is_none());
}

#[test]
fn reloading_detaches_old_plugins() {
    let dir = TempDir::new().unwrap();
    let answer = format!(r#"{{"./test.py": [{TEST_RECIPE}]}}"#);
    let mut bridge = RecipeBridge::new(answering_interpreter(&dir, &answer));
    let mut modules = paths(&["./test.py"]);
    bridge.load_modules(&mut modules).unwrap();
    bridge.select_module(Some("./test.py")).unwrap();
    let mut list = Vec::new();
    bridge.get_plugin_list(&mut list).unwrap();

    bridge.load_modules(&mut modules).unwrap();
    assert_eq!(bridge.selected_module(), None);
    let err = list[0].initialize().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataNotFound);
}
