#![cfg(unix)]

use assert_cmd::prelude::*;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Lays out a recipe directory and a mock interpreter answering module
/// discovery with `testrecipe` and every execution with `execute_answer`.
struct Fixture {
    home: TempDir,
    recipes: PathBuf,
    interpreter: PathBuf,
}

impl Fixture {
    fn new(execute_answer: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let home = TempDir::new()?;
        let recipes = home.path().join("recipes");
        fs::create_dir(&recipes)?;
        let module = recipes.join("testrecipe.py");
        fs::write(&module, "# answered by the mock interpreter\n")?;

        let discover = format!(
            r#"{{"{}": [{{
  "class": "CplPlugin",
  "name": "testrecipe",
  "version": 123,
  "synopsis": "test recipe",
  "description": "Simple unit test recipe",
  "author": "Test",
  "email": "author@test.org",
  "copyright": "copyright",
  "parameters": [
    {{"class": "value", "name": "par1", "description": "test parameter", "context": "test", "default": 3}},
    {{"class": "enum", "name": "mode", "description": "combination", "context": "test", "default": "add", "choices": ["add", "sub"]}}
  ]
}}]}}"#,
            module.display()
        );
        fs::write(home.path().join("discover.json"), discover)?;
        fs::write(home.path().join("execute.json"), execute_answer)?;

        let interpreter = home.path().join("python.sh");
        fs::write(
            &interpreter,
            format!(
                "#!/bin/sh\nrequest=$(cat <&3)\nprintf '%s' \"$request\" > \"{dir}/last-request.json\"\ncase \"$request\" in\n  *CPL_PLUGINS*) cat \"{dir}/discover.json\" >&4 ;;\n  *) cat \"{dir}/execute.json\" >&4 ;;\nesac\n",
                dir = home.path().display()
            ),
        )?;
        fs::set_permissions(&interpreter, fs::Permissions::from_mode(0o755))?;
        Ok(Self {
            home,
            recipes,
            interpreter,
        })
    }

    fn cmd(&self) -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("recipebridge")?;
        cmd.env("HOME", self.home.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--interpreter")
            .arg(&self.interpreter)
            .arg("--recipe-dir")
            .arg(&self.recipes);
        Ok(cmd)
    }

    fn sof(&self, content: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.home.path().join("input.sof");
        fs::write(&path, content)?;
        Ok(path)
    }

    fn path(&self) -> &Path {
        self.home.path()
    }
}

const EXECUTE_OK: &str = r#"{
  "result": 0,
  "error": null,
  "plugin": {
    "class": "unknown",
    "name": "testrecipe",
    "version": 123,
    "synopsis": "test recipe",
    "parameters": [],
    "frames": [
      {"filename": "in.fits", "tag": "RAW", "type": 32, "group": 1, "level": 3},
      {"filename": "python_recipe_test_output.fits", "tag": "PROD", "type": 32, "group": 3, "level": 3}
    ]
  }
}"#;

#[test]
fn lists_recipes_with_version_and_synopsis() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    fixture
        .cmd()?
        .arg("list")
        .assert()
        .success()
        .stdout(
            contains("testrecipe.py")
                .and(contains("testrecipe"))
                .and(contains("0.1.23"))
                .and(contains("test recipe")),
        );
    Ok(())
}

#[test]
fn manual_shows_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    fixture
        .cmd()?
        .args(["man", "testrecipe"])
        .assert()
        .success()
        .stdout(
            contains("Simple unit test recipe")
                .and(contains("Author:    Test <author@test.org>"))
                .and(contains("--par1"))
                .and(contains("test parameter [3]"))
                .and(contains("one of {add, sub}"))
                .and(contains("__class__").not()),
        );
    Ok(())
}

#[test]
fn executes_recipe_and_prints_frames() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    let sof = fixture.sof("# inputs\nin.fits RAW raw\n")?;
    fixture
        .cmd()?
        .args(["exec", "testrecipe"])
        .arg(&sof)
        .args(["--param", "par1=4"])
        .assert()
        .success()
        .stdout(
            contains("[DONE] testrecipe finished")
                .and(contains("python_recipe_test_output.fits"))
                .and(contains("PRODUCT")),
        );

    let request: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.path().join("last-request.json"))?)?;
    let plugin = &request["plugin"];
    assert_eq!(plugin["name"], "testrecipe");
    assert_eq!(plugin["parameters"][0]["value"], 4);
    assert_eq!(plugin["frames"][0]["filename"], "in.fits");
    assert!(request["script"].as_str().unwrap().contains("testrecipe.CplPlugin()"));
    Ok(())
}

#[test]
fn recipe_failure_sets_exit_status() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(r#"{"result": 2, "error": "bad input", "plugin": null}"#)?;
    let sof = fixture.sof("in.fits RAW\n")?;
    fixture
        .cmd()?
        .args(["exec", "testrecipe"])
        .arg(&sof)
        .assert()
        .code(2)
        .stderr(contains("testrecipe: bad input"));
    Ok(())
}

#[test]
fn malformed_answer_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(r#"{"error": null}"#)?;
    let sof = fixture.sof("in.fits RAW\n")?;
    fixture
        .cmd()?
        .args(["exec", "testrecipe"])
        .arg(&sof)
        .assert()
        .failure()
        .stderr(contains("Missing a 'result' key in output object at line 1 column 1."));
    Ok(())
}

#[test]
fn invalid_parameters_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    let sof = fixture.sof("in.fits RAW\n")?;
    fixture
        .cmd()?
        .args(["exec", "testrecipe"])
        .arg(&sof)
        .args(["--param", "mode=mul"])
        .assert()
        .failure()
        .stderr(contains("parameter 'mode'"));
    fixture
        .cmd()?
        .args(["exec", "testrecipe"])
        .arg(&sof)
        .args(["--param", "par2=1"])
        .assert()
        .failure()
        .stderr(contains("has no parameter 'par2'"));
    Ok(())
}

#[test]
fn unknown_recipe_fails() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    fixture
        .cmd()?
        .args(["man", "nosuchrecipe"])
        .assert()
        .failure()
        .stderr(contains("recipe 'nosuchrecipe' not found"));
    Ok(())
}

#[test]
fn debug_flag_logs_protocol_traffic() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    fixture
        .cmd()?
        .args(["list", "--debug"])
        .assert()
        .success()
        .stderr(
            contains("Debug mode enabled")
                .and(contains("Loading recipe modules"))
                .and(contains("python.sh"))
                .and(contains("Input to Python interpreter:"))
                .and(contains("Output from Python interpreter:")),
        );
    Ok(())
}

#[test]
fn missing_interpreter_fails() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    Command::cargo_bin("recipebridge")?
        .env("HOME", fixture.path())
        .args(["--interpreter", "/nonexistent/python-for-tests", "--recipe-dir"])
        .arg(&fixture.recipes)
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("failed to load recipe modules"));
    Ok(())
}

#[test]
fn configuration_file_supplies_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::new(EXECUTE_OK)?;
    let config_dir = fixture.path().join(".config/recipebridge");
    fs::create_dir_all(&config_dir)?;
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "interpreter = '{}'\njoin_timeout_secs = 5\nrecipe_dirs = ['{}']\n",
            fixture.interpreter.display(),
            fixture.recipes.display()
        ),
    )?;
    Command::cargo_bin("recipebridge")?
        .env("HOME", fixture.path())
        .env("NO_COLOR", "1")
        .arg("list")
        .assert()
        .success()
        .stdout(contains("testrecipe"));
    Ok(())
}

#[test]
fn empty_recipe_directory_lists_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let home = TempDir::new()?;
    Command::cargo_bin("recipebridge")?
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .arg("--recipe-dir")
        .arg(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No recipes found"));
    Ok(())
}
