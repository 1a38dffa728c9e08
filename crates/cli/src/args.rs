use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

fn parse_timeout(s: &str) -> Result<u64, String> {
    let v: u64 = s
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    if v == 0 {
        Err("timeout must be greater than 0".into())
    } else {
        Ok(v)
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Run data reduction recipes implemented in Python",
    long_about = "recipebridge loads recipe classes from Python modules and runs them as plugins.

Each operation starts a fresh Python interpreter. Requests are sent to the
interpreter on file descriptor 3 and answers are read from descriptor 4, so
the recipe's own output and tracebacks stay on the terminal.

Examples:
  recipebridge list                              # Recipes in the configured directories
  recipebridge --recipe-dir ./recipes list       # Recipes below ./recipes
  recipebridge man testrecipe                    # Parameters of a recipe
  recipebridge exec testrecipe input.sof --param par1=4",
    subcommand_required = true
)]
pub struct Cli {
    /// Python interpreter (path or command line) used to run recipes
    #[arg(long, global = true)]
    pub interpreter: Option<String>,
    /// Seconds to wait for the interpreter to exit before terminating it
    #[arg(long, global = true, value_parser = parse_timeout)]
    pub timeout: Option<u64>,
    /// Directory searched recursively for recipe modules (repeatable)
    #[arg(long = "recipe-dir", global = true)]
    pub recipe_dirs: Vec<PathBuf>,
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the recipes found in the recipe directories and given modules
    List {
        /// Additional Python module files to load
        modules: Vec<PathBuf>,
    },
    /// Show the description and parameters of a recipe
    #[command(alias = "help-recipe")]
    Man {
        /// Name of the recipe
        recipe: String,
    },
    /// Run a recipe on the frames listed in a set-of-frames file
    Exec(ExecArgs),
}

#[derive(ClapArgs)]
pub struct ExecArgs {
    /// Name of the recipe
    pub recipe: String,
    /// Set-of-frames file: one `FILENAME [TAG [GROUP]]` entry per line
    pub sof: PathBuf,
    /// Parameter values as NAME=VALUE pairs
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
