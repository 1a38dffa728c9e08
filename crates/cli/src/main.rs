//! Entry point for the command-line interface.
//! Merges flags with the configuration file and dispatches to the
//! recipe commands.

use std::process::ExitCode;

use recipebridge::args::{parse_cli, Commands};
use recipebridge::config::load_config;
use recipebridge::init_logging;
use recipebridge::recipes::{execute_recipe, list_recipes, show_manual, Session};
use tracing::debug;

fn main() -> anyhow::Result<ExitCode> {
    let cli = parse_cli();
    init_logging(cli.debug);
    if cli.debug {
        debug!("Debug mode enabled");
    }
    let session = Session::new(load_config()?, cli.interpreter, cli.timeout, cli.recipe_dirs);
    match cli.command {
        Commands::List { modules } => list_recipes(&session, &modules),
        Commands::Man { recipe } => show_manual(&session, &recipe),
        Commands::Exec(args) => execute_recipe(&session, &args),
    }
}
