mod cli;
mod config;
mod logging;
mod render;
mod shell;

use anyhow::{Context, Result, bail};
use clap::Parser;
use formula_core::{FileStore, FormulaBook, Workbench};
use tracing::debug;

use crate::{
    cli::{Args, Command},
    config::CliConfig,
    shell::Session,
};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level.as_deref());

    let mut config = CliConfig::from_env();
    config.apply_args(&args);
    debug!(?config, "effective configuration");

    let store = FileStore::new(&config.store_dir);
    let mut book = FormulaBook::open(store)
        .with_context(|| format!("Failed to open formulas in {}", config.store_dir.display()))?;

    let fresh = || {
        let mut wb = Workbench::new();
        wb.set_batch_oz(config.batch_oz);
        wb.set_percent_check(config.percent_check());
        wb
    };

    match args.command {
        Command::Calc(input) => {
            let mut wb = input.build(config.batch_oz)?;
            wb.set_percent_check(config.percent_check());
            println!("{}", render::report(&wb));
        }
        Command::Save { name, input } => {
            let mut wb = input.build(config.batch_oz)?;
            wb.set_percent_check(config.percent_check());
            if !book.save(&name, &wb).context("Failed to save formula")? {
                bail!("formula name must not be blank");
            }
            println!("{}", render::report(&wb));
            println!("Formula '{name}' saved to {}", config.store_dir.display());
        }
        Command::Show {
            name,
            scalars,
            json,
        } => {
            let mut wb = fresh();
            if !book.load(&name, &mut wb) {
                bail!("no saved formula named '{name}'");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&wb.snapshot())?);
            } else {
                scalars.apply(&mut wb);
                println!("{}", render::report(&wb));
            }
        }
        Command::List => {
            if book.is_empty() {
                println!("No saved formulas.");
            }
            for name in book.names() {
                println!("{name}");
            }
        }
        Command::Delete { name } => {
            let mut wb = fresh();
            if !book.delete(&name, &mut wb).context("Failed to delete formula")? {
                bail!("no saved formula named '{name}'");
            }
            println!("Formula '{name}' deleted.");
        }
        Command::Shell => {
            let mut session = Session::new(fresh(), book);
            shell::run_stdio(&mut session)?;
        }
    }

    Ok(())
}
