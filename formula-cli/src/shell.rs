//! Line-oriented session over one workbench, one command per form control.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use formula_core::{
    FormulaBook, IngredientEdit, KeyValueStore, SplitEdit, Workbench, parse_decimal,
};
use tracing::debug;

use crate::{cli::PhaseFlag, render};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

/// Rows and scents are numbered from 1, as shown in the report.
#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Append a blank ingredient (the last row needs a name and percent first)
    Add,
    /// Rename a row
    Name {
        row: usize,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        name: Vec<String>,
    },
    /// Set a row's percent
    Percent {
        row: usize,
        #[arg(allow_hyphen_values = true, default_value = "")]
        percent: String,
    },
    /// Set a row's phase
    Phase {
        row: usize,
        #[arg(value_enum, ignore_case = true)]
        phase: PhaseFlag,
    },
    /// Split a fragrance row into 1-3 scents
    Scents {
        row: usize,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        count: u8,
    },
    /// Name a scent of a fragrance row
    ScentName {
        row: usize,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        scent: u8,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        name: Vec<String>,
    },
    /// Set a scent's share of its fragrance, in percent
    ScentPercent {
        row: usize,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        scent: u8,
        #[arg(allow_hyphen_values = true, default_value = "")]
        percent: String,
    },
    /// Move a row to another position
    Move { from: usize, to: usize },
    /// Remove a row
    Remove { row: usize },
    /// Set the batch size in oz
    Batch { oz: String },
    /// Water-phase weight before heating, in grams
    Before { grams: String },
    /// Water-phase weight after heating, in grams
    After { grams: String },
    /// Save the current formula (defaults to the last saved or loaded name)
    Save {
        #[arg(trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Replace the current formula with a saved one
    Load {
        #[arg(trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Delete a saved formula and start over with a blank row
    Delete {
        #[arg(trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// List saved formulas
    List,
    /// Print the report
    Show,
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

/// What the caller should print after a command.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Report,
    Message(String),
    Quit,
}

pub struct Session<S> {
    workbench: Workbench,
    book: FormulaBook<S>,
    /// Name last saved or loaded; target of bare `save`/`delete`.
    formula_name: String,
}

fn row_index(row: usize) -> Result<usize> {
    row.checked_sub(1)
        .ok_or_else(|| anyhow!("rows are numbered from 1"))
}

/// Split a line on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(current);
    }
    tokens
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(workbench: Workbench, book: FormulaBook<S>) -> Self {
        Self {
            workbench,
            book,
            formula_name: String::new(),
        }
    }

    pub fn workbench(&self) -> &Workbench {
        &self.workbench
    }

    fn target_name(&self, words: Vec<String>) -> String {
        if words.is_empty() {
            self.formula_name.clone()
        } else {
            words.join(" ")
        }
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<Reply> {
        debug!(?command, "shell command");
        let wb = &mut self.workbench;
        match command {
            ShellCommand::Add => {
                if !wb.add_ingredient() {
                    return Ok(Reply::Message(
                        "Fill in the last ingredient's name and percent first.".into(),
                    ));
                }
            }
            ShellCommand::Name { row, name } => {
                wb.edit(row_index(row)?, IngredientEdit::Name(name.join(" ")))?;
            }
            ShellCommand::Percent { row, percent } => {
                wb.edit(row_index(row)?, IngredientEdit::Percent(percent))?;
            }
            ShellCommand::Phase { row, phase } => {
                wb.edit(row_index(row)?, IngredientEdit::Phase(Some(phase.into())))?;
            }
            ShellCommand::Scents { row, count } => {
                wb.edit_split(row_index(row)?, SplitEdit::Count(count))?;
            }
            ShellCommand::ScentName { row, scent, name } => {
                let slot = scent as usize - 1;
                wb.edit_split(row_index(row)?, SplitEdit::ScentName(slot, name.join(" ")))?;
            }
            ShellCommand::ScentPercent {
                row,
                scent,
                percent,
            } => {
                let slot = scent as usize - 1;
                wb.edit_split(row_index(row)?, SplitEdit::ScentPercent(slot, percent))?;
            }
            ShellCommand::Move { from, to } => {
                wb.move_ingredient(row_index(from)?, row_index(to)?)?;
            }
            ShellCommand::Remove { row } => {
                wb.remove_ingredient(row_index(row)?)?;
            }
            ShellCommand::Batch { oz } => wb.set_batch_oz(parse_decimal(&oz)),
            ShellCommand::Before { grams } => wb.set_water_before(parse_decimal(&grams)),
            ShellCommand::After { grams } => wb.set_water_after(parse_decimal(&grams)),
            ShellCommand::Save { name } => {
                let name = self.target_name(name);
                if !self.book.save(&name, &self.workbench)? {
                    return Ok(Reply::Message("Give the formula a name to save it.".into()));
                }
                self.formula_name = name;
                return Ok(Reply::Message(format!("Saved '{}'.", self.formula_name)));
            }
            ShellCommand::Load { name } => {
                let name = name.join(" ");
                if !self.book.load(&name, &mut self.workbench) {
                    return Ok(Reply::Message(format!("No saved formula named '{name}'.")));
                }
                self.formula_name = name;
            }
            ShellCommand::Delete { name } => {
                let name = self.target_name(name);
                if name.trim().is_empty() {
                    return Ok(Reply::Message("Which formula? Load or name one first.".into()));
                }
                let removed = self.book.delete(&name, &mut self.workbench)?;
                self.formula_name.clear();
                if !removed {
                    return Ok(Reply::Message(format!(
                        "No saved formula named '{name}'; workbench cleared."
                    )));
                }
            }
            ShellCommand::List => {
                if self.book.is_empty() {
                    return Ok(Reply::Message("No saved formulas.".into()));
                }
                return Ok(Reply::Message(self.book.names().collect::<Vec<_>>().join("\n")));
            }
            ShellCommand::Show => {}
            ShellCommand::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::Report)
    }

    /// Parse and run one input line. Blank lines do nothing.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<Reply>> {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return Ok(None);
        }
        let parsed = ShellLine::try_parse_from(tokens).map_err(|e| anyhow!(e.render().to_string()))?;
        self.execute(parsed.command).map(Some)
    }

    /// Read commands from `input` until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        writeln!(out, "{}", render::report(&self.workbench))?;
        writeln!(out, "Type `help` for commands.")?;
        write!(out, "formula> ")?;
        out.flush()?;

        for line in input.lines() {
            let line = line.context("failed to read input")?;
            match self.execute_line(&line) {
                Ok(None) => {}
                Ok(Some(Reply::Quit)) => break,
                Ok(Some(Reply::Report)) => writeln!(out, "{}", render::report(&self.workbench))?,
                Ok(Some(Reply::Message(msg))) => writeln!(out, "{msg}")?,
                Err(e) => writeln!(out, "{e}")?,
            }
            write!(out, "formula> ")?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Run an interactive session on stdin/stdout.
pub fn run_stdio<S: KeyValueStore>(session: &mut Session<S>) -> Result<()> {
    let stdin = io::stdin();
    session.run(stdin.lock(), io::stdout())
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use formula_core::{MemoryStore, Phase};
    use pretty_assertions::assert_eq;

    fn session() -> Session<MemoryStore> {
        Session::new(
            Workbench::new(),
            FormulaBook::open(MemoryStore::new()).unwrap(),
        )
    }

    fn run(s: &mut Session<MemoryStore>, lines: &[&str]) {
        for line in lines {
            s.execute_line(line).unwrap();
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize(r#"name 1 "Shea  Butter"  x"#),
            vec!["name", "1", "Shea  Butter", "x"]
        );
        assert_eq!(tokenize(r#"name 1 """#), vec!["name", "1", ""]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_build_formula_by_commands() {
        let mut s = session();
        run(
            &mut s,
            &[
                "name 1 Distilled Water",
                "percent 1 75",
                "add",
                "name 2 Shea Butter",
                "percent 2 25",
                "phase 2 b",
                "batch 100",
            ],
        );
        let wb = s.workbench();
        assert_eq!(wb.ingredients()[0].name, "Distilled Water");
        assert_eq!(wb.ingredients()[1].phase, Some(Phase::B));
        assert!(wb.is_percent_balanced());
    }

    #[test]
    fn test_add_refused_message() {
        let mut s = session();
        let reply = s.execute_line("add").unwrap();
        assert!(matches!(reply, Some(Reply::Message(_))));
        assert_eq!(s.workbench().ingredients().len(), 1);
    }

    #[test]
    fn test_fragrance_commands() {
        let mut s = session();
        run(
            &mut s,
            &[
                "name 1 Fragrance Oil",
                "percent 1 100",
                "scents 1 2",
                "scent-name 1 1 Lavender",
                "scent-percent 1 1 50",
                "scent-name 1 2 Vanilla",
                "scent-percent 1 2 50",
            ],
        );
        let rows = s.workbench().rows();
        let split = rows[0].split.as_ref().unwrap();
        assert_eq!(split.scents[1].name, "Vanilla");
        assert!(split.is_balanced());

        assert!(s.execute_line("scents 1 4").is_err());
    }

    #[test]
    fn test_bad_rows_are_errors() {
        let mut s = session();
        assert!(s.execute_line("remove 1").is_err());
        assert!(s.execute_line("percent 0 5").is_err());
        assert!(s.execute_line("move 1 2").is_err());
        assert!(s.execute_line("frobnicate").is_err());
    }

    #[test]
    fn test_save_load_delete_cycle() {
        let mut s = session();
        run(&mut s, &["name 1 Glycerin", "percent 1 100"]);

        let reply = s.execute_line("save Test Formula").unwrap();
        assert_eq!(reply, Some(Reply::Message("Saved 'Test Formula'.".into())));
        let saved = s.workbench().snapshot();

        run(&mut s, &["percent 1 50", "load Test Formula"]);
        assert_eq!(s.workbench().snapshot(), saved);

        run(&mut s, &["delete"]);
        assert_eq!(s.workbench().ingredients().len(), 1);
        assert!(s.workbench().ingredients()[0].name.is_empty());

        let reply = s.execute_line("list").unwrap();
        assert_eq!(reply, Some(Reply::Message("No saved formulas.".into())));
    }

    #[test]
    fn test_unnamed_save_is_refused() {
        let mut s = session();
        let reply = s.execute_line("save").unwrap();
        assert_eq!(
            reply,
            Some(Reply::Message("Give the formula a name to save it.".into()))
        );
    }

    #[test]
    fn test_run_transcript() {
        let mut s = session();
        let input = "before 100\nafter 94\nquit\nname 1 ignored\n";
        let mut out = Vec::new();
        s.run(input.as_bytes(), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("➕ Add back: 6.00 g"));
        assert!(s.workbench().ingredients()[0].name.is_empty());
    }
}
