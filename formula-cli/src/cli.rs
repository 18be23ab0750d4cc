use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use formula_core::{IngredientEdit, MAX_SCENTS, Phase, SplitEdit, Workbench, parse_decimal};

/// Phase CLI enum mirrors formula-core (derive for Clap).
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PhaseFlag {
    A,
    B,
    C,
}

impl From<PhaseFlag> for Phase {
    fn from(p: PhaseFlag) -> Self {
        match p {
            PhaseFlag::A => Phase::A,
            PhaseFlag::B => Phase::B,
            PhaseFlag::C => Phase::C,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "formula-cli",
    about = "Recalculate cosmetic formulas: ingredient weights, phase totals, fragrance splits and water add-back.",
    version
)]
pub struct Args {
    /// Directory holding saved formulas (overrides FORMULA_STORE_DIR)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Accept percent totals this close to 100 (0 = exact match)
    #[arg(long, global = true)]
    pub percent_tolerance: Option<f64>,

    /// Log filter such as `debug` or `formula_core=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Calculate a formula given on the command line
    Calc(FormulaInput),
    /// Calculate and save a formula under NAME (overwrites)
    Save {
        name: String,
        #[command(flatten)]
        input: FormulaInput,
    },
    /// Load a saved formula and print its report
    Show {
        name: String,
        #[command(flatten)]
        scalars: Scalars,
        /// Print the stored formula as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// List saved formula names
    List,
    /// Delete a saved formula
    Delete { name: String },
    /// Interactive session editing one formula at a time
    Shell,
}

/// Inputs that are not part of a saved formula.
#[derive(ClapArgs, Debug, Default, Clone, PartialEq)]
pub struct Scalars {
    /// Batch size in oz (defaults to FORMULA_BATCH_OZ or 100)
    #[arg(long, value_parser = lenient_number)]
    pub batch: Option<f64>,

    /// Water-phase weight before heating, in grams
    #[arg(long, value_parser = lenient_number, default_value = "0")]
    pub before: f64,

    /// Water-phase weight after heating, in grams
    #[arg(long, value_parser = lenient_number, default_value = "0")]
    pub after: f64,
}

impl Scalars {
    pub fn apply(&self, wb: &mut Workbench) {
        if let Some(batch) = self.batch {
            wb.set_batch_oz(batch);
        }
        wb.set_water_before(self.before);
        wb.set_water_after(self.after);
    }
}

#[derive(ClapArgs, Debug, Default, Clone, PartialEq)]
pub struct FormulaInput {
    /// Ingredient as NAME:PERCENT[:PHASE], in order (phase defaults to A)
    #[arg(short = 'i', long = "ingredient", value_parser = parse_ingredient)]
    pub ingredients: Vec<IngredientSpec>,

    /// Fragrance split as ROW:NAME=PCT,NAME=PCT[,NAME=PCT] (ROW is 1-based)
    #[arg(long = "split", value_parser = parse_split)]
    pub splits: Vec<SplitSpec>,

    #[command(flatten)]
    pub scalars: Scalars,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IngredientSpec {
    pub name: String,
    pub percent: String,
    pub phase: Phase,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SplitSpec {
    /// Zero-based ingredient index.
    pub index: usize,
    pub scents: Vec<(String, String)>,
}

/// Numbers degrade to zero instead of failing, like the form fields.
fn lenient_number(s: &str) -> Result<f64, String> {
    Ok(parse_decimal(s))
}

pub fn parse_ingredient(s: &str) -> Result<IngredientSpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let (name, percent, phase) = match parts.as_slice() {
        [name, percent] => (*name, *percent, Phase::A),
        [name, percent, phase] => (
            *name,
            *percent,
            phase.parse::<Phase>().map_err(|e| e.to_string())?,
        ),
        _ => return Err(format!("expected NAME:PERCENT[:PHASE], got '{s}'")),
    };
    Ok(IngredientSpec {
        name: name.trim().to_string(),
        percent: percent.trim().to_string(),
        phase,
    })
}

pub fn parse_split(s: &str) -> Result<SplitSpec, String> {
    let (row, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:NAME=PCT,..., got '{s}'"))?;
    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row '{row}'"))?;
    let index = row
        .checked_sub(1)
        .ok_or_else(|| "rows are numbered from 1".to_string())?;

    let scents = rest
        .split(',')
        .map(|pair| {
            pair.split_once('=')
                .map(|(n, p)| (n.trim().to_string(), p.trim().to_string()))
                .ok_or_else(|| format!("expected NAME=PCT, got '{pair}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if scents.len() > MAX_SCENTS {
        return Err(format!("at most {MAX_SCENTS} scents per fragrance"));
    }
    Ok(SplitSpec { index, scents })
}

impl FormulaInput {
    /// Replay the inputs through the same edits the interactive session uses.
    pub fn build(&self, default_batch_oz: f64) -> Result<Workbench> {
        let mut wb = Workbench::new();
        wb.set_batch_oz(default_batch_oz);
        self.scalars.apply(&mut wb);

        for (index, entry) in self.ingredients.iter().enumerate() {
            if index > 0 && !wb.add_ingredient() {
                bail!("ingredient {index} needs a name and percent before another can follow");
            }
            wb.edit(index, IngredientEdit::Name(entry.name.clone()))?;
            wb.edit(index, IngredientEdit::Percent(entry.percent.clone()))?;
            wb.edit(index, IngredientEdit::Phase(Some(entry.phase)))?;
        }

        for split in &self.splits {
            let row = split.index + 1;
            wb.edit_split(split.index, SplitEdit::Count(split.scents.len() as u8))
                .with_context(|| format!("split for row {row}"))?;
            for (slot, (name, percent)) in split.scents.iter().enumerate() {
                wb.edit_split(split.index, SplitEdit::ScentName(slot, name.clone()))?;
                wb.edit_split(split.index, SplitEdit::ScentPercent(slot, percent.clone()))?;
            }
        }
        Ok(wb)
    }
}

/* ===========================
Unit tests
=========================== */
