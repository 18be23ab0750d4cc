use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use formula_core::{IngredientRow, SplitAllocation, Workbench};

pub const PERCENT_WARNING: &str = "⚠️ Total percentage must equal 100%";
pub const SPLIT_WARNING: &str = "Total must equal 100%";

pub fn fmt_oz(x: f64) -> String {
    format!("{x:.2} oz")
}

pub fn fmt_g(x: f64) -> String {
    format!("{x:.2} g")
}

fn header(table: &mut Table, titles: &[&str]) {
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            titles
                .iter()
                .map(|t| Cell::new(t).add_attribute(Attribute::Bold)),
        );
}

/// One line per scent, plus the warning when the scents don't add up.
fn split_lines(split: &SplitAllocation, amount: impl Fn(&SplitAllocation, usize) -> String) -> String {
    let mut lines: Vec<String> = (0..split.scents.len())
        .map(|i| format!("{}: {}", split.scents[i].name, amount(split, i)))
        .collect();
    if !split.is_balanced() {
        lines.push(SPLIT_WARNING.to_string());
    }
    lines.join("\n")
}

fn ingredient_cells(wb: &Workbench, row: &IngredientRow<'_>) -> Vec<Cell> {
    let ing = row.ingredient;

    let mut name = format!("{}. {}", row.index + 1, ing.name);
    if let Some(split) = wb.split(row.index).filter(|_| ing.is_fragrance()) {
        name.push_str(&format!("\n  scents: {}", split.count()));
    }

    // Grams shown on a row always match the ounces shown beside them.
    let (oz, grams) = match &row.split {
        Some(split) => (
            split_lines(split, |s, i| fmt_oz(s.scents[i].weight.displayed().oz)),
            split_lines(split, |s, i| fmt_g(s.scents[i].weight.displayed().grams)),
        ),
        None => {
            let shown = row.weight.displayed();
            (fmt_oz(shown.oz), fmt_g(shown.grams))
        }
    };
    let balanced = row.split.as_ref().is_none_or(SplitAllocation::is_balanced);
    let color = if balanced { Color::Reset } else { Color::Red };

    vec![
        Cell::new(name),
        Cell::new(&ing.percent),
        Cell::new(ing.phase.map(|p| p.label()).unwrap_or("-")),
        Cell::new(oz).fg(color),
        Cell::new(grams).fg(color),
    ]
}

pub fn ingredients_table(wb: &Workbench) -> Table {
    let mut table = Table::new();
    header(&mut table, &["Ingredient", "%", "Phase", "Amount (oz)", "Amount (g)"]);
    for row in wb.rows() {
        table.add_row(ingredient_cells(wb, &row));
    }
    table
}

pub fn phase_totals_table(wb: &Workbench) -> Table {
    let totals = wb.phase_totals();
    let mut table = Table::new();
    header(&mut table, &["Phase", "Amount (g)", "Amount (oz)"]);
    for (phase, weight) in totals.iter() {
        table.add_row(vec![
            Cell::new(phase.label()),
            Cell::new(fmt_g(weight.grams)),
            Cell::new(fmt_oz(weight.oz)),
        ]);
    }
    let total = totals.total();
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(fmt_g(total.grams)).add_attribute(Attribute::Bold),
        Cell::new(fmt_oz(total.oz)).add_attribute(Attribute::Bold),
    ]);
    table
}

/// `Total: 100.00%`, followed by the warning when the check fails.
pub fn percent_line(wb: &Workbench) -> String {
    let mut line = format!("Total: {:.2}%", wb.total_percent());
    if !wb.is_percent_balanced() {
        line.push_str("  ");
        line.push_str(PERCENT_WARNING);
    }
    line
}

pub fn water_line(wb: &Workbench) -> Option<String> {
    wb.water()
        .add_back()
        .map(|grams| format!("➕ Add back: {grams:.2} g"))
}

/// Full report for the current state.
pub fn report(wb: &Workbench) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n=== Ingredients ({} oz batch) ===\n", wb.batch_oz()));
    out.push_str(&ingredients_table(wb).to_string());
    out.push('\n');
    out.push_str(&percent_line(wb));
    out.push_str("\n\n=== Phase totals ===\n");
    out.push_str(&phase_totals_table(wb).to_string());
    out.push('\n');
    if let Some(line) = water_line(wb) {
        out.push_str("\n=== Water phase ===\n");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/* ===========================
Unit tests
=========================== */
