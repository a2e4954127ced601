use super::ui;
use crate::core::insights::{CategoryReport, CategoryTotalsReport, Insights};
use crate::core::ledger::RequestContext;
use crate::core::model::{CategoryId, Currency, DateRange};
use anyhow::Result;
use comfy_table::Cell;

impl CategoryReport {
    pub fn display_as_table(&self, currency: Currency) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Month"),
            ui::header_cell("Category"),
            ui::header_cell("Income"),
            ui::header_cell("Expenses"),
            ui::header_cell(&format!("Balance ({currency})")),
        ]);

        for row in &self.breakdown.rows {
            let income = row.kpis.received_income + row.kpis.upcoming_income;
            let expenses = row.kpis.paid_expenses + row.kpis.upcoming_expenses;
            table.add_row(vec![
                Cell::new(format!("{}-{:02}", row.year, row.month)),
                Cell::new(&row.category_name),
                ui::money_cell(income),
                ui::money_cell(expenses),
                ui::signed_cell(row.kpis.estimated_balance),
            ]);
        }

        let mut output = format!(
            "Categories for {} ({} to {})\n\n",
            ui::style_text(&self.owner, ui::StyleType::Title),
            self.window.from,
            self.window.to
        );
        output.push_str(&table.to_string());
        output.push_str(&render_unknown(&self.breakdown.unknown_categories));
        output.push_str(&ui::render_skipped(&self.skipped));
        output
    }
}

impl CategoryTotalsReport {
    pub fn display_as_table(&self, currency: Currency) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Income"),
            ui::header_cell("Expenses"),
            ui::header_cell(&format!("Balance ({currency})")),
        ]);

        for row in &self.totals.rows {
            table.add_row(vec![
                Cell::new(&row.category_name),
                ui::money_cell(row.kpis.received_income + row.kpis.upcoming_income),
                ui::money_cell(row.kpis.paid_expenses + row.kpis.upcoming_expenses),
                ui::signed_cell(row.kpis.estimated_balance),
            ]);
        }

        let mut output = format!(
            "Category totals for {} ({} to {})\n\n",
            ui::style_text(&self.owner, ui::StyleType::Title),
            self.window.from,
            self.window.to
        );
        output.push_str(&table.to_string());
        output.push_str(&render_unknown(&self.totals.unknown_categories));
        output.push_str(&ui::render_skipped(&self.skipped));
        output
    }
}

fn render_unknown(unknown: &[CategoryId]) -> String {
    if unknown.is_empty() {
        return String::new();
    }
    let ids: Vec<String> = unknown.iter().map(|id| format!("#{id}")).collect();
    format!(
        "\n\n{} {}",
        ui::style_text("Unknown categories:", ui::StyleType::Error),
        ids.join(", ")
    )
}

/// Month-by-month rows, or one row per category over the whole range with `totals`.
pub async fn run(
    insights: &Insights,
    ctx: &RequestContext,
    months: u32,
    totals: bool,
    currency: Currency,
) -> Result<()> {
    let window = DateRange::trailing_months(insights.current_month().from, months);

    let pb = ui::new_spinner("Grouping transactions by category...");
    let output = if totals {
        insights
            .category_totals(ctx, window)
            .await
            .map(|report| report.display_as_table(currency))
    } else {
        insights
            .categories(ctx, window)
            .await
            .map(|report| report.display_as_table(currency))
    };
    pb.finish_and_clear();

    println!("{}", output?);
    Ok(())
}
