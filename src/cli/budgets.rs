use super::ui;
use crate::core::insights::{BudgetReport, Insights};
use crate::core::ledger::RequestContext;
use crate::core::model::{BudgetKind, Currency};
use anyhow::Result;
use comfy_table::Cell;

impl BudgetReport {
    pub fn display_as_table(&self, currency: Currency) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Budget"),
            ui::header_cell("Type"),
            ui::header_cell(&format!("Budget ({currency})")),
            ui::header_cell("Spent"),
            ui::header_cell("Projected"),
            ui::header_cell("Remaining"),
        ]);

        for usage in &self.budgets {
            let kind = match usage.kind {
                BudgetKind::Include => "include",
                BudgetKind::Exclude => "exclude",
            };
            table.add_row(vec![
                Cell::new(&usage.name),
                Cell::new(kind),
                ui::money_cell(usage.budget),
                ui::money_cell(usage.spent),
                ui::money_cell(usage.projected_spend),
                ui::signed_cell(usage.remaining),
            ]);
        }

        let mut output = format!(
            "Budgets for {} ({} to {})\n\n",
            ui::style_text(&self.owner, ui::StyleType::Title),
            self.window.from,
            self.window.to
        );
        if self.budgets.is_empty() {
            output.push_str(&ui::style_text("No budgets defined", ui::StyleType::Subtle));
        } else {
            output.push_str(&table.to_string());
        }

        let estimated = &self.estimated;
        output.push_str("\n\n");
        output.push_str(
            &ui::kpi_table(&[
                ("Paid expenses", estimated.expenses.paid),
                ("Upcoming expenses", estimated.expenses.upcoming),
                ("Received income", estimated.income.received),
                ("Upcoming income", estimated.income.upcoming),
            ])
            .to_string(),
        );
        output.push_str(&format!(
            "\n\nFree Amount ({}): {}",
            ui::style_text(&currency.to_string(), ui::StyleType::TotalLabel),
            ui::style_text(
                &ui::format_money(estimated.free_amount),
                if estimated.free_amount.is_sign_negative() {
                    ui::StyleType::Error
                } else {
                    ui::StyleType::TotalValue
                }
            )
        ));
        output.push_str(&ui::render_skipped(&self.skipped));
        output
    }
}

pub async fn run(insights: &Insights, ctx: &RequestContext, currency: Currency) -> Result<()> {
    let pb = ui::new_spinner("Estimating budgets...");
    let report = insights.budgets(ctx).await;
    pb.finish_and_clear();

    println!("{}", report?.display_as_table(currency));
    Ok(())
}
