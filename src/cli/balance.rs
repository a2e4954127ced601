use super::ui;
use crate::core::insights::{BalanceReport, Insights};
use crate::core::ledger::RequestContext;
use crate::core::model::{Currency, DateRange};
use anyhow::Result;
use comfy_table::Cell;

impl BalanceReport {
    pub fn display_as_table(&self, currency: Currency) -> String {
        let mut output = format!(
            "Balance for {} ({} to {})\n\n",
            ui::style_text(&self.owner, ui::StyleType::Title),
            self.window.from,
            self.window.to
        );

        output.push_str(
            &ui::kpi_table(&[
                ("Received income", self.kpis.received_income),
                ("Upcoming income", self.kpis.upcoming_income),
                ("Paid expenses", self.kpis.paid_expenses),
                ("Upcoming expenses", self.kpis.upcoming_expenses),
            ])
            .to_string(),
        );

        if self.months.len() > 1 {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Month"),
                ui::header_cell("Income"),
                ui::header_cell("Expenses"),
                ui::header_cell(&format!("Balance ({currency})")),
                ui::header_cell("Estimated"),
            ]);
            for month in &self.months {
                let income = month.kpis.received_income + month.kpis.upcoming_income;
                let expenses = month.kpis.paid_expenses + month.kpis.upcoming_expenses;
                table.add_row(vec![
                    Cell::new(format!("{}-{:02}", month.year, month.month)),
                    ui::money_cell(income),
                    ui::money_cell(expenses),
                    ui::signed_cell(month.kpis.current_balance),
                    ui::signed_cell(month.kpis.estimated_balance),
                ]);
            }
            output.push_str("\n\n");
            output.push_str(&table.to_string());
        }

        output.push_str(&format!(
            "\n\nCurrent Balance ({}): {}",
            ui::style_text(&currency.to_string(), ui::StyleType::TotalLabel),
            ui::style_text(
                &ui::format_money(self.kpis.current_balance),
                ui::StyleType::TotalValue
            )
        ));
        output.push_str(&format!(
            "\nEstimated Balance ({}): {}",
            ui::style_text(&currency.to_string(), ui::StyleType::TotalLabel),
            ui::style_text(
                &ui::format_money(self.kpis.estimated_balance),
                ui::StyleType::TotalValue
            )
        ));
        output.push_str(&ui::render_skipped(&self.skipped));
        output
    }
}

pub async fn run(
    insights: &Insights,
    ctx: &RequestContext,
    months: u32,
    currency: Currency,
) -> Result<()> {
    let today = insights.current_month().from;
    let window = DateRange::trailing_months(today, months);

    let pb = ui::new_spinner("Computing balance...");
    let report = insights.balance(ctx, window).await;
    pb.finish_and_clear();

    println!("{}", report?.display_as_table(currency));
    Ok(())
}
