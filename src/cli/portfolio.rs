use super::ui;
use crate::core::insights::{Insights, PortfolioReport};
use crate::core::ledger::RequestContext;
use crate::core::model::Currency;
use crate::core::positions::PositionAggregator;
use anyhow::Result;
use comfy_table::Cell;

impl PortfolioReport {
    pub fn display_as_table(&self, currency: Currency) -> String {
        let valuation = &self.valuation;
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Instrument"),
            ui::header_cell("Exchange"),
            ui::header_cell("Quantity"),
            ui::header_cell("Cost Basis"),
            ui::header_cell("Price"),
            ui::header_cell(&format!("Value ({currency})")),
            ui::header_cell("Gain"),
        ]);

        for position in &valuation.positions {
            table.add_row(vec![
                Cell::new(&position.identifier),
                Cell::new(position.exchange.as_deref().unwrap_or("-")),
                ui::format_optional_cell(Some(position.net_quantity), |q| q.normalize().to_string()),
                ui::money_cell(position.total_cost_basis),
                ui::money_cell(position.current_price),
                ui::money_cell(position.market_value),
                ui::signed_cell(position.unrealized_gain),
            ]);
        }
        for missing in &valuation.unavailable {
            table.add_row(vec![
                Cell::new(&missing.identifier),
                Cell::new(missing.exchange.as_deref().unwrap_or("-")),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
            ]);
        }

        let mut output = format!(
            "Portfolio: {}\n\n",
            ui::style_text(&self.owner, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let kpis = &valuation.kpis;
        output.push_str("\n\n");
        output.push_str(
            &ui::kpi_table(&[
                ("Absolute capital gains", kpis.absolute_capital_gains),
                ("Unrealised profit", kpis.unrealised_profit),
                ("Unrealised loss", kpis.unrealised_loss),
                (
                    "Free capital (profitable)",
                    kpis.free_capital_on_profitable_positions,
                ),
                ("Bound capital (losing)", kpis.bound_capital_on_losing_positions),
                ("Upcoming dividends", kpis.upcoming_dividends),
            ])
            .to_string(),
        );

        let label = if valuation.is_partial() {
            format!("Total Value ({currency}, partial)")
        } else {
            format!("Total Value ({currency})")
        };
        let total_style = if valuation.is_partial() {
            ui::StyleType::Error
        } else {
            ui::StyleType::TotalValue
        };
        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text(&label, ui::StyleType::TotalLabel),
            ui::style_text(&ui::format_money(kpis.total_position_value), total_style)
        ));
        output.push_str(&ui::render_unavailable(&valuation.unavailable));
        output.push_str(&ui::render_skipped(&self.skipped));
        output
    }
}

pub async fn run(
    insights: &Insights,
    ctx: &RequestContext,
    positions: &PositionAggregator,
    currency: Currency,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching quotes...");
    let report = insights.portfolio(ctx, positions).await;
    pb.finish_and_clear();

    println!("{}", report?.display_as_table(currency));
    Ok(())
}
