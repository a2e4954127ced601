use super::ui;
use crate::core::metal::{MetalDesk, MetalQuotes, metal_options};
use anyhow::Result;
use comfy_table::Cell;

impl MetalQuotes {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Metal"),
            ui::header_cell("Code"),
            ui::header_cell("Unit"),
            ui::header_cell("EUR"),
            ui::header_cell("USD"),
            ui::header_cell("As of"),
        ]);

        for metal in metal_options() {
            match self.quotes.iter().find(|q| q.metal.code == metal.code) {
                Some(quote) => table.add_row(vec![
                    Cell::new(metal.name),
                    Cell::new(metal.code),
                    Cell::new(metal.unit),
                    ui::format_optional_cell(quote.eur, ui::format_money),
                    ui::format_optional_cell(quote.usd, ui::format_money),
                    Cell::new(quote.fetched_at.format("%Y-%m-%d %H:%M UTC")),
                ]),
                None => table.add_row(vec![
                    Cell::new(metal.name),
                    Cell::new(metal.code),
                    Cell::new(metal.unit),
                    ui::na_cell(true),
                    ui::na_cell(true),
                    ui::na_cell(false),
                ]),
            };
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Precious Metals", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&ui::render_unavailable(&self.unavailable));
        output
    }
}

pub async fn run(desk: &MetalDesk, code: Option<&str>) -> Result<()> {
    let pb = ui::new_spinner("Fetching metal prices...");
    let quotes = match code {
        Some(code) => {
            let quote = desk.metal_quote(code).await;
            pb.finish_and_clear();
            MetalQuotes {
                quotes: vec![quote?],
                unavailable: vec![],
            }
        }
        None => {
            let quotes = desk.metal_quotes().await;
            pb.finish_and_clear();
            quotes
        }
    };

    println!("{}", quotes.display_as_table());
    Ok(())
}
