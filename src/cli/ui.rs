use crate::core::SkippedRecord;
use crate::core::quotes::UnavailableQuote;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Right-aligned amount.
pub fn money_cell(value: Decimal) -> Cell {
    Cell::new(format_money(value)).set_alignment(CellAlignment::Right)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Green for gains, red for losses.
pub fn signed_cell(value: Decimal) -> Cell {
    let color = if value.is_sign_negative() && !value.is_zero() {
        Color::Red
    } else {
        Color::Green
    };
    Cell::new(format_money(value))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Creates a cell for "N/A" values, with error-specific styling.
pub fn na_cell(has_error: bool) -> Cell {
    let color = if has_error {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new("N/A").fg(color)
}

/// Two-column label/value table for a handful of KPIs.
pub fn kpi_table(rows: &[(&str, Decimal)]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("KPI"), header_cell("Amount")]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), money_cell(*value)]);
    }
    table
}

/// Spinner shown while a report is computed.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Lists records left out of a report. Empty input renders nothing.
pub fn render_skipped(skipped: &[SkippedRecord]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let mut out = format!(
        "\n\n{}\n",
        style_text("Skipped records", StyleType::Error)
    );
    for record in skipped {
        out.push_str(&format!(
            "  {} #{}: {}\n",
            record.kind, record.id, record.reason
        ));
    }
    out
}

/// Lists instruments without a usable quote. Empty input renders nothing.
pub fn render_unavailable(unavailable: &[UnavailableQuote]) -> String {
    if unavailable.is_empty() {
        return String::new();
    }
    let mut out = format!(
        "\n\n{}\n",
        style_text("Quotes unavailable", StyleType::Error)
    );
    for quote in unavailable {
        let name = match &quote.exchange {
            Some(exchange) => format!("{}@{}", quote.identifier, exchange),
            None => quote.identifier.clone(),
        };
        out.push_str(&format!(
            "  {}: {}\n",
            name,
            style_text(&quote.reason, StyleType::Subtle)
        ));
    }
    out
}
