pub mod balance;
pub mod budgets;
pub mod categories;
pub mod metals;
pub mod portfolio;
pub mod setup;
pub mod ui;
