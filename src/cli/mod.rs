pub mod commands;
pub mod ui;

pub use commands::convert::ConvertOptions;
pub use ui::output::Output;
