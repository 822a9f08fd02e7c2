//! Terminal output for the CLI.

mod status_display;
mod tables;

pub use status_display::{print_hardware, print_report, print_status_table, status_label};
pub use tables::{print_separator, truncate_string, yes_no};
