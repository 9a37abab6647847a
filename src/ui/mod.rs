pub mod icons;
pub mod progress;

pub use progress::{StageSpinner, format_relay_event, print_fix_outcome, print_relay_start};
