//! CLI command implementations.
//!
//! | Module    | Command   |
//! |-----------|-----------|
//! | `fix`     | `Fix`     |
//! | `trigger` | `Trigger` |
//! | `logs`    | `Logs`    |
//! | `serve`   | `Serve`   |

pub mod fix;
pub mod logs;
pub mod serve;
pub mod trigger;

pub use fix::cmd_fix;
pub use logs::cmd_logs;
pub use serve::cmd_serve;
pub use trigger::cmd_trigger;
