//! Command implementations for ext-cli

pub mod lifecycle;
pub mod list;
pub mod start;

pub use lifecycle::{run_disable, run_enable, run_install, run_uninstall, run_update};
pub use list::{run_info, run_list, run_order};
pub use start::run_start;
