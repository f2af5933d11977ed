//! Support library for the `dsuld` and `dsulc` binaries
//!
//! Argument parsing, logging setup and the information report live here so
//! the binaries stay thin and the pieces can be tested.

pub mod cli;
pub mod logging;
pub mod report;

/// Build identifier injected by `build.rs`
pub const BUILD_ID: &str = match option_env!("DSUL_BUILD_ID") {
    Some(id) => id,
    None => "unknown",
};

/// Text printed for `--version`
pub fn version_line(program: &str) -> String {
    format!("{} v{} ({})", program, dsul_core::VERSION, BUILD_ID)
}
