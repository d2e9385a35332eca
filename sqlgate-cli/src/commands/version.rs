//! `sqlgate version` command - Display version information.

use sqlgate::Engine;

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::section("sqlgate");
    kv("Version", VERSION);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";
    kv("Build", build_mode);

    let engines: Vec<&str> = Engine::ALL.iter().map(|e| e.label()).collect();
    kv("Engines", &engines.join(", "));

    output::dim("https://github.com/pegasusheavy/sqlgate");
    println!("{}", VERSION);
    Ok(())
}
