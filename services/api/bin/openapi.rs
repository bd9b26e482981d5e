//! Dumps the broker's OpenAPI document.
//!
//! Usage: `openapi [PATH]`. Writes to `openapi.json` by default; `-` prints the
//! document to stdout instead.

use anyhow::Context;
use habla_api::router::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> anyhow::Result<()> {
    let target = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize the OpenAPI document")?;

    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{document}").context("Failed to write to stdout")?;
    } else {
        std::fs::write(&target, document).with_context(|| format!("Failed to write {target}"))?;
        eprintln!("OpenAPI document written to {target}");
    }
    Ok(())
}
