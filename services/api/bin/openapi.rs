//! Writes the OpenAPI document for the havruta API.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use havruta_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&output, spec_json)?;
    println!("Wrote {}", output.display());
    Ok(())
}
