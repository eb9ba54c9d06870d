//! Print the OpenAPI document as JSON.

use color_eyre::eyre::Result;
use utoipa::OpenApi;
use voicepost_backend::doc::ApiDoc;

fn main() -> Result<()> {
    color_eyre::install()?;
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
