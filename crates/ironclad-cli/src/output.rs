//! Rendering of query results for the terminal

use clap::ValueEnum;
use ironclad_core::Asset;

/// Output format for asset lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One summary line per asset
    #[default]
    Table,
    /// Pretty-printed JSON array
    Json,
}

/// Render assets in the requested format
///
/// A table of no assets renders as an empty string; JSON renders `[]`.
///
/// # Errors
/// Returns error if JSON serialization fails
pub fn render_assets(assets: &[Asset], format: Format) -> eyre::Result<String> {
    match format {
        Format::Table => Ok(assets
            .iter()
            .map(Asset::summary)
            .collect::<Vec<_>>()
            .join("\n")),
        Format::Json => Ok(serde_json::to_string_pretty(assets)?),
    }
}

/// Print rendered assets to stdout, skipping empty tables
pub fn print_assets(assets: &[Asset], format: Format) -> eyre::Result<()> {
    let rendered = render_assets(assets, format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}
