//! List command implementation.

use typeforge_core::{CatalogStore, ForgeConfig};

use crate::colors;

/// Execute the list command.
pub fn execute(config: &ForgeConfig) -> anyhow::Result<()> {
    if !config.catalog_dir.exists() {
        anyhow::bail!("Catalog not found: {}", config.catalog_dir.display());
    }

    let store = CatalogStore::open(&config.catalog_dir)?;
    let definitions = store.load()?;

    if definitions.is_empty() {
        println!("No types published in {}", store.root().display());
        return Ok(());
    }

    for def in &definitions {
        println!(
            "{}{}{} {}({}.rs){}",
            colors::BOLD,
            def.name,
            colors::RESET,
            colors::DIM,
            def.module_name,
            colors::RESET
        );
        for field in &def.fields {
            println!(
                "  {}{}{}: {}  {}\"{}\"{}",
                colors::CYAN,
                field.ident,
                colors::RESET,
                field.declared_type,
                colors::DIM,
                field.tag,
                colors::RESET
            );
        }
    }

    Ok(())
}
