use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use symstate_core::config::find_map_file;
use symstate_core::signatures::ApplyReport;

use crate::commands::{load_session_symbols, open_session};

#[derive(Serialize)]
pub struct PopulateSummary {
    pub added: usize,
    pub total: usize,
    pub signature_db: String,
}

#[derive(Serialize)]
pub struct ApplySummary {
    #[serde(flatten)]
    pub report: ApplyReport,
    pub saved_to: Option<String>,
}

/// Record the checksums of the session's named functions in the signature database.
pub fn populate_signatures_command(root: &str, filter: Option<&str>, json: bool) -> Result<()> {
    let ctx = open_session(root)?;
    let (_memory, symbols) = load_session_symbols(&ctx)?;
    if symbols.is_empty() {
        return Err(anyhow!("No map loaded for {}", ctx.config.game_id));
    }

    let (db_path, db) = ctx.open_signature_db()?;
    let added = db.populate(&symbols, filter).context("Failed to populate signatures")?;
    let total = db.len().context("Failed to count signatures")?;

    let summary = PopulateSummary { added, total, signature_db: db_path.display().to_string() };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Added {} signatures ({} total) to {}", summary.added, summary.total, summary.signature_db);
    }
    Ok(())
}

/// Rename the session's functions whose checksums are known, then save the map.
pub fn apply_signatures_command(root: &str, dry_run: bool, json: bool) -> Result<()> {
    let ctx = open_session(root)?;
    let (_memory, symbols) = load_session_symbols(&ctx)?;
    if symbols.is_empty() {
        return Err(anyhow!("No map loaded for {}", ctx.config.game_id));
    }

    let (_db_path, db) = ctx.open_signature_db()?;
    let report = db.apply(&symbols).context("Failed to apply signatures")?;

    let saved_to = if dry_run || report.renamed == 0 {
        None
    } else {
        let target = find_map_file(&ctx.layout, &ctx.config.game_id).writable;
        symbols.save_symbol_map(&target).context("Failed to save session map")?;
        Some(target.display().to_string())
    };

    let summary = ApplySummary { report, saved_to };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Renamed {} functions", summary.report.renamed);
        if summary.report.size_mismatches > 0 {
            println!("Skipped {} checksum matches with a different size", summary.report.size_mismatches);
        }
        if let Some(path) = &summary.saved_to {
            println!("Saved map to {path}");
        }
    }
    Ok(())
}
