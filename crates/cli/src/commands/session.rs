use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use symstate_core::config::{find_map_file, SessionConfig, SessionLayout};
use symstate_core::signatures::SignatureDb;

use crate::commands::{load_session_symbols, open_session, print_dir_status};
use crate::{canonicalize_or_current, infer_session_name};

#[derive(Serialize)]
pub struct SessionInfoSnapshot {
    pub name: String,
    pub game_id: String,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub wii: bool,
    pub lenient_maps: bool,
    pub signature_db: String,
    pub signatures: usize,
    pub map_file: Option<String>,
    pub symbols: usize,
    pub notes: usize,
    pub layout: SessionInfoLayout,
}

#[derive(Serialize)]
pub struct SessionInfoLayout {
    pub meta_dir: String,
    pub maps_dir: String,
    pub states_dir: String,
}

/// Initialize a new session at `root`.
pub fn init_session_command(root: &str, name: Option<String>, game_id: &str, wii: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = SessionLayout::new(&root_path);

    let session_name = name.unwrap_or_else(|| infer_session_name(&root_path));

    for dir in [&layout.meta_dir, &layout.maps_dir, &layout.states_dir] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut config = SessionConfig::new(&session_name, game_id, layout.signature_db_relative_string());
    config.wii = wii;

    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&layout.config_path, json)
        .with_context(|| format!("Failed to write session config: {}", layout.config_path.display()))?;

    // Create the signature database up front so later commands can rely on it.
    SignatureDb::open(&layout.signature_db_path).with_context(|| {
        format!("Failed to initialize signature database at {}", layout.signature_db_path.display())
    })?;

    println!("Initialized session:");
    println!("  Name: {}", session_name);
    println!("  Game: {}", game_id);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.config_path.display());
    println!("  Signatures: {}", layout.signature_db_path.display());

    Ok(())
}

/// Show the session config, its directories and what is currently loaded.
pub fn session_info_command(root: &str, json: bool) -> Result<()> {
    let ctx = open_session(root)?;
    let (db_path, db) = ctx.open_signature_db()?;
    let signatures = db.len().context("Failed to count signatures")?;
    let (_memory, symbols) = load_session_symbols(&ctx)?;
    let map_file = find_map_file(&ctx.layout, &ctx.config.game_id).existing;

    if json {
        let snapshot = SessionInfoSnapshot {
            name: ctx.config.name.clone(),
            game_id: ctx.config.game_id.clone(),
            root: ctx.layout.root.display().to_string(),
            config_file: ctx.layout.config_path.display().to_string(),
            config_version: ctx.config.config_version.clone(),
            wii: ctx.config.wii,
            lenient_maps: ctx.config.lenient_maps,
            signature_db: db_path.display().to_string(),
            signatures,
            map_file: map_file.map(|path| path.display().to_string()),
            symbols: symbols.len(),
            notes: symbols.notes().len(),
            layout: SessionInfoLayout {
                meta_dir: ctx.layout.meta_dir.display().to_string(),
                maps_dir: ctx.layout.maps_dir.display().to_string(),
                states_dir: ctx.layout.states_dir.display().to_string(),
            },
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("symstate v{}", symstate_core::version());
    println!("Session info:");
    println!("  Name: {}", ctx.config.name);
    println!("  Game: {}", ctx.config.game_id);
    println!("  Console: {}", if ctx.config.wii { "Wii" } else { "GameCube" });
    println!("  Root: {}", ctx.layout.root.display());
    println!("  Config version: {}", ctx.config.config_version);
    println!("  Signatures: {} ({})", signatures, db_path.display());
    match map_file {
        Some(path) => println!("  Map: {} ({} symbols, {} notes)", path.display(), symbols.len(), symbols.notes().len()),
        None => println!("  Map: (none)"),
    }
    println!("Layout:");
    print_dir_status("Meta", &ctx.layout.meta_dir);
    print_dir_status("Maps", &ctx.layout.maps_dir);
    print_dir_status("States", &ctx.layout.states_dir);

    Ok(())
}
