use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use symstate_core::config::SessionContext;
use symstate_core::hw::Hardware;
use symstate_core::state::{decode_state, save_state};

use crate::commands::open_session;
use crate::{sha256_bytes, sha256_file};

#[derive(Serialize)]
pub struct StateFileInfo {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
    pub valid: bool,
    pub error: Option<String>,
}

/// Machine matching the session's console family and sizes, with the
/// memory image (if any) copied into main RAM.
pub fn session_hardware(ctx: &SessionContext) -> Result<Hardware> {
    let mut hardware = Hardware::new(ctx.config.hardware_config());
    let image = ctx.load_memory()?;
    if !image.is_empty() {
        let bytes = image.as_bytes();
        let len = bytes.len().min(hardware.memory.ram.len());
        if len < bytes.len() {
            tracing::warn!(image = bytes.len(), ram = len, "memory image larger than RAM, truncating");
        }
        hardware.memory.ram[..len].copy_from_slice(&bytes[..len]);
    }
    Ok(hardware)
}

fn state_path(ctx: &SessionContext, slot: Option<u32>, path: Option<&str>) -> Result<PathBuf> {
    match (path, slot) {
        (Some(path), _) => Ok(ctx.layout.resolve(path)),
        (None, Some(slot)) => Ok(ctx.layout.state_path(&ctx.config.game_id, slot)),
        (None, None) => Err(anyhow!("Either --slot or --path is required")),
    }
}

fn verify_bytes(ctx: &SessionContext, bytes: &[u8]) -> Result<()> {
    let template = Hardware::new(ctx.config.hardware_config());
    decode_state(&template, bytes)?;
    Ok(())
}

/// Save the session's machine state into a slot.
pub fn save_state_command(root: &str, slot: u32) -> Result<()> {
    let ctx = open_session(root)?;
    let mut hardware = session_hardware(&ctx)?;
    let bytes = save_state(&mut hardware).context("Failed to serialize machine state")?;

    let path = ctx.layout.state_path(&ctx.config.game_id, slot);
    fs::create_dir_all(&ctx.layout.states_dir)
        .with_context(|| format!("Failed to create {}", ctx.layout.states_dir.display()))?;
    fs::write(&path, &bytes).with_context(|| format!("Failed to write save state {}", path.display()))?;

    println!("Saved state:");
    println!("  Path: {}", path.display());
    println!("  Bytes: {}", bytes.len());
    println!("  SHA-256: {}", sha256_bytes(&bytes));
    Ok(())
}

/// Check that a save state loads into the session's machine.
pub fn verify_state_command(root: &str, slot: Option<u32>, path: Option<&str>) -> Result<()> {
    let ctx = open_session(root)?;
    let path = state_path(&ctx, slot, path)?;
    let bytes = fs::read(&path).with_context(|| format!("Failed to read save state {}", path.display()))?;

    verify_bytes(&ctx, &bytes).with_context(|| format!("Save state {} does not load", path.display()))?;
    println!("OK: {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn describe_state_file(ctx: &SessionContext, path: &Path) -> Result<StateFileInfo> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read save state {}", path.display()))?;
    let error = verify_bytes(ctx, &bytes).err().map(|err| format!("{err:#}"));
    Ok(StateFileInfo {
        path: path.display().to_string(),
        bytes: bytes.len() as u64,
        sha256: sha256_file(path)?,
        valid: error.is_none(),
        error,
    })
}

/// List the session's save states with their size, digest and whether they load.
pub fn state_info_command(root: &str, slot: Option<u32>, json: bool) -> Result<()> {
    let ctx = open_session(root)?;

    let paths = match slot {
        Some(slot) => {
            let path = ctx.layout.state_path(&ctx.config.game_id, slot);
            if !path.exists() {
                return Err(anyhow!("No save state at {}", path.display()));
            }
            vec![path]
        }
        None => list_state_files(&ctx)?,
    };

    let infos = paths.iter().map(|path| describe_state_file(&ctx, path)).collect::<Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if infos.is_empty() {
        println!("No save states in {}", ctx.layout.states_dir.display());
        return Ok(());
    }
    for info in &infos {
        println!("{}", info.path);
        println!("  Bytes: {}", info.bytes);
        println!("  SHA-256: {}", info.sha256);
        match &info.error {
            None => println!("  Status: OK"),
            Some(err) => println!("  Status: INVALID ({err})"),
        }
    }
    Ok(())
}

fn list_state_files(ctx: &SessionContext) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if !ctx.layout.states_dir.is_dir() {
        return Ok(paths);
    }
    let prefix = format!("{}.s", ctx.config.game_id);
    for entry in fs::read_dir(&ctx.layout.states_dir)
        .with_context(|| format!("Failed to read {}", ctx.layout.states_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
