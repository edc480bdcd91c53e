use anyhow::Result;
use clap::{Parser, Subcommand};
use symstate::commands::{
    apply_signatures_command, code_map_command, export_map_command, init_session_command,
    load_map_command, lookup_command, populate_signatures_command, save_state_command,
    session_info_command, state_info_command, verify_state_command,
};
use tracing_subscriber::EnvFilter;

/// Save-state and symbol database tooling for PowerPC console sessions.
///
/// This CLI is a thin wrapper around `symstate-core`. All substantive logic
/// lives in the library so it can be tested thoroughly and reused from other
/// frontends.
#[derive(Parser, Debug)]
#[command(name = "symstate", version, about = "Save-state and symbol database tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a session at the given root.
    ///
    /// Creates `.symstate/session.json`, the signature database, and the
    /// `Maps` and `StateSaves` directories.
    Init {
        /// Session root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Title identifier (e.g. GALE01); names the map and state files.
        #[arg(long)]
        game_id: String,

        /// Optional session name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,

        /// Configure a Wii machine (adds the IOS sections to save states).
        #[arg(long)]
        wii: bool,
    },

    /// Show the session config, layout and loaded map.
    Info {
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Validate a map file against the memory image and store it as the title's map.
    LoadMap {
        #[arg(long, default_value = ".")]
        root: String,

        /// Map file to import (relative to the root unless absolute).
        #[arg(long)]
        path: String,

        /// Accept functions bounded by `blr` even outside instruction RAM.
        #[arg(long)]
        lenient: bool,

        #[arg(long)]
        json: bool,
    },

    /// Describe the symbol, note and call edges covering an address.
    Lookup {
        #[arg(long, default_value = ".")]
        root: String,

        /// Guest address in hex (`0x80003100` or `80003100`).
        #[arg(long)]
        address: String,

        #[arg(long)]
        json: bool,
    },

    /// Write the title's symbol table in map file form.
    ExportMap {
        #[arg(long, default_value = ".")]
        root: String,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<String>,
    },

    /// Write a disassembly listing of every function.
    CodeMap {
        #[arg(long, default_value = ".")]
        root: String,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<String>,
    },

    /// Record the checksums of named functions in the signature database.
    PopulateSignatures {
        #[arg(long, default_value = ".")]
        root: String,

        /// Only take functions whose name contains this text.
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Rename functions whose checksum matches a stored signature.
    ApplySignatures {
        #[arg(long, default_value = ".")]
        root: String,

        /// Report matches without saving the renamed map.
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// Serialize the session's machine into a state slot.
    SaveState {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long, default_value_t = 1)]
        slot: u32,
    },

    /// Check that a save state loads into the session's machine.
    VerifyState {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long, conflicts_with = "path")]
        slot: Option<u32>,

        /// Explicit state file (relative to the root unless absolute).
        #[arg(long)]
        path: Option<String>,
    },

    /// List save states with their size, digest and load status.
    StateInfo {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        slot: Option<u32>,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Default to showing the session in the current directory.
    match cli.command.unwrap_or(Command::Info { root: ".".to_string(), json: false }) {
        Command::Init { root, game_id, name, wii } => init_session_command(&root, name, &game_id, wii)?,
        Command::Info { root, json } => session_info_command(&root, json)?,
        Command::LoadMap { root, path, lenient, json } => load_map_command(&root, &path, lenient, json)?,
        Command::Lookup { root, address, json } => lookup_command(&root, &address, json)?,
        Command::ExportMap { root, out } => export_map_command(&root, out.as_deref())?,
        Command::CodeMap { root, out } => code_map_command(&root, out.as_deref())?,
        Command::PopulateSignatures { root, filter, json } => {
            populate_signatures_command(&root, filter.as_deref(), json)?
        }
        Command::ApplySignatures { root, dry_run, json } => apply_signatures_command(&root, dry_run, json)?,
        Command::SaveState { root, slot } => save_state_command(&root, slot)?,
        Command::VerifyState { root, slot, path } => verify_state_command(&root, slot, path.as_deref())?,
        Command::StateInfo { root, slot, json } => state_info_command(&root, slot, json)?,
    }

    Ok(())
}
