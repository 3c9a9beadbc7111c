//! notes-cli: command-line client for the session notes HTTP API
//!
//! Covers the same workflow as the web front-end: generate a summary from
//! raw notes, save the (possibly edited) summary under a name and date, and
//! view stored notes.
//!
//! # Subcommands
//! - `status`                                                 : server health
//! - `generate [--session-type T] [--duration D] <notes|->`   : summarise notes
//! - `save <name> <date> <notes|->`                           : store a note
//! - `list [--json]`                                          : show stored notes

use std::io::Read;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "notes-cli", version, about = "Session notes API client")]
struct Cli {
    /// Server URL (overrides NOTES_HTTP_URL env var)
    #[arg(long, env = "NOTES_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show server status
    Status,

    /// Generate a clinical summary from raw session notes
    Generate {
        /// Session type, e.g. "Speech Therapy"
        #[arg(long, default_value = "")]
        session_type: String,

        /// Session duration, e.g. "45"
        #[arg(long, default_value = "")]
        duration: String,

        /// Raw notes, or "-" to read them from stdin
        notes: String,
    },

    /// Save a note under a name and date
    Save {
        name: String,
        date: String,
        /// Note text, or "-" to read it from stdin
        notes: String,
    },

    /// List every stored note
    List {
        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub name: String,
    pub date: String,
    pub notes: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody<'a> {
    pub session_type: &'a str,
    pub duration: &'a str,
    pub notes: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResult {
    pub result: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Read `-` from stdin; anything else is taken literally.
fn resolve_text(arg: &str) -> anyhow::Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(arg.to_string())
    }
}

/// Client-side check the front-end performs before saving.
pub fn validate_save(name: &str, date: &str, notes: &str) -> Result<(), String> {
    let missing: Vec<&str> = [("name", name), ("date", date), ("notes", notes)]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing {}", missing.join(", ")))
    }
}

/// Pull the `detail` message out of an error body, falling back to the raw text.
pub fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["detail"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// One note rendered for the terminal.
pub fn format_note(note: &NoteRecord) -> String {
    format!("{} — {}\n{}\n", note.name, note.date, note.notes.trim_end())
}

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn fail_on_status(resp: reqwest::blocking::Response) -> anyhow::Result<reqwest::blocking::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    anyhow::bail!("server returned {}: {}", status, error_detail(&body))
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?
        .get(&url)
        .send()
        .map_err(|e| anyhow::anyhow!("cannot reach {} — {}", url, e))?;

    let resp = fail_on_status(resp)?;
    let body: serde_json::Value = resp.json().unwrap_or_default();
    println!("Notes server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:      {}", body["version"].as_str().unwrap_or("?"));
    println!("SQLite:       {}", body["sqlite"].as_str().unwrap_or("?"));
    Ok(())
}

fn do_generate(server: &str, session_type: &str, duration: &str, notes: &str) -> anyhow::Result<()> {
    let url = format!("{}/generate-notes", server);
    let body = GenerateBody {
        session_type,
        duration,
        notes,
    };

    // The upstream model call dominates; allow for it.
    let resp = client(90)?.post(&url).json(&body).send()?;
    let generated: GenerateResult = fail_on_status(resp)?.json()?;
    println!("{}", generated.result);
    Ok(())
}

fn do_save(server: &str, name: &str, date: &str, notes: &str) -> anyhow::Result<()> {
    validate_save(name, date, notes).map_err(|e| anyhow::anyhow!("{}", e))?;

    let url = format!("{}/save-notes", server);
    let body = NoteRecord {
        name: name.to_string(),
        date: date.to_string(),
        notes: notes.to_string(),
    };

    let resp = client(30)?.post(&url).json(&body).send()?;
    let saved: NoteRecord = fail_on_status(resp)?.json()?;
    println!("Saved note for {} on {}", saved.name, saved.date);
    Ok(())
}

fn do_list(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/get-notes", server);
    let resp = client(30)?.get(&url).send()?;
    let notes: Vec<NoteRecord> = fail_on_status(resp)?.json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    if notes.is_empty() {
        eprintln!("No notes stored");
        return Ok(());
    }
    for note in &notes {
        println!("{}", format_note(note));
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: Cli) -> anyhow::Result<()> {
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Status => do_status(&server),
        Commands::Generate {
            session_type,
            duration,
            notes,
        } => do_generate(&server, &session_type, &duration, &resolve_text(&notes)?),
        Commands::Save { name, date, notes } => {
            do_save(&server, &name, &date, &resolve_text(&notes)?)
        }
        Commands::List { json } => do_list(&server, json),
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("notes-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
