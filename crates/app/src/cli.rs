use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use narrator_core::model::{PlaybackSettings, PlaybackSettingsDraft};

/// Narrates study material aloud, question then answer, with timed breaks.
#[derive(Parser, Debug)]
#[command(name = "study-narrator")]
#[command(version)]
pub struct Cli {
    /// Folder holding one `.docx`/`.txt`/`.md` file per subject
    #[arg(long, default_value = "material", env = "NARRATOR_MATERIAL_DIR", global = true)]
    pub material_dir: PathBuf,

    /// Folder holding `.mp3`/`.wav` break music
    #[arg(long, default_value = "songs", env = "NARRATOR_SONGS_DIR", global = true)]
    pub songs_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List subjects and break tracks
    Subjects,
    /// Print a subject's parsed content as JSON
    Content { subject: String },
    /// Run an interactive narration session
    Play(PlayArgs),
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    pub subject: String,

    /// SQLite URL or path for saved progress
    #[arg(long = "db", default_value = "sqlite://narrator.sqlite3", env = "NARRATOR_DB_URL")]
    pub db_url: String,

    /// Keep progress in memory only
    #[arg(long)]
    pub memory: bool,

    /// Print narration and skip audio devices and media keys
    #[arg(long)]
    pub console: bool,

    /// Speech rate (0.5 to 2.0)
    #[arg(long)]
    pub rate: Option<f32>,

    /// Pause after a question, in milliseconds
    #[arg(long = "pause-ms")]
    pub pause_ms: Option<u64>,

    /// Study seconds before a break
    #[arg(long = "break-after")]
    pub break_after: Option<u32>,

    /// Break length in seconds
    #[arg(long = "break-for")]
    pub break_for: Option<u32>,
}

impl PlayArgs {
    pub fn settings(&self) -> Result<PlaybackSettings> {
        PlaybackSettingsDraft {
            pause_after_question: self.pause_ms.map(Duration::from_millis),
            break_threshold_secs: self.break_after,
            break_duration_secs: self.break_for,
            speech_rate: self.rate,
            ..PlaybackSettingsDraft::default()
        }
        .validate()
        .context("invalid playback settings")
    }
}

pub fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its folder exist before sqlx opens it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}
