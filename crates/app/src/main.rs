use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use services::{
    Capabilities, MaterialLibrary, PlaybackController, TokioScheduler, run_controller,
    spawn_bridge,
};
use storage::{ProgressStore, Storage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod console;
mod platform;

use cli::{Cli, Command, PlayArgs, normalize_sqlite_url, prepare_sqlite_file};
use console::{ConsoleCommand, ConsoleObserver, HELP, HeadlessWakeLock, parse_command};
use platform::Devices;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "study_narrator=info,narrator_core=info,services=info,storage=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let library = MaterialLibrary::new(&cli.material_dir, &cli.songs_dir);

    match cli.command {
        Command::Subjects => list(&library),
        Command::Content { subject } => {
            let export = library
                .export(&subject)
                .with_context(|| format!("loading subject {subject}"))?;
            println!("{}", serde_json::to_string_pretty(&export)?);
            Ok(())
        }
        Command::Play(args) => play(&library, args).await,
    }
}

fn list(library: &MaterialLibrary) -> Result<()> {
    let subjects = library.list_subjects().context("listing subjects")?;
    if subjects.is_empty() {
        println!("no subjects found");
    }
    for subject in subjects {
        println!("{}", subject.name);
    }

    let tracks = library.list_tracks().context("listing break tracks")?;
    if !tracks.is_empty() {
        println!();
        println!("break tracks:");
        for track in tracks {
            println!("  {track}");
        }
    }
    Ok(())
}

async fn play(library: &MaterialLibrary, args: PlayArgs) -> Result<()> {
    let settings = args.settings()?;
    let content = library
        .load(&args.subject)
        .with_context(|| format!("loading subject {}", args.subject))?;

    let storage = if args.memory {
        Storage::in_memory()
    } else {
        let db_url = normalize_sqlite_url(&args.db_url);
        prepare_sqlite_file(&db_url)?;
        Storage::sqlite(&db_url)
            .await
            .with_context(|| format!("opening {db_url}"))?
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let devices = if args.console {
        Devices::console(library.songs_dir())
    } else {
        Devices::open(library.songs_dir())
    };
    let (bridge_tx, bridge) =
        spawn_bridge(devices.media, Box::new(HeadlessWakeLock), transport_tx);

    let capabilities = Capabilities {
        speech: devices.speech,
        audio: devices.audio,
        scheduler: Box::new(TokioScheduler::new(events_tx.clone())),
        observer: Arc::new(ConsoleObserver::new(content.len())),
    };
    let controller = PlaybackController::create(
        content,
        settings,
        capabilities,
        ProgressStore::new(storage.kv.clone()),
        events_tx.clone(),
    )
    .await
    .with_bridge(bridge_tx);

    let session = tokio::spawn(run_controller(
        controller,
        events_rx,
        transport_rx,
        shutdown_rx,
    ));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Some(ConsoleCommand::Event(event)) => {
                        if events_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Some(ConsoleCommand::Quit) => break,
                    Some(ConsoleCommand::Help) | None => println!("{HELP}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    if shutdown_tx.send(()).is_err() {
        warn!("playback loop already stopped");
    }
    let controller = session.await.context("playback loop panicked")?;
    info!(
        percent = controller.progress_percent(),
        "session ended"
    );
    drop(controller);
    bridge.await.context("bridge task panicked")?;
    Ok(())
}
