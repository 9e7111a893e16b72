use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pairlink::tracks::classify_label;
use pairlink::{AudioChannelRole, AudioFile, Config, DualChannelGate, PairingCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "pairlink", version, about = "Dual-channel audio pairing tools")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/pairlink")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Issue a pairing code
    Code,
    /// Show which role a device label maps to
    Classify { label: String },
    /// Run two WAV recordings through the voice activity gates
    Replay {
        /// Microphone recording
        #[arg(long)]
        local: PathBuf,
        /// System audio recording
        #[arg(long)]
        remote: PathBuf,
        #[arg(long, default_value_t = 20)]
        frame_ms: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);
    info!(
        "HTTP API configured for {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );
    info!(
        "NATS at {} (signaling on {}.signal.*)",
        cfg.nats.url, cfg.nats.subject_prefix
    );

    match cli.command {
        Command::Code => {
            let code = PairingCode::generate(
                Utc::now(),
                Duration::from_secs(cfg.pairing.code_ttl_secs),
            );
            println!("{} (expires {})", code.as_str(), code.expires_at().to_rfc3339());
        }
        Command::Classify { label } => {
            let classification = classify_label(&label);
            println!("{} ({:?})", classification.role, classification.method);
        }
        Command::Replay {
            local,
            remote,
            frame_ms,
        } => replay(&cfg, &local, &remote, frame_ms)?,
    }

    Ok(())
}

fn replay(cfg: &Config, local: &Path, remote: &Path, frame_ms: u64) -> Result<()> {
    let local = AudioFile::open(local).context("Failed to load local recording")?;
    let remote = AudioFile::open(remote).context("Failed to load remote recording")?;

    let mut gates = DualChannelGate::new(cfg.vad)?;
    let local_frames = local.frames(AudioChannelRole::LocalParticipant, frame_ms);
    let remote_frames = remote.frames(AudioChannelRole::RemoteParticipant, frame_ms);

    let ticks = local_frames.len().max(remote_frames.len());
    let mut open_frames = [0usize; 2];
    let mut open = [false; 2];

    for tick in 0..ticks {
        for (slot, frame) in [local_frames.get(tick), remote_frames.get(tick)]
            .into_iter()
            .enumerate()
        {
            let Some(frame) = frame else { continue };

            let now_open = gates.evaluate(frame.role, frame.rms_level(), frame.timestamp_ms);
            if now_open != open[slot] {
                info!(
                    "{:>8}ms {} {}",
                    frame.timestamp_ms,
                    frame.role,
                    if now_open { "SPEAKING" } else { "SILENT" }
                );
                open[slot] = now_open;
            }
            if now_open {
                open_frames[slot] += 1;
            }
        }
    }

    println!(
        "{}: {}/{} frames forwarded",
        AudioChannelRole::LocalParticipant,
        open_frames[0],
        local_frames.len()
    );
    println!(
        "{}: {}/{} frames forwarded",
        AudioChannelRole::RemoteParticipant,
        open_frames[1],
        remote_frames.len()
    );

    Ok(())
}
