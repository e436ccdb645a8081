#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays headless Sushi Rush sessions.

mod host;
mod settings;
mod store;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use sushi_rush_core::{Command, SessionSummary};
use sushi_rush_session::{self as session, query, Session};
use sushi_rush_system_replay::FrameSource;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    host::{Behaviour, Host},
    settings::Settings,
    store::JsonHighScore,
};

/// Runs simulated rounds and prints the end-of-session summary.
#[derive(Debug, Parser)]
#[command(name = "sushi-rush", version, about)]
struct Args {
    /// TOML settings file; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the seed used for order draws and the simulated player.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the round length in seconds.
    #[arg(long)]
    duration_secs: Option<f64>,
    /// File holding the persisted high score.
    #[arg(long, default_value = "sushi-rush-high-score.json")]
    high_score_file: PathBuf,
    /// Log filter, e.g. `debug` or `sushi_rush_session=trace`. Defaults to `RUST_LOG`, then `info`.
    #[arg(long)]
    log_level: Option<String>,
    /// Fixed simulation step in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Probability that the simulated player serves the requested item.
    #[arg(long, default_value_t = 0.8)]
    accuracy: f64,
    /// Number of rounds to play back to back.
    #[arg(long, default_value_t = 1)]
    rounds: u32,
    /// Prints summaries as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Sushi Rush command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    if args.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }
    if !(0.0..=1.0).contains(&args.accuracy) {
        bail!("--accuracy must lie between 0 and 1");
    }

    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut config = settings.into_config()?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.duration = settings::seconds(args.duration_secs, config.duration, "--duration-secs")?;

    let store = JsonHighScore::new(&args.high_score_file);
    debug!(path = %store.path().display(), "high score store");

    let behaviour = Behaviour {
        accuracy: args.accuracy,
        ..Behaviour::default()
    };
    let mut host = Host::new(behaviour, config.catalog.clone(), config.seed);

    let mut frame_index = 0u64;
    let capture = move || {
        frame_index += 1;
        Some(frame_index)
    };
    let mut session =
        Session::new(config, capture, Box::new(store)).context("invalid session configuration")?;
    println!("{}", query::welcome_banner(&session));

    let tick = Duration::from_millis(args.tick_ms);
    for round in 1..=args.rounds {
        if round > 1 {
            let mut events = Vec::new();
            session::apply(&mut session, Command::Restart, &mut events);
            host.observe(&events);
        }

        let summary = host::run(&mut session, &mut host, tick);
        play_digest(&session);
        print_summary(round, &summary, args.json)?;
    }

    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn play_digest<C: FrameSource<Frame = u64>>(session: &Session<C>) {
    let replay = query::replay(session);
    let mut playback = replay.playback();
    let Some(first) = playback.current() else {
        info!("no digest frames captured");
        return;
    };

    let mut shown = vec![*first];
    for _ in 1..replay.len() {
        if let Some(frame) = playback.advance(replay.interval()) {
            shown.push(*frame);
        }
    }
    info!(
        frames = shown.len(),
        first = shown.first().copied(),
        last = shown.last().copied(),
        "digest played"
    );
}

fn print_summary(round: u32, summary: &SessionSummary, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(summary).context("failed to encode session summary")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Round {round}");
    println!("  score:         {}", summary.score);
    println!("  high score:    {}", summary.high_score);
    println!("  rank:          {}", summary.rank);
    println!("  served:        {}", summary.served);
    println!("  wrong:         {}", summary.wrong);
    println!("  missed:        {}", summary.missed);
    println!(
        "  avg service:   {:.2}s",
        summary.average_service_time.as_secs_f64()
    );
    println!(
        "  angry time:    {:.2}s",
        summary.decay_active_time.as_secs_f64()
    );
    println!("  digest frames: {}", summary.replay_frames);
    Ok(())
}
