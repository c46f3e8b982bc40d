// SPDX-License-Identifier: MIT OR Apache-2.0
//! `keyline_replay` - replay a timeline command script
//!
//! Usage: `keyline_replay <script.ron> [config.ron]`
//!
//! The script is a RON list of timeline commands. Each command is dispatched
//! through a session in order and the final snapshot is printed as RON. If no
//! config path is given, `keyline.ron` in the working directory is used when
//! present.

use keyline_editor::{SessionConfig, SessionError, TimelineSession, CONFIG_FILE_NAME};
use keyline_timeline::Command;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "keyline_editor=debug".parse::<tracing_subscriber::filter::Directive>() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(script_path) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: keyline_replay <script.ron> [config.ron]");
        std::process::exit(2);
    };
    let config_path = args.next().map(PathBuf::from);

    if let Err(e) = run(&script_path, config_path.as_deref()) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(script_path: &Path, config_path: Option<&Path>) -> Result<(), SessionError> {
    let config = match config_path {
        Some(path) => SessionConfig::load(path)?,
        None if Path::new(CONFIG_FILE_NAME).exists() => SessionConfig::load(Path::new(CONFIG_FILE_NAME))?,
        None => SessionConfig::default(),
    };

    let script = std::fs::read_to_string(script_path)?;
    let commands: Vec<Command> = ron::from_str(&script)?;
    tracing::info!("Replaying {} commands from {:?}", commands.len(), script_path);

    let mut session = TimelineSession::new(config);
    for command in commands {
        session.submit(command);
    }
    let accepted = session.flush()?;
    tracing::info!(accepted, last_sequence = session.journal().last_sequence(), "Replay finished");

    let pretty = ron::ser::PrettyConfig::default().struct_names(true);
    println!("{}", ron::ser::to_string_pretty(&session.snapshot(), pretty)?);
    Ok(())
}
