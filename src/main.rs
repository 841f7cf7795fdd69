mod assign;
mod cli;
mod clock;
mod commands;
mod config;
mod cursor;
mod grid;
mod model;
mod paint;
mod planner;
mod registry;
mod storage;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    init_logging(args.verbose, args.log_file, matches!(command, cli::Command::Tui))?;
    log::debug!("command: {:?}", command);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::Show => commands::show(),
        cli::Command::Paint { from, to, marker } => commands::paint(from, to, marker),
        cli::Command::Erase { from, to } => commands::erase(from, to),
        cli::Command::Assign { todo_id, at } => commands::assign(todo_id, at),
        cli::Command::Unassign { todo_id } => commands::unassign(todo_id),
        cli::Command::Reset => commands::reset(),
        cli::Command::Now => commands::now(),
        cli::Command::Watch => commands::watch(),
        cli::Command::Marker(cmd) => match cmd {
            cli::MarkerCommand::List => commands::marker_list(),
            cli::MarkerCommand::Add(args) => commands::marker_add(args.name, args.color),
            cli::MarkerCommand::Rename { marker, name } => commands::marker_rename(marker, name),
            cli::MarkerCommand::Color { marker, color } => commands::marker_color(marker, color),
            cli::MarkerCommand::Rm { marker } => commands::marker_rm(marker),
        },
        cli::Command::Todo(cmd) => match cmd {
            cli::TodoCommand::List => commands::todo_list(),
            cli::TodoCommand::Add { text } => commands::todo_add(text),
            cli::TodoCommand::Edit { todo_id, text } => commands::todo_edit(todo_id, text),
            cli::TodoCommand::Done { todo_id } => commands::todo_done(todo_id),
            cli::TodoCommand::Rm { todo_id } => commands::todo_rm(todo_id),
        },
        cli::Command::Tui => commands::tui(),
    }
}

// 0 = warn, 1 = info, 2 = debug, 3+ = trace. `RUST_LOG` wins when set.
fn init_logging(verbosity: u8, log_file: Option<PathBuf>, tui: bool) -> Result<()> {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();

    let path = match log_file {
        Some(path) => Some(path),
        None if tui => Some(default_log_path()?),
        None => None,
    };
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let file = File::create(&path).with_context(|| format!("creating log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "daysprint")
        .context("locating data directory")?;
    Ok(dirs.data_dir().join("daysprint.log"))
}
