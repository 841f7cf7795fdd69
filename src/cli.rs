use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "daysprint",
    version,
    about = "Paint your day into time blocks and attach todos to them"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Write logs to this file (the TUI always logs to a file)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a planner in the current directory
    Init,
    /// Print the day grid
    Show,
    /// Paint a range of slots with a marker
    Paint {
        /// First slot (HH:MM or slot index)
        from: String,
        /// Last slot, inclusive (defaults to `from`)
        to: Option<String>,
        /// Marker id or name (defaults to the first marker)
        #[arg(long, short)]
        marker: Option<String>,
    },
    /// Blank a range of slots
    Erase {
        /// First slot (HH:MM or slot index)
        from: String,
        /// Last slot, inclusive (defaults to `from`)
        to: Option<String>,
    },
    /// Attach a todo to the painted block containing a slot
    Assign {
        /// Todo id
        todo_id: String,
        /// Slot inside the block (HH:MM or slot index)
        at: String,
    },
    /// Detach a todo from every slot
    Unassign {
        /// Todo id
        todo_id: String,
    },
    /// Blank the whole grid
    Reset,
    /// Show the current slot
    Now,
    /// Follow the clock and print a notice whenever a new block starts
    Watch,
    /// Manage markers
    #[command(subcommand)]
    Marker(MarkerCommand),
    /// Manage todos
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum MarkerCommand {
    /// List markers
    List,
    /// Add a marker
    Add(MarkerArgs),
    /// Rename a marker
    Rename {
        /// Marker id or name
        marker: String,
        /// New name
        name: String,
    },
    /// Change a marker colour
    Color {
        /// Marker id or name
        marker: String,
        /// Colour token, e.g. teal-500
        color: String,
    },
    /// Delete a marker and blank its slots
    Rm {
        /// Marker id or name
        marker: String,
    },
}

#[derive(Args, Debug)]
pub struct MarkerArgs {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
    /// Colour token, e.g. teal-500
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// List todos
    List,
    /// Add a todo
    Add {
        /// Todo text
        text: String,
    },
    /// Replace a todo's text
    Edit {
        /// Todo id
        todo_id: String,
        /// New text
        text: String,
    },
    /// Toggle a todo's completed flag
    Done {
        /// Todo id
        todo_id: String,
    },
    /// Delete a todo and detach it from every slot
    Rm {
        /// Todo id
        todo_id: String,
    },
}
