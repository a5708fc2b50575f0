use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskdesk_core::RecordId;

#[derive(Parser, Debug)]
#[clap(author, version, about = "A small task tracker for people and groups")]
pub struct Cli {
    /// Directory holding the data files (overrides the config file)
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Email of the user; prompted for when omitted
        #[clap(long)]
        email: Option<String>,

        /// Offer this user on later logins
        #[clap(long)]
        remember: bool,
    },

    /// Forget the logged-in user
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage tasks
    #[clap(subcommand)]
    Task(TaskCommand),

    /// Manage users
    #[clap(subcommand)]
    User(UserCommand),

    /// Manage groups
    #[clap(subcommand)]
    Team(TeamCommand),

    /// Show or change the color theme (dark, light or toggle)
    Theme {
        mode: Option<String>,
    },

    /// Check that every link between records is mutual
    Check {
        /// Fix one-sided and dangling links
        #[clap(long)]
        repair: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a new task
    Add {
        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Due date (DD/MM/YYYY)
        #[clap(long)]
        due: Option<String>,

        /// Exact status text: "Pending...", "In Progress...", "Completed!",
        /// "On Hold..." or "Cancelled!"
        #[clap(long)]
        status: Option<String>,

        /// Group names (comma separated)
        #[clap(long)]
        teams: Option<String>,

        /// User full names (comma separated)
        #[clap(long)]
        users: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all tasks
    List {
        /// Only tasks with this exact status text, e.g. "In Progress..."
        #[clap(long)]
        status: Option<String>,
    },

    /// Show details for a specific task
    Show { id: RecordId },

    /// Edit an existing task
    Edit {
        id: RecordId,

        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Due date (DD/MM/YYYY)
        #[clap(long)]
        due: Option<String>,

        /// Exact status text: "Pending...", "In Progress...", "Completed!",
        /// "On Hold..." or "Cancelled!"
        #[clap(long)]
        status: Option<String>,

        /// Replaces the task's groups (comma separated names)
        #[clap(long)]
        teams: Option<String>,

        /// Replaces the task's users (comma separated full names)
        #[clap(long)]
        users: Option<String>,

        #[clap(long)]
        interactive: bool,
    },

    /// Delete a task
    Del {
        id: RecordId,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Search tasks by title, description or id
    Search { query: Vec<String> },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Add a new user
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        email: Option<String>,

        /// Exact role text: Admin, User or Read-Only
        #[clap(long)]
        role: Option<String>,

        /// Group names (comma separated)
        #[clap(long)]
        teams: Option<String>,

        /// Task titles (comma separated)
        #[clap(long)]
        tasks: Option<String>,

        #[clap(long)]
        interactive: bool,
    },

    /// List all users
    List,

    /// Show details for a specific user
    Show { id: RecordId },

    /// Edit an existing user
    Edit {
        id: RecordId,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        email: Option<String>,

        /// Exact role text: Admin, User or Read-Only
        #[clap(long)]
        role: Option<String>,

        /// Replaces the user's groups (comma separated names)
        #[clap(long)]
        teams: Option<String>,

        /// Replaces the user's tasks (comma separated titles)
        #[clap(long)]
        tasks: Option<String>,

        /// Prompt for a new password
        #[clap(long)]
        password: bool,

        #[clap(long)]
        interactive: bool,
    },

    /// Delete a user
    Del {
        id: RecordId,

        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Search users by name, email or id
    Search { query: Vec<String> },
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Add a new group
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// User full names (comma separated)
        #[clap(long)]
        users: Option<String>,

        /// Task titles (comma separated)
        #[clap(long)]
        tasks: Option<String>,

        #[clap(long)]
        interactive: bool,
    },

    /// List all groups
    List,

    /// Show details for a specific group
    Show { id: RecordId },

    /// Edit an existing group
    Edit {
        id: RecordId,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Replaces the group's users (comma separated full names)
        #[clap(long)]
        users: Option<String>,

        /// Replaces the group's tasks (comma separated titles)
        #[clap(long)]
        tasks: Option<String>,

        #[clap(long)]
        interactive: bool,
    },

    /// Delete a group
    Del {
        id: RecordId,

        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Search groups by name, description or id
    Search { query: Vec<String> },
}
