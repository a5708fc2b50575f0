mod cli;
mod prompts;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::{ColoredString, Colorize};

use taskdesk_core::models::DUE_DATE_FORMAT;
use taskdesk_core::search::{find_by_name, ids_for_names};
use taskdesk_core::{
    get_config_path, init_logging, Config, Identified, Item, ItemStatus, Named, NewItem,
    NewPerson, NewTeam, Person, PersonRole, RecordId, SearchView, Searchable, Storage, TaskStore,
    Team,
};

use crate::cli::{Cli, Command, TaskCommand, TeamCommand, UserCommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }

    if config.log_to_file {
        if let Err(e) = init_logging(&config.log_dir(), &config.log_level) {
            eprintln!("{} {:#}", "Logging disabled:".yellow(), e);
        }
    }

    let storage = Storage::from_config(&config);
    let (mut store, load_report) = storage.load_all();
    for failure in &load_report.failures {
        eprintln!("{} {}", "Warning:".yellow(), failure);
    }
    let loaded = store.clone();

    run(&cli.command, &mut store)?;

    if store != loaded {
        // Saving now would overwrite the unreadable files with empty ones
        if !load_report.is_clean() {
            anyhow::bail!(
                "Not saving changes: some data files in {:?} could not be loaded",
                storage.data_dir()
            );
        }

        let save_report = storage.save_all(&store);
        if !save_report.is_clean() {
            for failure in &save_report.failures {
                eprintln!("{} {}", "Error:".red(), failure);
            }
            anyhow::bail!("Failed to save data to {:?}", storage.data_dir());
        }
    }

    Ok(())
}

fn run(command: &Command, store: &mut TaskStore) -> Result<()> {
    if !matches!(command, Command::Login { .. } | Command::Logout) {
        require_login(store)?;
    }

    match command {
        Command::Login { email, remember } => login(store, email.as_deref(), *remember)?,
        Command::Logout => logout(store),
        Command::Whoami => whoami(store)?,
        Command::Task(task_cmd) => handle_task_command(task_cmd, store)?,
        Command::User(user_cmd) => handle_user_command(user_cmd, store)?,
        Command::Team(team_cmd) => handle_team_command(team_cmd, store)?,
        Command::Theme { mode } => handle_theme(store, mode.as_deref())?,
        Command::Check { repair } => check_links(store, *repair),
    }

    Ok(())
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Splits a comma separated list of names, dropping blanks
pub(crate) fn split_names(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn parse_due_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DUE_DATE_FORMAT)
        .with_context(|| format!("Invalid due date '{}'. Use DD/MM/YYYY.", input))
}

pub(crate) fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

fn parse_status(input: &str) -> Result<ItemStatus> {
    input.parse::<ItemStatus>().with_context(|| {
        let valid: Vec<&str> = ItemStatus::ALL.iter().map(|s| s.as_display_str()).collect();
        format!("Valid statuses: {}", valid.join(", "))
    })
}

fn parse_role(input: &str) -> Result<PersonRole> {
    input.parse::<PersonRole>().with_context(|| {
        let valid: Vec<&str> = PersonRole::ALL.iter().map(|r| r.as_display_str()).collect();
        format!("Valid roles: {}", valid.join(", "))
    })
}

/// Resolves comma separated names to ids, warning about names that match nothing
pub(crate) fn resolve_names<T: Identified + Named>(
    input: &str,
    records: &[T],
    kind: &str,
) -> Vec<RecordId> {
    let names = split_names(input);
    for name in &names {
        if find_by_name(records, name).is_none() {
            println!("{} {} '{}' not found, skipped", "Warning:".yellow(), kind, name);
        }
    }
    ids_for_names(&names, records)
}

fn status_colored(status: ItemStatus) -> ColoredString {
    let text = status.as_display_str();
    match status {
        ItemStatus::Pending => text.yellow(),
        ItemStatus::InProgress => text.blue(),
        ItemStatus::Completed => text.green(),
        ItemStatus::OnHold => text.magenta(),
        ItemStatus::Cancelled => text.red(),
    }
}

// =============================================================================
// Session
// =============================================================================

fn require_login(store: &TaskStore) -> Result<()> {
    store
        .current_person()
        .map(|_| ())
        .context("Not logged in. Run 'taskdesk login' first.")
}

fn login(store: &mut TaskStore, email: Option<&str>, remember: bool) -> Result<()> {
    let remembered = store.settings.remembered_emails(store.people().as_slice());
    let (email, password) = prompts::prompt_login(&remembered, email)?;

    let person_id = match store.authenticate(&email, &password) {
        Some(person) => person.id(),
        None => {
            log::warn!("Failed login attempt for '{}'", email);
            anyhow::bail!("Invalid email or password");
        }
    };
    store.record_login(person_id, remember);

    let person = store.person(person_id).context("User not found")?;
    println!("{} {}", "Logged in as".green(), person.full_name.bold());
    Ok(())
}

fn logout(store: &mut TaskStore) {
    store.settings.last_person_id = None;
    println!("{}", "Logged out.".green());
}

fn whoami(store: &TaskStore) -> Result<()> {
    let person = store.current_person().context("Not logged in")?;
    print_person(store, person);
    Ok(())
}

fn handle_theme(store: &mut TaskStore, mode: Option<&str>) -> Result<()> {
    match mode {
        None => {}
        Some("dark") => store.settings.dark_theme = true,
        Some("light") => store.settings.dark_theme = false,
        Some("toggle") => store.settings.dark_theme = !store.settings.dark_theme,
        Some(other) => anyhow::bail!("Unknown theme '{}'. Use dark, light or toggle.", other),
    }

    let name = if store.settings.dark_theme { "dark" } else { "light" };
    println!("{}: {}", "Theme".cyan(), name);
    Ok(())
}

fn check_links(store: &mut TaskStore, repair: bool) {
    let issues = store.consistency_report();
    if issues.is_empty() {
        println!("{}", "All links are consistent.".green());
        return;
    }

    println!("{}", format!("Found {} broken link(s):", issues.len()).yellow());
    for issue in &issues {
        println!("  {}", issue);
    }

    if repair {
        let fixes = store.repair_links();
        println!("{}", format!("Applied {} fix(es).", fixes).green());
    } else {
        println!("{}", "Run with --repair to fix them.".dimmed());
    }
}

// =============================================================================
// Tasks
// =============================================================================

fn handle_task_command(cmd: &TaskCommand, store: &mut TaskStore) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            title,
            description,
            due,
            status,
            teams,
            users,
            interactive,
        } => {
            // Default to interactive mode if no specific arguments are provided
            let should_be_interactive = *interactive
                || (title.is_none()
                    && description.is_none()
                    && due.is_none()
                    && status.is_none()
                    && teams.is_none()
                    && users.is_none());

            let fields = if should_be_interactive {
                prompts::prompt_item(store, None)?
            } else {
                NewItem {
                    title: title
                        .clone()
                        .context("Title is required. Use --title to specify a title.")?,
                    description: description.clone().context(
                        "Description is required. Use --description to specify a description.",
                    )?,
                    due_date: match due {
                        Some(due) => parse_due_date(due)?,
                        None => chrono::Local::now().date_naive(),
                    },
                    status: match status {
                        Some(status) => parse_status(status)?,
                        None => ItemStatus::Pending,
                    },
                    team_ids: teams
                        .as_deref()
                        .map(|t| resolve_names(t, store.teams().as_slice(), "Group"))
                        .unwrap_or_default(),
                    person_ids: users
                        .as_deref()
                        .map(|u| resolve_names(u, store.people().as_slice(), "User"))
                        .unwrap_or_default(),
                }
            };

            let id = store.create_item(fields)?;
            println!("{}", "Task added successfully!".green());
            println!("ID: {}", id.to_string().green());
        }
        TaskCommand::List { status } => {
            let mut items: Vec<&Item> = store.items().iter().collect();
            if let Some(status) = status {
                let status = parse_status(status)?;
                items.retain(|i| i.status == status);
            }
            print_items(store, &items);
        }
        TaskCommand::Show { id } => {
            let item = store.item(*id).with_context(|| format!("Task {} not found", id))?;
            print_item(store, item);
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            due,
            status,
            teams,
            users,
            interactive,
        } => {
            let current = store.item(*id).with_context(|| format!("Task {} not found", id))?;
            let should_be_interactive = *interactive
                || (title.is_none()
                    && description.is_none()
                    && due.is_none()
                    && status.is_none()
                    && teams.is_none()
                    && users.is_none());

            let fields = if should_be_interactive {
                prompts::prompt_item(store, Some(current))?
            } else {
                let mut fields = NewItem::from(current);
                if let Some(title) = title {
                    fields.title = title.clone();
                }
                if let Some(description) = description {
                    fields.description = description.clone();
                }
                if let Some(due) = due {
                    fields.due_date = parse_due_date(due)?;
                }
                if let Some(status) = status {
                    fields.status = parse_status(status)?;
                }
                if let Some(teams) = teams {
                    fields.team_ids = resolve_names(teams, store.teams().as_slice(), "Group");
                }
                if let Some(users) = users {
                    fields.person_ids = resolve_names(users, store.people().as_slice(), "User");
                }
                fields
            };

            store.update_item(*id, fields)?;
            println!("{}", "Task updated successfully!".green());
        }
        TaskCommand::Del { id, yes } => {
            let item = store.item(*id).with_context(|| format!("Task {} not found", id))?;

            println!("{}", "Task to delete:".yellow());
            println!("  ID: {}", item.id());
            println!("  Title: {}", item.title);
            println!("  Due: {}", item.due_date_text());

            // Confirm deletion unless --yes flag is used
            if !*yes && !prompts::confirm_delete("task")? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            store.delete_item(*id);
            println!("{}", "Task deleted successfully!".green());
        }
        TaskCommand::Search { query } => {
            let items = search(store.items().as_slice(), &query.join(" "), "tasks");
            print_items(store, &items);
        }
    }

    Ok(())
}

fn print_items(store: &TaskStore, items: &[&Item]) {
    if items.is_empty() {
        println!("{}", "No tasks found.".yellow());
        return;
    }

    println!(
        "{:<5} | {:<30} | {:<10} | {:<11} | {:<20} | {:<20}",
        "ID", "Title", "Due", "Status", "Groups", "Users"
    );
    println!("{}", "-".repeat(110));

    for item in items {
        println!(
            "{:<5} | {:<30} | {:<10} | {:<11} | {:<20} | {:<20}",
            item.id(),
            item.title,
            item.due_date_text(),
            status_colored(item.status),
            item.teams_text(store.teams().as_slice()),
            item.people_text(store.people().as_slice())
        );
    }
}

fn print_item(store: &TaskStore, item: &Item) {
    println!("{}: {}", "ID".cyan(), item.id());
    println!("{}: {}", "Title".cyan(), item.title.bold());
    println!("{}: {}", "Due".cyan(), item.due_date_text());
    println!("{}: {}", "Status".cyan(), status_colored(item.status));
    println!("{}: {}", "Groups".cyan(), item.teams_text(store.teams().as_slice()));
    println!("{}: {}", "Users".cyan(), item.people_text(store.people().as_slice()));
    println!("{}:", "Description".cyan());
    println!("{}", item.description);
}

// =============================================================================
// Users
// =============================================================================

fn handle_user_command(cmd: &UserCommand, store: &mut TaskStore) -> Result<()> {
    match cmd {
        UserCommand::Add {
            name,
            email,
            role,
            teams,
            tasks,
            interactive,
        } => {
            let should_be_interactive = *interactive
                || (name.is_none()
                    && email.is_none()
                    && role.is_none()
                    && teams.is_none()
                    && tasks.is_none());

            let fields = if should_be_interactive {
                prompts::prompt_person(store, None)?
            } else {
                NewPerson {
                    full_name: name
                        .clone()
                        .context("Name is required. Use --name to specify a full name.")?,
                    email: email
                        .clone()
                        .context("Email is required. Use --email to specify an email.")?,
                    password: prompts::prompt_new_password()?,
                    role: match role {
                        Some(role) => parse_role(role)?,
                        None => PersonRole::User,
                    },
                    team_ids: teams
                        .as_deref()
                        .map(|t| resolve_names(t, store.teams().as_slice(), "Group"))
                        .unwrap_or_default(),
                    item_ids: tasks
                        .as_deref()
                        .map(|t| resolve_names(t, store.items().as_slice(), "Task"))
                        .unwrap_or_default(),
                }
            };

            let id = store.create_person(fields)?;
            println!("{}", "User added successfully!".green());
            println!("ID: {}", id.to_string().green());
        }
        UserCommand::List => {
            let people: Vec<&Person> = store.people().iter().collect();
            print_people(store, &people);
        }
        UserCommand::Show { id } => {
            let person = store.person(*id).with_context(|| format!("User {} not found", id))?;
            print_person(store, person);
        }
        UserCommand::Edit {
            id,
            name,
            email,
            role,
            teams,
            tasks,
            password,
            interactive,
        } => {
            let current = store.person(*id).with_context(|| format!("User {} not found", id))?;
            let should_be_interactive = *interactive
                || (name.is_none()
                    && email.is_none()
                    && role.is_none()
                    && teams.is_none()
                    && tasks.is_none()
                    && !*password);

            let mut fields = if should_be_interactive {
                prompts::prompt_person(store, Some(current))?
            } else {
                let mut fields = NewPerson::from(current);
                if let Some(name) = name {
                    fields.full_name = name.clone();
                }
                if let Some(email) = email {
                    fields.email = email.clone();
                }
                if let Some(role) = role {
                    fields.role = parse_role(role)?;
                }
                if let Some(teams) = teams {
                    fields.team_ids = resolve_names(teams, store.teams().as_slice(), "Group");
                }
                if let Some(tasks) = tasks {
                    fields.item_ids = resolve_names(tasks, store.items().as_slice(), "Task");
                }
                fields
            };
            if *password {
                fields.password = prompts::prompt_new_password()?;
            }

            store.update_person(*id, fields)?;
            println!("{}", "User updated successfully!".green());
        }
        UserCommand::Del { id, yes } => {
            let person = store.person(*id).with_context(|| format!("User {} not found", id))?;

            println!("{}", "User to delete:".yellow());
            println!("  ID: {}", person.id());
            println!("  Name: {}", person.full_name);
            println!("  Email: {}", person.email());

            if !*yes && !prompts::confirm_delete("user")? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            store.delete_person(*id);
            println!("{}", "User deleted successfully!".green());
        }
        UserCommand::Search { query } => {
            let people = search(store.people().as_slice(), &query.join(" "), "users");
            print_people(store, &people);
        }
    }

    Ok(())
}

fn print_people(store: &TaskStore, people: &[&Person]) {
    if people.is_empty() {
        println!("{}", "No users found.".yellow());
        return;
    }

    println!(
        "{:<5} | {:<25} | {:<30} | {:<10} | {:<20}",
        "ID", "Full name", "Email", "Role", "Groups"
    );
    println!("{}", "-".repeat(100));

    for person in people {
        println!(
            "{:<5} | {:<25} | {:<30} | {:<10} | {:<20}",
            person.id(),
            person.full_name,
            person.email(),
            person.role_text(),
            person.teams_text(store.teams().as_slice())
        );
    }
}

fn print_person(store: &TaskStore, person: &Person) {
    println!("{}: {}", "ID".cyan(), person.id());
    println!("{}: {}", "Full name".cyan(), person.full_name.bold());
    println!("{}: {}", "Email".cyan(), person.email());
    println!("{}: {}", "Role".cyan(), person.role_text());
    println!("{}: {}", "Groups".cyan(), person.teams_text(store.teams().as_slice()));
    println!("{}: {}", "Tasks".cyan(), person.items_text(store.items().as_slice()));
}

// =============================================================================
// Groups
// =============================================================================

fn handle_team_command(cmd: &TeamCommand, store: &mut TaskStore) -> Result<()> {
    match cmd {
        TeamCommand::Add {
            name,
            description,
            users,
            tasks,
            interactive,
        } => {
            let should_be_interactive = *interactive
                || (name.is_none() && description.is_none() && users.is_none() && tasks.is_none());

            let fields = if should_be_interactive {
                prompts::prompt_team(store, None)?
            } else {
                NewTeam {
                    name: name
                        .clone()
                        .context("Name is required. Use --name to specify a name.")?,
                    description: description.clone().unwrap_or_default(),
                    person_ids: users
                        .as_deref()
                        .map(|u| resolve_names(u, store.people().as_slice(), "User"))
                        .unwrap_or_default(),
                    item_ids: tasks
                        .as_deref()
                        .map(|t| resolve_names(t, store.items().as_slice(), "Task"))
                        .unwrap_or_default(),
                }
            };

            let id = store.create_team(fields)?;
            println!("{}", "Group added successfully!".green());
            println!("ID: {}", id.to_string().green());
        }
        TeamCommand::List => {
            let teams: Vec<&Team> = store.teams().iter().collect();
            print_teams(store, &teams);
        }
        TeamCommand::Show { id } => {
            let team = store.team(*id).with_context(|| format!("Group {} not found", id))?;
            print_team(store, team);
        }
        TeamCommand::Edit {
            id,
            name,
            description,
            users,
            tasks,
            interactive,
        } => {
            let current = store.team(*id).with_context(|| format!("Group {} not found", id))?;
            let should_be_interactive = *interactive
                || (name.is_none() && description.is_none() && users.is_none() && tasks.is_none());

            let fields = if should_be_interactive {
                prompts::prompt_team(store, Some(current))?
            } else {
                let mut fields = NewTeam::from(current);
                if let Some(name) = name {
                    fields.name = name.clone();
                }
                if let Some(description) = description {
                    fields.description = description.clone();
                }
                if let Some(users) = users {
                    fields.person_ids = resolve_names(users, store.people().as_slice(), "User");
                }
                if let Some(tasks) = tasks {
                    fields.item_ids = resolve_names(tasks, store.items().as_slice(), "Task");
                }
                fields
            };

            store.update_team(*id, fields)?;
            println!("{}", "Group updated successfully!".green());
        }
        TeamCommand::Del { id, yes } => {
            let team = store.team(*id).with_context(|| format!("Group {} not found", id))?;

            println!("{}", "Group to delete:".yellow());
            println!("  ID: {}", team.id());
            println!("  Name: {}", team.name);

            if !*yes && !prompts::confirm_delete("group")? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            store.delete_team(*id);
            println!("{}", "Group deleted successfully!".green());
        }
        TeamCommand::Search { query } => {
            let teams = search(store.teams().as_slice(), &query.join(" "), "groups");
            print_teams(store, &teams);
        }
    }

    Ok(())
}

fn print_teams(store: &TaskStore, teams: &[&Team]) {
    if teams.is_empty() {
        println!("{}", "No groups found.".yellow());
        return;
    }

    println!(
        "{:<5} | {:<25} | {:<30} | {:<30}",
        "ID", "Name", "Users", "Tasks"
    );
    println!("{}", "-".repeat(100));

    for team in teams {
        println!(
            "{:<5} | {:<25} | {:<30} | {:<30}",
            team.id(),
            team.name,
            team.people_text(store.people().as_slice()),
            team.items_text(store.items().as_slice())
        );
    }
}

fn print_team(store: &TaskStore, team: &Team) {
    println!("{}: {}", "ID".cyan(), team.id());
    println!("{}: {}", "Name".cyan(), team.name.bold());
    println!("{}: {}", "Description".cyan(), team.description);
    println!("{}: {}", "Users".cyan(), team.people_text(store.people().as_slice()));
    println!("{}: {}", "Tasks".cyan(), team.items_text(store.items().as_slice()));
}

// =============================================================================
// Search
// =============================================================================

/// Runs a query through a result view
///
/// A query that matches nothing keeps the previous results, which for a fresh
/// view is the whole collection.
fn search<'a, T: Searchable>(records: &'a [T], query: &str, kind: &str) -> Vec<&'a T> {
    let mut view = SearchView::new(records);
    if !view.update(records, query) {
        println!(
            "{}",
            format!("No {} match '{}'; showing previous results.", kind, query).yellow()
        );
    }
    view.resolve(records)
}
