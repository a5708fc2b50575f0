use anyhow::Result;
use inquire::{Confirm, Editor, Password, PasswordDisplayMode, Select, Text};

use taskdesk_core::{
    Item, ItemStatus, NewItem, NewPerson, NewTeam, Person, PersonRole, Team, TaskStore,
};

use crate::{format_due_date, parse_due_date, resolve_names};

const OTHER_EMAIL: &str = "Another user...";

/// Prompts for login credentials, offering remembered users first
pub fn prompt_login(remembered: &[&str], email: Option<&str>) -> Result<(String, String)> {
    let email = match email {
        Some(email) => email.to_string(),
        None if remembered.is_empty() => Text::new("Email:").prompt()?,
        None => {
            let mut options: Vec<String> = remembered.iter().map(|e| e.to_string()).collect();
            options.push(OTHER_EMAIL.to_string());
            let selection = Select::new("Log in as:", options).prompt()?;
            if selection == OTHER_EMAIL {
                Text::new("Email:").prompt()?
            } else {
                selection
            }
        }
    };

    let password = Password::new("Password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;

    Ok((email, password))
}

/// Prompts for a new password, asking twice
pub fn prompt_new_password() -> Result<String> {
    let password = Password::new("Password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    Ok(password)
}

/// Prompts for a membership list as comma separated names
fn prompt_names(label: &str, current: &str) -> Result<String> {
    let input = Text::new(label).with_default(current).prompt()?;
    Ok(input)
}

fn prompt_text(label: &str, current: Option<&str>) -> Result<String> {
    let prompt = Text::new(label);
    let value = match current {
        Some(current) => prompt.with_default(current).prompt()?,
        None => prompt.prompt()?,
    };
    Ok(value)
}

/// Prompts for every field of a task; `current` provides the defaults
pub fn prompt_item(store: &TaskStore, current: Option<&Item>) -> Result<NewItem> {
    let title = prompt_text("Title:", current.map(|i| i.title.as_str()))?;

    // Use the Editor type for multiline input
    let description = match current {
        Some(item) => Editor::new("Description:")
            .with_predefined_text(&item.description)
            .prompt()?,
        None => Editor::new("Description:").prompt()?,
    };

    let due_default = current.map(Item::due_date_text).unwrap_or_else(today_text);
    let due = prompt_text("Due date (DD/MM/YYYY):", Some(due_default.as_str()))?;
    let due_date = parse_due_date(&due)?;

    let start = current
        .and_then(|i| ItemStatus::ALL.iter().position(|s| *s == i.status))
        .unwrap_or(0);
    let status = Select::new("Status:", ItemStatus::ALL.to_vec())
        .with_starting_cursor(start)
        .prompt()?;

    let teams_text = current.map(|i| i.teams_text(store.teams().as_slice())).unwrap_or_default();
    let team_names = prompt_names("Groups (comma separated):", &teams_text)?;
    let people_text = current.map(|i| i.people_text(store.people().as_slice())).unwrap_or_default();
    let person_names = prompt_names("Users (comma separated):", &people_text)?;

    Ok(NewItem {
        title,
        description,
        due_date,
        status,
        team_ids: resolve_names(&team_names, store.teams().as_slice(), "Group"),
        person_ids: resolve_names(&person_names, store.people().as_slice(), "User"),
    })
}

/// Prompts for every field of a user
///
/// The password is only asked for new users; for edits it is left empty.
pub fn prompt_person(store: &TaskStore, current: Option<&Person>) -> Result<NewPerson> {
    let full_name = prompt_text("Full name:", current.map(|p| p.full_name.as_str()))?;
    let email = prompt_text("Email:", current.map(Person::email))?;
    let password = match current {
        Some(_) => String::new(),
        None => prompt_new_password()?,
    };

    let start = current
        .and_then(|p| PersonRole::ALL.iter().position(|r| *r == p.role))
        .unwrap_or(1);
    let role = Select::new("Role:", PersonRole::ALL.to_vec())
        .with_starting_cursor(start)
        .prompt()?;

    let teams_text = current.map(|p| p.teams_text(store.teams().as_slice())).unwrap_or_default();
    let team_names = prompt_names("Groups (comma separated):", &teams_text)?;
    let items_text = current.map(|p| p.items_text(store.items().as_slice())).unwrap_or_default();
    let item_titles = prompt_names("Tasks (comma separated):", &items_text)?;

    Ok(NewPerson {
        full_name,
        email,
        password,
        role,
        team_ids: resolve_names(&team_names, store.teams().as_slice(), "Group"),
        item_ids: resolve_names(&item_titles, store.items().as_slice(), "Task"),
    })
}

/// Prompts for every field of a group
pub fn prompt_team(store: &TaskStore, current: Option<&Team>) -> Result<NewTeam> {
    let name = prompt_text("Name:", current.map(|t| t.name.as_str()))?;
    let description = prompt_text("Description:", current.map(|t| t.description.as_str()))?;

    let people_text = current.map(|t| t.people_text(store.people().as_slice())).unwrap_or_default();
    let person_names = prompt_names("Users (comma separated):", &people_text)?;
    let items_text = current.map(|t| t.items_text(store.items().as_slice())).unwrap_or_default();
    let item_titles = prompt_names("Tasks (comma separated):", &items_text)?;

    Ok(NewTeam {
        name,
        description,
        person_ids: resolve_names(&person_names, store.people().as_slice(), "User"),
        item_ids: resolve_names(&item_titles, store.items().as_slice(), "Task"),
    })
}

/// Asks before deleting; defaults to no
pub fn confirm_delete(what: &str) -> Result<bool> {
    let confirm = Confirm::new(&format!("Are you sure you want to delete this {}?", what))
        .with_default(false)
        .prompt()?;
    Ok(confirm)
}

/// Default due date offered for new tasks
fn today_text() -> String {
    format_due_date(chrono::Local::now().date_naive())
}
