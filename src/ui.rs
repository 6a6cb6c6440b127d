// UI layer: interactive login and menu loop built on `dialoguer`, with
// `indicatif` spinners around network calls. All remote work is delegated
// to `client`; this module only collects input and renders results.

use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::{role_permits, DirectoryClient, TokenRecord, PRIVILEGED_ROLE};

const ROLE_CHOICES: [&str; 3] = ["VISITOR", "EDITOR", "ADMIN"];

/// Entry point for the interactive session: prompt for credentials,
/// authenticate, gate on the privileged role, then run the menu loop.
/// Authentication failure or an insufficient role prints a message and
/// returns without offering the menu.
pub fn run(mut client: DirectoryClient) -> Result<()> {
    println!("Directory administration client");
    println!("-------------------------------");

    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    let sp = spinner("Logging in...");
    let auth = client.authenticate(&username, &password);
    sp.finish_and_clear();

    if let Err(err) = auth {
        println!("Login failed: {err}");
        return Ok(());
    }
    if !role_permits(client.session().role()) {
        let role = client.session().role().unwrap_or("unknown");
        println!("Access denied: role {PRIVILEGED_ROLE} required, your role is {role}");
        return Ok(());
    }
    println!("Welcome {username} ({PRIVILEGED_ROLE})");

    main_menu(&client)
}

fn main_menu(client: &DirectoryClient) -> Result<()> {
    let items = vec![
        "List all users",
        "Create a user",
        "Update a user",
        "Delete a user",
        "List all tokens",
        "Generate a token for a user",
        "Delete a token",
        "List a user's tokens",
        "Reactivate a token",
        "Revoke a token",
        "Refresh",
        "Quit",
    ];
    loop {
        println!();
        let selection = Select::new()
            .with_prompt("Choose an operation")
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => list_users(client),
            1 => create_user(client)?,
            2 => update_user(client)?,
            3 => delete_user(client)?,
            4 => list_tokens(client),
            5 => generate_token(client)?,
            6 => delete_token(client)?,
            7 => list_tokens_by_user(client)?,
            8 => reactivate_token(client)?,
            9 => revoke_token(client)?,
            10 => continue,
            11 => break,
            _ => {}
        }
    }
    Ok(())
}

fn list_users(client: &DirectoryClient) {
    let sp = spinner("Fetching users...");
    let users = client.list_users();
    sp.finish_and_clear();
    match users {
        Ok(users) if users.is_empty() => println!("No users found."),
        Ok(users) => {
            println!("{:<4} {:<15} {:<25} {:<10}", "ID", "Username", "Email", "Role");
            println!("{}", "-".repeat(60));
            for user in &users {
                println!(
                    "{:<4} {:<15} {:<25} {:<10}",
                    user.get("id"),
                    user.get("username"),
                    user.get("email"),
                    user.get("role"),
                );
            }
        }
        Err(err) => println!("Could not list users: {err}"),
    }
}

fn create_user(client: &DirectoryClient) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;
    let role = ROLE_CHOICES[Select::new()
        .with_prompt("Role")
        .items(&ROLE_CHOICES)
        .default(0)
        .interact()?];

    let sp = spinner("Creating user...");
    let res = client.create_user(&username, &email, &password, role);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("User created."),
        Err(err) => println!("Could not create user: {err}"),
    }
    Ok(())
}

fn update_user(client: &DirectoryClient) -> Result<()> {
    let id: i64 = Input::new().with_prompt("User id").interact_text()?;
    // Blank input means "leave unchanged"; the server expects the literal
    // sentinel rather than an omitted field.
    let username = optional_field("New username (blank to keep)")?;
    let email = optional_field("New email (blank to keep)")?;
    let password = optional_field("New password (blank to keep)")?;
    println!("Available roles: {}", ROLE_CHOICES.join(", "));
    let role_input: String = Input::new()
        .with_prompt("New role (blank to keep)")
        .allow_empty(true)
        .interact_text()?;
    let role = role_or_unchanged(&role_input);

    let sp = spinner("Updating user...");
    let res = client.update_user(id, &username, &email, &password, &role);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("User updated."),
        Err(err) => println!("Could not update user: {err}"),
    }
    Ok(())
}

fn delete_user(client: &DirectoryClient) -> Result<()> {
    let id: i64 = Input::new().with_prompt("User id to delete").interact_text()?;
    if !Confirm::new()
        .with_prompt(format!("Really delete user {id}?"))
        .default(false)
        .interact()?
    {
        println!("Deletion cancelled.");
        return Ok(());
    }
    let sp = spinner("Deleting user...");
    let res = client.delete_user(id);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("User deleted."),
        Err(err) => println!("Could not delete user: {err}"),
    }
    Ok(())
}

fn list_tokens(client: &DirectoryClient) {
    let sp = spinner("Fetching tokens...");
    let tokens = client.list_tokens();
    sp.finish_and_clear();
    match tokens {
        Ok(tokens) if tokens.is_empty() => println!("No tokens found."),
        Ok(tokens) => {
            println!(
                "{:<4} {:<8} {:<20} {:<20} {:<8}",
                "ID", "User ID", "Created", "Expires", "Revoked"
            );
            println!("{}", "-".repeat(70));
            for token in &tokens {
                println!(
                    "{:<4} {:<8} {:<20} {:<20} {:<8}",
                    token.get("id"),
                    token.get("userId"),
                    short_timestamp(token.get("createdAt")),
                    short_timestamp(token.get("expiresAt")),
                    token.get("revoked"),
                );
            }
        }
        Err(err) => println!("Could not list tokens: {err}"),
    }
}

fn generate_token(client: &DirectoryClient) -> Result<()> {
    let user_id: i64 = Input::new().with_prompt("User id").interact_text()?;
    let sp = spinner("Generating token...");
    let res = client.generate_token(user_id);
    sp.finish_and_clear();
    match res {
        Ok(token) => {
            println!("Token generated for user {user_id}");
            print_token_details(&token);
        }
        Err(err) => println!("Could not generate token: {err}"),
    }
    Ok(())
}

fn delete_token(client: &DirectoryClient) -> Result<()> {
    let id: i64 = Input::new().with_prompt("Token id to delete").interact_text()?;
    if !Confirm::new()
        .with_prompt(format!("Really delete token {id}?"))
        .default(false)
        .interact()?
    {
        println!("Deletion cancelled.");
        return Ok(());
    }
    let sp = spinner("Deleting token...");
    let res = client.delete_token(id);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("Token deleted."),
        Err(err) => println!("Could not delete token: {err}"),
    }
    Ok(())
}

fn list_tokens_by_user(client: &DirectoryClient) -> Result<()> {
    let user_id: i64 = Input::new().with_prompt("User id").interact_text()?;
    let sp = spinner("Fetching tokens...");
    let tokens = client.list_tokens_by_user(user_id);
    sp.finish_and_clear();
    match tokens {
        Ok(tokens) if tokens.is_empty() => println!("No tokens found for user {user_id}."),
        Ok(tokens) => {
            println!("Tokens for user {user_id}:");
            println!("{:<4} {:<20} {:<20} {:<8}", "ID", "Created", "Expires", "Revoked");
            println!("{}", "-".repeat(60));
            for token in &tokens {
                println!(
                    "{:<4} {:<20} {:<20} {:<8}",
                    token.get("id"),
                    short_timestamp(token.get("createdAt")),
                    short_timestamp(token.get("expiresAt")),
                    token.get("revoked"),
                );
            }
        }
        Err(err) => println!("Could not list tokens: {err}"),
    }
    Ok(())
}

fn reactivate_token(client: &DirectoryClient) -> Result<()> {
    let id: i64 = Input::new().with_prompt("Token id to reactivate").interact_text()?;
    let sp = spinner("Reactivating token...");
    let res = client.reactivate_token(id);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("Token reactivated."),
        Err(err) => println!("Could not reactivate token: {err}"),
    }
    Ok(())
}

fn revoke_token(client: &DirectoryClient) -> Result<()> {
    let id: i64 = Input::new().with_prompt("Token id to revoke").interact_text()?;
    if !Confirm::new()
        .with_prompt(format!("Really revoke token {id}?"))
        .default(false)
        .interact()?
    {
        println!("Revocation cancelled.");
        return Ok(());
    }
    let sp = spinner("Revoking token...");
    let res = client.revoke_token(id);
    sp.finish_and_clear();
    match res {
        Ok(()) => println!("Token revoked."),
        Err(err) => println!("Could not revoke token: {err}"),
    }
    Ok(())
}

fn print_token_details(token: &TokenRecord) {
    println!("  ID:      {}", token.get("id"));
    println!("  Created: {}", token.get("createdAt"));
    println!("  Expires: {}", token.get("expiresAt"));
}

/// Prompted field where blank input stands for "leave unchanged".
fn optional_field(prompt: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    if value.trim().is_empty() {
        Ok("unchanged".to_string())
    } else {
        Ok(value)
    }
}

/// Role entry is uppercased, but blank input must stay the lowercase
/// `unchanged` sentinel the server expects.
fn role_or_unchanged(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        "unchanged".to_string()
    } else {
        trimmed.to_uppercase()
    }
}

/// Server timestamps carry a sub-second tail; keep `YYYY-MM-DDTHH:MM:SS`.
fn short_timestamp(ts: &str) -> &str {
    ts.get(..19).unwrap_or(ts)
}

fn spinner(msg: &str) -> ProgressBar {
    let sp = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        sp.set_style(style);
    }
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(std::time::Duration::from_millis(80));
    sp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_role_stays_the_lowercase_sentinel() {
        assert_eq!(role_or_unchanged(""), "unchanged");
        assert_eq!(role_or_unchanged("   "), "unchanged");
    }

    #[test]
    fn typed_role_is_trimmed_and_uppercased() {
        assert_eq!(role_or_unchanged("editor"), "EDITOR");
        assert_eq!(role_or_unchanged(" admin "), "ADMIN");
    }

    #[test]
    fn timestamps_are_cut_to_seconds() {
        assert_eq!(short_timestamp("2026-01-01T00:00:00.123456"), "2026-01-01T00:00:00");
        assert_eq!(short_timestamp("N/A"), "N/A");
    }
}
