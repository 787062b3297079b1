// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

use expense_tracker::config::{Cli, Command};
use expense_tracker::{logging, ExpenseStore, NewExpense, DATE_FORMAT, TABLE_HEADERS};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref(), cli.is_interactive())?;

    let store = open_store(&cli.db);

    match cli.command() {
        Command::Ui => run_ui_mode(store)?,
        Command::List { json } => run_list(store, json)?,
        Command::Add {
            date,
            category,
            amount,
            description,
        } => run_add(store, date, &category, &amount, &description)?,
        Command::Delete { id, yes } => run_delete(store, id, yes)?,
        Command::Export { path } => run_export(store, &path)?,
        Command::Import { path } => run_import(store, &path)?,
    }

    Ok(())
}

/// Open the store and make sure the table exists.
/// Failing here is the one error that ends the program.
fn open_store(db_path: &Path) -> ExpenseStore {
    let opened = ExpenseStore::open(db_path).and_then(|store| {
        store.ensure_schema()?;
        Ok(store)
    });

    match opened {
        Ok(store) => {
            info!(path = %db_path.display(), "expense store ready");
            store
        }
        Err(e) => {
            eprintln!("❌ Could not open database");
            eprintln!("   {}", e);
            std::process::exit(1);
        }
    }
}

/// Close the store whatever `result` holds, then hand `result` back.
fn close_after<T>(store: ExpenseStore, result: Result<T>) -> Result<T> {
    store.close()?;
    result
}

fn run_add(
    store: ExpenseStore,
    date: Option<String>,
    category: &str,
    amount: &str,
    description: &str,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive().format(DATE_FORMAT).to_string());
    let result = NewExpense::parse(&date, category, amount, description)
        .and_then(|expense| store.insert(&expense))
        .map_err(anyhow::Error::from);
    let id = close_after(store, result)?;

    println!("✓ Added expense #{}", id);
    Ok(())
}

fn run_export(store: ExpenseStore, path: &Path) -> Result<()> {
    let result = store
        .export_csv(path)
        .with_context(|| format!("Failed to export to {}", path.display()));
    let count = close_after(store, result)?;

    println!("✓ Exported {} expenses to {}", count, path.display());
    Ok(())
}

fn run_import(store: ExpenseStore, path: &Path) -> Result<()> {
    let result = store
        .import_csv(path)
        .with_context(|| format!("Failed to import {}", path.display()));
    let count = close_after(store, result)?;

    println!("✓ Imported {} expenses from {}", count, path.display());
    Ok(())
}

fn run_list(store: ExpenseStore, json: bool) -> Result<()> {
    let result = store.list_all().map_err(anyhow::Error::from);
    let expenses = close_after(store, result)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:<10}  {:<14}  {:>10}  {}",
        TABLE_HEADERS[0], TABLE_HEADERS[1], TABLE_HEADERS[2], TABLE_HEADERS[3], TABLE_HEADERS[4]
    );
    for e in &expenses {
        println!(
            "{:>5}  {:<10}  {:<14}  {:>10}  {}",
            e.id,
            e.date,
            e.category,
            e.amount.to_string(),
            e.description
        );
    }
    println!("\n✓ {} expenses", expenses.len());

    Ok(())
}

fn run_delete(store: ExpenseStore, id: i64, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Delete expense #{}? [y/N] ", id))? {
        println!("Cancelled");
        return close_after(store, Ok(()));
    }

    let result = store.delete(id).map_err(anyhow::Error::from);
    match close_after(store, result)? {
        0 => println!("No expense #{} (nothing deleted)", id),
        _ => println!("✓ Deleted expense #{}", id),
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: ExpenseStore) -> Result<()> {
    let controller = expense_tracker::FormController::new(store)?;

    let mut app = ui::App::new(controller);
    ui::run_ui(&mut app)?;

    app.controller.into_store().close()?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: ExpenseStore) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the subcommands: list, add, delete, export, import");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_store(dir: &Path) -> (ExpenseStore, std::path::PathBuf) {
        let path = dir.join("expense.db");
        let store = ExpenseStore::open(&path).unwrap();
        store.ensure_schema().unwrap();
        (store, path)
    }

    fn wal_file(db_path: &Path) -> std::path::PathBuf {
        let mut name = db_path.as_os_str().to_owned();
        name.push("-wal");
        name.into()
    }

    #[test]
    fn test_list_closes_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = file_store(dir.path());
        assert!(wal_file(&path).exists());

        run_list(store, true).unwrap();

        // Closing the last connection checkpoints and removes the WAL file
        assert!(!wal_file(&path).exists());
    }

    #[test]
    fn test_failed_import_still_closes_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = file_store(dir.path());
        let csv_path = dir.path().join("bad.csv");
        std::fs::write(&csv_path, "Date,Category,Amount,Description\n2024-01-15,Food,abc,x\n").unwrap();

        let err = run_import(store, &csv_path).unwrap_err();

        assert!(err.to_string().contains("Failed to import"));
        assert!(!wal_file(&path).exists());
    }

    #[test]
    fn test_failed_add_still_closes_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = file_store(dir.path());

        assert!(run_add(store, None, "Food", "", "no amount").is_err());

        assert!(!wal_file(&path).exists());
        let reopened = ExpenseStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 0);
    }
}
