//! Command definitions and their execution against an `ExpenseService`.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use spendcache_core::models::{parse_wire_date, total_amount, WIRE_DATE_FORMAT};
use spendcache_core::utils::{format_amount, format_date, truncate_string};
use spendcache_core::{Expense, ExpenseBackend, ExpenseDraft, ExpenseService, Session};

/// Width of the title column in listings
const TITLE_WIDTH: usize = 28;

const SHELL_PROMPT: &str = "spendcache> ";

#[derive(Debug, Parser)]
#[command(name = "spendcache", version, about = "Track personal expenses against a remote expense store")]
pub struct Cli {
    /// User id to act as (defaults to SPENDCACHE_USER or the last one used)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Expense(ExpenseCommand),

    /// Read commands from stdin, keeping the cache warm between them
    Shell,
}

#[derive(Debug, Subcommand)]
pub enum ExpenseCommand {
    /// List expenses, optionally within an inclusive date range
    List {
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
        /// Ignore cached data
        #[arg(long)]
        refresh: bool,
    },
    /// Show the running total
    Total {
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
    },
    /// Record a new expense
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an expense by id
    Delete { id: String },
    /// Drop cached data for the current user, or for everyone with --all
    Invalidate {
        #[arg(long)]
        all: bool,
    },
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_wire_date(raw).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", raw))
}

impl ExpenseCommand {
    pub async fn execute<B: ExpenseBackend, W: Write>(
        self,
        service: &ExpenseService<B>,
        session: &Session,
        out: &mut W,
    ) -> Result<()> {
        let user = || {
            session
                .user_id()
                .context("No user selected; pass --user or set SPENDCACHE_USER")
        };

        match self {
            ExpenseCommand::List { from, to, refresh } => {
                let user = user()?;
                let expenses = service.fetch_expenses(user, from, to, refresh).await?;
                render_expenses(out, &expenses)?;
                if let Some(entry) = service.cached_entry(user) {
                    writeln!(out, "(cached {})", entry.age_display(service.now()))?;
                }
            }
            ExpenseCommand::Total { from, to } => {
                let total = service.total_for(user()?, from, to).await?;
                writeln!(out, "Total: {}", format_amount(&total))?;
            }
            ExpenseCommand::Add { title, amount, date } => {
                let date = date.unwrap_or_else(|| {
                    Local::now().date_naive().format(WIRE_DATE_FORMAT).to_string()
                });
                let draft = ExpenseDraft::parse(&title, &amount, &date)?;
                let id = service.add_expense(user()?, draft).await?;
                writeln!(out, "Added expense {}", id)?;
            }
            ExpenseCommand::Delete { id } => {
                let deleted = service.delete_expense(&id).await?;
                writeln!(
                    out,
                    "Deleted {} ({})",
                    deleted.title,
                    format_amount(&deleted.amount)
                )?;
            }
            ExpenseCommand::Invalidate { all } => {
                if all {
                    service.invalidate_cache(None);
                } else {
                    service.invalidate_cache(Some(user()?));
                }
                writeln!(out, "Cache cleared")?;
            }
        }
        Ok(())
    }
}

fn render_expenses<W: Write>(out: &mut W, expenses: &[Expense]) -> Result<()> {
    if expenses.is_empty() {
        writeln!(out, "No expenses found")?;
        return Ok(());
    }
    for expense in expenses {
        writeln!(
            out,
            "{:<8} {}  {:<width$} {:>10}",
            expense.id,
            format_date(expense.date),
            truncate_string(&expense.title, TITLE_WIDTH),
            format_amount(&expense.amount),
            width = TITLE_WIDTH
        )?;
    }
    writeln!(
        out,
        "{} expense(s), total {}",
        expenses.len(),
        format_amount(&total_amount(expenses))
    )?;
    Ok(())
}

// ============================================================================
// Interactive shell
// ============================================================================

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Expense(ExpenseCommand),

    /// Act as another user id
    Login { user: String },

    /// Sign out and clear all cached expenses
    Logout,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

pub async fn run_shell<B: ExpenseBackend>(
    service: &ExpenseService<B>,
    session: &mut Session,
) -> Result<()> {
    let mut out = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt(&mut out)?;
    while let Some(line) = lines.next_line().await? {
        let words = split_args(&line);
        if !words.is_empty() {
            match ShellLine::try_parse_from(words) {
                Ok(ShellLine { command: ShellCommand::Quit }) => break,
                Ok(ShellLine { command: ShellCommand::Login { user } }) => {
                    session.sign_in(user);
                }
                Ok(ShellLine { command: ShellCommand::Logout }) => {
                    session.sign_out(service);
                    writeln!(out, "Signed out")?;
                }
                Ok(ShellLine { command: ShellCommand::Expense(command) }) => {
                    if let Err(e) = command.execute(service, session, &mut out).await {
                        writeln!(out, "error: {:#}", e)?;
                    }
                }
                Err(e) => write!(out, "{}", e.render())?,
            }
        }
        prompt(&mut out)?;
    }
    Ok(())
}

fn prompt<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "{}", SHELL_PROMPT)?;
    out.flush()?;
    Ok(())
}

/// Split a shell line on whitespace, keeping double-quoted runs together.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}
