//! Shell command - interactive Bankist session
//!
//! Reads commands from stdin while listening for session events, so an
//! expired session is reported even when the user is idle at the prompt.

use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use bankist_core::{BankistContext, DisplayBundle, MovementKind, OperationResult, SessionEvent};

use super::{get_context, GlobalOptions};
use crate::output::{self, create_table, format_countdown, format_money, format_relative};

const HELP: &str = "\
Commands:
  login <user> <pin>       Start a session
  transfer <to> <amount>   Send money to another account
  loan <amount>            Request a loan
  close <user> <pin>       Close the logged-in account
  sort                     Toggle sorting movements by amount
  status                   Show the current account
  history [--errors]       Show recent activity
  help                     Show this help
  quit                     Leave the shell";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Login { username: String, pin: String },
    Transfer { to: String, amount: Decimal },
    Loan { amount: Decimal },
    Close { username: String, pin: String },
    Sort,
    Status,
    History { errors: bool },
    Help,
    Quit,
}

fn parse_amount(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Not a number: {}", raw))
}

/// Parse one input line; blank lines yield `None`
fn parse(line: &str) -> Result<Option<Command>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(None);
    };

    let arg = |i: usize| args.get(i).map(|s| s.to_string()).unwrap_or_default();
    let command = match name {
        "login" => Command::Login {
            username: arg(0),
            pin: arg(1),
        },
        "transfer" => {
            let [to, amount] = args else {
                return Err("Usage: transfer <to> <amount>".to_string());
            };
            Command::Transfer {
                to: to.to_string(),
                amount: parse_amount(amount)?,
            }
        }
        "loan" => {
            let [amount] = args else {
                return Err("Usage: loan <amount>".to_string());
            };
            Command::Loan {
                amount: parse_amount(amount)?,
            }
        }
        "close" => Command::Close {
            username: arg(0),
            pin: arg(1),
        },
        "sort" => Command::Sort,
        "status" => Command::Status,
        "history" => Command::History {
            errors: args.contains(&"--errors"),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };
    Ok(Some(command))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => output::error(&format!("Failed to encode output: {}", e)),
    }
}

fn render_bundle(bundle: &DisplayBundle) {
    let Some(account) = &bundle.account else {
        output::info("Log in to get started");
        return;
    };

    println!();
    println!("{}", format!("Welcome back, {}!", account.first_name).bold());
    println!("Current balance: {}", format_money(&account.balance).bold());
    println!();

    let mut table = create_table();
    table.set_header(vec!["#", "Type", "Date", "Amount"]);
    for movement in &account.movements {
        let kind = match movement.kind {
            MovementKind::Deposit => "deposit".green(),
            MovementKind::Withdrawal => "withdrawal".red(),
        };
        table.add_row(vec![
            movement.position.to_string(),
            kind.to_string(),
            format_relative(&movement.label, &account.locale),
            format_money(&movement.amount),
        ]);
    }
    println!("{}", table);

    println!(
        "In: {}  Out: {}  Interest: {}",
        format_money(&account.total_in).green(),
        format_money(&account.total_out).red(),
        format_money(&account.total_interest).green(),
    );
    if let Some(remaining) = bundle.remaining_secs {
        println!("You will be logged out in {}", format_countdown(remaining));
    }
    println!();
}

fn report<T: Serialize>(result: bankist_core::domain::Result<T>, json: bool, on_ok: impl FnOnce(&T)) {
    if json {
        print_json(&OperationResult::from(result));
        return;
    }
    match result {
        Ok(data) => on_ok(&data),
        Err(e) => output::error(&e.to_string()),
    }
}

fn show_history(ctx: &BankistContext, errors: bool, json: bool) {
    let entries = if errors {
        ctx.activity.get_errors(20)
    } else {
        ctx.activity.get_recent(20)
    };

    if json {
        print_json(&OperationResult::ok(entries));
        return;
    }
    if entries.is_empty() {
        output::info("No activity yet");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Event", "User", "Error"]);
    for entry in entries.iter().rev() {
        table.add_row(vec![
            entry.timestamp.format("%H:%M:%S").to_string(),
            entry.event.clone(),
            entry.username.clone().unwrap_or_default(),
            entry.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

fn execute(ctx: &BankistContext, command: Command, json: bool) {
    let session = &ctx.session;
    match command {
        Command::Login { username, pin } => {
            report(session.login(&username, &pin), json, render_bundle)
        }
        Command::Transfer { to, amount } => report(session.transfer(&to, amount), json, |bundle| {
            output::success("Transfer completed");
            render_bundle(bundle);
        }),
        Command::Loan { amount } => report(session.request_loan(amount), json, |bundle| {
            output::success("Loan approved");
            render_bundle(bundle);
        }),
        Command::Close { username, pin } => {
            let result = session.close_account(&username, &pin).map(|a| a.username);
            report(result, json, |closed| {
                output::warning(&format!("Account {} closed, you have been logged out", closed));
            })
        }
        Command::Sort => report(session.toggle_sort(), json, render_bundle),
        Command::Status => report(session.display(), json, render_bundle),
        Command::History { errors } => show_history(ctx, errors, json),
        Command::Help => {
            if json {
                print_json(&OperationResult::ok(HELP));
            } else {
                println!("{}", HELP);
            }
        }
        Command::Quit => {}
    }
}

fn on_event(event: SessionEvent, json: bool) {
    match event {
        SessionEvent::Expired => {
            if json {
                print_json(&event);
            } else {
                println!();
                output::warning("Session expired, you have been logged out");
            }
        }
        // everything else is rendered from the command's own result
        SessionEvent::Updated(_) | SessionEvent::Tick { .. } | SessionEvent::LoggedOut => {}
    }
}

fn prompt(ctx: &BankistContext, json: bool) {
    if json {
        return;
    }
    let label = match (ctx.session.active_username(), ctx.session.remaining_secs()) {
        (Some(user), Some(remaining)) => format!("{} {}", user, format_countdown(remaining)),
        (Some(user), None) => user,
        _ => "bankist".to_string(),
    };
    print!("{}> ", label.cyan());
    let _ = std::io::stdout().flush();
}

pub async fn run(options: &GlobalOptions, json: bool) -> Result<()> {
    let ctx = get_context(options)?;
    let mut events = ctx.session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        println!("{}", "Bankist".bold());
        println!(
            "Sessions end after {} of inactivity. Type 'help' for commands.",
            format_countdown(ctx.config.logout_after.as_secs())
        );
    }
    prompt(&ctx, json);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(&ctx, command, json),
                    Ok(None) => {}
                    Err(msg) if json => print_json(&OperationResult::<()>::fail(msg)),
                    Err(msg) => output::error(&msg),
                }
                prompt(&ctx, json);
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Expired) => {
                    on_event(SessionEvent::Expired, json);
                    prompt(&ctx, json);
                }
                Ok(event) => on_event(event, json),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("shell closed");
    Ok(())
}
