//! Accounts command - list the registry without credentials

use anyhow::Result;
use colored::Colorize;

use super::{get_context, GlobalOptions};
use crate::output::{create_table, format_money};

pub fn run(options: &GlobalOptions, json: bool) -> Result<()> {
    let ctx = get_context(options)?;
    let accounts = ctx.session.list_accounts()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    println!("{}", "Accounts".bold());
    println!();

    let mut table = create_table();
    table.set_header(vec!["Owner", "Username", "Balance", "Movements"]);
    for account in &accounts {
        table.add_row(vec![
            account.owner.clone(),
            account.username.clone(),
            format_money(&account.balance),
            account.movement_count.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
