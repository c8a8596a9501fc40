//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

use bankist_core::{Money, RelativeDay};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Separators and symbol placement for one locale
struct NumberStyle {
    group: Option<char>,
    decimal: char,
    /// Integer digits needed before grouping kicks in
    min_grouping_digits: usize,
    symbol_first: bool,
}

fn number_style(locale: &str) -> NumberStyle {
    match locale {
        "en-US" | "en-GB" => NumberStyle {
            group: Some(','),
            decimal: '.',
            min_grouping_digits: 4,
            symbol_first: true,
        },
        "de-DE" => NumberStyle {
            group: Some('.'),
            decimal: ',',
            min_grouping_digits: 4,
            symbol_first: false,
        },
        "pt-PT" => NumberStyle {
            group: Some('\u{a0}'),
            decimal: ',',
            min_grouping_digits: 5,
            symbol_first: false,
        },
        _ => NumberStyle {
            group: None,
            decimal: '.',
            min_grouping_digits: usize::MAX,
            symbol_first: false,
        },
    }
}

fn currency_symbol(currency: &str) -> &str {
    match currency {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        other => other,
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

/// Format an amount with two decimals in its account's locale and currency
pub fn format_money(money: &Money) -> String {
    let style = number_style(&money.locale);
    let fixed = format!("{:.2}", money.amount.abs().round_dp(2));
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let integer = match style.group {
        Some(separator) if integer.len() >= style.min_grouping_digits => {
            group_digits(integer, separator)
        }
        _ => integer.to_string(),
    };
    let number = format!("{}{}{}", integer, style.decimal, fraction);
    let sign = if money.amount < Decimal::ZERO { "-" } else { "" };
    let symbol = currency_symbol(&money.currency);

    if style.symbol_first {
        format!("{}{}{}", sign, symbol, number)
    } else {
        format!("{}{}\u{a0}{}", sign, number, symbol)
    }
}

/// Human label for a movement date
pub fn format_relative(label: &RelativeDay, locale: &str) -> String {
    match label {
        RelativeDay::Today => "Today".to_string(),
        RelativeDay::Yesterday => "Yesterday".to_string(),
        RelativeDay::DaysAgo(days) => format!("{} days ago", days),
        RelativeDay::WeeksAgo(1) => "1 week ago".to_string(),
        RelativeDay::WeeksAgo(weeks) => format!("{} weeks ago", weeks),
        RelativeDay::CalendarDate(date) => match locale {
            "en-US" => date.format("%m/%d/%Y").to_string(),
            "de-DE" => date.format("%d.%m.%Y").to_string(),
            _ => date.format("%d/%m/%Y").to_string(),
        },
    }
}

/// Remaining countdown as mm:ss
pub fn format_countdown(remaining_secs: u64) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}
