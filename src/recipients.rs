//! Recipient-list parsing, validation and aggregation.
//!
//! The file format is one recipient per line: `<address> [<amount-in-sol>]`,
//! fields separated by whitespace, commas or semicolons; `#` starts a
//! comment. Bad lines become warnings rather than hard failures so one typo
//! does not sink a 500-line payout file; the whole parse only fails when
//! nothing usable remains.

use std::collections::HashMap;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::constants::LAMPORTS_PER_SOL;
use crate::error::{PayoutError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: String,
    pub lamports: u64,
}

/// Parse outcome: the accepted set plus every per-line warning, letting the
/// caller decide between displaying the warnings and aborting.
#[derive(Debug, Default)]
pub struct ParsedRecipients {
    /// Aggregated recipients in first-seen address order.
    pub recipients: Vec<Recipient>,
    pub warnings: Vec<String>,
}

impl ParsedRecipients {
    pub fn total_lamports(&self) -> u128 {
        sum_lamports(&self.recipients)
    }
}

/// Sums in the wider type so a long list of large entries cannot wrap.
pub fn sum_lamports(recipients: &[Recipient]) -> u128 {
    recipients.iter().map(|r| u128::from(r.lamports)).sum()
}

/// Parses a recipient list from raw text. `default_amount_sol` applies to
/// lines that carry only an address. Duplicate addresses are merged by
/// summing lamports, with one warning per duplicated address.
pub fn parse_recipients(
    raw_text: &str,
    default_amount_sol: Option<&str>,
) -> Result<ParsedRecipients> {
    let mut warnings: Vec<String> = Vec::new();
    let mut recipients: Vec<Recipient> = Vec::new();
    let mut index_by_address: HashMap<String, usize> = HashMap::new();
    let mut extra_occurrences: HashMap<String, usize> = HashMap::new();
    let mut duplicate_order: Vec<String> = Vec::new();

    for (line_number, raw_line) in raw_text.lines().enumerate() {
        let line_number = line_number + 1;
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let recipient = match parse_line(line, line_number, default_amount_sol) {
            Ok(recipient) => recipient,
            Err(warning) => {
                warnings.push(warning);
                continue;
            }
        };
        match index_by_address.get(&recipient.address) {
            Some(&index) => {
                let merged = match recipients[index].lamports.checked_add(recipient.lamports) {
                    Some(total) => total,
                    None => {
                        warnings.push(format!(
                            "line {line_number}: merging another amount for {} overflows the \
                             per-recipient total; line skipped",
                            recipient.address
                        ));
                        continue;
                    }
                };
                recipients[index].lamports = merged;
                let count = extra_occurrences.entry(recipient.address.clone()).or_insert(0);
                if *count == 0 {
                    duplicate_order.push(recipient.address.clone());
                }
                *count += 1;
            }
            None => {
                index_by_address.insert(recipient.address.clone(), recipients.len());
                recipients.push(recipient);
            }
        }
    }

    for address in duplicate_order {
        let extra = extra_occurrences[&address];
        warnings.push(format!(
            "address {address} appears {} times; amounts were summed",
            extra + 1
        ));
    }

    if recipients.is_empty() {
        return Err(if warnings.is_empty() {
            PayoutError::RecipientParse(
                "the recipients file is empty or contains only comments".to_string(),
            )
        } else {
            PayoutError::RecipientParse(
                "no valid recipients could be loaded; check the file".to_string(),
            )
        });
    }

    debug!(
        recipients = recipients.len(),
        warnings = warnings.len(),
        "recipient list parsed"
    );
    Ok(ParsedRecipients {
        recipients,
        warnings,
    })
}

/// One physical line. Any rejection is reported as a warning string naming
/// the line number.
fn parse_line(
    line: &str,
    line_number: usize,
    default_amount_sol: Option<&str>,
) -> std::result::Result<Recipient, String> {
    let mut tokens = line
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| !token.is_empty());
    let address = match tokens.next() {
        Some(address) => address,
        None => return Err(format!("line {line_number} is empty")),
    };
    if Pubkey::from_str(address).is_err() {
        return Err(format!("invalid address on line {line_number}: {address}"));
    }
    let amount_text = match tokens.next() {
        Some(amount) => amount,
        None => match default_amount_sol {
            Some(default) => default,
            None => {
                return Err(format!(
                    "line {line_number} has no amount and no default amount was provided"
                ))
            }
        },
    };
    let lamports = decimal_sol_to_lamports(amount_text)
        .map_err(|reason| format!("invalid amount on line {line_number}: {reason}"))?;
    Ok(Recipient {
        address: address.to_string(),
        lamports,
    })
}

/// Exact decimal SOL → lamports conversion, truncating toward zero. Never
/// goes through floating point: nine fractional digits are taken verbatim
/// and anything beyond them is dropped.
pub fn decimal_sol_to_lamports(text: &str) -> std::result::Result<u64, String> {
    let text = text.trim();
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.starts_with('-') {
        return Err(format!("amount must be greater than zero, got {text}"));
    }
    let (whole_text, frac_text) = match unsigned.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (unsigned, ""),
    };
    if whole_text.is_empty() && frac_text.is_empty() {
        return Err(format!("not a number: {text:?}"));
    }
    if !whole_text.bytes().all(|b| b.is_ascii_digit())
        || !frac_text.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(format!("not a number: {text:?}"));
    }
    let whole: u64 = if whole_text.is_empty() {
        0
    } else {
        whole_text
            .parse()
            .map_err(|_| format!("amount out of range: {text}"))?
    };
    // First nine fractional digits are exact lamports; the rest truncate.
    let mut frac_digits: String = frac_text.chars().take(9).collect();
    while frac_digits.len() < 9 {
        frac_digits.push('0');
    }
    let frac: u64 = frac_digits.parse().expect("only ascii digits");
    let lamports = whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|value| value.checked_add(frac))
        .ok_or_else(|| format!("amount out of range: {text}"))?;
    if lamports == 0 {
        return Err(format!("amount is too small (0 lamports): {text}"));
    }
    Ok(lamports)
}
