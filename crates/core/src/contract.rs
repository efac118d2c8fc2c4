//! Futures contract codes such as `ESH25_FUT_CME`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// Month codes in calendar order.
pub const MONTH_CODES: &str = "FGHJKMNQUVXZ";

/// A parsed contract code: root, delivery month, two-digit year, suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractCode {
    /// Product root (e.g. "ES").
    pub root: String,
    /// Delivery month code (e.g. 'H').
    pub month_code: char,
    /// Two-digit year (e.g. 25).
    pub year: u8,
    /// Exchange suffix without the leading underscore (e.g. "FUT_CME").
    pub suffix: Option<String>,
}

impl ContractCode {
    /// Parse `<ROOT><MONTH><YY>[_<SUFFIX>]`.
    pub fn parse(code: &str) -> Result<Self> {
        let (head, suffix) = match code.split_once('_') {
            Some((head, rest)) => (head, Some(rest.to_string())),
            None => (code, None),
        };

        if head.len() < 4 || !head.is_ascii() {
            return Err(Error::data(format!("invalid contract code '{code}'")));
        }

        let (root, tail) = head.split_at(head.len() - 3);
        let month_code = tail.as_bytes()[0] as char;
        if !MONTH_CODES.contains(month_code) {
            return Err(Error::data(format!(
                "invalid month code '{month_code}' in '{code}'"
            )));
        }
        let year: u8 = tail[1..]
            .parse()
            .map_err(|_| Error::data(format!("invalid year in contract code '{code}'")))?;

        Ok(Self {
            root: root.to_string(),
            month_code,
            year,
            suffix,
        })
    }

    /// Delivery month, 1-12.
    pub fn month(&self) -> u32 {
        MONTH_CODES
            .find(self.month_code)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    /// Sort key: (year, month).
    fn key(&self) -> (u8, u32) {
        (self.year, self.month())
    }
}

impl PartialOrd for ContractCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContractCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.root.cmp(&other.root))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl fmt::Display for ContractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:02}", self.root, self.month_code, self.year)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "_{suffix}")?;
        }
        Ok(())
    }
}

/// List contract codes between two `<MONTH><YY>` codes, inclusive.
///
/// `pattern` contains a `{MYY}` placeholder, e.g. `"ES{MYY}_FUT_CME"`;
/// `months` lists the listed delivery months, e.g. `"HMUZ"`.
pub fn contract_chain(pattern: &str, months: &str, start: &str, end: &str) -> Result<Vec<String>> {
    let parse_myy = |s: &str| -> Result<(u8, char)> {
        let mut chars = s.chars();
        let month = chars
            .next()
            .filter(|c| MONTH_CODES.contains(*c))
            .ok_or_else(|| Error::config(format!("invalid month/year code '{s}'")))?;
        let year = chars
            .as_str()
            .parse::<u8>()
            .map_err(|_| Error::config(format!("invalid month/year code '{s}'")))?;
        Ok((year, month))
    };

    let (start_year, start_month) = parse_myy(start)?;
    let (end_year, end_month) = parse_myy(end)?;
    let month_index = |c: char| MONTH_CODES.find(c).unwrap_or(0);

    let mut listed: Vec<char> = months.chars().filter(|c| MONTH_CODES.contains(*c)).collect();
    listed.sort_by_key(|c| month_index(*c));

    let mut chain = Vec::new();
    for year in start_year..=end_year {
        for &month in &listed {
            if year == start_year && month_index(month) < month_index(start_month) {
                continue;
            }
            if year == end_year && month_index(month) > month_index(end_month) {
                continue;
            }
            chain.push(pattern.replace("{MYY}", &format!("{month}{year:02}")));
        }
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        let code = ContractCode::parse("NQH25_FUT_CME").unwrap();
        assert_eq!(code.root, "NQ");
        assert_eq!(code.month_code, 'H');
        assert_eq!(code.month(), 3);
        assert_eq!(code.year, 25);
        assert_eq!(code.suffix.as_deref(), Some("FUT_CME"));
        assert_eq!(code.to_string(), "NQH25_FUT_CME");
    }

    #[test]
    fn test_ordering_by_expiry() {
        let mut codes: Vec<ContractCode> = ["ESZ24", "ESH25", "ESU24", "ESM25"]
            .iter()
            .map(|c| ContractCode::parse(c).unwrap())
            .collect();
        codes.sort();
        let names: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["ESU24", "ESZ24", "ESH25", "ESM25"]);
    }

    #[test]
    fn test_invalid_codes() {
        assert!(ContractCode::parse("ES").is_err());
        assert!(ContractCode::parse("ESA25").is_err());
        assert!(ContractCode::parse("ESHxx").is_err());
    }

    #[test]
    fn test_contract_chain() {
        let chain = contract_chain("ES{MYY}_FUT_CME", "HMUZ", "N23", "H24").unwrap();
        assert_eq!(chain, vec!["ESU23_FUT_CME", "ESZ23_FUT_CME", "ESH24_FUT_CME"]);
    }
}
