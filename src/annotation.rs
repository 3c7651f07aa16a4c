//! Parser for per-field index annotations.
//!
//! An annotation is a comma separated list of tokens taken from
//! `asc`, `desc`, `unique`, `ttl=<seconds>` and `name=<identifier>`.
//! Tokens are case-sensitive and may appear in any order. The empty
//! annotation requests a plain ascending, non-unique index.

use log::debug;
use thiserror::Error;

use crate::schema::{ Direction, IndexMode, IndexOption };

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("both 'asc' and 'desc' specified")]
    ConflictingDirection,
    #[error("invalid ttl value '{0}': expected a non-negative integer")]
    InvalidTtlValue(String),
    #[error("invalid index name '{0}'")]
    InvalidName(String),
    #[error("unknown index option '{0}'")]
    UnknownOption(String),
    #[error("conflicting index options: {0}")]
    ConflictingOptions(String),
}

/// Parses a raw annotation into a validated [`IndexOption`].
pub fn parse(raw: &str) -> Result<IndexOption, ParseError> {
    if raw.trim().is_empty() {
        return Ok(IndexOption::default());
    }

    let mut asc = false;
    let mut desc = false;
    let mut unique = false;
    let mut ttl: Option<u64> = None;
    let mut name: Option<String> = None;

    for token in raw.split(',').map(|t| t.trim_matches(|c: char| c.is_ascii_whitespace())) {
        match token {
            "asc" => {
                asc = true;
            }
            "desc" => {
                desc = true;
            }
            "unique" => {
                unique = true;
            }
            _ => {
                if let Some(value) = token.strip_prefix("ttl=") {
                    let seconds = parse_ttl(value)?;
                    if ttl.is_some_and(|prev| prev != seconds) {
                        return Err(ParseError::ConflictingOptions(format!("ttl specified twice in '{}'", raw)));
                    }
                    ttl = Some(seconds);
                } else if let Some(value) = token.strip_prefix("name=") {
                    let value = parse_name(value)?;
                    if name.as_deref().is_some_and(|prev| prev != value) {
                        return Err(ParseError::ConflictingOptions(format!("name specified twice in '{}'", raw)));
                    }
                    name = Some(value.to_string());
                } else {
                    return Err(ParseError::UnknownOption(token.to_string()));
                }
            }
        }
    }

    if asc && desc {
        return Err(ParseError::ConflictingDirection);
    }

    let mode = match ttl {
        Some(_) if desc => {
            return Err(ParseError::ConflictingOptions("ttl index cannot be descending".into()));
        }
        Some(_) if unique => {
            return Err(ParseError::ConflictingOptions("ttl index cannot be unique".into()));
        }
        Some(seconds) => IndexMode::Ttl { seconds },
        None =>
            IndexMode::Sorted {
                direction: if desc { Direction::Descending } else { Direction::Ascending },
                unique,
            },
    };

    let option = IndexOption { mode, name };
    debug!("Parsed index annotation '{}' into {:?}", raw, option);
    Ok(option)
}

fn parse_ttl(value: &str) -> Result<u64, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidTtlValue(value.to_string()));
    }
    value.parse::<u64>().map_err(|_| ParseError::InvalidTtlValue(value.to_string()))
}

fn parse_name(value: &str) -> Result<&str, ParseError> {
    if value.is_empty() || value.trim() != value {
        return Err(ParseError::InvalidName(value.to_string()));
    }
    Ok(value)
}
