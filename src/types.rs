//! Common types used throughout the crate
//!
//! Entity ids, operation ids and hbar amounts. All of them have a canonical
//! text form that round-trips through `Display` / `FromStr`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::operation::DispatchError;

/// Maximum memo length in UTF-8 bytes, for every memo-bearing field
pub const MAX_MEMO_BYTES: usize = 100;

/// Tinybars per hbar
pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// `shard.realm.num` identifier for accounts, topics, tokens, schedules and nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Shorthand for `0.0.num`
    pub const fn from_num(num: u64) -> Self {
        Self::new(0, 0, num)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |name: &str| -> Result<u64, String> {
            parts
                .next()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| format!("'{}' is missing the {} component", s, name))
                .and_then(|p| digits_only(s, name, p))?
                .parse::<u64>()
                .map_err(|e| format!("'{}' has an invalid {} component: {}", s, name, e))
        };
        let shard = next("shard")?;
        let realm = next("realm")?;
        let num = next("num")?;
        if parts.next().is_some() {
            return Err(format!("'{}' has more than three components", s));
        }
        Ok(Self { shard, realm, num })
    }
}

/// Parse an entity id from caller input, naming the field on failure
pub fn parse_entity_id(field: &str, value: &str) -> Result<EntityId, DispatchError> {
    value
        .parse()
        .map_err(|reason: String| DispatchError::invalid_input(field, reason))
}

/// Identifier of one operation: the payer plus the valid-start timestamp
///
/// Text form is `<payer>@<seconds>.<nanos>`, nanos zero-padded to nine digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId {
    pub payer: EntityId,
    pub valid_start_seconds: i64,
    pub valid_start_nanos: u32,
}

impl OperationId {
    pub fn new(payer: EntityId, valid_start: DateTime<Utc>) -> Self {
        Self {
            payer,
            valid_start_seconds: valid_start.timestamp(),
            valid_start_nanos: valid_start.timestamp_subsec_nanos(),
        }
    }

    pub fn valid_start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.valid_start_seconds, self.valid_start_nanos)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.payer, self.valid_start_seconds, self.valid_start_nanos
        )
    }
}

impl FromStr for OperationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (payer, start) = s
            .trim()
            .split_once('@')
            .ok_or_else(|| format!("'{}' is not of the form <payer>@<seconds>.<nanos>", s))?;
        let payer: EntityId = payer.parse()?;
        let (secs, nanos) = start
            .split_once('.')
            .ok_or_else(|| format!("'{}' valid start must be <seconds>.<nanos>", s))?;
        digits_only(s, "seconds", secs.strip_prefix('-').unwrap_or(secs))?;
        digits_only(s, "nanos", nanos)?;
        let valid_start_seconds = secs
            .parse::<i64>()
            .map_err(|e| format!("'{}' has invalid seconds: {}", s, e))?;
        if nanos.is_empty() || nanos.len() > 9 {
            return Err(format!("'{}' nanos must be 1 to 9 digits", s));
        }
        let valid_start_nanos = nanos
            .parse::<u32>()
            .map_err(|e| format!("'{}' has invalid nanos: {}", s, e))?;
        Ok(Self {
            payer,
            valid_start_seconds,
            valid_start_nanos,
        })
    }
}

/// `u64::parse` and friends accept a leading sign; canonical text forms do not
fn digits_only<'a>(s: &str, name: &str, part: &'a str) -> Result<&'a str, String> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' has a non-digit {} component", s, name));
    }
    Ok(part)
}

/// Check a memo against [`MAX_MEMO_BYTES`]
pub fn check_memo(field: &str, memo: &str) -> Result<(), DispatchError> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(DispatchError::invalid_input(
            field,
            format!("memo is {} bytes, limit is {}", memo.len(), MAX_MEMO_BYTES),
        ));
    }
    Ok(())
}

/// Convert a decimal hbar amount (as written by a caller) to tinybars
///
/// Accepts an optional sign and up to eight fractional digits.
pub fn hbar_to_tinybars(amount: &str) -> Result<i64, String> {
    let amount = amount.trim();
    let (negative, digits) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount.strip_prefix('+').unwrap_or(amount)),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("'{}' is not a number", amount));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a number", amount));
    }
    if frac.len() > 8 {
        return Err(format!("'{}' has more than 8 decimal places", amount));
    }
    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|e| format!("'{}' is not a number: {}", amount, e))?
    };
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<8}", frac);
        padded
            .parse()
            .map_err(|e| format!("'{}' is not a number: {}", amount, e))?
    };
    let tinybars = whole
        .checked_mul(TINYBARS_PER_HBAR)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(|| format!("'{}' is out of range", amount))?;
    Ok(if negative { -tinybars } else { tinybars })
}
