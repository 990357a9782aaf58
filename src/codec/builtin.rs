//! Codecs shipped with the crate and preloaded by [`CodecRegistry::new`].
//!
//! [`CodecRegistry::new`]: super::CodecRegistry::new

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{
    NaiveDate, NaiveDateTime,
    format::{Item, StrftimeItems},
};
use regex::Regex;

use super::Codec;
use crate::{error::CodecInitError, sheet::CellValue};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_FLAG_WORDS: &str = "yes|no";

fn checked_format(format: &str) -> Result<String, CodecInitError> {
    if format.trim().is_empty() {
        return Err(CodecInitError::Invalid("format is blank".to_string()));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(CodecInitError::Invalid(format!(
            "'{format}' is not a valid strftime format"
        )));
    }
    Ok(format.to_string())
}

fn render<D: std::fmt::Display>(value: D) -> Result<String> {
    let mut rendered = String::new();
    write!(rendered, "{value}").map_err(|_| anyhow!("format does not apply to this value"))?;
    Ok(rendered)
}

/// Calendar dates in a fixed strftime format (default `%Y-%m-%d`).
#[derive(Debug, Clone)]
pub struct DateCodec {
    format: String,
}

impl Codec for DateCodec {
    type Value = NaiveDate;

    const KIND: &'static str = "date";

    fn from_param(param: Option<&str>) -> Result<Self, CodecInitError> {
        let format = checked_format(param.unwrap_or(DEFAULT_DATE_FORMAT))?;
        Ok(DateCodec { format })
    }

    fn decode(&self, text: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), &self.format)
            .with_context(|| format!("Failed to parse '{text}' as date ({})", self.format))
    }

    fn encode(&self, value: &NaiveDate) -> Result<Option<CellValue>> {
        let rendered = render(value.format(&self.format))?;
        Ok(Some(CellValue::String(rendered)))
    }
}

#[derive(Debug, Clone)]
pub struct DateTimeCodec {
    format: String,
}

impl Codec for DateTimeCodec {
    type Value = NaiveDateTime;

    const KIND: &'static str = "datetime";

    fn from_param(param: Option<&str>) -> Result<Self, CodecInitError> {
        let format = checked_format(param.unwrap_or(DEFAULT_DATETIME_FORMAT))?;
        Ok(DateTimeCodec { format })
    }

    fn decode(&self, text: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text.trim(), &self.format)
            .with_context(|| format!("Failed to parse '{text}' as datetime ({})", self.format))
    }

    fn encode(&self, value: &NaiveDateTime) -> Result<Option<CellValue>> {
        let rendered = render(value.format(&self.format))?;
        Ok(Some(CellValue::String(rendered)))
    }
}

/// Text that must match a regular expression, compiled once per pattern.
#[derive(Debug, Clone)]
pub struct PatternCodec {
    pattern: Regex,
}

impl PatternCodec {
    fn check(&self, text: &str) -> Result<()> {
        if !self.pattern.is_match(text) {
            bail!("'{text}' does not match pattern '{}'", self.pattern.as_str());
        }
        Ok(())
    }
}

impl Codec for PatternCodec {
    type Value = String;

    const KIND: &'static str = "pattern";

    fn from_param(param: Option<&str>) -> Result<Self, CodecInitError> {
        let raw = param.ok_or(CodecInitError::ParameterRequired)?;
        let pattern = Regex::new(raw).map_err(|err| CodecInitError::Invalid(err.to_string()))?;
        Ok(PatternCodec { pattern })
    }

    fn decode(&self, text: &str) -> Result<String> {
        self.check(text)?;
        Ok(text.to_string())
    }

    fn encode(&self, value: &String) -> Result<Option<CellValue>> {
        self.check(value)?;
        Ok(Some(CellValue::String(value.clone())))
    }
}

/// Booleans spelled with a configured word pair such as `Y|N`.
#[derive(Debug, Clone)]
pub struct FlagCodec {
    truthy: String,
    falsy: String,
}

impl Codec for FlagCodec {
    type Value = bool;

    const KIND: &'static str = "flag";

    fn from_param(param: Option<&str>) -> Result<Self, CodecInitError> {
        let words = param.unwrap_or(DEFAULT_FLAG_WORDS);
        let (truthy, falsy) = words
            .split_once('|')
            .map(|(t, f)| (t.trim(), f.trim()))
            .filter(|(t, f)| !t.is_empty() && !f.is_empty())
            .ok_or_else(|| {
                CodecInitError::Invalid(format!("expected 'TRUE|FALSE' words, got '{words}'"))
            })?;
        if truthy.eq_ignore_ascii_case(falsy) {
            return Err(CodecInitError::Invalid(format!(
                "true and false words are both '{truthy}'"
            )));
        }
        Ok(FlagCodec {
            truthy: truthy.to_string(),
            falsy: falsy.to_string(),
        })
    }

    fn decode(&self, text: &str) -> Result<bool> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case(&self.truthy) {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case(&self.falsy) {
            Ok(false)
        } else {
            Err(anyhow!(
                "Expected '{}' or '{}' but found '{text}'",
                self.truthy,
                self.falsy
            ))
        }
    }

    fn encode(&self, value: &bool) -> Result<Option<CellValue>> {
        let word = if *value { &self.truthy } else { &self.falsy };
        Ok(Some(CellValue::String(word.clone())))
    }
}
