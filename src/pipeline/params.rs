use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::loader::parse_date;
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// ParamValue – one user-facing input of a challenge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    IntSet(BTreeSet<i64>),
    Text(String),
    TextSet(BTreeSet<String>),
    Date(NaiveDate),
}

impl ParamValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "an integer",
            ParamValue::IntSet(_) => "a set of integers",
            ParamValue::Text(_) => "text",
            ParamValue::TextSet(_) => "a set of labels",
            ParamValue::Date(_) => "a date",
        }
    }

    pub fn int_set(values: impl IntoIterator<Item = i64>) -> Self {
        ParamValue::IntSet(values.into_iter().collect())
    }

    pub fn text_set<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        ParamValue::TextSet(values.into_iter().map(Into::into).collect())
    }

    pub fn text(value: impl Into<String>) -> Self {
        ParamValue::Text(value.into())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Text(s) => write!(f, "{s}"),
            ParamValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ParamValue::IntSet(set) => {
                let parts: Vec<String> = set.iter().map(i64::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
            ParamValue::TextSet(set) => {
                let parts: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ParamSpec – declared whitelist entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Calendar month, `1..=12`.
    Month,
    /// Positive count.
    Count,
    /// One year out of the listed options.
    Year(Vec<i64>),
    /// Any subset of the listed years.
    Years(Vec<i64>),
    /// Any subset of the listed labels.
    Labels(Vec<String>),
    /// Free text.
    Text,
    Date { min: NaiveDate, max: NaiveDate },
    /// Exactly one of the listed options.
    Choice(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn new(name: &'static str, label: &'static str, kind: ParamKind, default: ParamValue) -> Self {
        ParamSpec {
            name,
            label,
            kind,
            default,
        }
    }

    /// Reject values of the wrong kind or outside hard bounds.
    ///
    /// Years, labels and dates outside their listed options are accepted;
    /// they select nothing and lead to an empty result.
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        let wrong_kind = || {
            PipelineError::invalid_param(
                self.name,
                format!("expected {}, got {}", self.default.kind_name(), value.kind_name()),
            )
        };
        match (&self.kind, value) {
            (ParamKind::Month, ParamValue::Int(m)) => {
                if (1..=12).contains(m) {
                    Ok(())
                } else {
                    Err(PipelineError::invalid_param(
                        self.name,
                        format!("month {m} is outside 1..=12"),
                    ))
                }
            }
            (ParamKind::Count, ParamValue::Int(n)) => {
                if *n >= 1 {
                    Ok(())
                } else {
                    Err(PipelineError::invalid_param(
                        self.name,
                        format!("count must be at least 1, got {n}"),
                    ))
                }
            }
            (ParamKind::Year(_), ParamValue::Int(_))
            | (ParamKind::Years(_), ParamValue::IntSet(_))
            | (ParamKind::Labels(_), ParamValue::TextSet(_))
            | (ParamKind::Text, ParamValue::Text(_))
            | (ParamKind::Date { .. }, ParamValue::Date(_)) => Ok(()),
            (ParamKind::Choice(options), ParamValue::Text(choice)) => {
                if options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(PipelineError::invalid_param(
                        self.name,
                        format!("'{choice}' is not one of {}", options.join(", ")),
                    ))
                }
            }
            _ => Err(wrong_kind()),
        }
    }

    /// Parse a command-line value (`4`, `2015,2016`, `Furniture,Technology`,
    /// `2017-06-30`) according to this parameter's kind.
    pub fn parse(&self, raw: &str) -> Result<ParamValue> {
        let raw = raw.trim();
        let int = |s: &str| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| PipelineError::invalid_param(self.name, format!("'{s}' is not an integer")))
        };
        let list = || raw.split(',').map(str::trim).filter(|s| !s.is_empty());
        let value = match &self.kind {
            ParamKind::Month | ParamKind::Count | ParamKind::Year(_) => ParamValue::Int(int(raw)?),
            ParamKind::Years(_) => ParamValue::IntSet(list().map(int).collect::<Result<_>>()?),
            ParamKind::Labels(_) => ParamValue::text_set(list()),
            ParamKind::Text | ParamKind::Choice(_) => ParamValue::text(raw),
            ParamKind::Date { .. } => ParamValue::Date(parse_date(raw).ok_or_else(|| {
                PipelineError::invalid_param(self.name, format!("'{raw}' is not a date"))
            })?),
        };
        self.check(&value)?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Params – resolved parameter set, part of the memo key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Defaults of every declared parameter.
    pub fn defaults(specs: &[ParamSpec]) -> Self {
        Params(
            specs
                .iter()
                .map(|s| (s.name.to_string(), s.default.clone()))
                .collect(),
        )
    }

    /// Fill in defaults, drop undeclared names and validate the rest.
    pub fn resolve(challenge: &str, specs: &[ParamSpec], given: &Params) -> Result<Params> {
        for name in given.0.keys() {
            if !specs.iter().any(|s| s.name == name) {
                log::warn!("{challenge}: ignoring undeclared parameter '{name}'");
            }
        }
        let mut resolved = Params::new();
        for spec in specs {
            let value = given.get(spec.name).unwrap_or(&spec.default);
            spec.check(value)?;
            resolved.set(spec.name, value.clone());
        }
        Ok(resolved)
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.get(name)
            .ok_or_else(|| PipelineError::invalid_param(name, "not set"))
    }

    fn mismatch(name: &str, expected: &str, found: &ParamValue) -> PipelineError {
        PipelineError::invalid_param(name, format!("expected {expected}, got {}", found.kind_name()))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ParamValue::Int(i) => Ok(*i),
            other => Err(Self::mismatch(name, "an integer", other)),
        }
    }

    /// An integer param that must fit a `u32` (months, counts).
    pub fn uint(&self, name: &str) -> Result<u32> {
        let value = self.int(name)?;
        u32::try_from(value)
            .map_err(|_| PipelineError::invalid_param(name, format!("{value} is out of range")))
    }

    pub fn int_set(&self, name: &str) -> Result<&BTreeSet<i64>> {
        match self.require(name)? {
            ParamValue::IntSet(set) => Ok(set),
            other => Err(Self::mismatch(name, "a set of integers", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn text_set(&self, name: &str) -> Result<&BTreeSet<String>> {
        match self.require(name)? {
            ParamValue::TextSet(set) => Ok(set),
            other => Err(Self::mismatch(name, "a set of labels", other)),
        }
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate> {
        match self.require(name)? {
            ParamValue::Date(d) => Ok(*d),
            other => Err(Self::mismatch(name, "a date", other)),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}
