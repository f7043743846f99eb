//! Query parameters shared by the list endpoints.
//!
//! `limit` and `offset` arrive as raw strings. Both must hold a number that is
//! not NaN and not negative for the request to be paginated, otherwise the
//! default window (first 20 items) is used. `search` narrows results to names
//! containing it, ignoring case, in both modes.

use crate::catalog_store::{Page, Track};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListMode {
    Paginated { offset: f64, limit: f64 },
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub mode: ListMode,
    pub search: Option<String>,
}

/// Loose numeric coercion of a query value. Surrounding whitespace is ignored
/// and blank is zero. `0x`/`0o`/`0b` prefixes pick the radix. `Infinity` is the
/// only spelled-out number.
fn coerce_number(raw: &str) -> f64 {
    let value = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if value.is_empty() {
        return 0.0;
    }
    let radix = match value.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &value[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits
            .chars()
            .try_fold(0.0, |acc: f64, c| {
                c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
            })
            .unwrap_or(f64::NAN);
    }
    match value {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // "inf" and "nan" spellings are not numbers
    if value
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    value.parse::<f64>().unwrap_or(f64::NAN)
}

/// Absent and empty values are invalid, anything else is coerced and must be
/// a number that is not NaN and not negative.
fn parse_query_number(raw: Option<&str>) -> Option<f64> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    Some(coerce_number(raw)).filter(|n| !n.is_nan() && *n >= 0.0)
}

/// `Infinity` spelled out, huge values in exponent form with a signed exponent.
fn display_number(n: f64) -> String {
    if n.is_infinite() {
        return "Infinity".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.abs() >= 1e21 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    n.to_string()
}

/// Fractions are dropped, values too large for usize saturate.
fn truncate(n: f64) -> usize {
    n.trunc() as usize
}

impl Listing {
    pub fn from_params(params: &ListParams) -> Self {
        let limit = parse_query_number(params.limit.as_deref());
        let offset = parse_query_number(params.offset.as_deref());
        let mode = match (offset, limit) {
            (Some(offset), Some(limit)) => ListMode::Paginated { offset, limit },
            _ => ListMode::Default,
        };
        let search = params.search.clone().filter(|s| !s.is_empty());
        Listing { mode, search }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self.mode, ListMode::Paginated { .. })
    }

    /// `offset` counts pages, not items.
    pub fn page(&self) -> Page {
        match self.mode {
            ListMode::Paginated { offset, limit } => {
                let limit = truncate(limit);
                Page {
                    skip: truncate(offset).saturating_mul(limit),
                    take: limit,
                }
            }
            ListMode::Default => Page {
                skip: 0,
                take: DEFAULT_PAGE_SIZE,
            },
        }
    }

    /// How the window was chosen, e.g. "with a limit of 20, ...". `unit` names
    /// what is being listed.
    pub fn describe(&self, unit: &str) -> String {
        match self.mode {
            ListMode::Paginated { offset, limit } => format!(
                "with an offset of {} and a limit of {}, if you want a different number of {} send a different limit and offset values.",
                display_number(offset),
                display_number(limit),
                unit
            ),
            ListMode::Default => format!(
                "with a limit of {}, if you want a different number of {} send a limit and offset queries with valid values.",
                DEFAULT_PAGE_SIZE, unit
            ),
        }
    }

    pub fn message(&self, label: &str, unit: &str) -> String {
        format!("Sended {} {}", label, self.describe(unit))
    }
}

/// A listed item, plus whether the viewer liked it when a viewer is known.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Annotated<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(
        rename = "isLikedByLoggedUser",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_liked_by_logged_user: Option<bool>,
}

pub fn annotate_likes(
    tracks: Vec<Track>,
    liked: Option<&HashSet<String>>,
) -> Vec<Annotated<Track>> {
    tracks
        .into_iter()
        .map(|track| {
            let is_liked_by_logged_user = liked.map(|liked| liked.contains(&track.id));
            Annotated {
                item: track,
                is_liked_by_logged_user,
            }
        })
        .collect()
}
