//! Pagination parameter types

use crate::error::{Error, Result};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};

// ============================================================================
// Number Parameter
// ============================================================================

/// A numeric pagination parameter (page, limit, or offset)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberParameter {
    /// Request field name
    pub key: String,
    /// Value observed in the captured request
    pub default_value: i64,
}

impl NumberParameter {
    /// Create a number parameter
    pub fn new(key: impl Into<String>, default_value: i64) -> Self {
        Self {
            key: key.into(),
            default_value,
        }
    }
}

// ============================================================================
// Cursor Parameter
// ============================================================================

/// An opaque cursor parameter with its reverse-engineered pattern map.
///
/// `pattern_map` is ordered; every key is a sub-cursor value that appears
/// verbatim inside `default_value`. An entry with an empty pattern list
/// is a constant: its literal value survives every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorParameter {
    /// Request field name
    pub key: String,
    /// Cursor value observed in the captured request
    pub default_value: String,
    /// Sub-cursor value → delimiter patterns, most specific first
    pub pattern_map: Vec<(String, Vec<Pattern>)>,
}

// Construction and extraction live in `cursor.rs`.

// ============================================================================
// Pagination Info
// ============================================================================

/// The inferred pagination parameter set of a request.
///
/// Invariant: at least one of `page`, `offset`, `cursor` is present; a
/// limit-only or parameter-less info cannot address pages and fails
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaginationInfoParts", into = "PaginationInfoParts")]
pub struct PaginationInfo {
    page: Option<NumberParameter>,
    cursor: Option<CursorParameter>,
    limit: Option<NumberParameter>,
    offset: Option<NumberParameter>,
}

impl PaginationInfo {
    /// Build a pagination info, enforcing the addressing invariant
    pub fn new(
        page: Option<NumberParameter>,
        cursor: Option<CursorParameter>,
        limit: Option<NumberParameter>,
        offset: Option<NumberParameter>,
    ) -> Result<Self> {
        if page.is_none() && cursor.is_none() && offset.is_none() {
            return Err(Error::invalid_pagination(
                "at least one of page, offset, cursor is required",
            ));
        }
        Ok(Self {
            page,
            cursor,
            limit,
            offset,
        })
    }

    /// Page-number parameter, if inferred
    pub fn page(&self) -> Option<&NumberParameter> {
        self.page.as_ref()
    }

    /// Cursor parameter, if inferred
    pub fn cursor(&self) -> Option<&CursorParameter> {
        self.cursor.as_ref()
    }

    /// Limit parameter, if inferred
    pub fn limit(&self) -> Option<&NumberParameter> {
        self.limit.as_ref()
    }

    /// Offset parameter, if inferred
    pub fn offset(&self) -> Option<&NumberParameter> {
        self.offset.as_ref()
    }

    /// Select the generation strategy for this parameter set.
    ///
    /// Priority: `limit & offset` > `page & limit` > `page & offset` >
    /// `cursor`. An offset alone still addresses positions directly and
    /// maps to the limit/offset generator; a page alone falls back to
    /// page/limit.
    pub fn select(&self) -> SelectedStrategy<'_> {
        match (&self.page, &self.cursor, &self.limit, &self.offset) {
            (_, _, Some(limit), Some(offset)) => SelectedStrategy::LimitOffset {
                limit: Some(limit),
                offset,
            },
            (Some(page), _, Some(limit), None) => SelectedStrategy::PageLimit {
                page,
                limit: Some(limit),
            },
            (Some(page), _, None, Some(offset)) => SelectedStrategy::PageOffset { page, offset },
            (page, Some(cursor), limit, _) => SelectedStrategy::Cursor {
                cursor,
                limit: limit.as_ref(),
                page: page.as_ref(),
            },
            (None, None, limit, Some(offset)) => SelectedStrategy::LimitOffset {
                limit: limit.as_ref(),
                offset,
            },
            (Some(page), None, limit, None) => SelectedStrategy::PageLimit {
                page,
                limit: limit.as_ref(),
            },
            // Construction and deserialization both enforce at least one
            // of page, offset, cursor.
            (None, None, _, None) => unreachable!("pagination info without addressing parameter"),
        }
    }

    /// The strategy tag for this parameter set
    pub fn strategy(&self) -> Strategy {
        match self.select() {
            SelectedStrategy::LimitOffset { .. } => Strategy::LimitOffset,
            SelectedStrategy::PageLimit { .. } => Strategy::PageLimit,
            SelectedStrategy::PageOffset { .. } => Strategy::PageOffset,
            SelectedStrategy::Cursor { .. } => Strategy::Cursor,
        }
    }
}

/// Serialized form of [`PaginationInfo`]; deserialization re-checks the
/// addressing invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaginationInfoParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<NumberParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cursor: Option<CursorParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<NumberParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<NumberParameter>,
}

impl TryFrom<PaginationInfoParts> for PaginationInfo {
    type Error = Error;

    fn try_from(parts: PaginationInfoParts) -> Result<Self> {
        PaginationInfo::new(parts.page, parts.cursor, parts.limit, parts.offset)
    }
}

impl From<PaginationInfo> for PaginationInfoParts {
    fn from(info: PaginationInfo) -> Self {
        Self {
            page: info.page,
            cursor: info.cursor,
            limit: info.limit,
            offset: info.offset,
        }
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// The four replay generation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Direct offset addressing with a limit
    LimitOffset,
    /// Page counter with a page-size limit
    PageLimit,
    /// Page counter with a page-relative offset
    PageOffset,
    /// Opaque cursor chain
    Cursor,
}

/// A strategy selection carrying the parameters it will drive.
///
/// Borrowed view over a [`PaginationInfo`]; the variant is the explicit
/// priority match on which fields are populated.
#[derive(Debug, Clone, Copy)]
pub enum SelectedStrategy<'a> {
    /// Direct offset addressing
    LimitOffset {
        /// Page-size parameter, when the API exposes one
        limit: Option<&'a NumberParameter>,
        /// Item offset parameter
        offset: &'a NumberParameter,
    },
    /// Page counter with a page-size limit
    PageLimit {
        /// Page-number parameter
        page: &'a NumberParameter,
        /// Page-size parameter, absent in the page-only fallback
        limit: Option<&'a NumberParameter>,
    },
    /// Page counter with a page-relative offset
    PageOffset {
        /// Page-number parameter
        page: &'a NumberParameter,
        /// Within-page offset parameter
        offset: &'a NumberParameter,
    },
    /// Opaque cursor chain
    Cursor {
        /// The cursor parameter
        cursor: &'a CursorParameter,
        /// Optional limit sent alongside the cursor
        limit: Option<&'a NumberParameter>,
        /// Optional page counter incremented in lock-step
        page: Option<&'a NumberParameter>,
    },
}
