//! Search pagination cursor.
//!
//! Two mutually exclusive modes are accepted: `page`/`size` (1-based page
//! number) and `from`/`size` (1-based offset). Every index below is
//! zero-based and half-open: a page covers `[from_idx, to_idx)`.

use crate::error::{FieldError, RestError, RestResult};
use crate::extractors::QueryParams;

/// How the window was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// `page=N`, 1-based.
    Page(usize),
    /// `from=N`, 1-based.
    Offset(usize),
}

/// A validated search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    mode: CursorMode,
    size: usize,
}

impl PaginationCursor {
    /// Page-mode cursor.
    pub fn page(page: usize, size: usize) -> Self {
        Self {
            mode: CursorMode::Page(page),
            size,
        }
    }

    /// Offset-mode cursor.
    pub fn offset(from: usize, size: usize) -> Self {
        Self {
            mode: CursorMode::Offset(from),
            size,
        }
    }

    /// Parses `page`, `from` and `size`.
    ///
    /// Defaults to page 1 of `default_size` hits.
    ///
    /// # Errors
    ///
    /// `InvalidPagination` naming each malformed or non-positive parameter,
    /// and both `page` and `from` when they are combined.
    pub fn from_params(params: &QueryParams, default_size: usize) -> RestResult<Self> {
        let mut errors = Vec::new();
        let page = positive_param(params, "page", &mut errors);
        let from = positive_param(params, "from", &mut errors);
        let size = positive_param(params, "size", &mut errors);

        if params.contains("page") && params.contains("from") {
            errors.push(FieldError::new("page", "Cannot be combined with \"from\"."));
            errors.push(FieldError::new("from", "Cannot be combined with \"page\"."));
        }
        if !errors.is_empty() {
            return Err(RestError::InvalidPagination { errors });
        }

        let size = size.unwrap_or(default_size);
        Ok(match (page, from) {
            (_, Some(from)) => Self::offset(from, size),
            (page, None) => Self::page(page.unwrap_or(1), size),
        })
    }

    /// Cursor mode.
    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    /// Number of hits per page.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the first hit.
    pub fn from_idx(&self) -> usize {
        match self.mode {
            CursorMode::Page(page) => (page - 1).saturating_mul(self.size),
            CursorMode::Offset(from) => from - 1,
        }
    }

    /// Index one past the last hit.
    pub fn to_idx(&self) -> usize {
        self.from_idx().saturating_add(self.size)
    }

    /// Rejects windows reaching beyond `max_result_window`.
    pub fn check_window(&self, max_result_window: usize) -> RestResult<()> {
        if self.to_idx() > max_result_window {
            return Err(RestError::PaginationOutOfRange);
        }
        Ok(())
    }

    /// The preceding window, unless this one starts at the first hit.
    pub fn prev(&self) -> Option<Self> {
        if self.from_idx() < 1 {
            return None;
        }
        Some(match self.mode {
            CursorMode::Page(page) => Self::page(page - 1, self.size),
            CursorMode::Offset(from) => Self::offset(from.saturating_sub(self.size).max(1), self.size),
        })
    }

    /// The following window, while hits remain inside the result window.
    pub fn next(&self, total: usize, max_result_window: usize) -> Option<Self> {
        if self.to_idx() >= total.min(max_result_window) {
            return None;
        }
        Some(match self.mode {
            CursorMode::Page(page) => Self::page(page + 1, self.size),
            CursorMode::Offset(from) => Self::offset(from + self.size, self.size),
        })
    }

    /// Query parameters reproducing this cursor.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let (name, value) = match self.mode {
            CursorMode::Page(page) => ("page", page),
            CursorMode::Offset(from) => ("from", from),
        };
        vec![
            (name.to_string(), value.to_string()),
            ("size".to_string(), self.size.to_string()),
        ]
    }
}

fn positive_param(params: &QueryParams, name: &str, errors: &mut Vec<FieldError>) -> Option<usize> {
    let raw = params.get(name)?;
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => usize::try_from(value).ok(),
        Ok(_) => {
            errors.push(FieldError::new(name, "Must be at least 1."));
            None
        }
        Err(_) => {
            errors.push(FieldError::new(name, "Not a valid integer."));
            None
        }
    }
}
