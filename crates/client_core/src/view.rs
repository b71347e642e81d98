//! Search, pagination and sort derivation over an in-memory collection.
//!
//! Everything here is a pure function of the full collection and the
//! [`ViewState`]; the controller re-runs [`derive`] after every change.

use std::{
    cmp::{Ordering, Reverse},
    fmt,
};

use crate::record::ListRecord;

pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
}

impl SortField {
    pub fn compare<R: ListRecord>(self, a: &R, b: &R) -> Ordering {
        match self {
            Self::Id => a.id().cmp(&b.id()),
            Self::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Same field toggles the direction; a new field starts ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.toggle();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn toggle(&mut self) {
        self.direction = self.direction.flipped();
    }

    pub fn compare<R: ListRecord>(&self, a: &R, b: &R) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Stable: equal keys keep their input order in both directions.
    /// Name keys are case-folded once per record, not once per comparison.
    pub fn sort<R: ListRecord>(&self, records: &mut [R]) {
        match (self.field, self.direction) {
            (SortField::Id, _) => records.sort_by(|a, b| self.compare(a, b)),
            (SortField::Name, SortDirection::Asc) => {
                records.sort_by_cached_key(|r| r.name().to_lowercase());
            }
            (SortField::Name, SortDirection::Desc) => {
                records.sort_by_cached_key(|r| Reverse(r.name().to_lowercase()));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Slice the filtered collection first, then order only the visible page.
    PageLocal,
    /// Order the whole filtered collection, then slice.
    #[default]
    SortThenPaginate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search_term: String,
    pub sort: SortOrder,
    pub current_page: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            sort: SortOrder::default(),
            current_page: 1,
            page_size: page_size.max(1),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone)]
pub struct Derived<R> {
    pub filtered: Vec<R>,
    pub page_window: Vec<R>,
}

impl<R> Default for Derived<R> {
    fn default() -> Self {
        Self {
            filtered: Vec::new(),
            page_window: Vec::new(),
        }
    }
}

/// Case-insensitive substring on the name, or substring of the decimal id.
pub fn matches_search<R: ListRecord>(record: &R, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    record.name().to_lowercase().contains(&term) || record.id().0.to_string().contains(&term)
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

pub fn derive<R: ListRecord>(full: &[R], state: &mut ViewState, mode: SortMode) -> Derived<R> {
    let filtered: Vec<R> = full
        .iter()
        .filter(|record| matches_search(*record, &state.search_term))
        .cloned()
        .collect();

    let pages = total_pages(filtered.len(), state.page_size);
    state.current_page = state.current_page.clamp(1, pages);

    let start = ((state.current_page - 1) * state.page_size).min(filtered.len());
    let end = (start + state.page_size).min(filtered.len());

    // `filtered` keeps the collection order; only the window is reordered.
    let page_window = match mode {
        SortMode::PageLocal => {
            let mut window = filtered[start..end].to_vec();
            state.sort.sort(&mut window);
            window
        }
        SortMode::SortThenPaginate => {
            let mut ordered = filtered.clone();
            state.sort.sort(&mut ordered);
            ordered.truncate(end);
            ordered.split_off(start)
        }
    };

    Derived {
        filtered,
        page_window,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl PageSummary {
    pub fn new(current_page: usize, page_size: usize, total: usize) -> Self {
        if total == 0 {
            return Self {
                start: 0,
                end: 0,
                total,
            };
        }
        let offset = current_page.saturating_sub(1) * page_size;
        Self {
            start: (offset + 1).min(total),
            end: (offset + page_size).min(total),
            total,
        }
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} to {} of {} entries",
            self.start, self.end, self.total
        )
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
