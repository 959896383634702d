//! Page-number pagination over listings.
//!
//! A requested page is resolved against the total row count before any rows
//! are fetched: missing or non-numeric page numbers fall back to the first
//! page, numbers outside `1..=num_pages` clamp to the last page, and an empty
//! listing still has a single (empty) page.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

/// Posts per listing page.
pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn resolve(requested: Option<&str>, count: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let count = count.max(0);
        let num_pages = if count == 0 {
            1
        } else {
            (count + per_page - 1) / per_page
        };

        let number = match parse_page_number(requested) {
            Some(number) if (1..=num_pages).contains(&number) => number,
            Some(_) => num_pages,
            None => 1,
        };

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// 1-based index of the first item on the page, 0 for an empty listing.
    pub fn start_index(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.offset() + 1
        }
    }

    pub fn end_index(&self) -> i64 {
        if self.number == self.num_pages {
            self.count
        } else {
            self.number * self.per_page
        }
    }
}

/// Integer value of a `?page=` parameter. Numbers too large for `i64`
/// saturate, so they still count as out of range rather than as junk.
pub fn parse_page_number(requested: Option<&str>) -> Option<i64> {
    match requested?.trim().parse::<i64>() {
        Ok(number) => Some(number),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
    pub start_index: i64,
    pub end_index: i64,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, object_list: Vec<T>) -> Self {
        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next: window.has_next(),
            has_previous: window.has_previous(),
            next_page_number: window.has_next().then(|| window.number + 1),
            previous_page_number: window.has_previous().then(|| window.number - 1),
            start_index: window.start_index(),
            end_index: window.end_index(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
            start_index: self.start_index,
            end_index: self.end_index,
        }
    }
}
