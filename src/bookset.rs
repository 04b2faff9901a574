use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// one bit per canon position
use roaring::RoaringBitmap;
use tracing::warn;

use crate::canon::Canon;
use crate::error::{CanonryError, Result};

// ------------- BookSet -------------

/// A set of book numbers, one slot per registered book in canon order.
///
/// The external form is a '0'/'1' ASCII string of exactly
/// [`Canon::last_book`] characters. That layout is persisted by callers and
/// must stay bit-for-bit stable, which is why the canon registry is
/// append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSet {
    selected: RoaringBitmap,
}

impl BookSet {
    pub fn new() -> Self {
        Self { selected: RoaringBitmap::new() }
    }

    /// A set with every registered book selected.
    pub fn all() -> Self {
        let mut set = Self::new();
        set.select_all();
        set
    }

    pub fn from_book(book_num: u16) -> Self {
        let mut set = Self::new();
        set.add(book_num);
        set
    }

    pub fn from_book_id(id: &str) -> Self {
        let mut set = Self::new();
        set.add_id(id);
        set
    }

    pub fn from_book_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for id in ids {
            set.add_id(id.as_ref());
        }
        set
    }

    /// A set selecting the inclusive range of book numbers.
    pub fn from_range(first: u16, last: u16) -> Self {
        let mut set = Self::new();
        for book_num in first..=last {
            set.add(book_num);
        }
        set
    }

    /// Builds a set from its '0'/'1' string form. The string must be exactly
    /// one character per registered book.
    pub fn from_books_string(books: &str) -> Result<Self> {
        let expected = Canon::global().last_book() as usize;
        if books.len() != expected {
            return Err(CanonryError::InvalidBookSet(format!(
                "expected {} characters, got {}",
                expected,
                books.len()
            )));
        }
        let mut set = Self::new();
        for (i, c) in books.chars().enumerate() {
            match c {
                '1' => set.selected.insert(i as u32 + 1),
                '0' => false,
                _ => {
                    return Err(CanonryError::InvalidBookSet(format!(
                        "unexpected character '{}' at position {}",
                        c, i
                    )))
                }
            };
        }
        Ok(set)
    }

    // ------------- Mutators -------------

    pub fn add(&mut self, book_num: u16) {
        if book_num == 0 || book_num > Canon::global().last_book() {
            warn!(book_num, "ignoring out-of-range book number");
            return;
        }
        self.selected.insert(book_num as u32);
    }

    pub fn add_id(&mut self, id: &str) {
        let book_num = Canon::global().book_id_to_number(id, true);
        if book_num == 0 {
            warn!(id, "ignoring unknown book id");
            return;
        }
        self.selected.insert(book_num as u32);
    }

    /// Merges another set into this one.
    pub fn add_set(&mut self, other: &BookSet) {
        self.selected |= &other.selected;
    }

    pub fn remove(&mut self, book_num: u16) {
        self.selected.remove(book_num as u32);
    }

    pub fn remove_id(&mut self, id: &str) {
        let book_num = Canon::global().book_id_to_number(id, true);
        if book_num != 0 {
            self.selected.remove(book_num as u32);
        }
    }

    /// Subtracts another set from this one.
    pub fn remove_set(&mut self, other: &BookSet) {
        self.selected -= &other.selected;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn select_all(&mut self) {
        for book_num in 1..=Canon::global().last_book() {
            self.selected.insert(book_num as u32);
        }
    }

    // ------------- Queries -------------

    pub fn is_selected(&self, book_num: u16) -> bool {
        self.selected.contains(book_num as u32)
    }

    pub fn count(&self) -> u64 {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Lowest selected book number, 0 when the set is empty.
    pub fn first_selected_book_num(&self) -> u16 {
        self.selected.min().unwrap_or(0) as u16
    }

    /// Highest selected book number, 0 when the set is empty.
    pub fn last_selected_book_num(&self) -> u16 {
        self.selected.max().unwrap_or(0) as u16
    }

    pub fn intersect(&self, other: &BookSet) -> BookSet {
        BookSet { selected: &self.selected & &other.selected }
    }

    /// Finds the first selected book strictly after `book_num`, clamped to
    /// the canon bounds. Returns `book_num` unchanged when there is nothing
    /// after it; callers must treat "unchanged" as "no result".
    pub fn next_selected(&self, book_num: u16) -> u16 {
        let last = Canon::global().last_book();
        let start = book_num.min(last);
        for candidate in (start + 1)..=last {
            if self.is_selected(candidate) {
                return candidate;
            }
        }
        book_num
    }

    /// Finds the first selected book strictly before `book_num`, clamped to
    /// the canon bounds. Returns `book_num` unchanged when there is nothing
    /// before it.
    pub fn previous_selected(&self, book_num: u16) -> u16 {
        let last = Canon::global().last_book();
        let start = book_num.min(last + 1);
        for candidate in (1..start).rev() {
            if self.is_selected(candidate) {
                return candidate;
            }
        }
        book_num
    }

    /// Ascending iteration over the selected book numbers.
    pub fn selected_book_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        self.selected.iter().map(|b| b as u16)
    }

    /// Ascending iteration over the selected book ids.
    pub fn selected_book_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.selected
            .iter()
            .map(|b| Canon::global().book_number_to_id(b as u16))
    }

    /// The canonical '0'/'1' string form, one character per registered book.
    pub fn books(&self) -> String {
        let last = Canon::global().last_book();
        let mut out = String::with_capacity(last as usize);
        for book_num in 1..=last {
            out.push(if self.is_selected(book_num) { '1' } else { '0' });
        }
        out
    }
}

impl fmt::Display for BookSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.books())
    }
}

impl FromStr for BookSet {
    type Err = CanonryError;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_books_string(s)
    }
}

// hash over the canonical string form, matching equality semantics
impl Hash for BookSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.books().hash(state);
    }
}
