use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use tracing::warn;

use crate::bookset::BookSet;
use crate::canon::Canon;
use crate::error::{CanonryError, Result};
use crate::registry::{ScrVers, ScrVersType};
use crate::versification::NON_CANONICAL_LAST_CHAPTER_OR_VERSE;

pub const VERSE_RANGE_SEPARATOR: char = '-';
pub const VERSE_SEQUENCE_INDICATOR: char = ',';

const RTL_MARK: char = '\u{200f}';
const BCV_MAX_VALUE: i32 = 999;

/// Packs a book/chapter/verse location into a single comparable integer with
/// three digits per field. Negative chapter/verse contribute zero. Exact for
/// single verses only; bridges and sequences must be compared through their
/// string form.
pub fn encode_bbbcccvvv(book_num: u16, chapter_num: i32, verse_num: i32) -> u32 {
    let book = (book_num as u32 % 1000) * 1_000_000;
    let chapter = if chapter_num >= 0 { (chapter_num as u32 % 1000) * 1000 } else { 0 };
    let verse = if verse_num >= 0 { verse_num as u32 % 1000 } else { 0 };
    book + chapter + verse
}

// ------------- VerseSpec -------------

/// The verse part of a reference. `Simple` is the fast path where the number
/// is authoritative. `Complex` carries the raw verse text of a bridge,
/// sequence or segment (e.g. `1-3`, `1,3a`, `2b`); there the text is
/// authoritative and `num` only holds the leading numeric value for
/// approximate ordering and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseSpec {
    Simple(i32),
    Complex { num: i32, text: String },
}

impl VerseSpec {
    fn num(&self) -> i32 {
        match self {
            VerseSpec::Simple(num) => *num,
            VerseSpec::Complex { num, .. } => *num,
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            VerseSpec::Simple(_) => None,
            VerseSpec::Complex { text, .. } => Some(text),
        }
    }
}

/// Parses the leading numeric portion of a verse string. Returns
/// `(true, n)` when the entire string is one simple verse number (empty
/// counts, as -1); `(false, leading)` when the string carries more than a
/// number, where `leading` is -1 if there is no usable leading number.
fn try_get_verse_num(verse_str: &str) -> (bool, i32) {
    if verse_str.is_empty() {
        return (true, -1);
    }
    let mut num: i32 = 0;
    for (i, ch) in verse_str.chars().enumerate() {
        if !ch.is_ascii_digit() {
            return (false, if i == 0 { -1 } else { num });
        }
        num = num * 10 + (ch as i32 - '0' as i32);
        if num > BCV_MAX_VALUE {
            return (false, -1);
        }
    }
    (true, num)
}

// ------------- VerseRef -------------

/// A reference to a specific verse in Scripture: book, chapter and verse
/// plus the scheme the numbers are meaningful in. A freely copyable value.
#[derive(Debug, Clone)]
pub struct VerseRef {
    book_num: u16,
    chapter_num: i32,
    spec: VerseSpec,
    versification: Option<ScrVers>,
}

/// The valid status of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidStatus {
    Valid,
    UnknownVersification,
    OutOfRange,
    VerseOutOfOrder,
    VerseRepeated,
}

impl Default for VerseRef {
    fn default() -> Self {
        Self { book_num: 0, chapter_num: 0, spec: VerseSpec::Simple(0), versification: None }
    }
}

impl VerseRef {
    /// An empty reference carrying only a scheme.
    pub fn with_versification(versification: ScrVers) -> Self {
        Self {
            book_num: 0,
            chapter_num: -1,
            spec: VerseSpec::Simple(-1),
            versification: Some(versification),
        }
    }

    /// A validated reference from numeric parts.
    pub fn new(
        book_num: u16,
        chapter_num: i32,
        verse_num: i32,
        versification: Option<ScrVers>,
    ) -> Result<Self> {
        if book_num == 0 || book_num > Canon::global().last_book() {
            return Err(CanonryError::InvalidReference(format!(
                "book number {} out of range",
                book_num
            )));
        }
        if chapter_num < 0 {
            return Err(CanonryError::InvalidReference("chapter number can not be negative".into()));
        }
        if verse_num < 0 {
            return Err(CanonryError::InvalidReference("verse number can not be negative".into()));
        }
        Ok(Self::raw(book_num, chapter_num, verse_num, versification))
    }

    pub(crate) fn raw(
        book_num: u16,
        chapter_num: i32,
        verse_num: i32,
        versification: Option<ScrVers>,
    ) -> Self {
        Self { book_num, chapter_num, spec: VerseSpec::Simple(verse_num), versification }
    }

    /// A reference from its encoded BBBCCCVVV form.
    pub fn from_bbbcccvvv(bbbcccvvv: u32, versification: Option<ScrVers>) -> Self {
        Self::raw(
            (bbbcccvvv / 1_000_000) as u16,
            (bbbcccvvv % 1_000_000 / 1000) as i32,
            (bbbcccvvv % 1000) as i32,
            versification,
        )
    }

    /// A reference from string parts. The book must resolve; an unparsable
    /// chapter or verse leaves the corresponding field at -1.
    pub fn from_book_chapter_verse(
        book: &str,
        chapter: &str,
        verse: &str,
        versification: Option<ScrVers>,
    ) -> Result<Self> {
        let book_num = Canon::global().book_id_to_number(book, true);
        if book_num == 0 {
            return Err(CanonryError::InvalidReference(format!("invalid book: {}", book)));
        }
        let mut vref = Self::raw(book_num, -1, -1, versification);
        vref.set_chapter(chapter);
        vref.set_verse(verse);
        Ok(vref)
    }

    /// Parses `"BBB C:V"`, optionally followed by a legacy `/N` scheme code.
    pub fn parse(verse_str: &str) -> Result<Self> {
        Self::parse_internal(verse_str, None)
    }

    /// Parses a reference and then attaches the given scheme, overriding any
    /// `/N` suffix.
    pub fn parse_with_versification(verse_str: &str, versification: ScrVers) -> Result<Self> {
        let mut vref = Self::parse_internal(verse_str, None)?;
        vref.versification = Some(versification);
        Ok(vref)
    }

    fn parse_internal(verse_str: &str, versification: Option<ScrVers>) -> Result<Self> {
        let cleaned = verse_str.replace(RTL_MARK, "");
        let invalid = || CanonryError::InvalidReference(verse_str.to_owned());

        let mut versification = versification;
        let reference = match cleaned.split_once('/') {
            Some((reference, code_str)) => {
                let code = code_str.trim().parse::<u8>().map_err(|_| invalid())?;
                let vers_type = ScrVersType::from_code(code).ok_or_else(invalid)?;
                versification = Some(ScrVers::builtin(vers_type).ok_or_else(invalid)?);
                reference
            }
            None => &cleaned,
        };

        let mut book_chapter_verse = reference.trim().split(' ');
        let (book, chapter_verse) = match (
            book_chapter_verse.next(),
            book_chapter_verse.next(),
            book_chapter_verse.next(),
        ) {
            (Some(book), Some(chapter_verse), None) => (book, chapter_verse),
            _ => return Err(invalid()),
        };

        let (chapter, verse) = chapter_verse.split_once(':').ok_or_else(invalid)?;
        if verse.contains(':') {
            return Err(invalid());
        }

        let book_num = Canon::global().book_id_to_number(book, true);
        let chapter_num = chapter.parse::<i32>().map_err(|_| invalid())?;
        if book_num == 0 || chapter_num < 0 || !is_verse_parseable(verse) {
            return Err(invalid());
        }

        let mut vref = Self::raw(book_num, -1, -1, versification);
        vref.set_chapter(chapter);
        vref.set_verse(verse);
        Ok(vref)
    }

    // ------------- Field access -------------

    /// All values at their defaults, i.e. the reference was never set.
    pub fn is_default(&self) -> bool {
        self.book_num == 0
            && self.chapter_num == 0
            && self.spec == VerseSpec::Simple(0)
            && self.versification.is_none()
    }

    pub fn book_num(&self) -> u16 {
        self.book_num
    }

    pub fn chapter_num(&self) -> i32 {
        self.chapter_num
    }

    /// The verse start number; for a bridge or sequence, the leading number.
    pub fn verse_num(&self) -> i32 {
        self.spec.num()
    }

    /// The raw verse text of a complex reference, `None` on the simple path.
    pub fn verse_text(&self) -> Option<&str> {
        self.spec.text()
    }

    pub fn verse_spec(&self) -> &VerseSpec {
        &self.spec
    }

    /// The three letter book code in capitals, empty when unset.
    pub fn book(&self) -> &'static str {
        Canon::global().book_number_to_id_or(self.book_num, "")
    }

    pub fn chapter(&self) -> String {
        if self.is_default() || self.chapter_num < 0 {
            String::new()
        } else {
            self.chapter_num.to_string()
        }
    }

    pub fn verse(&self) -> String {
        match &self.spec {
            VerseSpec::Complex { text, .. } => text.clone(),
            VerseSpec::Simple(num) => {
                if self.is_default() || *num < 0 {
                    String::new()
                } else {
                    num.to_string()
                }
            }
        }
    }

    pub fn versification(&self) -> Option<&ScrVers> {
        self.versification.as_ref()
    }

    /// Sets the scheme without converting the reference. Use
    /// [`VerseRef::change_versification`] to convert.
    pub fn set_versification(&mut self, versification: Option<ScrVers>) {
        self.versification = versification;
    }

    pub fn set_book_num(&mut self, book_num: u16) -> Result<()> {
        if book_num == 0 || book_num > Canon::global().last_book() {
            return Err(CanonryError::InvalidReference(format!(
                "book number {} out of range",
                book_num
            )));
        }
        self.book_num = book_num;
        Ok(())
    }

    pub fn set_chapter_num(&mut self, chapter_num: i32) -> Result<()> {
        if chapter_num < 0 {
            return Err(CanonryError::InvalidReference("chapter number can not be negative".into()));
        }
        self.chapter_num = chapter_num;
        Ok(())
    }

    /// Sets the verse number, dropping any bridge/segment text.
    pub fn set_verse_num(&mut self, verse_num: i32) -> Result<()> {
        if verse_num < 0 {
            return Err(CanonryError::InvalidReference("verse number can not be negative".into()));
        }
        self.spec = VerseSpec::Simple(verse_num);
        Ok(())
    }

    pub fn set_chapter(&mut self, value: &str) {
        self.chapter_num = match value.parse::<i32>() {
            Ok(chapter) => chapter,
            Err(_) => {
                warn!(value, "failed to parse a chapter number");
                -1
            }
        };
    }

    /// Sets the verse from a string, taking the complex path when the string
    /// is more than a plain number. Returns false when no usable verse
    /// number could be extracted.
    pub fn try_set_verse(&mut self, value: &str) -> bool {
        let (simple, num) = try_get_verse_num(value);
        if simple {
            self.spec = VerseSpec::Simple(num);
        } else {
            self.spec = VerseSpec::Complex { num, text: value.replace(RTL_MARK, "") };
        }
        if num >= 0 {
            return true;
        }
        warn!(value, "failed to parse a verse number");
        false
    }

    pub fn set_verse(&mut self, value: &str) {
        self.try_set_verse(value);
    }

    pub(crate) fn copy_location_from(
        &mut self,
        book_num: u16,
        chapter_num: i32,
        verse_num: i32,
        verse_text: Option<&str>,
    ) {
        self.book_num = book_num;
        self.chapter_num = chapter_num;
        self.spec = match verse_text {
            Some(text) => VerseSpec::Complex { num: verse_num, text: text.to_owned() },
            None => VerseSpec::Simple(verse_num),
        };
    }

    /// Copy every field from another reference.
    pub fn copy_from(&mut self, other: &VerseRef) {
        self.book_num = other.book_num;
        self.chapter_num = other.chapter_num;
        self.spec = other.spec.clone();
        self.versification = other.versification.clone();
    }

    // ------------- Encoded forms -------------

    /// The reference as a comparable integer with the verse digits zeroed.
    pub fn bbbccc(&self) -> u32 {
        encode_bbbcccvvv(self.book_num, self.chapter_num, 0)
    }

    /// The reference as a comparable integer. Exact only for the first verse
    /// of a bridge or sequence.
    pub fn bbbcccvvv(&self) -> u32 {
        encode_bbbcccvvv(self.book_num, self.chapter_num, self.verse_num())
    }

    /// Comparable string form: the zero-padded encoded integer with the
    /// segment letter, if any, tacked on the end.
    pub fn bbbcccvvvs(&self) -> String {
        format!("{:09}{}", self.bbbcccvvv(), self.segment())
    }

    // ------------- Scheme-derived facts -------------

    pub fn first_chapter(&self) -> u16 {
        1
    }

    /// Last chapter of the current book in the current scheme, 0 without a
    /// scheme.
    pub fn last_chapter(&self) -> u16 {
        self.versification
            .as_ref()
            .map(|v| v.last_chapter(self.book_num))
            .unwrap_or(0)
    }

    /// Last verse of the current chapter in the current scheme, 0 without a
    /// scheme.
    pub fn last_verse(&self) -> u16 {
        self.versification
            .as_ref()
            .map(|v| v.last_verse(self.book_num, self.chapter_num))
            .unwrap_or(0)
    }

    /// Whether the verse is excluded in the scheme. Does not handle ranges.
    pub fn is_excluded(&self) -> bool {
        self.versification
            .as_ref()
            .map(|v| v.is_excluded(self.bbbcccvvv()))
            .unwrap_or(false)
    }

    /// Whether the verse has explicit segments in the scheme. Does not
    /// handle ranges.
    pub fn has_segments_defined(&self) -> bool {
        self.versification
            .as_ref()
            .map(|v| v.verse_segments(self.bbbcccvvv()).is_some())
            .unwrap_or(false)
    }

    /// Whether the verse text covers multiple verses.
    pub fn has_multiple(&self) -> bool {
        match self.spec.text() {
            Some(text) => {
                text.contains(VERSE_RANGE_SEPARATOR) || text.contains(VERSE_SEQUENCE_INDICATOR)
            }
            None => false,
        }
    }

    // ------------- Segments -------------

    /// The segment letters from the verse text: the run of non-digits after
    /// the leading digits, stopping at a bridge or sequence separator.
    pub fn segment(&self) -> String {
        let Some(text) = self.spec.text() else {
            return String::new();
        };
        if !text.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return String::new();
        }

        let mut found_seg_start = false;
        let mut segment = String::new();
        for c in text.chars() {
            if c == VERSE_RANGE_SEPARATOR || c == VERSE_SEQUENCE_INDICATOR {
                break;
            }
            if !c.is_ascii_digit() {
                found_seg_start = true;
                segment.push(c);
            } else if found_seg_start {
                break;
            }
        }
        segment
    }

    /// Segments defined for this verse in the scheme, else the supplied
    /// default segments.
    pub fn segments(&self, default_segments: Option<&[String]>) -> Option<Vec<String>> {
        match &self.versification {
            None => default_segments.map(<[String]>::to_vec),
            Some(vers) => vers
                .verse_segments(self.bbbcccvvv())
                .or_else(|| default_segments.map(<[String]>::to_vec)),
        }
    }

    /// The segment, validated against the scheme's segments for this verse
    /// (or the supplied ones). Empty when there is no segment or it does not
    /// validate.
    pub fn segment_validated(&self, valid_segments: Option<&[String]>) -> String {
        let segment = self.segment();
        if segment.is_empty() {
            return segment;
        }
        match self.segments(valid_segments) {
            Some(valid) if !valid.is_empty() => {
                if valid.iter().any(|s| *s == segment) {
                    segment
                } else {
                    String::new()
                }
            }
            _ => segment,
        }
    }

    /// Index of the segment in the applicable segment list, -1 when there is
    /// no segment or it is unknown.
    pub fn segment_number(&self, valid_segments: Option<&[String]>) -> i32 {
        let segment = self.segment();
        if segment.is_empty() {
            return -1;
        }
        match self.segments(valid_segments) {
            Some(valid) => valid
                .iter()
                .position(|s| *s == segment)
                .map(|p| p as i32)
                .unwrap_or(-1),
            None => -1,
        }
    }

    /// Appends the last defined segment of this verse, if any.
    pub fn advance_to_last_segment(&mut self) {
        if let Some(segments) = self.segments(None) {
            if let Some(last) = segments.last() {
                let verse = format!("{}{}", self.verse(), last);
                self.set_verse(&verse);
            }
        }
    }

    // ------------- Simplification -------------

    /// Drops bridging and segment text, keeping the leading verse number.
    pub fn simplify(&mut self) {
        self.spec = VerseSpec::Simple(self.spec.num());
    }

    /// The first verse of a bridge, segments kept.
    pub fn unbridge(&self) -> VerseRef {
        self.all_verses(false).into_iter().next().unwrap_or_else(|| self.clone())
    }

    /// Every individual verse covered by this reference. Ranges are walked
    /// verse by verse (excluded verses left out) unless
    /// `specified_verses_only` is set.
    pub fn all_verses(&self, specified_verses_only: bool) -> Vec<VerseRef> {
        let VerseSpec::Complex { text, .. } = &self.spec else {
            return vec![self.clone()];
        };
        if self.chapter_num <= 0 {
            return vec![self.clone()];
        }
        let text = text.clone();

        let mut verses = Vec::new();
        for part in text.split(VERSE_SEQUENCE_INDICATOR) {
            let pieces: Vec<&str> = part.split(VERSE_RANGE_SEPARATOR).collect();
            let mut vref = self.clone();
            vref.set_verse(pieces[0]);
            let start_verse = vref.verse_num();
            verses.push(vref);

            if let Some(last_piece) = pieces.get(1) {
                let mut vlast = self.clone();
                vlast.set_verse(last_piece);

                if !specified_verses_only {
                    // everything in between, except excluded verses
                    for verse_num in (start_verse + 1)..vlast.verse_num() {
                        let in_range = VerseRef::raw(
                            self.book_num,
                            self.chapter_num,
                            verse_num,
                            self.versification.clone(),
                        );
                        if !in_range.is_excluded() {
                            verses.push(in_range);
                        }
                    }
                }
                verses.push(vlast);
            }
        }
        verses
    }

    /// The single verses or verse ranges represented in this reference.
    pub fn ranges(&self) -> Vec<VerseRef> {
        let VerseSpec::Complex { text, .. } = &self.spec else {
            return vec![self.clone()];
        };
        if self.chapter_num <= 0 {
            return vec![self.clone()];
        }
        text.clone()
            .split(VERSE_SEQUENCE_INDICATOR)
            .map(|range| {
                let mut vref = self.clone();
                vref.set_verse(range);
                vref
            })
            .collect()
    }

    // ------------- Validity -------------

    pub fn is_valid(&self) -> bool {
        self.valid_status() == ValidStatus::Valid
    }

    /// Validates the reference, walking every specified verse of a bridge or
    /// sequence and requiring strictly ascending order.
    pub fn valid_status(&self) -> ValidStatus {
        if self.spec.text().is_none() {
            return self.internal_valid();
        }

        let mut prev_verse = 0u32;
        for vref in self.all_verses(true) {
            let status = vref.internal_valid();
            if status != ValidStatus::Valid {
                return status;
            }
            let bbbcccvvv = vref.bbbcccvvv();
            if prev_verse > bbbcccvvv {
                return ValidStatus::VerseOutOfOrder;
            }
            if prev_verse == bbbcccvvv {
                return ValidStatus::VerseRepeated;
            }
            prev_verse = bbbcccvvv;
        }
        ValidStatus::Valid
    }

    fn internal_valid(&self) -> ValidStatus {
        let Some(versification) = &self.versification else {
            return ValidStatus::UnknownVersification;
        };
        if self.book_num == 0 || self.book_num > Canon::global().last_book() {
            return ValidStatus::OutOfRange;
        }
        // any chapter/verse in a non-biblical book is fine
        if !Canon::global().is_canonical(self.book_num) {
            return ValidStatus::Valid;
        }
        if self.book_num > versification.last_book()
            || self.chapter_num <= 0
            || self.chapter_num > versification.last_chapter(self.book_num) as i32
            || self.verse_num() < 0
            || self.verse_num() > versification.last_verse(self.book_num, self.chapter_num) as i32
        {
            return ValidStatus::OutOfRange;
        }
        if versification.is_excluded(self.bbbcccvvv()) {
            ValidStatus::OutOfRange
        } else {
            ValidStatus::Valid
        }
    }

    // ------------- Scheme conversion -------------

    /// Converts this reference to the given scheme.
    pub fn change_versification(&mut self, new_versification: &ScrVers) {
        if self.has_multiple() {
            new_versification.change_versification_with_ranges(self);
        } else {
            new_versification.change_versification(self);
        }
    }

    /// Converts a bridge/sequence reference to the given scheme, part by
    /// part. False means the parts did not all land in one chapter and the
    /// result is undefined.
    pub fn change_versification_with_ranges(&mut self, new_versification: &ScrVers) -> bool {
        new_versification.change_versification_with_ranges(self)
    }

    // ------------- Navigation: book -------------

    /// Moves to the next book among the selected set. The chapter resets to
    /// 1 and the verse to 0.
    pub fn next_book_within(&mut self, present: &BookSet) -> bool {
        let new_book = present.next_selected(self.book_num);
        if new_book == self.book_num {
            return false;
        }
        self.book_num = new_book;
        self.chapter_num = 1;
        self.spec = VerseSpec::Simple(0);
        true
    }

    /// Moves to the next book in the whole canon.
    pub fn next_book(&mut self) -> bool {
        self.next_book_within(&BookSet::all())
    }

    pub fn previous_book_within(&mut self, present: &BookSet) -> bool {
        let new_book = present.previous_selected(self.book_num);
        if new_book == self.book_num {
            return false;
        }
        self.book_num = new_book;
        self.chapter_num = 1;
        self.spec = VerseSpec::Simple(1);
        true
    }

    pub fn previous_book(&mut self) -> bool {
        self.previous_book_within(&BookSet::all())
    }

    // ------------- Navigation: chapter -------------

    /// Moves to the next chapter, crossing into the next selected book at
    /// the end of the current one. With `skip_excluded`, lands on the first
    /// non-excluded verse of the new chapter, falling through books as
    /// needed.
    pub fn next_chapter_within(&mut self, present: &BookSet, skip_excluded: bool) -> bool {
        // a book that is not present can't be stepped through
        if !present.is_selected(self.book_num) {
            return self.next_book_within(present);
        }
        let new_position = self.chapter_num + 1;
        if new_position > self.last_chapter() as i32 {
            return self.next_book_within(present);
        }

        if skip_excluded {
            let next_ref = self
                .versification
                .as_ref()
                .and_then(|v| v.first_included_verse(self.book_num, new_position));
            match next_ref {
                Some(next) => self.copy_from(&next),
                None => return self.next_book_within(present),
            }
        } else {
            self.chapter_num = new_position;
            self.spec = VerseSpec::Simple(1);
        }
        true
    }

    pub fn next_chapter(&mut self) -> bool {
        self.next_chapter_within(&BookSet::all(), false)
    }

    fn previous_book_last_chapter(&mut self, present: &BookSet) -> bool {
        if !self.previous_book_within(present) {
            return false;
        }
        let last_chapter = self.last_chapter();
        self.chapter_num = if last_chapter != NON_CANONICAL_LAST_CHAPTER_OR_VERSE {
            last_chapter as i32
        } else {
            1
        };
        true
    }

    pub fn previous_chapter_within(&mut self, present: &BookSet) -> bool {
        if !present.is_selected(self.book_num) {
            return self.previous_book_last_chapter(present);
        }
        let new_position = self.chapter_num - 1;
        if new_position < self.first_chapter() as i32 {
            return self.previous_book_last_chapter(present);
        }
        self.spec = VerseSpec::Simple(1);
        self.chapter_num = new_position;
        true
    }

    pub fn previous_chapter(&mut self) -> bool {
        self.previous_chapter_within(&BookSet::all())
    }

    // ------------- Navigation: verse -------------

    /// Moves to the next verse, or to the next verse segment when the
    /// current verse has segments defined. With `skip_excluded`, keeps
    /// moving until a non-excluded verse is found or scripture runs out.
    pub fn next_verse_within(&mut self, present: &BookSet, skip_excluded: bool) -> bool {
        // avoid incrementing through a blank book
        if !present.is_selected(self.book_num) {
            return self.next_book_within(present);
        }

        let segments = self
            .versification
            .as_ref()
            .and_then(|v| v.verse_segments(self.bbbcccvvv()));
        if let Some(segments) = segments {
            if let Some(seg_index) = self.find_segment(&segments) {
                if seg_index + 1 < segments.len() && segments[seg_index] != segments[seg_index + 1]
                {
                    // Navigation onto an identical label would stall, so only
                    // step the segment when the next one differs.
                    let verse = format!("{}{}", self.verse_num(), segments[seg_index + 1]);
                    self.set_verse(&verse);
                    return true;
                }
            }
        }

        loop {
            if self.verse_num() >= self.last_verse() as i32 {
                if self.next_chapter_within(present, skip_excluded) {
                    self.set_verse_with_segment_info(true);
                    return true;
                }
                return false;
            }

            let next = self.verse_num() + 1;
            self.spec = VerseSpec::Simple(next);
            self.set_verse_with_segment_info(true);

            if !(skip_excluded && self.is_excluded()) {
                break;
            }
        }
        true
    }

    pub fn next_verse(&mut self) -> bool {
        self.next_verse_within(&BookSet::all(), false)
    }

    fn previous_chapter_last_verse(&mut self, present: &BookSet) -> bool {
        let result = if !present.is_selected(self.book_num) || self.chapter_num <= 1 {
            self.previous_book_last_chapter(present)
        } else {
            self.chapter_num -= 1;
            true
        };
        if result {
            let last_verse = self.last_verse() as i32;
            self.spec = VerseSpec::Simple(last_verse);
        }
        result
    }

    /// Moves to the previous verse, or to the previous verse segment when
    /// the current verse has segments defined.
    pub fn previous_verse_within(&mut self, present: &BookSet) -> bool {
        // avoid moving through nonexistent books
        if !present.is_selected(self.book_num) {
            if self.previous_chapter_last_verse(present) {
                self.set_verse_with_segment_info(false);
                return true;
            }
            return false;
        }

        let segments = self
            .versification
            .as_ref()
            .and_then(|v| v.verse_segments(self.bbbcccvvv()));
        if let Some(segments) = segments {
            if let Some(seg_index) = self.find_segment(&segments) {
                if seg_index > 0 {
                    let verse = format!("{}{}", self.verse_num(), segments[seg_index - 1]);
                    self.set_verse(&verse);
                    return true;
                }
            }
        }

        if self.verse_num() == 1 && self.chapter_num == 1 {
            self.spec = VerseSpec::Simple(0);
        } else if self.verse_num() <= 1 {
            if self.previous_chapter_last_verse(present) {
                self.set_verse_with_segment_info(false);
                return true;
            }
            return false;
        } else {
            let previous = self.verse_num() - 1;
            self.spec = VerseSpec::Simple(previous);
            self.set_verse_with_segment_info(false);
        }
        true
    }

    pub fn previous_verse(&mut self) -> bool {
        self.previous_verse_within(&BookSet::all())
    }

    /// After a move, pick up the first (forward) or last (backward) segment
    /// label of the new verse, when it has segments.
    fn set_verse_with_segment_info(&mut self, moving_forward: bool) {
        let encoded = encode_bbbcccvvv(self.book_num, self.chapter_num, self.verse_num());
        let segments = self
            .versification
            .as_ref()
            .and_then(|v| v.verse_segments(encoded));
        match segments {
            Some(segments) if !segments.is_empty() => {
                let segment =
                    if moving_forward { &segments[0] } else { &segments[segments.len() - 1] };
                let verse = format!("{}{}", self.verse_num(), segment);
                self.set_verse(&verse);
            }
            _ => {
                self.spec = VerseSpec::Simple(self.spec.num());
            }
        }
    }

    fn find_segment(&self, segments: &[String]) -> Option<usize> {
        let current = self.segment();
        segments.iter().position(|s| *s == current)
    }

    // ------------- Comparison -------------

    /// Compares with another reference, converting it into this reference's
    /// scheme first. By default only the first verse of a bridge counts and
    /// segments compare ordinally.
    pub fn compare_to(&self, other: &VerseRef) -> Ordering {
        self.compare_to_with(other, None, false, true)
    }

    /// Full comparison control: an explicit segment ordering, comparing the
    /// whole verse list of a bridge, and ignoring segments entirely.
    pub fn compare_to_with(
        &self,
        other: &VerseRef,
        segment_order: Option<&[String]>,
        compare_all_verses: bool,
        compare_segments: bool,
    ) -> Ordering {
        let mut other = other.clone();
        let needs_conversion = match (&self.versification, &other.versification) {
            (Some(mine), Some(theirs)) => mine != theirs,
            _ => false,
        };
        if needs_conversion {
            if let Some(mine) = &self.versification {
                if other.has_multiple() {
                    mine.change_versification_with_ranges(&mut other);
                } else {
                    mine.change_versification(&mut other);
                }
            }
        }

        if self.book_num != other.book_num {
            return self.book_num.cmp(&other.book_num);
        }
        if self.chapter_num != other.chapter_num {
            return self.chapter_num.cmp(&other.chapter_num);
        }
        if compare_all_verses {
            return compare_verse_lists(&self.get_verses(), &other.get_verses());
        }
        if self.verse_num() != other.verse_num() {
            return self.verse_num().cmp(&other.verse_num());
        }
        if !compare_segments {
            return Ordering::Equal;
        }

        let this_segment = self.segment_validated(segment_order);
        let other_segment = other.segment_validated(segment_order);
        match (this_segment.is_empty(), other_segment.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match segment_order {
                Some(order) => {
                    // both have segments; compare by the custom order
                    let verse_seg_order = self.segments(Some(order));
                    let this_index = index_of_segment(&verse_seg_order, &this_segment);
                    let other_index = index_of_segment(&verse_seg_order, &other_segment);
                    this_index.cmp(&other_index)
                }
                None => this_segment.cmp(&other_segment),
            },
        }
    }

    /// The verse numbers named by this reference, in order of appearance.
    fn get_verses(&self) -> Vec<i32> {
        let Some(text) = self.spec.text() else {
            return vec![self.spec.num()];
        };
        let mut list = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if c.is_ascii_digit() {
                current.push(c);
            } else if !current.is_empty() {
                list.push(current.parse().unwrap_or(0));
                current.clear();
            }
        }
        if !current.is_empty() {
            list.push(current.parse().unwrap_or(0));
        }
        list
    }

    // ------------- Overlap -------------

    /// True when the two references cover any common verse. Both must be in
    /// the same scheme.
    pub fn are_overlapping_verse_ranges(a: &VerseRef, b: &VerseRef) -> bool {
        if a.is_default() || b.is_default() {
            return false;
        }
        debug_assert!(
            a.versification == b.versification,
            "versification of verse references does not match"
        );

        if a.book_num != b.book_num || a.chapter_num != b.chapter_num {
            return false;
        }
        if a.spec.text().is_none() && b.spec.text().is_none() {
            return a.verse_num() == b.verse_num();
        }
        Self::are_overlapping_verses(&a.verse(), &b.verse())
    }

    /// True when the two verse strings (`1`, `1b`, `1-2c`, `1,3`) overlap.
    pub fn are_overlapping_verses(verse1: &str, verse2: &str) -> bool {
        for verse1_part in verse1.split(VERSE_SEQUENCE_INDICATOR) {
            for verse2_part in verse2.split(VERSE_SEQUENCE_INDICATOR) {
                let (v1, s1, v1_end, s1_end) = parse_verse_number_range(verse1_part);
                let (v2, s2, v2_end, s2_end) = parse_verse_number_range(verse2_part);

                if v1 == v1_end && v2 == v2_end && s1 == s1_end && s2 == s2_end {
                    // no ranges, this is easy
                    if v1 == v2 && (s1.is_empty() || s2.is_empty() || s1 == s2) {
                        return true;
                    }
                } else if in_verse_range(v1, s1, v2, s2, v2_end, s2_end)
                    || in_verse_range(v1_end, s1_end, v2, s2, v2_end, s2_end)
                    || in_verse_range(v2, s2, v1, s1, v1_end, s1_end)
                    || in_verse_range(v2_end, s2_end, v1, s1, v1_end, s1_end)
                {
                    return true;
                }
            }
        }
        false
    }

    /// Whether any of the given references overlap this one.
    pub fn overlaps_any(&self, compare_to: &[VerseRef]) -> bool {
        compare_to
            .iter()
            .any(|vref| Self::are_overlapping_verse_ranges(self, vref))
    }

    /// Whether this reference falls in the inclusive range. With `exact`,
    /// an endpoint must match exactly; otherwise partial overlaps at the
    /// endpoints count.
    pub fn in_range(&self, range_start: &VerseRef, range_end: &VerseRef, exact: bool) -> bool {
        if range_start.compare_to(self) == Ordering::Less
            && self.compare_to(range_end) == Ordering::Less
        {
            return true;
        }
        if exact {
            return range_start == self || range_end == self;
        }
        self.bbbcccvvv() == range_start.bbbcccvvv()
            || self.bbbcccvvv() == range_end.bbbcccvvv()
            || self.overlaps_any(&[range_start.clone(), range_end.clone()])
    }

    // ------------- String forms -------------

    /// `"BBB C:V/N"`, the form with the legacy numeric scheme code.
    pub fn to_string_with_versification(&self) -> String {
        let code = self
            .versification
            .as_ref()
            .map(|v| v.vers_type().code())
            .unwrap_or(0);
        format!("{}/{}", self, code)
    }
}

/// Whether the verse string is in a valid format (no scheme involved): it
/// must start with a digit and not end with a bridge/sequence separator.
pub fn is_verse_parseable(verse: &str) -> bool {
    !verse.is_empty()
        && verse.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false)
        && !verse.ends_with(VERSE_RANGE_SEPARATOR)
        && !verse.ends_with(VERSE_SEQUENCE_INDICATOR)
}

/// Whether the string parses as a verse reference.
pub fn is_parseable(reference: &str) -> bool {
    VerseRef::parse(reference).is_ok()
}

fn compare_verse_lists(mine: &[i32], theirs: &[i32]) -> Ordering {
    for (a, b) in mine.iter().zip(theirs.iter()) {
        if a != b {
            return a.cmp(b);
        }
    }
    mine.len().cmp(&theirs.len())
}

fn index_of_segment(order: &Option<Vec<String>>, segment: &str) -> i32 {
    order
        .as_ref()
        .and_then(|list| list.iter().position(|s| s == segment))
        .map(|p| p as i32)
        .unwrap_or(-1)
}

/// Breaks a verse number into its number and optional segment:
/// `1a` → `(1, "a")`.
fn parse_verse_number(verse: &str) -> (i32, &str) {
    let digits = verse.chars().take_while(|c| c.is_ascii_digit()).count();
    let number = if digits > 0 { verse[..digits].parse().unwrap_or(0) } else { 0 };
    (number, &verse[digits..])
}

/// Breaks a verse number with an optional range into its two endpoints:
/// `1a-2` → `(1, "a", 2, "")`.
fn parse_verse_number_range(verse: &str) -> (i32, &str, i32, &str) {
    let parts: Vec<&str> = verse.split(['-', '\u{2013}', '\u{2014}']).collect();
    if parts.len() == 1 {
        let (number, segment) = parse_verse_number(parts[0]);
        return (number, segment, number, segment);
    }
    let (number1, segment1) = parse_verse_number(parts[0]);
    let (number2, segment2) = parse_verse_number(parts[1]);
    (number1, segment1, number2, segment2)
}

// true if verse1 (number plus possibly-empty segment) lies between verse2
// and verse2_end inclusive
fn in_verse_range(
    verse1: i32,
    verse1_seg: &str,
    verse2: i32,
    verse2_seg: &str,
    verse2_end: i32,
    verse2_end_seg: &str,
) -> bool {
    if verse1 < verse2 {
        return false;
    }
    if verse1 == verse2 && !verse1_seg.is_empty() && !verse2_seg.is_empty() && verse1_seg < verse2_seg
    {
        return false;
    }
    if verse1 > verse2_end {
        return false;
    }
    if verse1 == verse2_end
        && !verse1_seg.is_empty()
        && !verse2_end_seg.is_empty()
        && verse1_seg > verse2_end_seg
    {
        return false;
    }
    true
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let book = self.book();
        if book.is_empty() {
            return Ok(());
        }
        write!(f, "{} {}:{}", book, self.chapter(), self.verse())
    }
}

impl FromStr for VerseRef {
    type Err = CanonryError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for VerseRef {
    fn eq(&self, other: &Self) -> bool {
        self.book_num == other.book_num
            && self.chapter_num == other.chapter_num
            && self.spec == other.spec
            && self.versification == other.versification
    }
}

impl Eq for VerseRef {}

// The hash deliberately leaves out the scheme, like equality of the encoded
// forms does.
impl Hash for VerseRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bbbcccvvv().hash(state);
        if let Some(text) = self.spec.text() {
            text.hash(state);
        }
    }
}

impl PartialOrd for VerseRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare_to(other))
    }
}
