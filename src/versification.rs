use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::BuildHasherDefault;

use lazy_static::lazy_static;
use regex::Regex;
use seahash::SeaHasher;

use crate::bookset::BookSet;
use crate::canon::Canon;
use crate::error::{CanonryError, LineErrorKind, Result};
use crate::registry::ScrVersType;
use crate::verseref::{encode_bbbcccvvv, VerseRef};

/// Chapter/verse count reported for non-canonical books. Never a real count;
/// it keeps encoded references of extra material from colliding with real
/// scripture locations.
pub const NON_CANONICAL_LAST_CHAPTER_OR_VERSE: u16 = 998;

/// Books that are always routed through their segment mappings when changing
/// schemes. ESG verses are mapped onto LXX segments in several schemes and
/// that mapping must work in both directions, so the "already valid in the
/// target" shortcut never applies to these books.
const SEGMENT_MAPPED_BOOKS: &[&str] = &["ESG"];

pub(crate) fn bypasses_mapping_shortcut(book_id: &str) -> bool {
    SEGMENT_MAPPED_BOOKS.contains(&book_id)
}

// symbols used when parsing lines from a versification file
const COMMENT_SYMBOL: char = '#';
const EXCLUDED_SYMBOL: char = '-';
const SEGMENT_SYMBOL: char = '*';
const UNSPECIFIED_SEG_SYMBOL: &str = "-";
const SEGMENT_SEP: char = ',';
const MAPPING_SYMBOL: char = '=';
const VERS_EXTENSION_SYMBOL: char = '!';
const CHAP_VERSE_SEP: char = ':';

lazy_static! {
    static ref VERSIFICATION_NAME: Regex =
        Regex::new("^#\\s*Versification\\s+\"([^\"]+)\"\\s*$").unwrap();
}

type SeaState = BuildHasherDefault<SeaHasher>;

// ------------- VerseKey -------------

/// A single verse location stripped of its scheme, used as the key of the
/// verse-mapping tables. The optional raw verse text carries a segment
/// letter (e.g. `1b`) so segmented mappings stay exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct VerseKey {
    pub book_num: u16,
    pub chapter_num: i32,
    pub verse_num: i32,
    pub verse: Option<String>,
}

impl VerseKey {
    pub fn from_verse_ref(vref: &VerseRef) -> Self {
        Self {
            book_num: vref.book_num(),
            chapter_num: vref.chapter_num(),
            verse_num: vref.verse_num(),
            verse: vref.verse_text().map(str::to_owned),
        }
    }

    pub fn parse(reference: &str) -> Result<Self> {
        Ok(Self::from_verse_ref(&VerseRef::parse(reference)?))
    }

    /// Setting the verse number drops any raw verse text, like the reference
    /// type does.
    pub fn set_verse_num(&mut self, verse_num: i32) {
        self.verse_num = verse_num;
        self.verse = None;
    }

    pub fn has_multiple(&self) -> bool {
        self.verse
            .as_deref()
            .map(|v| v.contains('-') || v.contains(','))
            .unwrap_or(false)
    }

    fn segment(&self) -> &str {
        let Some(verse) = self.verse.as_deref() else {
            return "";
        };
        let digits = verse.chars().take_while(|c| c.is_ascii_digit()).count();
        let rest = &verse[digits..];
        let end = rest
            .find(|c: char| c == '-' || c == ',' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    }

    pub fn apply_to(&self, vref: &mut VerseRef) {
        vref.copy_location_from(self.book_num, self.chapter_num, self.verse_num, self.verse.as_deref());
    }
}

impl PartialOrd for VerseKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VerseKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.book_num, self.chapter_num, self.verse_num, self.segment()).cmp(&(
            other.book_num,
            other.chapter_num,
            other.verse_num,
            other.segment(),
        ))
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let book = Canon::global().book_number_to_id_or(self.book_num, "");
        match &self.verse {
            Some(verse) => write!(f, "{} {}:{}", book, self.chapter_num, verse),
            None => write!(f, "{} {}:{}", book, self.chapter_num, self.verse_num),
        }
    }
}

// ------------- VerseMappings -------------

/// The bidirectional mapping between a scheme and the standard scheme. Two
/// owned maps, written only through [`VerseMappings::add`] so both sides stay
/// in step. Not a bijection: many-to-one mappings are legal, which is why
/// this is not a `BiMap`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct VerseMappings {
    vers_to_standard: HashMap<VerseKey, VerseKey, SeaState>,
    standard_to_vers: HashMap<VerseKey, VerseKey, SeaState>,
}

impl VerseMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a verse mapping, replacing any existing entry for either side.
    /// Both sides must resolve to a single verse.
    pub fn add(&mut self, vers: VerseKey, standard: VerseKey) -> Result<()> {
        if vers.has_multiple() || standard.has_multiple() {
            return Err(CanonryError::Scheme(
                "mappings must resolve into a single reference on both sides".into(),
            ));
        }
        self.vers_to_standard.insert(vers.clone(), standard.clone());
        self.standard_to_vers.insert(standard, vers);
        Ok(())
    }

    pub fn add_many(&mut self, vers: &[VerseKey], standard: &[VerseKey]) -> Result<()> {
        for v in vers.iter().rev() {
            for s in standard.iter().rev() {
                self.add(v.clone(), s.clone())?;
            }
        }
        Ok(())
    }

    pub fn get_standard(&self, vers: &VerseKey) -> Option<&VerseKey> {
        self.vers_to_standard.get(vers)
    }

    pub fn get_vers(&self, standard: &VerseKey) -> Option<&VerseKey> {
        self.standard_to_vers.get(standard)
    }

    pub fn clear(&mut self) {
        self.vers_to_standard.clear();
        self.standard_to_vers.clear();
    }

    /// The mappings as merged ranges rather than individual verses, ordered
    /// by the left-hand (scheme) side.
    pub fn ranges(&self) -> Vec<(VerseKey, VerseKey)> {
        let mut pending: BTreeMap<VerseKey, VerseKey> = self
            .vers_to_standard
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        // Some schemes map multiple verses onto one, so pick up anything only
        // recorded in the reverse direction.
        for (standard, vers) in &self.standard_to_vers {
            pending.insert(vers.clone(), standard.clone());
        }

        let mut merged = Vec::new();
        while let Some((first_left, first_right)) = pending.pop_first() {
            let mut next_left = first_left.clone();
            let mut next_right = first_right.clone();
            let mut last_left;
            let mut last_right;
            loop {
                pending.remove(&next_left);
                last_left = next_left.verse_num;
                last_right = next_right.verse_num;
                next_left.set_verse_num(last_left + 1);
                next_right.set_verse_num(last_right + 1);
                match pending.get(&next_left) {
                    Some(mapped) if *mapped == next_right => continue,
                    _ => break,
                }
            }

            let mut left = first_left;
            let mut right = first_right;
            if left.verse_num != last_left {
                left.verse = Some(format!("{}-{}", left.verse_num, last_left));
                right.verse = Some(format!("{}-{}", right.verse_num, last_right));
            }
            merged.push((left, right));
        }
        merged
    }
}

// ------------- Versification -------------

/// Internal information for one versification scheme: per-book verse counts,
/// mappings to the standard scheme, excluded verses and verse segments.
/// Access normally goes through a `ScrVers` handle.
#[derive(Debug, Clone)]
pub struct Versification {
    name: String,
    vers_type: ScrVersType,
    full_path: Option<String>,
    base_name: Option<String>,
    /// book number - 1 → max verse number for each chapter
    book_chapters: Vec<Vec<u16>>,
    mappings: VerseMappings,
    /// encoded BBBCCCVVV integers so lookups with segments are exact
    excluded_verses: HashSet<u32, SeaState>,
    /// encoded BBBCCCVVV integers so lookups with segments are exact
    verse_segments: HashMap<u32, Vec<String>, SeaState>,
}

impl Versification {
    pub(crate) fn new(name: &str, vers_type: ScrVersType, full_path: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            vers_type,
            full_path: full_path.map(str::to_owned),
            base_name: None,
            book_chapters: Vec::new(),
            mappings: VerseMappings::new(),
            excluded_verses: HashSet::default(),
            verse_segments: HashMap::default(),
        }
    }

    /// Creates a customization of a base versification: an eager copy that
    /// later directives override. Customizations do not chain.
    pub(crate) fn customized(base: &Versification, name: &str, full_path: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            vers_type: ScrVersType::Unknown,
            full_path: full_path.map(str::to_owned),
            base_name: Some(base.name.clone()),
            book_chapters: base.book_chapters.clone(),
            mappings: base.mappings.clone(),
            excluded_verses: base.excluded_verses.clone(),
            verse_segments: base.verse_segments.clone(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.book_chapters.clear();
        self.mappings.clear();
        self.excluded_verses.clear();
        self.verse_segments.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vers_type(&self) -> ScrVersType {
        self.vers_type
    }

    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    pub fn is_customized(&self) -> bool {
        self.base_name.is_some()
    }

    pub fn has_verse_segments(&self) -> bool {
        !self.verse_segments.is_empty()
    }

    /// Last book present in this scheme's table.
    pub fn last_book(&self) -> u16 {
        self.book_chapters.len() as u16
    }

    /// Last chapter number of the book. Non-canonical books report the 998
    /// sentinel; books absent from the table have one chapter.
    pub fn last_chapter(&self, book_num: u16) -> u16 {
        if !Canon::global().is_canonical(book_num) {
            return NON_CANONICAL_LAST_CHAPTER_OR_VERSE;
        }
        match self.book_chapters.get(book_num as usize - 1) {
            Some(chapters) => chapters.len() as u16,
            None => 1,
        }
    }

    /// Last verse number in the book/chapter. Non-canonical books report the
    /// 998 sentinel; absent books and chapters have one verse.
    pub fn last_verse(&self, book_num: u16, chapter_num: i32) -> u16 {
        if !Canon::global().is_canonical(book_num) {
            return NON_CANONICAL_LAST_CHAPTER_OR_VERSE;
        }
        let Some(chapters) = self.book_chapters.get(book_num as usize - 1) else {
            return 1;
        };
        if chapter_num < 1 || chapter_num as usize > chapters.len() {
            return 1;
        }
        chapters[chapter_num as usize - 1]
    }

    pub fn is_excluded(&self, bbbcccvvv: u32) -> bool {
        self.excluded_verses.contains(&bbbcccvvv)
    }

    pub fn verse_segments(&self, bbbcccvvv: u32) -> Option<&[String]> {
        self.verse_segments.get(&bbbcccvvv).map(Vec::as_slice)
    }

    /// First verse of the book at or after the given chapter that is not
    /// excluded, scanning forward across chapters (chapters with a zero
    /// verse count are skipped entirely).
    pub fn first_included_verse(&self, book_num: u16, chapter_num: i32) -> Option<(i32, i32)> {
        let last_chapter = self.last_chapter(book_num) as i32;
        let mut chapter = chapter_num.max(1);
        while chapter <= last_chapter {
            for verse in 1..=self.last_verse(book_num, chapter) as i32 {
                if !self.is_excluded(encode_bbbcccvvv(book_num, chapter, verse)) {
                    return Some((chapter, verse));
                }
            }
            chapter += 1;
        }
        None
    }

    /// Books materially present in this scheme: canonical, not obsolete and
    /// with more content than the 1:1 placeholder.
    pub fn scripture_books(&self) -> BookSet {
        let mut set = BookSet::new();
        for book_num in Canon::global().scripture_books().selected_book_numbers() {
            if self.last_chapter(book_num) != 1 || self.last_verse(book_num, 1) != 1 {
                set.add(book_num);
            }
        }
        set
    }

    pub(crate) fn map_to_standard(&self, key: &VerseKey) -> VerseKey {
        self.mappings.get_standard(key).cloned().unwrap_or_else(|| key.clone())
    }

    pub(crate) fn map_from_standard(&self, key: &VerseKey) -> VerseKey {
        self.mappings.get_vers(key).cloned().unwrap_or_else(|| key.clone())
    }

    pub(crate) fn book_chapter_verse_exists(
        &self,
        book_num: u16,
        chapter_num: i32,
        verse_num: i32,
    ) -> bool {
        book_num <= self.last_book()
            && chapter_num <= self.last_chapter(book_num) as i32
            && verse_num <= self.last_verse(book_num, chapter_num) as i32
    }

    // ------------- Line parsing -------------

    /// Reads definition lines into a fresh versification. The scheme name
    /// comes from the first `# Versification "NAME"` line, else from
    /// `fallback_name`; a directive before either is a load error.
    pub(crate) fn parse_new<'a>(
        lines: impl Iterator<Item = &'a str>,
        file_path: Option<&str>,
        vers_type: ScrVersType,
        fallback_name: Option<&str>,
        hook: Option<&(dyn Fn(&CanonryError) -> bool + Send + Sync)>,
    ) -> Result<Versification> {
        let mut vers: Option<Versification> = None;
        for raw in lines {
            if vers.is_none() {
                if let Some(captures) = VERSIFICATION_NAME.captures(raw) {
                    vers = Some(Versification::new(&captures[1], vers_type, file_path));
                }
            }

            let (line_type, line) = classify_line(raw);
            if line_type == LineType::Comment {
                continue;
            }

            if vers.is_none() {
                match fallback_name {
                    Some(name) => vers = Some(Versification::new(name, vers_type, file_path)),
                    None => {
                        let err = CanonryError::invalid_line(
                            LineErrorKind::MissingName,
                            &line,
                            file_path,
                        );
                        if hook.map(|h| h(&err)).unwrap_or(false) {
                            continue;
                        }
                        return Err(err);
                    }
                }
            }
            let Some(target) = vers.as_mut() else {
                continue;
            };

            if let Err(err) = target.process_classified_line(line_type, &line, file_path) {
                if matches!(err, CanonryError::InvalidLine { .. })
                    && hook.map(|h| h(&err)).unwrap_or(false)
                {
                    continue;
                }
                return Err(err);
            }
        }
        match vers {
            Some(v) => Ok(v),
            None => match fallback_name {
                Some(name) => Ok(Versification::new(name, vers_type, file_path)),
                None => Err(CanonryError::invalid_line(LineErrorKind::MissingName, "", file_path)),
            },
        }
    }

    /// Reads definition lines into an existing versification (reload, or a
    /// customization layered over its base). Name lines are comments here.
    pub(crate) fn parse_into<'a>(
        &mut self,
        lines: impl Iterator<Item = &'a str>,
        file_path: Option<&str>,
        hook: Option<&(dyn Fn(&CanonryError) -> bool + Send + Sync)>,
    ) -> Result<()> {
        for raw in lines {
            let (line_type, line) = classify_line(raw);
            if line_type == LineType::Comment {
                continue;
            }
            if let Err(err) = self.process_classified_line(line_type, &line, file_path) {
                if matches!(err, CanonryError::InvalidLine { .. })
                    && hook.map(|h| h(&err)).unwrap_or(false)
                {
                    continue;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn process_classified_line(
        &mut self,
        line_type: LineType,
        line: &str,
        file_path: Option<&str>,
    ) -> Result<()> {
        match line_type {
            LineType::Comment => Ok(()),
            LineType::ChapterVerse => self.parse_chapter_verse_line(line, file_path),
            LineType::StandardMapping => self.parse_mapping_line(line, file_path),
            LineType::OneToManyMapping => self.parse_range_to_one_mapping_line(line, file_path),
            LineType::ExcludedVerse => self.parse_excluded_verse_line(line, file_path),
            LineType::VerseSegments => self.parse_verse_segments_line(line, file_path),
        }
    }

    /// `BOOK 1:n 2:n ... [END]` — the verse counts of each listed chapter.
    /// Unlisted chapters in between default to one verse; `END` truncates a
    /// longer inherited chapter list.
    fn parse_chapter_verse_line(&mut self, line: &str, file: Option<&str>) -> Result<()> {
        let syntax = || CanonryError::invalid_line(LineErrorKind::InvalidSyntax, line, file);

        let parts: Vec<&str> = line.split(' ').collect();
        let book_num = Canon::global().book_id_to_number(parts[0], true);
        if book_num == 0 {
            return Err(syntax());
        }

        while self.book_chapters.len() < book_num as usize {
            self.book_chapters.push(vec![1]);
        }

        let mut verses_in_chapter = self.book_chapters[book_num as usize - 1].clone();
        let mut chapter: usize = 0;
        for part in &parts[1..] {
            if *part == "END" {
                if verses_in_chapter.len() > chapter {
                    verses_in_chapter.truncate(chapter);
                }
                break;
            }

            let mut pieces = part.split(CHAP_VERSE_SEP);
            let chapter_str = pieces.next().unwrap_or("");
            chapter = match chapter_str.parse::<usize>() {
                Ok(c) if c > 0 => c,
                _ => return Err(syntax()),
            };
            let verse_count = match (pieces.next(), pieces.next()) {
                (Some(v), None) => v.parse::<u16>().map_err(|_| syntax())?,
                _ => return Err(syntax()),
            };

            if verses_in_chapter.len() < chapter {
                verses_in_chapter.resize(chapter, 1);
            }
            verses_in_chapter[chapter - 1] = verse_count;
        }

        self.book_chapters[book_num as usize - 1] = verses_in_chapter;
        Ok(())
    }

    /// `BOOK C:V[-V2] = BOOK C:V[-V2]` — a mapping from this scheme to the
    /// standard scheme, expanded to one pair per verse.
    fn parse_mapping_line(&mut self, line: &str, file: Option<&str>) -> Result<()> {
        let syntax = || CanonryError::invalid_line(LineErrorKind::InvalidSyntax, line, file);

        let (left, right) = line.split_once(MAPPING_SYMBOL).ok_or_else(syntax)?;
        let left_pieces: Vec<&str> = left.trim().split('-').collect();
        let right_pieces: Vec<&str> = right.trim().split('-').collect();

        let mut vers = VerseKey::parse(left_pieces[0]).map_err(|_| syntax())?;
        let left_limit = match left_pieces.get(1) {
            Some(limit) => limit.parse::<i32>().map_err(|_| syntax())?,
            None => 0,
        };
        let mut standard = match right_pieces.first() {
            Some(piece) => VerseKey::parse(piece).map_err(|_| syntax())?,
            None => return Err(syntax()),
        };

        loop {
            self.mappings
                .add(vers.clone(), standard.clone())
                .map_err(|_| syntax())?;
            if vers.verse_num >= left_limit {
                break;
            }
            vers.set_verse_num(vers.verse_num + 1);
            standard.set_verse_num(standard.verse_num + 1);
        }
        Ok(())
    }

    /// `&BOOK C:V[-V2] = BOOK C:V[-V2]` — a mapping where one side is a
    /// range and the other must be a single verse.
    fn parse_range_to_one_mapping_line(&mut self, line: &str, file: Option<&str>) -> Result<()> {
        let line = line.strip_prefix('&').unwrap_or(line);
        let syntax = || CanonryError::invalid_line(LineErrorKind::InvalidSyntax, line, file);

        let (left, right) = line.split_once(MAPPING_SYMBOL).ok_or_else(syntax)?;
        let vers_refs = expand_references(left.trim()).map_err(|_| syntax())?;
        let standard_refs = expand_references(right.trim()).map_err(|_| syntax())?;

        if vers_refs.len() != 1 && standard_refs.len() != 1 {
            return Err(CanonryError::invalid_line(
                LineErrorKind::InvalidManyToOneMap,
                line,
                file,
            ));
        }

        self.mappings
            .add_many(&vers_refs, &standard_refs)
            .map_err(|_| syntax())
    }

    /// `-BOOK C:V` — records an excluded verse.
    fn parse_excluded_verse_line(&mut self, line: &str, file: Option<&str>) -> Result<()> {
        let line = line.trim();
        let syntax = || CanonryError::invalid_line(LineErrorKind::InvalidSyntax, line, file);

        if line.len() < 8
            || !line.starts_with(EXCLUDED_SYMBOL)
            || !line.contains(CHAP_VERSE_SEP)
            || !line.contains(' ')
        {
            return Err(syntax());
        }

        let parts: Vec<&str> = line.split(' ').collect();
        let (book_num, chapter, verse) = verse_reference_parts(&parts).ok_or_else(syntax)?;

        let bbbcccvvv = encode_bbbcccvvv(book_num, chapter, verse);
        if !self.excluded_verses.insert(bbbcccvvv) {
            return Err(CanonryError::invalid_line(
                LineErrorKind::DuplicateExcludedVerse,
                line,
                file,
            ));
        }
        Ok(())
    }

    /// `*BOOK C:V,-,a,b,...` — the ordered segment labels of a verse. `-`
    /// names the unmarked variant and, when present, must come first and
    /// only once; a line defining nothing but the unmarked variant is an
    /// error.
    fn parse_verse_segments_line(&mut self, line: &str, file: Option<&str>) -> Result<()> {
        let line = line.trim();
        let syntax = || CanonryError::invalid_line(LineErrorKind::InvalidSyntax, line, file);

        if line.len() < 8
            || !line.starts_with(SEGMENT_SYMBOL)
            || !line.contains(CHAP_VERSE_SEP)
            || !line.contains(' ')
            || !line.contains(SEGMENT_SEP)
        {
            return Err(syntax());
        }

        let colon = line.find(CHAP_VERSE_SEP).ok_or_else(syntax)?;
        let compact = remove_spaces_from(line, colon);

        let parts: Vec<&str> = compact.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(syntax());
        }

        let segment_start = parts[1].find(SEGMENT_SEP).ok_or_else(syntax)?;
        let segments_str = &parts[1][segment_start + 1..];
        let reference = &parts[1][..segment_start];

        let ref_parts = [parts[0], reference];
        let (book_num, chapter, verse) = verse_reference_parts(&ref_parts).ok_or_else(syntax)?;

        let mut segment_list: Vec<String> = Vec::new();
        for seg in segments_str.split(SEGMENT_SEP) {
            if seg.is_empty() {
                continue;
            }
            if seg == UNSPECIFIED_SEG_SYMBOL {
                if !segment_list.is_empty() {
                    return Err(CanonryError::invalid_line(
                        LineErrorKind::UnspecifiedSegmentLocation,
                        line,
                        file,
                    ));
                }
                // '-' indicates no marking for the segment
                segment_list.push(String::new());
            } else {
                segment_list.push(seg.to_owned());
            }
        }

        if segment_list.len() == 1 && segment_list[0].is_empty() {
            return Err(CanonryError::invalid_line(
                LineErrorKind::NoSegmentsDefined,
                line,
                file,
            ));
        }

        let bbbcccvvv = encode_bbbcccvvv(book_num, chapter, verse);
        // built-in schemes have no backing file and may not be redefined
        if file.is_none() && self.verse_segments.contains_key(&bbbcccvvv) {
            return Err(CanonryError::invalid_line(
                LineErrorKind::DuplicateSegment,
                line,
                file,
            ));
        }

        self.verse_segments.insert(bbbcccvvv, segment_list);
        Ok(())
    }

    // ------------- Writing -------------

    /// Writes the versification back out in the directive format. The round
    /// trip is semantic, not byte-for-byte: mappings are merged into ranges
    /// and entries are emitted in canonical order.
    pub fn write_definition(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "# List of books, chapters, verses")?;
        writeln!(out, "# One line per book.")?;
        writeln!(out, "# One entry for each chapter.")?;
        writeln!(out, "# Verse number is the maximum verse number for that chapter.")?;

        for (index, chapters) in self.book_chapters.iter().enumerate() {
            write!(out, "{}", Canon::global().book_number_to_id(index as u16 + 1))?;
            for (chapter, verse_count) in chapters.iter().enumerate() {
                write!(out, " {}{}{}", chapter + 1, CHAP_VERSE_SEP, verse_count)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "#")?;
        writeln!(out, "# Mappings from this versification to standard versification")?;
        for (vers, standard) in self.mappings.ranges() {
            writeln!(out, "{} = {}", vers, standard)?;
        }

        writeln!(out, "#")?;
        writeln!(out, "# Excluded verses")?;
        let mut excluded: Vec<u32> = self.excluded_verses.iter().copied().collect();
        excluded.sort_unstable();
        for bbbcccvvv in excluded {
            writeln!(out, "#! -{}", VerseRef::from_bbbcccvvv(bbbcccvvv, None))?;
        }

        writeln!(out, "#")?;
        writeln!(out, "# Verse segment information")?;
        let mut segmented: Vec<u32> = self.verse_segments.keys().copied().collect();
        segmented.sort_unstable();
        for bbbcccvvv in segmented {
            write!(out, "#! *{}", VerseRef::from_bbbcccvvv(bbbcccvvv, None))?;
            for seg in &self.verse_segments[&bbbcccvvv] {
                let label = if seg.is_empty() { UNSPECIFIED_SEG_SYMBOL } else { seg.as_str() };
                write!(out, ",{}", label)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

// Value equality over the full parsed content; used by scheme handle
// equality, where two same-named handles may diverge across a reload.
impl PartialEq for Versification {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.book_chapters == other.book_chapters
            && self.excluded_verses == other.excluded_verses
            && self.verse_segments == other.verse_segments
            && self.mappings == other.mappings
    }
}

impl fmt::Display for Versification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ------------- Line classification -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineType {
    Comment,
    ChapterVerse,
    StandardMapping,
    OneToManyMapping,
    ExcludedVerse,
    VerseSegments,
}

/// Splits a raw line into its directive type and payload. A `#!` prefix
/// inside a comment marks a real directive (the legacy extension syntax).
pub(crate) fn classify_line(raw: &str) -> (LineType, String) {
    let trimmed = raw.trim();
    let mut is_comment_line = trimmed.starts_with(COMMENT_SYMBOL);

    let (mut line, comment) = match trimmed.split_once(COMMENT_SYMBOL) {
        Some((before, after)) => (before.trim().to_owned(), after.trim().to_owned()),
        None => (trimmed.to_owned(), String::new()),
    };

    if line.is_empty() && comment.len() > 2 && comment.starts_with(VERS_EXTENSION_SYMBOL) {
        line = comment[1..].trim().to_owned();
        is_comment_line = false;
    }

    let line_type = if line.is_empty() || is_comment_line {
        LineType::Comment
    } else if line.contains(MAPPING_SYMBOL) {
        if line.starts_with('&') {
            LineType::OneToManyMapping
        } else {
            LineType::StandardMapping
        }
    } else if line.starts_with(EXCLUDED_SYMBOL) {
        LineType::ExcludedVerse
    } else if line.starts_with(SEGMENT_SYMBOL) {
        LineType::VerseSegments
    } else {
        LineType::ChapterVerse
    };

    (line_type, line)
}

/// Expands `BOOK C:V` or `BOOK C:V-V2` into individual verse keys.
fn expand_references(piece: &str) -> Result<Vec<VerseKey>> {
    let pieces: Vec<&str> = piece.split('-').collect();
    let mut current = VerseKey::parse(pieces[0])?;
    if pieces.len() == 1 {
        return Ok(vec![current]);
    }

    let limit = pieces[1]
        .parse::<i32>()
        .map_err(|_| CanonryError::InvalidReference(piece.to_owned()))?;
    let mut refs = Vec::new();
    loop {
        refs.push(current.clone());
        if current.verse_num >= limit {
            break;
        }
        current.set_verse_num(current.verse_num + 1);
    }
    Ok(refs)
}

/// `["-GEN", "1:31"]` (or `["*GEN", "1:5"]`) → book number, chapter, verse.
fn verse_reference_parts(parts: &[&str]) -> Option<(u16, i32, i32)> {
    let book_id = parts.first()?.get(1..)?;
    let book_num = Canon::global().book_id_to_number(book_id, true);
    if book_num == 0 {
        return None;
    }
    let (chapter_str, verse_str) = parts.get(1)?.split_once(CHAP_VERSE_SEP)?;
    let chapter = chapter_str.parse::<i32>().ok()?;
    let verse = verse_str.parse::<i32>().ok()?;
    Some((book_num, chapter, verse))
}

/// Removes every space after `index`, so `*GEN 1:5, a, b` parses the same as
/// `*GEN 1:5,a,b`.
fn remove_spaces_from(line: &str, index: usize) -> String {
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..index]);
    for part in line[index..].split(' ') {
        out.push_str(part);
    }
    out
}
