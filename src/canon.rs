use std::sync::OnceLock;

// used to keep the two-way mapping between book codes and book numbers
use bimap::BiMap;

use crate::bookset::BookSet;

// ------------- BookRecord -------------

/// One entry in the fixed canon registry. The position of an entry in the
/// registry is its 1-based book number and is bit-position stable: entries
/// may only ever be appended, never reordered or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookRecord {
    pub code: &'static str,
    pub name: &'static str,
    pub canonical: bool,
    pub obsolete: bool,
}

const fn book(code: &'static str, name: &'static str) -> BookRecord {
    BookRecord { code, name, canonical: true, obsolete: false }
}

const fn extra(code: &'static str, name: &'static str) -> BookRecord {
    BookRecord { code, name, canonical: false, obsolete: false }
}

// historical duplicate books, kept only so old data keeps its bit positions
const fn obsolete(code: &'static str, name: &'static str) -> BookRecord {
    BookRecord { code, name, canonical: true, obsolete: true }
}

#[rustfmt::skip]
const ALL_BOOKS: &[BookRecord] = &[
    book("GEN", "Genesis"),
    book("EXO", "Exodus"),
    book("LEV", "Leviticus"),
    book("NUM", "Numbers"),
    book("DEU", "Deuteronomy"),
    book("JOS", "Joshua"),
    book("JDG", "Judges"),
    book("RUT", "Ruth"),
    book("1SA", "1 Samuel"),
    book("2SA", "2 Samuel"), // 10
    book("1KI", "1 Kings"),
    book("2KI", "2 Kings"),
    book("1CH", "1 Chronicles"),
    book("2CH", "2 Chronicles"),
    book("EZR", "Ezra"),
    book("NEH", "Nehemiah"),
    book("EST", "Esther (Hebrew)"),
    book("JOB", "Job"),
    book("PSA", "Psalms"),
    book("PRO", "Proverbs"), // 20
    book("ECC", "Ecclesiastes"),
    book("SNG", "Song of Songs"),
    book("ISA", "Isaiah"),
    book("JER", "Jeremiah"),
    book("LAM", "Lamentations"),
    book("EZK", "Ezekiel"),
    book("DAN", "Daniel (Hebrew)"),
    book("HOS", "Hosea"),
    book("JOL", "Joel"),
    book("AMO", "Amos"), // 30
    book("OBA", "Obadiah"),
    book("JON", "Jonah"),
    book("MIC", "Micah"),
    book("NAM", "Nahum"),
    book("HAB", "Habakkuk"),
    book("ZEP", "Zephaniah"),
    book("HAG", "Haggai"),
    book("ZEC", "Zechariah"),
    book("MAL", "Malachi"),
    book("MAT", "Matthew"), // 40
    book("MRK", "Mark"),
    book("LUK", "Luke"),
    book("JHN", "John"),
    book("ACT", "Acts"),
    book("ROM", "Romans"),
    book("1CO", "1 Corinthians"),
    book("2CO", "2 Corinthians"),
    book("GAL", "Galatians"),
    book("EPH", "Ephesians"),
    book("PHP", "Philippians"), // 50
    book("COL", "Colossians"),
    book("1TH", "1 Thessalonians"),
    book("2TH", "2 Thessalonians"),
    book("1TI", "1 Timothy"),
    book("2TI", "2 Timothy"),
    book("TIT", "Titus"),
    book("PHM", "Philemon"),
    book("HEB", "Hebrews"),
    book("JAS", "James"),
    book("1PE", "1 Peter"), // 60
    book("2PE", "2 Peter"),
    book("1JN", "1 John"),
    book("2JN", "2 John"),
    book("3JN", "3 John"),
    book("JUD", "Jude"),
    book("REV", "Revelation"),
    book("TOB", "Tobit"),
    book("JDT", "Judith"),
    book("ESG", "Esther Greek"),
    book("WIS", "Wisdom of Solomon"), // 70
    book("SIR", "Sirach (Ecclesiasticus)"),
    book("BAR", "Baruch"),
    book("LJE", "Letter of Jeremiah"),
    book("S3Y", "Song of 3 Young Men"),
    book("SUS", "Susanna"),
    book("BEL", "Bel and the Dragon"),
    book("1MA", "1 Maccabees"),
    book("2MA", "2 Maccabees"),
    book("3MA", "3 Maccabees"),
    book("4MA", "4 Maccabees"), // 80
    book("1ES", "1 Esdras (Greek)"),
    book("2ES", "2 Esdras (Latin)"),
    book("MAN", "Prayer of Manasseh"),
    book("PS2", "Psalm 151"),
    book("ODA", "Odes"),
    book("PSS", "Psalms of Solomon"),
    obsolete("JSA", "Joshua A"),  // variant text for JOS, now in LXA text
    obsolete("JDB", "Judges B"),  // variant text for JDG, now in LXA text
    obsolete("TBS", "Tobit S"),   // variant text for TOB, now in LXA text
    obsolete("SST", "Susanna Th"), // variant text for SUS, now in LXA text // 90
    obsolete("DNT", "Daniel Th"), // variant text for DAN, now in LXA text
    obsolete("BLT", "Bel Th"),    // variant text for BEL, now in LXA text
    extra("XXA", "Extra A"),
    extra("XXB", "Extra B"),
    extra("XXC", "Extra C"),
    extra("XXD", "Extra D"),
    extra("XXE", "Extra E"),
    extra("XXF", "Extra F"),
    extra("XXG", "Extra G"),
    extra("FRT", "Front Matter"), // 100
    extra("BAK", "Back Matter"),
    extra("OTH", "Other Matter"),
    obsolete("3ES", "3 Ezra"),    // used previously but really should be 2ES
    book("EZA", "Apocalypse of Ezra"),   // used to be called 4ES
    book("5EZ", "5 Ezra (Latin Prologue)"), // used to be called 5ES
    book("6EZ", "6 Ezra (Latin Epilogue)"), // used to be called 6ES
    extra("INT", "Introduction"),
    extra("CNC", "Concordance"),
    extra("GLO", "Glossary"),
    extra("TDX", "Topical Index"), // 110
    extra("NDX", "Names Index"),
    book("DAG", "Daniel Greek"),
    book("PS3", "Psalms 152-155"),
    book("2BA", "2 Baruch (Apocalypse)"),
    book("LBA", "Letter of Baruch"),
    book("JUB", "Jubilees"),
    book("ENO", "Enoch"),
    book("1MQ", "1 Meqabyan"),
    book("2MQ", "2 Meqabyan"),
    book("3MQ", "3 Meqabyan"), // 120
    book("REP", "Reproof (Proverbs 25-31)"),
    book("4BA", "4 Baruch (Rest of Baruch)"),
    book("LAO", "Laodiceans"),
];

// ------------- Canon -------------

/// The fixed, ordered registry of all recognized book identifiers and their
/// classification. Built once and then immutable; the process-wide instance
/// is obtained through [`Canon::global`].
///
/// Lookup misses never fail: unknown codes resolve to book number 0 and
/// out-of-range numbers resolve to an error placeholder string. Validity
/// checking is the caller's contract.
pub struct Canon {
    records: &'static [BookRecord],
    numbers: BiMap<&'static str, u16>,
    scripture_books: OnceLock<BookSet>,
    all_books: OnceLock<BookSet>,
}

static GLOBAL_CANON: OnceLock<Canon> = OnceLock::new();

impl Canon {
    pub fn new() -> Self {
        let mut numbers = BiMap::new();
        for (i, record) in ALL_BOOKS.iter().enumerate() {
            numbers.insert(record.code, (i + 1) as u16);
        }
        Self {
            records: ALL_BOOKS,
            numbers,
            scripture_books: OnceLock::new(),
            all_books: OnceLock::new(),
        }
    }

    pub fn global() -> &'static Canon {
        GLOBAL_CANON.get_or_init(Canon::new)
    }

    /// Gets the 1-based number of the specified book, or 0 if the id is not
    /// in the registry. This is a performance-critical lookup.
    pub fn book_id_to_number(&self, id: &str, ignore_case: bool) -> u16 {
        if ignore_case {
            let upper = id.to_uppercase();
            self.numbers.get_by_left(upper.as_str()).copied().unwrap_or(0)
        } else {
            self.numbers.get_by_left(id).copied().unwrap_or(0)
        }
    }

    pub fn is_book_id_valid(&self, id: &str) -> bool {
        self.book_id_to_number(id, true) > 0
    }

    /// Gets the id of a book based on its 1-based number, or `error_value`
    /// when the number is out of range.
    pub fn book_number_to_id_or<'a>(&self, number: u16, error_value: &'a str) -> &'a str {
        match self.numbers.get_by_right(&number).copied() {
            Some(code) => code,
            None => error_value,
        }
    }

    pub fn book_number_to_id(&self, number: u16) -> &'static str {
        self.book_number_to_id_or(number, "***")
    }

    pub fn book_number_to_english_name(&self, number: u16) -> &'static str {
        if number == 0 || number as usize > self.records.len() {
            return "******";
        }
        self.records[number as usize - 1].name
    }

    pub fn book_id_to_english_name(&self, id: &str) -> &'static str {
        self.book_number_to_english_name(self.book_id_to_number(id, true))
    }

    pub fn record(&self, number: u16) -> Option<&BookRecord> {
        if number == 0 {
            return None;
        }
        self.records.get(number as usize - 1)
    }

    /// True if this is a canonical book, as opposed to front matter etc.
    pub fn is_canonical(&self, number: u16) -> bool {
        self.record(number).map(|r| r.canonical).unwrap_or(false)
    }

    pub fn is_canonical_id(&self, id: &str) -> bool {
        self.is_canonical(self.book_id_to_number(id, true))
    }

    pub fn is_extra_material(&self, number: u16) -> bool {
        self.record(number).map(|r| !r.canonical).unwrap_or(false)
    }

    pub fn is_extra_material_id(&self, id: &str) -> bool {
        self.is_extra_material(self.book_id_to_number(id, true))
    }

    /// Flags historical duplicate books that only remain for bit-position
    /// stability of persisted book sets.
    pub fn is_obsolete(&self, number: u16) -> bool {
        self.record(number).map(|r| r.obsolete).unwrap_or(false)
    }

    /// Check if the book number is in the Protestant OT.
    pub fn is_book_ot(&self, number: u16) -> bool {
        (1..=39).contains(&number)
    }

    /// Check if the book number is in the western NT.
    pub fn is_book_nt(&self, number: u16) -> bool {
        (40..=66).contains(&number)
    }

    pub fn is_book_ot_nt(&self, number: u16) -> bool {
        (1..=66).contains(&number)
    }

    /// Check if the book is in the Deutero Canon.
    pub fn is_book_dc(&self, number: u16) -> bool {
        self.is_canonical(number) && !self.is_book_ot_nt(number)
    }

    /// Index of the first book. Abstracting this makes code less fragile.
    pub fn first_book(&self) -> u16 {
        1
    }

    /// Number of the last book (1-based).
    pub fn last_book(&self) -> u16 {
        self.records.len() as u16
    }

    pub fn all_book_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        1..=self.last_book()
    }

    pub fn all_book_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.records.iter().map(|r| r.code)
    }

    /// A book set containing only scripture books, i.e. canonical and not
    /// obsolete. Built lazily because BookSet construction itself consults
    /// the canon.
    pub fn scripture_books(&self) -> &BookSet {
        self.scripture_books.get_or_init(|| {
            let mut set = BookSet::new();
            for number in self.all_book_numbers() {
                if self.is_canonical(number) && !self.is_obsolete(number) {
                    set.add(number);
                }
            }
            set
        })
    }

    /// A book set containing all books that are not obsolete.
    pub fn all_books(&self) -> &BookSet {
        self.all_books.get_or_init(|| {
            let mut set = BookSet::new();
            for number in self.all_book_numbers() {
                if !self.is_obsolete(number) {
                    set.add(number);
                }
            }
            set
        })
    }
}

impl Default for Canon {
    fn default() -> Self {
        Self::new()
    }
}
