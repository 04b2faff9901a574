use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info};

use crate::bookset::BookSet;
use crate::error::{CanonryError, Result};
use crate::versification::{bypasses_mapping_shortcut, VerseKey, Versification};
use crate::verseref::VerseRef;

// the six built-in schemes ship as embedded definition text, not files
const ORIGINAL_VRS: &str = include_str!("schemes/original.vrs");
const SEPTUAGINT_VRS: &str = include_str!("schemes/septuagint.vrs");
const VULGATE_VRS: &str = include_str!("schemes/vulgate.vrs");
const ENGLISH_VRS: &str = include_str!("schemes/english.vrs");
const RUSSIAN_PROTESTANT_VRS: &str = include_str!("schemes/russian_protestant.vrs");
const RUSSIAN_ORTHODOX_VRS: &str = include_str!("schemes/russian_orthodox.vrs");

// ------------- ScrVersType -------------

/// The built-in versification types. The order is load-bearing: the
/// discriminants are the legacy numeric codes used by the `/N` reference
/// suffix and stored by old callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScrVersType {
    Unknown = 0,
    Original = 1,
    Septuagint = 2,
    Vulgate = 3,
    English = 4,
    RussianProtestant = 5,
    RussianOrthodox = 6,
}

impl ScrVersType {
    pub const BUILT_IN: [ScrVersType; 6] = [
        ScrVersType::Original,
        ScrVersType::Septuagint,
        ScrVersType::Vulgate,
        ScrVersType::English,
        ScrVersType::RussianProtestant,
        ScrVersType::RussianOrthodox,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<ScrVersType> {
        match code {
            0 => Some(ScrVersType::Unknown),
            1 => Some(ScrVersType::Original),
            2 => Some(ScrVersType::Septuagint),
            3 => Some(ScrVersType::Vulgate),
            4 => Some(ScrVersType::English),
            5 => Some(ScrVersType::RussianProtestant),
            6 => Some(ScrVersType::RussianOrthodox),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ScrVersType::Unknown => "Unknown",
            ScrVersType::Original => "Original",
            ScrVersType::Septuagint => "Septuagint",
            ScrVersType::Vulgate => "Vulgate",
            ScrVersType::English => "English",
            ScrVersType::RussianProtestant => "RussianProtestant",
            ScrVersType::RussianOrthodox => "RussianOrthodox",
        }
    }

    /// The type a scheme name denotes; `Unknown` for anything that is not a
    /// built-in name.
    pub fn from_name(name: &str) -> ScrVersType {
        ScrVersType::BUILT_IN
            .into_iter()
            .find(|t| t.type_name() == name)
            .unwrap_or(ScrVersType::Unknown)
    }

    fn embedded_text(self) -> &'static str {
        match self {
            ScrVersType::Original => ORIGINAL_VRS,
            ScrVersType::Septuagint => SEPTUAGINT_VRS,
            ScrVersType::Vulgate => VULGATE_VRS,
            ScrVersType::English => ENGLISH_VRS,
            ScrVersType::RussianProtestant => RUSSIAN_PROTESTANT_VRS,
            ScrVersType::RussianOrthodox => RUSSIAN_ORTHODOX_VRS,
            ScrVersType::Unknown => "",
        }
    }
}

impl fmt::Display for ScrVersType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

// ------------- SchemeRegistry -------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SchemeKey {
    vers_type: ScrVersType,
    /// empty for built-in schemes
    name: String,
}

impl SchemeKey {
    fn builtin(vers_type: ScrVersType) -> Self {
        Self { vers_type, name: String::new() }
    }

    fn named(name: &str) -> Self {
        Self { vers_type: ScrVersType::Unknown, name: name.to_owned() }
    }
}

type LineErrorHook = dyn Fn(&CanonryError) -> bool + Send + Sync;

/// The owner of all cached versifications. Schemes are created on first
/// request and live for the registry's lifetime; [`SchemeRegistry::reload`]
/// re-parses file-backed schemes in place so every live handle observes the
/// new content. One internal lock serializes first-loads and reloads;
/// warmed-up reads only take it for the map lookup.
pub struct SchemeRegistry {
    versifications: Mutex<HashMap<SchemeKey, Arc<Mutex<Versification>>>>,
    line_error_hook: Option<Box<LineErrorHook>>,
}

static SHARED_REGISTRY: OnceLock<Arc<SchemeRegistry>> = OnceLock::new();

impl SchemeRegistry {
    pub fn new() -> Arc<SchemeRegistry> {
        Arc::new(SchemeRegistry {
            versifications: Mutex::new(HashMap::new()),
            line_error_hook: None,
        })
    }

    /// A registry whose loader consults `hook` on every malformed line:
    /// returning `true` skips the line and continues, returning `false`
    /// propagates the error.
    pub fn with_error_hook(
        hook: impl Fn(&CanonryError) -> bool + Send + Sync + 'static,
    ) -> Arc<SchemeRegistry> {
        Arc::new(SchemeRegistry {
            versifications: Mutex::new(HashMap::new()),
            line_error_hook: Some(Box::new(hook)),
        })
    }

    /// The process-wide registry used by the `ScrVers` convenience
    /// constructors. Independent registries can always be created for
    /// isolation.
    pub fn shared() -> &'static Arc<SchemeRegistry> {
        SHARED_REGISTRY.get_or_init(SchemeRegistry::new)
    }

    fn hook(&self) -> Option<&(dyn Fn(&CanonryError) -> bool + Send + Sync)> {
        self.line_error_hook.as_deref()
    }

    /// Handle onto a built-in scheme. `Unknown` is not a scheme.
    pub fn builtin(self: &Arc<Self>, vers_type: ScrVersType) -> Result<ScrVers> {
        if vers_type == ScrVersType::Unknown {
            return Err(CanonryError::Scheme(
                "can not create a versification for an unknown type".into(),
            ));
        }
        Ok(ScrVers {
            handle: Handle::Cached {
                registry: Arc::clone(self),
                key: SchemeKey::builtin(vers_type),
            },
        })
    }

    /// Handle onto the named scheme: a built-in when the name matches one,
    /// else a custom scheme created on first resolution (defaulting to the
    /// English book tables under the requested name).
    pub fn get(self: &Arc<Self>, name: &str) -> ScrVers {
        let vers_type = ScrVersType::from_name(name);
        let key = if vers_type != ScrVersType::Unknown {
            SchemeKey::builtin(vers_type)
        } else {
            SchemeKey::named(name)
        };
        ScrVers { handle: Handle::Cached { registry: Arc::clone(self), key } }
    }

    /// True iff the named versification exists (built-in or already cached).
    pub fn exists(&self, name: &str) -> bool {
        if ScrVersType::from_name(name) != ScrVersType::Unknown {
            return true;
        }
        self.lock_map().contains_key(&SchemeKey::named(name))
    }

    /// Loads a versification file. The result is ad hoc: it is not entered
    /// into the registry cache.
    pub fn load_file(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
        fallback_name: Option<&str>,
    ) -> Result<ScrVers> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        self.load_text(&text, path.to_str(), fallback_name)
    }

    /// Loads a versification from a stream (with no base versification).
    /// The result is ad hoc: it is not entered into the registry cache.
    pub fn load_stream<R: Read>(
        self: &Arc<Self>,
        mut reader: R,
        full_path: Option<&str>,
        fallback_name: Option<&str>,
    ) -> Result<ScrVers> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.load_text(&text, full_path, fallback_name)
    }

    fn load_text(
        self: &Arc<Self>,
        text: &str,
        full_path: Option<&str>,
        fallback_name: Option<&str>,
    ) -> Result<ScrVers> {
        let vers = Versification::parse_new(
            text.lines(),
            full_path,
            ScrVersType::Unknown,
            fallback_name,
            self.hook(),
        )?;
        debug!(name = vers.name(), "loaded ad-hoc versification");
        Ok(ScrVers { handle: Handle::AdHoc(Arc::new(Mutex::new(vers))) })
    }

    /// Loads a custom versification from a stream while overriding a base
    /// versification (clone-then-override, one level only). The scheme is
    /// entered into the cache under `name`, so later `get` calls observe it.
    pub fn load_custom<R: Read>(
        self: &Arc<Self>,
        mut reader: R,
        full_path: Option<&str>,
        base: &ScrVers,
        name: &str,
    ) -> Result<ScrVers> {
        if name.is_empty() {
            return Err(CanonryError::Scheme("custom versification needs a name".into()));
        }
        if base.is_customized() {
            return Err(CanonryError::Scheme(format!(
                "can not create a custom versification from customized versification {}",
                base.name()
            )));
        }

        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let base_info = base.vers_info();
        let mut vers = {
            let guard = base_info.lock().unwrap();
            Versification::customized(&guard, name, full_path)
        };
        vers.parse_into(text.lines(), full_path, self.hook())?;

        let key = SchemeKey::named(name);
        self.lock_map().insert(key.clone(), Arc::new(Mutex::new(vers)));
        info!(name, base = %base.name(), "loaded custom versification");
        Ok(ScrVers { handle: Handle::Cached { registry: Arc::clone(self), key } })
    }

    /// Reloads every cached scheme that has a backing file, in place. All
    /// live handles observe the reloaded content. Schemes without a backing
    /// file (built-ins, stream-loaded customs) are left alone.
    pub fn reload(&self) -> Result<()> {
        let map = self.lock_map();
        for vers_arc in map.values() {
            let mut vers = vers_arc.lock().unwrap();
            let Some(path) = vers.full_path().map(str::to_owned) else {
                continue;
            };
            if !Path::new(&path).exists() {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            vers.clear();
            vers.parse_into(text.lines(), Some(&path), self.hook())?;
            info!(name = vers.name(), path = %path, "reloaded versification");
        }
        Ok(())
    }

    /// Drops every cached scheme that is not built-in. Mostly useful for
    /// tests needing a clean slate.
    pub fn clear_custom(&self) {
        self.lock_map().retain(|key, _| key.vers_type != ScrVersType::Unknown);
    }

    /// All known schemes: the six built-ins plus any cached customs.
    pub fn all_schemes(self: &Arc<Self>) -> Vec<ScrVers> {
        let mut schemes: Vec<ScrVers> = ScrVersType::BUILT_IN
            .iter()
            .filter_map(|t| self.builtin(*t).ok())
            .collect();
        for key in self.lock_map().keys() {
            if key.vers_type == ScrVersType::Unknown {
                schemes.push(ScrVers {
                    handle: Handle::Cached { registry: Arc::clone(self), key: key.clone() },
                });
            }
        }
        schemes
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<SchemeKey, Arc<Mutex<Versification>>>> {
        self.versifications.lock().unwrap()
    }

    /// Cache lookup, creating built-ins (and name-defaulted customs) from
    /// the embedded definitions on first request. Only embedded text is ever
    /// parsed here, so failure means the crate's own data is broken.
    fn resolve(&self, key: &SchemeKey) -> Arc<Mutex<Versification>> {
        let mut map = self.lock_map();
        if let Some(existing) = map.get(key) {
            return Arc::clone(existing);
        }

        let (name, text) = if key.vers_type != ScrVersType::Unknown {
            (key.vers_type.type_name(), key.vers_type.embedded_text())
        } else {
            // unknown names default to the English book tables
            (key.name.as_str(), ScrVersType::English.embedded_text())
        };

        let mut vers = Versification::new(name, key.vers_type, None);
        if let Err(err) = vers.parse_into(text.lines(), None, self.hook()) {
            panic!("embedded versification definition failed to parse: {err}");
        }

        let resolved = Arc::new(Mutex::new(vers));
        map.insert(key.clone(), Arc::clone(&resolved));
        resolved
    }
}

// ------------- ScrVers -------------

#[derive(Clone)]
enum Handle {
    Cached { registry: Arc<SchemeRegistry>, key: SchemeKey },
    AdHoc(Arc<Mutex<Versification>>),
}

/// A cheap handle onto a versification scheme. Cached handles resolve
/// lazily through their registry, so two handles with the same name share
/// (and observe reloads of) one underlying versification. Equality is value
/// equality of the resolved content, not handle identity.
#[derive(Clone)]
pub struct ScrVers {
    handle: Handle,
}

impl ScrVers {
    pub fn original() -> ScrVers {
        Self::of_builtin(ScrVersType::Original)
    }

    pub fn septuagint() -> ScrVers {
        Self::of_builtin(ScrVersType::Septuagint)
    }

    pub fn vulgate() -> ScrVers {
        Self::of_builtin(ScrVersType::Vulgate)
    }

    pub fn english() -> ScrVers {
        Self::of_builtin(ScrVersType::English)
    }

    pub fn russian_protestant() -> ScrVers {
        Self::of_builtin(ScrVersType::RussianProtestant)
    }

    pub fn russian_orthodox() -> ScrVers {
        Self::of_builtin(ScrVersType::RussianOrthodox)
    }

    fn of_builtin(vers_type: ScrVersType) -> ScrVers {
        ScrVers {
            handle: Handle::Cached {
                registry: Arc::clone(SchemeRegistry::shared()),
                key: SchemeKey::builtin(vers_type),
            },
        }
    }

    /// Handle by built-in type; `None` for `Unknown`.
    pub fn builtin(vers_type: ScrVersType) -> Option<ScrVers> {
        if vers_type == ScrVersType::Unknown {
            return None;
        }
        Some(Self::of_builtin(vers_type))
    }

    /// Handle by name through the shared registry.
    pub fn named(name: &str) -> ScrVers {
        SchemeRegistry::shared().get(name)
    }

    pub fn name(&self) -> String {
        match &self.handle {
            Handle::Cached { key, .. } => {
                if key.vers_type != ScrVersType::Unknown {
                    key.vers_type.type_name().to_owned()
                } else {
                    key.name.clone()
                }
            }
            Handle::AdHoc(vers) => vers.lock().unwrap().name().to_owned(),
        }
    }

    pub fn vers_type(&self) -> ScrVersType {
        match &self.handle {
            Handle::Cached { key, .. } => key.vers_type,
            Handle::AdHoc(_) => ScrVersType::Unknown,
        }
    }

    pub(crate) fn vers_info(&self) -> Arc<Mutex<Versification>> {
        match &self.handle {
            Handle::Cached { registry, key } => registry.resolve(key),
            Handle::AdHoc(vers) => Arc::clone(vers),
        }
    }

    // ------------- Forwarded queries -------------

    pub fn last_book(&self) -> u16 {
        self.vers_info().lock().unwrap().last_book()
    }

    pub fn last_chapter(&self, book_num: u16) -> u16 {
        self.vers_info().lock().unwrap().last_chapter(book_num)
    }

    pub fn last_verse(&self, book_num: u16, chapter_num: i32) -> u16 {
        self.vers_info().lock().unwrap().last_verse(book_num, chapter_num)
    }

    pub fn is_excluded(&self, bbbcccvvv: u32) -> bool {
        self.vers_info().lock().unwrap().is_excluded(bbbcccvvv)
    }

    pub fn verse_segments(&self, bbbcccvvv: u32) -> Option<Vec<String>> {
        self.vers_info()
            .lock()
            .unwrap()
            .verse_segments(bbbcccvvv)
            .map(<[String]>::to_vec)
    }

    pub fn has_verse_segments(&self) -> bool {
        self.vers_info().lock().unwrap().has_verse_segments()
    }

    /// First non-excluded verse of the book at or after the given chapter,
    /// as a reference in this scheme.
    pub fn first_included_verse(&self, book_num: u16, chapter_num: i32) -> Option<VerseRef> {
        let location = self
            .vers_info()
            .lock()
            .unwrap()
            .first_included_verse(book_num, chapter_num);
        location.map(|(chapter, verse)| {
            VerseRef::raw(book_num, chapter, verse, Some(self.clone()))
        })
    }

    pub fn scripture_books(&self) -> BookSet {
        self.vers_info().lock().unwrap().scripture_books()
    }

    pub fn is_customized(&self) -> bool {
        self.vers_info().lock().unwrap().is_customized()
    }

    pub fn base_name(&self) -> Option<String> {
        self.vers_info().lock().unwrap().base_name().map(str::to_owned)
    }

    pub fn full_path(&self) -> Option<String> {
        self.vers_info().lock().unwrap().full_path().map(str::to_owned)
    }

    /// Writes this scheme back out in the directive format.
    pub fn write_definition(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.vers_info().lock().unwrap().write_definition(out)
    }

    // ------------- Conversion -------------

    /// Changes the passed reference to this scheme, mapping it through the
    /// standard scheme. A reference whose pivot location both schemes agree
    /// on, and which already names a valid location here, is left in place —
    /// an unrelated many-to-one mapping elsewhere in the table must not
    /// relocate it. ESG is exempt from that shortcut (see
    /// `SEGMENT_MAPPED_BOOKS`).
    pub fn change_versification(&self, vref: &mut VerseRef) {
        let target = self.vers_info();
        let orig = match vref.versification() {
            Some(existing) => existing.vers_info(),
            None => {
                vref.set_versification(Some(self.clone()));
                return;
            }
        };
        if vref.is_default() || Arc::ptr_eq(&orig, &target) {
            vref.set_versification(Some(self.clone()));
            return;
        }

        debug_assert!(!vref.has_multiple(), "use change_versification_with_ranges");

        let key = VerseKey::from_verse_ref(vref);

        // map from the existing scheme to the standard scheme
        let standard = orig.lock().unwrap().map_to_standard(&key);

        let (standard_here, location_exists) = {
            let guard = target.lock().unwrap();
            (
                guard.map_to_standard(&key),
                guard.book_chapter_verse_exists(
                    vref.book_num(),
                    vref.chapter_num(),
                    vref.verse_num(),
                ),
            )
        };

        if !bypasses_mapping_shortcut(vref.book()) && standard == standard_here && location_exists {
            vref.set_versification(Some(self.clone()));
            return;
        }

        // map from the standard scheme to this scheme
        let new_verse = target.lock().unwrap().map_from_standard(&standard);
        if new_verse != key {
            new_verse.apply_to(vref);
        }
        vref.set_versification(Some(self.clone()));
    }

    /// Changes the scheme of a reference with a verse like `1-3` or `1,3a`.
    /// Each part converts independently; returns false when the parts no
    /// longer land in one chapter, which leaves the result undefined — that
    /// judgement belongs to the caller.
    pub fn change_versification_with_ranges(&self, vref: &mut VerseRef) -> bool {
        let original = vref.clone();
        let parts = split_verse_parts(&vref.verse());

        vref.set_verse(&parts[0]);
        self.change_versification(vref);
        let mut all_same_chapter = true;
        let mut combined = vref.verse();

        let mut i = 2;
        while i < parts.len() {
            let mut piece = original.clone();
            piece.set_verse(&parts[i]);
            self.change_versification(&mut piece);
            all_same_chapter &= vref.chapter_num() == piece.chapter_num();
            combined.push_str(&parts[i - 1]);
            combined.push_str(&piece.verse());
            i += 2;
        }

        vref.set_verse(&combined);
        all_same_chapter
    }
}

/// Splits a verse string on bridge/sequence separators, keeping the
/// separators at the odd indexes: `"54-55"` → `["54", "-", "55"]`.
fn split_verse_parts(verse: &str) -> Vec<String> {
    let mut parts = vec![String::new()];
    for c in verse.chars() {
        if c == '-' || c == ',' {
            parts.push(c.to_string());
            parts.push(String::new());
        } else {
            let last = parts.len() - 1;
            parts[last].push(c);
        }
    }
    parts
}

impl PartialEq for ScrVers {
    fn eq(&self, other: &Self) -> bool {
        let a = self.vers_info();
        let b = other.vers_info();
        if Arc::ptr_eq(&a, &b) {
            return true;
        }
        let a_guard = a.lock().unwrap();
        let b_guard = b.lock().unwrap();
        *a_guard == *b_guard
    }
}

impl Eq for ScrVers {}

impl fmt::Debug for ScrVers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ScrVers({})", self.name())
    }
}

impl fmt::Display for ScrVers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
