//! Canonry – scripture canon registry, versification schemes and verse
//! reference arithmetic.
//!
//! Canonry centers on the *versification* concept: a named numbering scheme
//! defining, per scripture book, how many chapters exist and how many verses
//! each chapter has, plus the exceptions real publishing traditions carry:
//! * A [`canon::Canon`] is the fixed, ordered registry of all recognized
//!   book identifiers (`GEN`, `MAT`, ...) and their classification.
//! * A [`bookset::BookSet`] is a set of book numbers with a bit-stable
//!   '0'/'1' string form that external callers persist.
//! * A [`versification::Versification`] holds one parsed scheme: per-book
//!   verse counts, bidirectional verse mappings to the standard scheme,
//!   excluded verses and verse segments.
//! * A [`registry::ScrVers`] is a cheap handle onto a cached scheme; the
//!   [`registry::SchemeRegistry`] owns the cache, loads the six built-in
//!   schemes from embedded definition text on first use and can reload
//!   file-backed schemes in place.
//! * A [`verseref::VerseRef`] is the reference value type (`"GEN 3:11"`)
//!   with parsing, encoding, comparison, navigation and cross-scheme
//!   conversion.
//!
//! ## Definition text
//! Schemes load from a line-oriented text format: `#` comments (with the
//! legacy `#!` directive-inside-comment prefix), `# Versification "Name"`
//! naming lines, chapter/verse rows (`GEN 1:31 2:25 ...`), verse mappings
//! (`GEN 31:55 = GEN 32:1`), one-to-many mappings (`&ACT 19:39-41 = ACT
//! 19:40`), excluded verses (`-GEN 1:6`) and verse segments
//! (`*GEN 1:1,-,a,b`). Malformed lines raise typed, line- and
//! file-annotated errors; a registry hook can skip selected kinds for
//! tolerant loading.
//!
//! ## Quick Start
//! ```
//! use canonry::registry::ScrVers;
//! use canonry::verseref::VerseRef;
//!
//! let english = ScrVers::english();
//! let mut vref = VerseRef::parse_with_versification("GEN 31:55", english).unwrap();
//! vref.change_versification(&ScrVers::original());
//! assert_eq!(vref.to_string(), "GEN 32:1");
//! ```
//!
//! ## Modules
//! * [`canon`] – book registry and classification predicates.
//! * [`bookset`] – book number sets and their persisted string form.
//! * [`versification`] – the scheme model and definition-text parser.
//! * [`registry`] – scheme cache, handles, reload, cross-scheme conversion.
//! * [`verseref`] – the verse reference value type.
//! * [`error`] – the crate-wide error enum and `Result` alias.

pub mod bookset;
pub mod canon;
pub mod error;
pub mod registry;
pub mod versification;
pub mod verseref;
