use std::cmp::Ordering;

use canonry::registry::{SchemeRegistry, ScrVers};
use canonry::verseref::VerseRef;

fn english(reference: &str) -> VerseRef {
    VerseRef::parse_with_versification(reference, ScrVers::english()).unwrap()
}

#[test]
fn ordering_by_book_chapter_verse() {
    assert!(english("MAT 1:1") < english("MAT 1:2"));
    assert!(english("MAT 1:2") < english("MAT 2:1"));
    assert!(english("MAT 2:1") < english("MRK 1:1"));
    assert!(english("GEN 1:1") < english("MAT 1:1"));
    assert!(english("MAT 1:1") <= english("MAT 1:1"));
    assert!(english("MAT 1:2") > english("MAT 1:1"));
}

#[test]
fn segments_compare_ordinally_by_default() {
    assert!(english("GEN 1:1") < english("GEN 1:1a"), "no segment sorts first");
    assert!(english("GEN 1:1a") < english("GEN 1:1b"));
    assert!(english("GEN 1:1b") >= english("GEN 1:1a"));
    assert!(english("GEN 1:1a") >= english("GEN 1:1a"));
    assert_eq!(english("GEN 1:1a").compare_to(&english("GEN 1:1a")), Ordering::Equal);
}

#[test]
fn caller_supplied_segment_order_wins() {
    let a = english("MAT 1:1a");
    let b = english("MAT 1:1b");

    let order = ["a".to_owned(), "b".to_owned()];
    assert_eq!(a.compare_to_with(&b, Some(&order), false, true), Ordering::Less);

    // ordinally a < b, but a reversed supplied order flips that
    let order = ["b".to_owned(), "a".to_owned()];
    assert_eq!(a.compare_to_with(&b, Some(&order), false, true), Ordering::Greater);
    assert_eq!(b.compare_to_with(&a, Some(&order), false, true), Ordering::Less);
}

#[test]
fn segment_comparison_can_be_disabled() {
    let a = english("MAT 1:1a");
    let b = english("MAT 1:1b");
    assert_eq!(a.compare_to_with(&b, None, false, false), Ordering::Equal);
}

#[test]
fn first_verse_comparison_treats_bridge_as_its_start() {
    // by default only the first verse of a bridge takes part
    assert_eq!(english("MAT 1:2-3").compare_to(&english("MAT 1:2")), Ordering::Equal);
    assert!(english("MAT 1:2-3") < english("MAT 1:3"));
}

#[test]
fn compare_all_verses_distinguishes_bridges() {
    let bridge = english("MAT 1:2-3");
    let single = english("MAT 1:2");
    assert_eq!(bridge.compare_to_with(&single, None, true, true), Ordering::Greater);
    assert_eq!(single.compare_to_with(&bridge, None, true, true), Ordering::Less);
    assert_eq!(
        bridge.compare_to_with(&english("MAT 1:2-3"), None, true, true),
        Ordering::Equal
    );
}

#[test]
fn comparison_converts_across_schemes() {
    let english_ref = english("GEN 31:55");
    let original_ref =
        VerseRef::parse_with_versification("GEN 32:1", ScrVers::original()).unwrap();
    // GEN 31:55 (English) is the same location as GEN 32:1 (Original)
    assert_eq!(english_ref.compare_to(&original_ref), Ordering::Equal);

    let later = VerseRef::parse_with_versification("GEN 32:2", ScrVers::original()).unwrap();
    assert_eq!(english_ref.compare_to(&later), Ordering::Less);
}

#[test]
fn comparison_converts_bridges_with_ranges() {
    let english_ref = english("GEN 32:3-4");
    let original_ref =
        VerseRef::parse_with_versification("GEN 32:4-5", ScrVers::original()).unwrap();
    assert_eq!(
        english_ref.compare_to_with(&original_ref, None, true, true),
        Ordering::Equal
    );
}

#[test]
fn equality_requires_identical_verse_text() {
    assert_eq!(english("GEN 1:1a"), english("GEN 1:1a"));
    assert_ne!(english("GEN 1:1a"), english("GEN 1:1b"));
    assert_ne!(english("GEN 1:1a"), english("GEN 1:1"), "simple and complex differ");
    assert_eq!(
        VerseRef::new(1, 1, 1, Some(ScrVers::english())).unwrap(),
        VerseRef::new(1, 1, 1, Some(ScrVers::english())).unwrap()
    );
}

#[test]
fn equality_considers_the_scheme() {
    let a = english("GEN 1:1");
    let b = VerseRef::parse_with_versification("GEN 1:1", ScrVers::original()).unwrap();
    assert_ne!(a, b, "same location, different scheme");

    // two handles onto the same named scheme are interchangeable
    let c = VerseRef::parse_with_versification("GEN 1:1", ScrVers::named("English")).unwrap();
    assert_eq!(a, c);
}

#[test]
fn hash_tracks_equality() {
    use std::collections::HashSet;

    let mut seen = HashSet::new();
    seen.insert(english("GEN 1:1a"));
    assert!(seen.contains(&english("GEN 1:1a")));
    assert!(!seen.contains(&english("GEN 1:1b")));
}

#[test]
fn segment_order_respects_scheme_segments_for_the_verse() {
    // when the scheme defines segments for the verse, those define the order
    let vers = SchemeRegistry::new()
        .load_stream("GEN 1:5\n*GEN 1:1,-,b,a".as_bytes(), None, Some("Odd"))
        .unwrap();
    let first = VerseRef::parse_with_versification("GEN 1:1b", vers.clone()).unwrap();
    let second = VerseRef::parse_with_versification("GEN 1:1a", vers.clone()).unwrap();
    let fallback = ["a".to_owned(), "b".to_owned()];
    assert_eq!(
        first.compare_to_with(&second, Some(&fallback), false, true),
        Ordering::Less,
        "the scheme's b-before-a order beats the fallback order"
    );
}
