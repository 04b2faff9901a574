use canonry::bookset::BookSet;
use canonry::registry::{SchemeRegistry, ScrVers};
use canonry::verseref::VerseRef;

fn at(reference: &str, versification: &ScrVers) -> VerseRef {
    VerseRef::parse_with_versification(reference, versification.clone()).unwrap()
}

fn assert_location(vref: &VerseRef, book: &str, chapter: &str, verse: &str) {
    assert_eq!(vref.book(), book);
    assert_eq!(vref.chapter(), chapter);
    assert_eq!(vref.verse(), verse);
}

#[test]
fn next_verse_steps_through_chapters_and_books() {
    let english = ScrVers::english();

    let mut vref = at("EXO 6:0", &english);
    assert!(vref.next_verse());
    assert_location(&vref, "EXO", "6", "1");

    // a bridge steps from its leading verse
    let mut vref = at("GEN 1:5-7", &english);
    assert!(vref.next_verse());
    assert_location(&vref, "GEN", "1", "6");

    let mut vref = at("GEN 31:54", &english);
    assert!(vref.next_verse());
    assert_location(&vref, "GEN", "31", "55");

    // the same verse number crosses the chapter in the Original scheme
    let mut vref = at("GEN 31:54", &ScrVers::original());
    assert!(vref.next_verse());
    assert_location(&vref, "GEN", "32", "1");

    let mut vref = at("NAM 2:13", &english);
    assert!(vref.next_verse());
    assert_location(&vref, "NAM", "3", "1");

    let mut vref = at("JUD 1:25", &english);
    assert!(vref.next_verse());
    assert_location(&vref, "REV", "1", "0");
}

#[test]
fn next_verse_stops_at_the_end_of_everything() {
    let mut vref = at("LAO 1:20", &ScrVers::english());
    assert!(!vref.next_verse());
    assert_location(&vref, "LAO", "1", "20");
}

#[test]
fn next_verse_walks_segments() {
    // Septuagint 1KI 5:14 has three segments: unmarked, a and b
    let septuagint = ScrVers::septuagint();
    let mut vref = at("1KI 5:13", &septuagint);

    assert!(vref.next_verse());
    assert_location(&vref, "1KI", "5", "14");
    assert_eq!(vref.segment(), "");

    assert!(vref.next_verse());
    assert_location(&vref, "1KI", "5", "14a");
    assert_eq!(vref.segment(), "a");

    assert!(vref.next_verse());
    assert_location(&vref, "1KI", "5", "14b");
    assert_eq!(vref.segment(), "b");

    assert!(vref.next_verse());
    assert_location(&vref, "1KI", "5", "15");
    assert_eq!(vref.segment(), "");
}

#[test]
fn next_verse_segments_starting_with_a_letter() {
    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom("*RUT 1:3,a,b".as_bytes(), None, &registry.get("English"), "Lettered")
        .unwrap();
    let mut vref = at("RUT 1:2", &custom);

    assert!(vref.next_verse());
    assert_location(&vref, "RUT", "1", "3a");
    assert!(vref.next_verse());
    assert_location(&vref, "RUT", "1", "3b");
    assert!(vref.next_verse());
    assert_location(&vref, "RUT", "1", "4");
}

#[test]
fn identical_adjacent_segments_do_not_stall() {
    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom("*LAM 1:1,a,a".as_bytes(), None, &registry.get("English"), "Stall")
        .unwrap();
    let mut vref = at("LAM 1:1a", &custom);

    // stepping onto an identical label would go nowhere, so move to verse 2
    assert!(vref.next_verse());
    assert_location(&vref, "LAM", "1", "2");
    assert_eq!(vref.segment(), "");
}

#[test]
fn segment_to_segment_across_verses() {
    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom(
            "*1KI 5:16,a,b\n*1KI 5:17,a,b".as_bytes(),
            None,
            &registry.get("English"),
            "Sequential",
        )
        .unwrap();
    let mut vref = at("1KI 5:16b", &custom);
    assert!(vref.next_verse());
    assert_location(&vref, "1KI", "5", "17a");
}

#[test]
fn next_verse_at_chapter_boundary_picks_up_segments() {
    let septuagint = ScrVers::septuagint();
    let mut vref = at("MAL 1:14", &septuagint);
    assert!(vref.next_verse());
    assert_location(&vref, "MAL", "2", "1");

    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom("*ZEP 2:1,a,b".as_bytes(), None, &registry.get("English"), "Boundary")
        .unwrap();
    let mut vref = at("ZEP 1:18", &custom);
    assert!(vref.next_verse());
    assert_location(&vref, "ZEP", "2", "1a");
}

#[test]
fn previous_verse_steps_back_through_segments_and_chapters() {
    let septuagint = ScrVers::septuagint();

    let mut vref = at("1KI 5:15", &septuagint);
    assert!(vref.previous_verse());
    assert_location(&vref, "1KI", "5", "14b");
    assert!(vref.previous_verse());
    assert_location(&vref, "1KI", "5", "14a");
    assert!(vref.previous_verse());
    assert_location(&vref, "1KI", "5", "14");
    assert!(vref.previous_verse());
    assert_location(&vref, "1KI", "5", "13");

    let english = ScrVers::english();
    let mut vref = at("GEN 2:1", &english);
    assert!(vref.previous_verse());
    assert_location(&vref, "GEN", "1", "31");

    // the start of the first chapter steps down to verse 0, then stops
    let mut vref = at("GEN 1:1", &english);
    assert!(vref.previous_verse());
    assert_location(&vref, "GEN", "1", "0");
}

#[test]
fn chapter_navigation() {
    let english = ScrVers::english();

    let mut vref = at("GEN 1:5", &english);
    assert!(vref.next_chapter());
    assert_location(&vref, "GEN", "2", "1");

    let mut vref = at("GEN 50:1", &english);
    assert!(vref.next_chapter());
    assert_location(&vref, "EXO", "1", "0");

    let mut vref = at("EXO 1:9", &english);
    assert!(vref.previous_chapter());
    assert_location(&vref, "GEN", "50", "1");

    let mut vref = at("GEN 1:9", &english);
    assert!(!vref.previous_chapter());
}

#[test]
fn book_navigation() {
    let english = ScrVers::english();

    let mut vref = at("GEN 12:5", &english);
    assert!(vref.next_book());
    assert_location(&vref, "EXO", "1", "0");

    let mut vref = at("EXO 12:5", &english);
    assert!(vref.previous_book());
    assert_location(&vref, "GEN", "1", "1");

    let mut vref = at("LAO 1:1", &english);
    assert!(!vref.next_book());

    let mut vref = at("GEN 1:1", &english);
    assert!(!vref.previous_book());
}

#[test]
fn navigation_respects_the_selected_book_set() {
    let english = ScrVers::english();
    let present = BookSet::from_book_ids(["GEN", "MAT"]);

    let mut vref = at("GEN 50:26", &english);
    assert!(vref.next_verse_within(&present, false));
    assert_location(&vref, "MAT", "1", "0");

    // a book outside the set delegates to book navigation
    let mut vref = at("EXO 1:1", &english);
    assert!(vref.next_chapter_within(&present, false));
    assert_location(&vref, "MAT", "1", "0");

    let mut vref = at("MAT 1:1", &english);
    assert!(vref.previous_chapter_within(&present));
    assert_location(&vref, "GEN", "50", "1");

    let mut vref = at("MAT 28:20", &english);
    assert!(!vref.next_book_within(&present));
}

#[test]
fn next_verse_can_skip_excluded_verses() {
    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom("-GEN 1:2\n-GEN 1:3".as_bytes(), None, &registry.get("English"), "Holes")
        .unwrap();

    let mut vref = at("GEN 1:1", &custom);
    assert!(vref.next_verse_within(&BookSet::all(), true));
    assert_location(&vref, "GEN", "1", "4");

    // without the flag the excluded verse is still visited
    let mut vref = at("GEN 1:1", &custom);
    assert!(vref.next_verse_within(&BookSet::all(), false));
    assert_location(&vref, "GEN", "1", "2");
}

#[test]
fn next_chapter_can_skip_to_the_first_included_verse() {
    let registry = SchemeRegistry::new();
    let custom = registry
        .load_custom("-GEN 2:1\n-GEN 2:2".as_bytes(), None, &registry.get("English"), "Skips")
        .unwrap();

    let mut vref = at("GEN 1:5", &custom);
    assert!(vref.next_chapter_within(&BookSet::all(), true));
    assert_location(&vref, "GEN", "2", "3");

    let mut vref = at("GEN 1:5", &custom);
    assert!(vref.next_chapter_within(&BookSet::all(), false));
    assert_location(&vref, "GEN", "2", "1");
}
