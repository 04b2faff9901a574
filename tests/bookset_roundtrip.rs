use canonry::bookset::BookSet;
use canonry::canon::Canon;

#[test]
fn empty_set_has_no_selections() {
    let set = BookSet::new();
    assert_eq!(set.count(), 0);
    assert!(set.is_empty());
    assert_eq!(set.first_selected_book_num(), 0);
    assert_eq!(set.last_selected_book_num(), 0);
    assert!(!set.is_selected(1));
}

#[test]
fn empty_set_scan_returns_input_unchanged() {
    let set = BookSet::new();
    for n in [0u16, 1, 40, 123, 200] {
        assert_eq!(set.next_selected(n), n, "no result means unchanged");
        assert_eq!(set.previous_selected(n), n);
    }
}

#[test]
fn string_form_roundtrip() {
    let set = BookSet::from_book_ids(["GEN", "MAT", "REV"]);
    let books = set.books();
    assert_eq!(books.len(), Canon::global().last_book() as usize);
    assert_eq!(books.chars().filter(|c| *c == '1').count() as u64, set.count());
    assert!(books.starts_with('1'));

    let parsed = BookSet::from_books_string(&books).unwrap();
    assert_eq!(parsed, set);
    assert_eq!(parsed.to_string(), books);
}

#[test]
fn string_form_is_validated() {
    assert!(BookSet::from_books_string("101").is_err(), "wrong length");
    let mut books = "0".repeat(Canon::global().last_book() as usize);
    books.replace_range(0..1, "2");
    assert!(BookSet::from_books_string(&books).is_err(), "bad character");
}

#[test]
fn add_and_remove_by_number_and_id() {
    let mut set = BookSet::new();
    set.add(1);
    set.add_id("MAT");
    assert!(set.is_selected(1));
    assert!(set.is_selected(40));
    assert_eq!(set.count(), 2);

    set.remove_id("GEN");
    set.remove(40);
    assert!(set.is_empty());

    // out-of-range adds are ignored, not errors
    set.add(0);
    set.add(999);
    set.add_id("QQQ");
    assert!(set.is_empty());
}

#[test]
fn merge_subtract_and_intersect() {
    let mut a = BookSet::from_range(1, 10);
    let b = BookSet::from_range(5, 15);

    assert_eq!(a.intersect(&b), BookSet::from_range(5, 10));

    a.add_set(&b);
    assert_eq!(a, BookSet::from_range(1, 15));

    a.remove_set(&BookSet::from_range(1, 4));
    assert_eq!(a, BookSet::from_range(5, 15));
}

#[test]
fn select_all_and_clear() {
    let mut set = BookSet::new();
    set.select_all();
    assert_eq!(set.count(), Canon::global().last_book() as u64);
    assert_eq!(set, BookSet::all());
    set.clear();
    assert!(set.is_empty());
}

#[test]
fn directional_scan_is_strict_and_clamped() {
    let set = BookSet::from_book_ids(["EXO", "PSA", "MAT"]); // 2, 19, 40
    assert_eq!(set.next_selected(0), 2);
    assert_eq!(set.next_selected(2), 19);
    assert_eq!(set.next_selected(19), 40);
    assert_eq!(set.next_selected(40), 40, "nothing after MAT");
    assert_eq!(set.next_selected(500), 500, "clamped past the canon");

    assert_eq!(set.previous_selected(40), 19);
    assert_eq!(set.previous_selected(19), 2);
    assert_eq!(set.previous_selected(2), 2, "nothing before EXO");
    assert_eq!(set.previous_selected(500), 40, "clamped scan from beyond the end");
}

#[test]
fn iteration_is_ascending_and_restartable() {
    let set = BookSet::from_book_ids(["MAT", "GEN", "REV"]);
    let numbers: Vec<u16> = set.selected_book_numbers().collect();
    assert_eq!(numbers, vec![1, 40, 66]);
    // a second pass sees the same thing
    let again: Vec<u16> = set.selected_book_numbers().collect();
    assert_eq!(again, numbers);

    let ids: Vec<&str> = set.selected_book_ids().collect();
    assert_eq!(ids, vec!["GEN", "MAT", "REV"]);
}

#[test]
fn equality_and_hash_follow_the_string_form() {
    use std::collections::HashSet;

    let a = BookSet::from_book_ids(["GEN", "REV"]);
    let mut b = BookSet::new();
    b.add(66);
    b.add(1);
    assert_eq!(a, b);

    let mut seen = HashSet::new();
    seen.insert(a);
    assert!(seen.contains(&b));
}

#[test]
fn single_book_and_range_constructors() {
    assert_eq!(BookSet::from_book(40), BookSet::from_book_id("MAT"));
    assert_eq!(BookSet::from_range(1, 1), BookSet::from_book(1));
    assert_eq!(BookSet::from_range(1, 66).count(), 66);
    assert_eq!(BookSet::all().count(), Canon::global().last_book() as u64);
}
