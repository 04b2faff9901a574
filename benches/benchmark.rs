use criterion::{black_box, criterion_group, criterion_main, Criterion};

use canonry::bookset::BookSet;
use canonry::canon::Canon;
use canonry::registry::{SchemeRegistry, ScrVers};
use canonry::verseref::VerseRef;

pub fn criterion_benchmark(c: &mut Criterion) {
    let canon = Canon::global();
    c.bench_function("book id lookup", |b| {
        b.iter(|| canon.book_id_to_number(black_box("MAT"), true))
    });

    let mut english_text = String::new();
    ScrVers::english().write_definition(&mut english_text).unwrap();
    c.bench_function("parse scheme definition", |b| {
        b.iter(|| {
            SchemeRegistry::new()
                .load_stream(english_text.as_bytes(), None, Some("Bench"))
                .unwrap()
        })
    });

    c.bench_function("parse reference", |b| {
        b.iter(|| VerseRef::parse(black_box("GEN 31:55")).unwrap())
    });

    let english = ScrVers::english();
    let original = ScrVers::original();
    c.bench_function("convert reference", |b| {
        b.iter(|| {
            let mut vref =
                VerseRef::parse_with_versification("GEN 31:55", english.clone()).unwrap();
            vref.change_versification(&original);
            vref
        })
    });

    let odds = BookSet::from_book_ids(["GEN", "LEV", "1SA", "PSA", "MAT", "REV"]);
    let evens = BookSet::from_book_ids(["EXO", "LEV", "PSA", "MRK", "REV"]);
    c.bench_function("bookset intersect", |b| b.iter(|| odds.intersect(&evens)));

    c.bench_function("walk a book", |b| {
        b.iter(|| {
            let mut vref = VerseRef::parse_with_versification("JUD 1:0", english.clone()).unwrap();
            let mut steps = 0;
            while vref.book() == "JUD" && vref.next_verse() {
                steps += 1;
            }
            steps
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
