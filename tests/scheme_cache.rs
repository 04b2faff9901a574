use std::fs;

use canonry::canon::Canon;
use canonry::registry::{SchemeRegistry, ScrVers, ScrVersType};

#[test]
fn legacy_codes_are_load_bearing() {
    // the numeric order is persisted by old callers and must never change
    assert_eq!(ScrVersType::Unknown.code(), 0);
    assert_eq!(ScrVersType::Original.code(), 1);
    assert_eq!(ScrVersType::Septuagint.code(), 2);
    assert_eq!(ScrVersType::Vulgate.code(), 3);
    assert_eq!(ScrVersType::English.code(), 4);
    assert_eq!(ScrVersType::RussianProtestant.code(), 5);
    assert_eq!(ScrVersType::RussianOrthodox.code(), 6);

    for code in 0..=6 {
        assert_eq!(ScrVersType::from_code(code).unwrap().code(), code);
    }
    assert!(ScrVersType::from_code(7).is_none());
}

#[test]
fn names_resolve_to_types() {
    assert_eq!(ScrVersType::from_name("English"), ScrVersType::English);
    assert_eq!(ScrVersType::from_name("Original"), ScrVersType::Original);
    assert_eq!(ScrVersType::from_name("Esperanto"), ScrVersType::Unknown);
    assert_eq!(ScrVersType::from_name("Unknown"), ScrVersType::Unknown);
    assert_eq!(ScrVersType::from_name("Other25"), ScrVersType::Unknown);
}

#[test]
fn builtin_handles_compare_equal_by_content() {
    assert_eq!(ScrVers::english(), ScrVers::named("English"));
    assert_eq!(ScrVers::original(), ScrVers::named("Original"));
    assert_ne!(ScrVers::english(), ScrVers::original());

    assert_eq!(ScrVers::english().vers_type(), ScrVersType::English);
    assert_eq!(ScrVers::named("English").vers_type(), ScrVersType::English);
    assert_eq!(ScrVers::named("Monkey").vers_type(), ScrVersType::Unknown);
    assert_eq!(ScrVers::named("Monkey").name(), "Monkey");
}

#[test]
fn numeric_names_are_ordinary_custom_names() {
    let two = ScrVers::named("2");
    assert_eq!(two.vers_type(), ScrVersType::Unknown);
    assert_eq!(two.name(), "2");
}

#[test]
fn unknown_names_default_to_the_english_tables() {
    let registry = SchemeRegistry::new();
    let monkey = registry.get("Monkey");
    let rut = Canon::global().book_id_to_number("RUT", true);
    assert_eq!(monkey.last_chapter(rut), 4);
    assert_eq!(monkey.last_verse(rut, 4), 22);
    assert_eq!(monkey.name(), "Monkey");
}

#[test]
fn all_builtins_load_from_embedded_text() {
    for vers_type in ScrVersType::BUILT_IN {
        let scheme = ScrVers::builtin(vers_type).unwrap();
        assert_eq!(scheme.name(), vers_type.type_name());
        assert!(scheme.last_book() > 66, "{vers_type} should cover the canon");
        assert_eq!(scheme.last_verse(1, 1), 31, "{vers_type} GEN 1 has 31 verses");
        assert!(scheme.full_path().is_none(), "built-ins are not file-backed");
    }
    assert!(ScrVers::builtin(ScrVersType::Unknown).is_none());
}

#[test]
fn custom_schemes_are_cached_under_their_name() {
    let registry = SchemeRegistry::new();
    assert!(!registry.exists("ModifiedRuth"));

    let base = registry.get("English");
    registry
        .load_custom("RUT 5:91".as_bytes(), None, &base, "ModifiedRuth")
        .unwrap();
    assert!(registry.exists("ModifiedRuth"));

    let rut = Canon::global().book_id_to_number("RUT", true);
    let modified = registry.get("ModifiedRuth");
    assert_eq!(modified.last_chapter(rut), 5);
    assert_eq!(modified.last_verse(rut, 5), 91);
    assert!(modified.is_customized());
    assert_eq!(modified.base_name().as_deref(), Some("English"));

    registry.clear_custom();
    assert!(!registry.exists("ModifiedRuth"));

    // a fresh handle falls back to the default English-shaped tables
    let modified = registry.get("ModifiedRuth");
    assert_eq!(modified.last_chapter(rut), 4);
    assert_eq!(modified.last_verse(rut, 4), 22);
    assert!(!modified.is_customized());
}

#[test]
fn customizing_a_customized_scheme_is_rejected() {
    let registry = SchemeRegistry::new();
    let base = registry.get("English");
    let custom = registry
        .load_custom("RUT 5:91".as_bytes(), None, &base, "Layer1")
        .unwrap();
    assert!(registry
        .load_custom("RUT 6:5".as_bytes(), None, &custom, "Layer2")
        .is_err());
    assert!(registry
        .load_custom("RUT 6:5".as_bytes(), None, &base, "")
        .is_err(), "a custom scheme needs a name");
}

#[test]
fn ad_hoc_loads_are_not_cached() {
    let registry = SchemeRegistry::new();
    let scheme = registry
        .load_stream("# Versification \"Loose\"\nGEN 1:5".as_bytes(), None, None)
        .unwrap();
    assert_eq!(scheme.name(), "Loose");
    assert!(!registry.exists("Loose"));
    // the handle itself keeps working even though the registry never saw it
    assert_eq!(scheme.last_verse(1, 1), 5);
}

#[test]
fn all_schemes_lists_builtins_and_cached_customs() {
    let registry = SchemeRegistry::new();
    assert_eq!(registry.all_schemes().len(), 6);

    let base = registry.get("English");
    registry
        .load_custom("RUT 5:91".as_bytes(), None, &base, "Extra")
        .unwrap();
    let names: Vec<String> = registry.all_schemes().iter().map(|s| s.name()).collect();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&"English".to_owned()));
    assert!(names.contains(&"Extra".to_owned()));
}

#[test]
fn reload_reparses_file_backed_schemes_in_place() {
    let registry = SchemeRegistry::new();
    let path = std::env::temp_dir().join("canonry_reload_test.vrs");
    fs::write(&path, "RUT 5:91").unwrap();

    let base = registry.get("English");
    let handle = registry
        .load_custom(
            fs::File::open(&path).unwrap(),
            path.to_str(),
            &base,
            "Reloadable",
        )
        .unwrap();
    let rut = Canon::global().book_id_to_number("RUT", true);
    assert_eq!(handle.last_chapter(rut), 5);
    assert_eq!(handle.last_verse(rut, 5), 91);

    // rewrite the backing file and reload: the existing handle sees it
    fs::write(&path, "RUT 6:100").unwrap();
    registry.reload().unwrap();
    assert_eq!(handle.last_chapter(rut), 6);
    assert_eq!(handle.last_verse(rut, 6), 100);

    // a second handle resolved by name agrees
    assert_eq!(registry.get("Reloadable").last_chapter(rut), 6);

    fs::remove_file(&path).ok();
}

#[test]
fn reload_leaves_streams_and_builtins_alone() {
    let registry = SchemeRegistry::new();
    let base = registry.get("English");
    let handle = registry
        .load_custom("RUT 5:91".as_bytes(), None, &base, "StreamOnly")
        .unwrap();
    registry.reload().unwrap();

    let rut = Canon::global().book_id_to_number("RUT", true);
    assert_eq!(handle.last_chapter(rut), 5, "no backing file, nothing to reload");
    assert_eq!(registry.get("English").last_verse(1, 1), 31);
}

#[test]
fn isolated_registries_do_not_share_state() {
    let a = SchemeRegistry::new();
    let b = SchemeRegistry::new();
    a.load_custom("RUT 5:91".as_bytes(), None, &a.get("English"), "Mine")
        .unwrap();
    assert!(a.exists("Mine"));
    assert!(!b.exists("Mine"));
}
