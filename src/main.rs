//! Command line front end for canonry: inspect, check, export and convert
//! against versification schemes.
//!
//! Settings are read from an optional `canonry.json` next to the working
//! directory, e.g. `{ "default_versification": "English",
//! "versification_dir": "./vrs" }`.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use canonry::error::Result;
use canonry::registry::{SchemeRegistry, ScrVers, ScrVersType};
use canonry::verseref::VerseRef;

#[derive(Debug, Deserialize)]
struct Settings {
    default_versification: String,
    versification_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self { default_versification: "English".to_owned(), versification_dir: None }
    }
}

fn read_settings() -> Settings {
    let built = config::Config::builder()
        .add_source(config::File::with_name("canonry").required(false))
        .build();
    match built.and_then(|c| c.try_deserialize::<Settings>()) {
        Ok(settings) => settings,
        Err(err) => {
            debug!(%err, "no usable canonry.json, using defaults");
            Settings::default()
        }
    }
}

#[derive(Serialize)]
struct SchemeReport {
    name: String,
    last_book: u16,
    scripture_books: u64,
    customized: bool,
}

#[derive(Serialize)]
struct ConvertReport {
    input: String,
    scheme: String,
    result: String,
    bbbcccvvv: u32,
    all_parts_same_chapter: bool,
}

fn resolve_scheme(
    registry: &Arc<SchemeRegistry>,
    settings: &Settings,
    name: &str,
) -> Result<ScrVers> {
    if ScrVersType::from_name(name) != ScrVersType::Unknown {
        return Ok(registry.get(name));
    }
    if let Some(dir) = &settings.versification_dir {
        let candidate = Path::new(dir).join(format!("{name}.vrs"));
        if candidate.exists() {
            return registry.load_file(&candidate, Some(name));
        }
    }
    Ok(registry.get(name))
}

fn scheme_report(scheme: &ScrVers) -> SchemeReport {
    SchemeReport {
        name: scheme.name(),
        last_book: scheme.last_book(),
        scripture_books: scheme.scripture_books().count(),
        customized: scheme.is_customized(),
    }
}

fn run(args: &[String]) -> Result<bool> {
    let settings = read_settings();
    let registry = Arc::clone(SchemeRegistry::shared());
    let json = args.iter().any(|a| a == "--json");
    let args: Vec<&String> = args.iter().filter(|a| *a != "--json").collect();

    match args.get(0).map(|s| s.as_str()) {
        Some("check") if args.len() == 2 => {
            let scheme = registry.load_file(args[1], Some("Unnamed"))?;
            let report = scheme_report(&scheme);
            if json {
                println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            } else {
                println!("{} is well-formed ({} books)", report.name, report.last_book);
            }
            Ok(true)
        }
        Some("info") if args.len() == 2 => {
            let scheme = resolve_scheme(&registry, &settings, args[1])?;
            let report = scheme_report(&scheme);
            if json {
                println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            } else {
                println!(
                    "{}: {} books, {} with scripture content{}",
                    report.name,
                    report.last_book,
                    report.scripture_books,
                    if report.customized { " (customized)" } else { "" }
                );
            }
            Ok(true)
        }
        Some("export") if args.len() == 2 => {
            let scheme = resolve_scheme(&registry, &settings, args[1])?;
            let mut out = String::new();
            let _ = scheme.write_definition(&mut out);
            print!("{out}");
            Ok(true)
        }
        Some("convert") if args.len() == 3 => {
            let source = resolve_scheme(&registry, &settings, &settings.default_versification)?;
            let target = resolve_scheme(&registry, &settings, args[2])?;
            let mut vref = match VerseRef::parse(args[1])? {
                parsed if parsed.versification().is_some() => parsed,
                mut parsed => {
                    parsed.set_versification(Some(source));
                    parsed
                }
            };
            let input = vref.to_string();
            let all_same_chapter = if vref.has_multiple() {
                vref.change_versification_with_ranges(&target)
            } else {
                vref.change_versification(&target);
                true
            };
            let report = ConvertReport {
                input,
                scheme: target.name(),
                result: vref.to_string(),
                bbbcccvvv: vref.bbbcccvvv(),
                all_parts_same_chapter: all_same_chapter,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            } else {
                println!("{} -> {} ({})", report.input, report.result, report.scheme);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("usage: canonry [--json] <command>");
            eprintln!("  check <file.vrs>         validate a versification file");
            eprintln!("  info <scheme>            summarize a scheme");
            eprintln!("  export <scheme>          write a scheme back out as directives");
            eprintln!("  convert <ref> <scheme>   convert a reference, e.g. \"GEN 31:55\" Original");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
