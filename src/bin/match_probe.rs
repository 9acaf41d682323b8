// Prints how the matcher resolves a set of phrases against the training vocabulary.
// Run with: cargo run --bin dx_probe -- [config.toml] [phrase ...]
use dx_core::config::EngineConfig;
use dx_core::dataset;
use dx_core::fuzzy::matcher::SymptomMatcher;
use dx_core::MatchResult;
use std::path::Path;
use std::process::ExitCode;

const DEFAULT_PHRASES: &[&str] = &[
    "fever", "hedache", "stomach ache", "cold", "itchy skin", "vomitting", "xyz123", "pain",
    "breathing", "rash",
];

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.first() {
        Some(first) if first.ends_with(".toml") => Some(args.remove(0)),
        _ => None,
    };

    let config = match EngineConfig::resolve(config_path.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };
    let table = match dataset::load_training_table(&config.data.training_csv, &config.data.label_column)
    {
        Ok(table) => table,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };

    let matcher = SymptomMatcher::new(config.matcher.clone());
    let vocabulary = &table.vocabulary;
    let phrases: Vec<&str> = if args.is_empty() {
        DEFAULT_PHRASES.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    println!(
        "{} symptoms, threshold {}, metric {:?}",
        vocabulary.len(),
        config.matcher.threshold,
        config.matcher.metric
    );
    for phrase in phrases {
        match matcher.match_phrase(phrase, vocabulary) {
            MatchResult::Matched(name) => println!("{phrase:>16} => {name}"),
            MatchResult::Suggestions(list) => {
                let shown: Vec<String> = list
                    .iter()
                    .map(|s| format!("{} ({:.2})", s.symptom, s.score))
                    .collect();
                println!("{phrase:>16} ?> {}", shown.join(", "));
            }
            MatchResult::NoMatch => {
                let partial = matcher.suggest_prefix(phrase, vocabulary, 5);
                if partial.is_empty() {
                    println!("{phrase:>16} -- no match");
                } else {
                    let names: Vec<&str> = partial.iter().map(|n| n.as_str()).collect();
                    println!("{phrase:>16} -- no match; contains: {}", names.join(", "));
                }
            }
        }
    }
    ExitCode::SUCCESS
}
