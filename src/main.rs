use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textcache::cache::TranslationCache;
use textcache::config::{init_default_config, CacheSettings};
use textcache::store::{Scope, TranslationType};

#[derive(Parser, Debug)]
#[command(name = "textcache")]
#[command(about = "Scoped translation cache over key=value translation files", long_about = None)]
struct Args {
    /// Config file path (default: $TEXTCACHE_CONFIG, then textcache.toml searched upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a text through the cache and print the translation
    Lookup {
        text: String,
        /// Level scope to look in before the global table
        #[arg(long)]
        scope: Option<i32>,
        /// Skip regex rules
        #[arg(long)]
        no_regex: bool,
        /// Skip token translations
        #[arg(long)]
        no_token: bool,
    },
    /// Record a translation and append it to the output file
    Add {
        original: String,
        translation: String,
        #[arg(long)]
        scope: Option<i32>,
    },
    /// Print table sizes after loading
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write a default textcache.toml, then exit
    InitConfig {
        /// Directory to write the config to (default: current directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn open_cache(config: Option<PathBuf>) -> anyhow::Result<TranslationCache> {
    let settings = CacheSettings::resolve(config).context("resolve config")?;
    let mut cache = TranslationCache::new(settings);
    cache.load_translations();
    Ok(cache)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match args.command {
        Command::InitConfig { dir, force } => {
            let dir = dir
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
            let cfg_path = init_default_config(&dir, force).context("init default config")?;
            eprintln!("Wrote config: {}", cfg_path.display());
        }
        Command::Lookup {
            text,
            scope,
            no_regex,
            no_token,
        } => {
            let mut cache = open_cache(args.config)?;
            let text = cache.substitute(&text);
            let key = cache.normalize(&text, false);
            match cache.resolve(&key, !no_regex, !no_token, Scope::from_level(scope)) {
                Some(found) => {
                    println!("{}", key.untemplate(&found.value));
                    eprintln!(
                        "tier: {:?}, scope: {}{}",
                        found.tier,
                        found.scope,
                        if found.reconstructed { " (reconstructed)" } else { "" }
                    );
                    // static hits and persisted regex hits are queued
                    cache.flush()?;
                }
                None => {
                    eprintln!("No translation found");
                    std::process::exit(1);
                }
            }
        }
        Command::Add {
            original,
            translation,
            scope,
        } => {
            let mut cache = open_cache(args.config)?;
            let scope = Scope::from_level(scope);
            if cache.has_translation(&original, scope, false) {
                eprintln!("Already translated in {scope}; nothing to add");
                return Ok(());
            }
            cache.add_translation_to_cache(&original, &translation, true, TranslationType::Full, scope);
            let written = cache.flush()?;
            eprintln!(
                "Wrote {written} entr{} to {}",
                if written == 1 { "y" } else { "ies" },
                cache.settings().output_file.display()
            );
        }
        Command::Stats { json } => {
            let cache = open_cache(args.config)?;
            let stats = cache.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "global: {} translations, {} tokens, {} regexes",
                    stats.global.translations, stats.global.tokens, stats.global.regexes
                );
                for s in &stats.scopes {
                    println!(
                        "level {}: {} translations, {} tokens, {} regexes",
                        s.level, s.table.translations, s.table.tokens, s.table.regexes
                    );
                }
                println!(
                    "static: {}, partial: {}, substitutions: {}",
                    stats.statics, stats.partials, stats.substitutions
                );
            }
        }
    }
    Ok(())
}
