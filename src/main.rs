use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classification_cache::{compute_key, CacheConfig, CacheKey, ClassificationCache};

#[derive(Parser)]
#[command(name = "classification-cache")]
#[command(about = "Admin tool for the classification result cache", long_about = None)]
struct Cli {
    /// Redis connection string (overrides REDIS_URL)
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Key namespace (overrides CLASSIFICATION_CACHE_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key for a document
    Key {
        /// Document text
        text: String,

        /// Metadata pair affecting classification (repeatable)
        #[arg(short, long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },

    /// Show a stored entry and its remaining TTL
    Inspect {
        /// Hex digest of the entry
        key: String,
    },

    /// Remove a single entry
    Purge {
        /// Hex digest of the entry
        key: String,
    },

    /// Remove every entry in the namespace
    Flush {
        /// Confirm the flush
        #[arg(long)]
        yes: bool,
    },

    /// Count entries in the namespace
    Count,

    /// Probe the backing store
    Health,
}

fn parse_meta(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

fn open_cache(cli: &Cli) -> Result<ClassificationCache> {
    let mut config = CacheConfig::from_env().context("invalid cache configuration")?;
    if let Some(url) = &cli.redis_url {
        config.backing_store_location = Some(url.clone());
    }
    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
    }
    if config.backing_store_location.is_none() {
        bail!("no backing store configured; set REDIS_URL or pass --redis-url");
    }

    Ok(ClassificationCache::new(config)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "classification_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Key { ref text, ref meta } => {
            println!("{}", compute_key(text, meta.iter().map(|(k, v)| (k, v))));
        }

        Commands::Inspect { ref key } => {
            let key = CacheKey::parse(key)?;
            let cache = open_cache(&cli)?;
            match cache.inspect(&key).await? {
                Some(info) => {
                    println!("Key:       {}", info.store_key);
                    println!("Domain:    {}", info.entry.value.domain);
                    println!("Confidence: {:.3}", info.entry.value.confidence);
                    println!(
                        "Stored:    {}",
                        info.entry.stored_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    println!("TTL:       {}s", info.entry.ttl_seconds);
                    match info.remaining_ttl_seconds {
                        Some(secs) => println!("Remaining: {}s", secs),
                        None => println!("Remaining: no expiry"),
                    }
                    println!("\n{}", serde_json::to_string_pretty(&info.entry.value)?);
                }
                None => println!("No entry for {}", key),
            }
        }

        Commands::Purge { ref key } => {
            let key = CacheKey::parse(key)?;
            let cache = open_cache(&cli)?;
            if cache.delete(&key).await? {
                println!("Purged {}", key);
            } else {
                println!("No entry for {} (nothing to purge)", key);
            }
        }

        Commands::Flush { yes } => {
            if !yes {
                bail!("refusing to flush without --yes");
            }
            let cache = open_cache(&cli)?;
            let removed = cache.clear().await?;
            println!(
                "Flushed {} entries from namespace {}",
                removed,
                cache.config().namespace
            );
        }

        Commands::Count => {
            let cache = open_cache(&cli)?;
            println!("{}", cache.entry_count().await?);
        }

        Commands::Health => {
            let cache = open_cache(&cli)?;
            let result = cache.health_check().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.status.is_operational() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("source=doc1").unwrap(),
            ("source".to_string(), "doc1".to_string())
        );
        assert_eq!(
            parse_meta("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_meta("source").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "classification-cache",
            "key",
            "Il ginocchio...",
            "--meta",
            "source=doc1",
        ])
        .unwrap();
        match cli.command {
            Commands::Key { text, meta } => {
                assert_eq!(text, "Il ginocchio...");
                assert_eq!(meta.len(), 1);
            }
            _ => panic!("expected key command"),
        }

        let cli = Cli::try_parse_from(["classification-cache", "flush"]).unwrap();
        assert!(matches!(cli.command, Commands::Flush { yes: false }));
    }
}
