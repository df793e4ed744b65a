use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dstore_client::Client;
use dstore_core::{
    parse_path, ClientConfig, Direction, Key, KeyCodec, PathBuilder, PathElement, QueryBuilder,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod json;
mod table;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Table format (default)
    Table,
    /// Pretty JSON
    Json,
}

#[derive(Parser)]
#[command(name = "dstore")]
#[command(about = "Command line client for the dstore document store", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults to DSTORE_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Namespace override
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an entity
    Get {
        /// Key path, e.g. User:alice/Post:#12
        path: String,
    },
    /// Write an entity
    Put {
        /// Key path; with --auto-id the last element is just a kind (Blog:eng/Post)
        path: String,
        /// Properties as a JSON object
        properties: String,
        /// Property to index (repeatable)
        #[arg(short, long = "index")]
        index: Vec<String>,
        /// Let the store assign the final id
        #[arg(long)]
        auto_id: bool,
    },
    /// Delete an entity
    Delete {
        /// Key path
        path: String,
    },
    /// Run a query
    Query {
        /// Kind to query
        #[arg(short, long)]
        kind: Option<String>,
        /// Equality filter prop=value (repeatable)
        #[arg(short, long = "where")]
        filters: Vec<String>,
        /// Restrict to descendants of this key path
        #[arg(short, long)]
        ancestor: Option<String>,
        /// Order clause prop[:desc] (repeatable)
        #[arg(long)]
        order: Vec<String>,
        /// Maximum number of entities to return
        #[arg(short, long)]
        limit: Option<u32>,
        /// Number of results to skip
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Return keys only
        #[arg(long)]
        keys_only: bool,
        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
    /// Print the encoded form of a key path
    EncodeKey {
        /// Key path
        path: String,
    },
    /// Print the key path of an encoded key
    DecodeKey {
        /// Encoded key
        encoded: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::EncodeKey { path } => {
            let key = make_key(&path, cli.namespace.as_deref())?;
            println!("{}", key.encode());
        }

        Commands::DecodeKey { encoded } => {
            let key = KeyCodec::decode(&encoded).context("Failed to decode key")?;
            println!("{}", key);
        }

        Commands::Get { path } => {
            let client = connect(cli.config, cli.namespace).await?;
            let key = client.make_key(parse_path(&path)?)?;

            match client.get_entity(&key).await.context("Failed to get entity")? {
                Some(entity) => {
                    println!("{}", serde_json::to_string_pretty(&json::entity_to_json(&entity))?);
                }
                None => {
                    println!("Entity not found");
                }
            }
        }

        Commands::Put {
            path,
            properties,
            index,
            auto_id,
        } => {
            let mut client = connect(cli.config, cli.namespace).await?;
            let key = if auto_id {
                incomplete_key(&client, &path)?
            } else {
                client.make_key(parse_path(&path)?)?
            };

            let json: serde_json::Value = serde_json::from_str(&properties).context("Invalid JSON")?;
            let index: Vec<&str> = index.iter().map(String::as_str).collect();
            let entity = json::json_to_entity(key, &json, &index)?;

            if auto_id {
                let key = client
                    .insert_auto_id(entity)
                    .await
                    .context("Failed to insert entity")?;
                match key {
                    Some(key) => println!("Entity stored: {}", key),
                    None => println!("Entity stored"),
                }
            } else {
                client.write_entity(entity).await.context("Failed to put entity")?;
                println!("Entity stored");
            }
        }

        Commands::Delete { path } => {
            let mut client = connect(cli.config, cli.namespace).await?;
            client
                .delete_by_path(parse_path(&path)?)
                .await
                .context("Failed to delete entity")?;
            println!("Entity deleted");
        }

        Commands::Query {
            kind,
            filters,
            ancestor,
            order,
            limit,
            offset,
            keys_only,
            output,
        } => {
            let client = connect(cli.config, cli.namespace).await?;

            let mut builder = match kind {
                Some(kind) => QueryBuilder::new(kind),
                None => QueryBuilder::kindless(),
            };
            for filter in &filters {
                let (property, value) = filter
                    .split_once('=')
                    .with_context(|| format!("Filter must be prop=value, got '{}'", filter))?;
                builder = builder.filter_eq(property, value);
            }
            if let Some(ancestor) = ancestor {
                let ancestor = client.make_key(parse_path(&ancestor)?)?;
                builder = builder.ancestor(&ancestor);
            }
            for clause in &order {
                let (property, direction) = parse_order(clause)?;
                builder = builder.order(property, direction);
            }
            if let Some(limit) = limit {
                builder = builder.limit(limit);
            }
            builder = builder.offset(offset);
            if keys_only {
                builder = builder.keys_only();
            }

            let entities = client
                .run_query(&builder.build())
                .await
                .context("Failed to run query")?;

            match output {
                OutputFormat::Table => {
                    println!("{}", table::format_entities_table(&entities));
                    println!();
                    println!("Count: {}", entities.len());
                }
                OutputFormat::Json => {
                    let json: Vec<_> = entities.iter().map(json::entity_to_json).collect();
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }
    }

    Ok(())
}

async fn connect(config_path: Option<PathBuf>, namespace: Option<String>) -> Result<Client> {
    let mut config = match config_path {
        Some(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::from_env().context("Failed to read configuration from environment")?,
    };
    if let Some(namespace) = namespace {
        config = config.with_namespace(namespace);
    }
    debug!(host = %config.host, dataset = %config.dataset, namespace = ?config.namespace(), "Connecting");

    Client::connect(config).await.context("Failed to connect")
}

fn make_key(path: &str, namespace: Option<&str>) -> Result<Key> {
    Ok(Key::from_path(parse_path(path)?, namespace)?)
}

/// `Blog:eng/Post` becomes an incomplete `Post` key under `Blog:eng`.
fn incomplete_key(client: &Client, path: &str) -> Result<Key> {
    let (ancestors, kind) = match path.rsplit_once('/') {
        Some((ancestors, kind)) => (Some(ancestors), kind),
        None => (None, path),
    };
    if kind.is_empty() || kind.contains(':') {
        bail!("With --auto-id the last path element must be a bare kind, got '{}'", kind);
    }

    match ancestors {
        Some(ancestors) => {
            let elements: Vec<PathElement> = parse_path(ancestors)?;
            let parent = client.make_key(elements)?;
            Ok(PathBuilder::new().ancestor(&parent).build_incomplete(kind)?)
        }
        None => Ok(client.make_incomplete_key(kind, None)?),
    }
}

fn parse_order(clause: &str) -> Result<(&str, Direction)> {
    match clause.split_once(':') {
        None => Ok((clause, Direction::Ascending)),
        Some((property, "asc")) => Ok((property, Direction::Ascending)),
        Some((property, "desc")) => Ok((property, Direction::Descending)),
        Some((_, other)) => bail!("Unknown order direction '{}', expected asc or desc", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("age").unwrap(), ("age", Direction::Ascending));
        assert_eq!(parse_order("age:desc").unwrap(), ("age", Direction::Descending));
        assert!(parse_order("age:sideways").is_err());
    }

    #[test]
    fn test_make_key() {
        let key = make_key("Blog:eng/Post:#3", Some("ns")).unwrap();
        assert_eq!(key.to_string(), "Blog:eng/Post:#3 [ns]");
        assert!(make_key("Blog", None).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "dstore", "query", "--kind", "User", "--where", "city=Paris", "--order", "age:desc", "--keys-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Query { kind, filters, order, keys_only, .. } => {
                assert_eq!(kind.as_deref(), Some("User"));
                assert_eq!(filters, vec!["city=Paris"]);
                assert_eq!(order, vec!["age:desc"]);
                assert!(keys_only);
            }
            _ => panic!("expected query command"),
        }
    }
}
