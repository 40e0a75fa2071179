use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use metatree_store::{
    InMemoryPropertyStore, NamespaceRecord, PacketDocument, ANNOTATION_NAMESPACE,
    ANNOTATION_PREFIX,
};
use metatree_tree::Packet;
use metatree_types::{Address, Value};
use tracing::warn;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Namespaces(args) => cmd_namespaces(args, &config, &format),
        Command::Show(args) => cmd_show(args, &config, &format),
        Command::Get(args) => cmd_get(args, &config, &format),
        Command::Set(args) => cmd_set(args, &config),
        Command::Delete(args) => cmd_delete(args, &config),
    }
}

fn open(path: &Path, config: &CliConfig) -> anyhow::Result<Packet<InMemoryPropertyStore>> {
    let store = PacketDocument::load(path)
        .with_context(|| format!("loading packet {}", path.display()))?
        .into_store()?;
    Ok(Packet::with_config(store, config.tree.clone())?)
}

/// Save a modified packet when asked to, and warn when changes are dropped.
fn finish(packet: &Packet<InMemoryPropertyStore>, path: &Path, write: bool) -> anyhow::Result<()> {
    if !packet.store().is_dirty() {
        return Ok(());
    }
    if write {
        PacketDocument::from_store(packet.store())?.save(path)?;
        println!("{} Saved {}", "✓".green().bold(), path.display().to_string().bold());
    } else {
        warn!(packet = %path.display(), "packet modified in read-only mode; changes are not saved");
        eprintln!(
            "{} {} was opened read-only; pass --write to save the change",
            "warning:".yellow().bold(),
            path.display()
        );
    }
    Ok(())
}

fn namespace_of(explicit: Option<String>, config: &CliConfig) -> anyhow::Result<String> {
    match explicit.or_else(|| config.default_namespace.clone()) {
        Some(uri) => Ok(uri),
        None => bail!("no namespace given; pass --namespace or set default_namespace"),
    }
}

/// Read a command-line value: JSON when it parses, plain text otherwise.
fn parse_value(raw: &str, unordered: bool) -> Value {
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    match value {
        Value::Array(items) if unordered => Value::set_of(items),
        other => other,
    }
}

fn apply_set(
    packet: &mut Packet<InMemoryPropertyStore>,
    namespace: &str,
    path: &str,
    raw: &str,
    unordered: bool,
) -> anyhow::Result<Address> {
    Ok(packet.set(namespace, path, parse_value(raw, unordered))?)
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    if args.packet.exists() && !args.force {
        bail!("{} already exists; pass --force to overwrite", args.packet.display());
    }
    let mut document = PacketDocument::default();
    if args.annotations {
        document.namespaces.push(NamespaceRecord {
            uri: ANNOTATION_NAMESPACE.to_string(),
            prefix: Some(ANNOTATION_PREFIX.to_string()),
        });
    }
    document.save(&args.packet)?;
    println!(
        "{} Initialized packet {}",
        "✓".green().bold(),
        args.packet.display().to_string().bold()
    );
    Ok(())
}

fn cmd_namespaces(args: NamespacesArgs, config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let packet = open(&args.packet, config)?;
    match format {
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> = packet
                .namespaces()
                .iter()
                .map(|view| {
                    serde_json::json!({
                        "uri": view.uri(),
                        "prefix": view.prefix(),
                        "children": view.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            if packet.is_empty() {
                println!("No namespaces.");
            }
            for view in packet.namespaces() {
                let prefix = view
                    .prefix()
                    .map(|p| format!(" ({})", p.cyan()))
                    .unwrap_or_default();
                println!("{}{}  {} top-level nodes", view.uri().bold(), prefix, view.len());
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let packet = open(&args.packet, config)?;
    let uris: Vec<String> = match args.namespace.or_else(|| config.default_namespace.clone()) {
        Some(uri) => vec![uri],
        None => packet.uris().map(str::to_string).collect(),
    };
    match format {
        OutputFormat::Json => {
            let mut all = serde_json::Map::new();
            for uri in &uris {
                all.insert(uri.clone(), serde_json::to_value(packet.namespace(uri).value()?)?);
            }
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
        OutputFormat::Text => {
            for uri in &uris {
                println!("{}", packet.namespace(uri));
            }
        }
    }
    Ok(())
}

fn cmd_get(args: GetArgs, config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let packet = open(&args.packet, config)?;
    let namespace = namespace_of(args.namespace, config)?;
    let node = packet.node(&namespace, &args.path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&node.value()?)?),
        OutputFormat::Text => println!("{node}"),
    }
    Ok(())
}

fn cmd_set(args: SetArgs, config: &CliConfig) -> anyhow::Result<()> {
    let mut packet = open(&args.packet, config)?;
    let namespace = namespace_of(args.namespace, config)?;
    let address = apply_set(&mut packet, &namespace, &args.path, &args.value, args.unordered)?;
    println!("{} {}@{}", "set".green(), namespace, address.to_string().yellow());
    finish(&packet, &args.packet, args.write)
}

fn cmd_delete(args: DeleteArgs, config: &CliConfig) -> anyhow::Result<()> {
    let mut packet = open(&args.packet, config)?;
    let namespace = namespace_of(args.namespace, config)?;
    if packet.delete(&namespace, &args.path)? {
        println!("{} {}@{}", "deleted".red(), namespace, args.path.yellow());
    } else {
        println!("Nothing at {}@{}.", namespace, args.path);
    }
    finish(&packet, &args.packet, args.write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metatree_types::Scalar;

    const NS: &str = "urn:test";

    #[test]
    fn values_parse_as_json_or_text() {
        assert_eq!(parse_value("5", false), Value::from(5));
        assert_eq!(parse_value("true", false), Value::from(true));
        assert_eq!(parse_value("\"5\"", false), Value::Scalar(Scalar::Text("5".into())));
        assert_eq!(parse_value("hello world", false), Value::from("hello world"));
        assert_eq!(
            parse_value("[1, 1, 2]", true),
            Value::set_of([Value::from(1), Value::from(2)])
        );
        assert!(matches!(parse_value("{\"a\": 1}", false), Value::Struct(_)));
    }

    #[test]
    fn namespace_falls_back_to_config() {
        let config = CliConfig {
            default_namespace: Some(NS.into()),
            ..Default::default()
        };
        assert_eq!(namespace_of(None, &config).unwrap(), NS);
        assert_eq!(namespace_of(Some("urn:x".into()), &config).unwrap(), "urn:x");
        assert!(namespace_of(None, &CliConfig::default()).is_err());
    }

    #[test]
    fn set_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packet.json");
        cmd_init(InitArgs {
            packet: path.clone(),
            annotations: true,
            force: false,
        })
        .unwrap();

        let config = CliConfig::default();
        let mut packet = open(&path, &config).unwrap();
        assert!(packet.contains_namespace(ANNOTATION_NAMESPACE));
        let address = apply_set(&mut packet, ANNOTATION_NAMESPACE, "faces[0]/name", "\"ann\"", false)
            .unwrap();
        assert_eq!(address.as_str(), "aldebaran:faces[0]/aldebaran:name");
        finish(&packet, &path, true).unwrap();

        let reopened = open(&path, &config).unwrap();
        assert_eq!(
            reopened.value(ANNOTATION_NAMESPACE, "faces[0]/name").unwrap(),
            Value::from("ann")
        );
        assert!(!reopened.store().is_dirty());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packet.json");
        let args = || InitArgs {
            packet: path.clone(),
            annotations: false,
            force: false,
        };
        cmd_init(args()).unwrap();
        assert!(cmd_init(args()).is_err());
    }

    #[test]
    fn read_only_changes_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packet.json");
        PacketDocument::default().save(&path).unwrap();

        let mut packet = open(&path, &CliConfig::default()).unwrap();
        apply_set(&mut packet, NS, "k", "1", false).unwrap();
        finish(&packet, &path, false).unwrap();

        let reopened = open(&path, &CliConfig::default()).unwrap();
        assert!(reopened.is_empty());
    }
}
