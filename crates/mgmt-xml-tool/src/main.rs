//! Command-line front end for the management XML parser.
//!
//! Parses a configuration document and prints its operation list, rewrites it
//! in the current schema, or only checks that it parses and replays.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use serde_json::{Map, Value};

use mgmt_xml::{
    apply_operations, marshal_document, parse_document, MarshalOptions, ModelNode,
    ParsedDocument,
};

/// Inspect and normalize management configuration documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the operations a document produces
    Parse {
        file: PathBuf,

        /// Print JSON instead of one operation per line
        #[arg(long)]
        json: bool,
    },
    /// Rewrite a document in the current schema
    Normalize {
        file: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Spaces per nesting level
        #[arg(long, default_value_t = 4)]
        indent: usize,
    },
    /// Parse and replay a document, reporting only errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    if let Err(e) = run(args.command) {
        eprintln!("mgmt-xml error: {e:#}");
        exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Parse { file, json } => {
            let parsed = read(&file)?;
            if json {
                let ops: Vec<Value> = parsed
                    .operations
                    .iter()
                    .map(|op| to_json(&op.to_model_node()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&Value::Array(ops))?);
            } else {
                for op in &parsed.operations {
                    println!("{op}");
                }
            }
            Ok(())
        }
        Commands::Normalize {
            file,
            output,
            indent,
        } => {
            let parsed = read(&file)?;
            let tree = apply_operations(&parsed.operations)
                .with_context(|| format!("replaying {}", file.display()))?;
            let options = MarshalOptions::new()
                .with_indent(indent)
                .with_context(parsed.context);
            let xml = marshal_document(&tree, &options)?;
            match output {
                Some(path) => fs::write(&path, xml + "\n")
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{xml}"),
            }
            Ok(())
        }
        Commands::Check { files } => {
            for file in &files {
                let parsed = read(file)?;
                apply_operations(&parsed.operations)
                    .with_context(|| format!("replaying {}", file.display()))?;
                println!(
                    "{}: ok ({} document, schema {}, {} operations)",
                    file.display(),
                    parsed.context,
                    parsed.version,
                    parsed.operations.len()
                );
            }
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<ParsedDocument> {
    let xml =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    debug!("read {} bytes from {}", xml.len(), path.display());
    parse_document(&xml).with_context(|| format!("parsing {}", path.display()))
}

/// Renders a model node as JSON. Expressions stay strings.
fn to_json(node: &ModelNode) -> Value {
    match node {
        ModelNode::Undefined => Value::Null,
        ModelNode::Boolean(b) => Value::Bool(*b),
        ModelNode::Int(i) => Value::from(*i),
        ModelNode::String(s) | ModelNode::Expression(s) => Value::String(s.clone()),
        ModelNode::List(items) => Value::Array(items.iter().map(to_json).collect()),
        ModelNode::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect::<Map<_, _>>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json() {
        let mut node = ModelNode::object();
        node.set("url", "ldap://localhost");
        node.set("port", 389i64);
        node.set("secure", false);
        node.set("host", ModelNode::Expression("${ldap.host}".to_string()));
        assert_eq!(
            to_json(&node),
            serde_json::json!({
                "url": "ldap://localhost",
                "port": 389,
                "secure": false,
                "host": "${ldap.host}"
            })
        );
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from(["mgmt-xml", "-vv", "parse", "--json", "a.xml"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Commands::Parse { json: true, .. }));
    }
}
