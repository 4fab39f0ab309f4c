//! Purpose: `kvtable` CLI entry point.
//! Role: Binary crate root; parses args, runs one table command, emits JSON on stdout.
//! Invariants: Successful commands print exactly one JSON document on stdout.
//! Invariants: Errors go to stderr (JSON when piped, text on a TTY).
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod store_paths;

use kvtable::api::{Error, ErrorKind, RowId, Schema, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct OutputOptions {
    pretty: bool,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `kvtable --help` for usage."));
            }
        },
    };

    let context = command_dispatch::CommandContext {
        store_path: store_paths::resolve_store_path(cli.store),
        schema: load_schema(cli.schema.as_deref())?,
        output: OutputOptions { pretty: cli.pretty },
    };
    command_dispatch::dispatch_command(cli.command, &context)
}

#[derive(Parser)]
#[command(
    name = "kvtable",
    version,
    about = "Schema-checked tables over a JSON key-value store file",
    long_about = None,
    after_help = r#"EXAMPLES
  $ echo '[{"name":"firstName"},{"name":"loginCount","type":"int","default":0}]' > users.schema.json
  $ kvtable --schema users.schema.json insert users 1 '{"firstName":"John"}'
  $ kvtable get users 1
  $ kvtable filter users '{"loginCount":{">=":4}}'

STORE
  The store file defaults to $KVTABLE_STORE, then ~/.kvtable/store.json.
  Logging goes to stderr; set RUST_LOG=debug to see every write."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Store file (default: $KVTABLE_STORE or ~/.kvtable/store.json)",
        value_hint = ValueHint::FilePath
    )]
    store: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Schema file: JSON array of {name, type, default, required}",
        value_hint = ValueHint::FilePath
    )]
    schema: Option<PathBuf>,
    #[arg(long, global = true, help = "Pretty-print JSON output")]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Create a table's index if it does not exist")]
    Create {
        #[arg(help = "Table name")]
        table: String,
    },
    #[command(about = "Delete every row of a table and its index")]
    Drop {
        #[arg(help = "Table name")]
        table: String,
    },
    #[command(about = "Insert a new row; fails if the id exists")]
    Insert {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id (JSON number or quoted string; anything else is a raw string)")]
        id: String,
        #[arg(help = "Row fields as a JSON object")]
        data: String,
    },
    #[command(about = "Merge fields into a row, creating it if missing")]
    Update {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
        #[arg(help = "Fields to merge as a JSON object")]
        data: String,
    },
    #[command(about = "Fetch one row by id")]
    Get {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
    },
    #[command(about = "Report whether a row exists")]
    Exists {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
    },
    #[command(about = "Delete a row; absent ids are ignored")]
    Delete {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
    },
    #[command(about = "Count rows")]
    Count {
        #[arg(help = "Table name")]
        table: String,
    },
    #[command(about = "List every row in index order")]
    All {
        #[arg(help = "Table name")]
        table: String,
    },
    #[command(
        about = "List rows matching a lookup",
        after_help = r#"LOOKUP
  A JSON object of field -> {operator: value}. Operators: = != > >= < <=.
  All clauses must hold. Rows lacking a filtered field still match unless
  --exclude-missing is given.

  $ kvtable filter users '{"createdAt":{"<":12499},"firstName":{"=":"John"}}'"#
    )]
    Filter {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Lookup as a JSON object")]
        lookup: String,
        #[arg(long, help = "Rows lacking a filtered field do not match")]
        exclude_missing: bool,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn load_schema(path: Option<&Path>) -> Result<Schema, Error> {
    let Some(path) = path else {
        return Ok(Schema::default());
    };
    let text = std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("failed to read schema file")
            .with_path(path)
            .with_source(err)
    })?;
    Schema::from_json_str(&text).map_err(|err| err.with_path(path))
}

/// Numbers and quoted strings are read as JSON; anything else is taken verbatim.
fn parse_row_id(input: &str) -> RowId {
    match serde_json::from_str::<Value>(input) {
        Ok(value @ (Value::Number(_) | Value::String(_))) => RowId::new(value),
        _ => RowId::from(input),
    }
}

fn parse_json_arg(input: &str, what: &str) -> Result<Value, Error> {
    serde_json::from_str(input).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} is not valid JSON"))
            .with_hint(format!("Parse error: {err}. Quote the argument, e.g. '{{\"name\":\"Ann\"}}'."))
            .with_source(err)
    })
}

fn parse_row_data(input: &str) -> Result<Map<String, Value>, Error> {
    match parse_json_arg(input, "row data")? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("row data must be a JSON object")
            .with_hint("Example: '{\"firstName\":\"John\",\"loginCount\":5}'")),
    }
}

fn emit_json(value: Value, options: OutputOptions) {
    let json = if options.pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if !err.issues().is_empty() {
        let issues = err
            .issues()
            .iter()
            .map(|issue| {
                json!({
                    "field": issue.field,
                    "code": issue.code.as_str(),
                    "message": issue.message,
                })
            })
            .collect::<Vec<_>>();
        inner.insert("issues".to_string(), Value::Array(issues));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    for issue in err.issues() {
        lines.push(format!("  - {issue}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(key) = err.key() {
        lines.push(format!("key: {key}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, error_text, parse_row_data, parse_row_id};
    use clap::CommandFactory;
    use kvtable::api::{Error, ErrorKind, IssueCode, RowId, ValidationIssue};
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn row_ids_prefer_json_scalars() {
        assert_eq!(parse_row_id("12"), RowId::from(12));
        assert_eq!(parse_row_id("\"12\""), RowId::from("12"));
        assert_eq!(parse_row_id("ann"), RowId::from("ann"));
        assert_eq!(parse_row_id("true"), RowId::from("true"));
    }

    #[test]
    fn row_data_must_be_object() {
        assert!(parse_row_data(r#"{"a":1}"#).is_ok());
        assert_eq!(parse_row_data("[1]").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(parse_row_data("{").unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn error_json_lists_issues() {
        let err = Error::new(ErrorKind::Validation)
            .with_message("row `1` failed validation")
            .with_key("users_detail_1")
            .with_issues(vec![ValidationIssue::new(
                "firstName",
                IssueCode::MissingField,
                "missing field",
            )]);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], json!("Validation"));
        assert_eq!(value["error"]["key"], json!("users_detail_1"));
        assert_eq!(value["error"]["issues"][0]["code"], json!("missing-field"));

        let text = error_text(&err);
        assert!(text.contains("firstName: missing field"));
    }
}
