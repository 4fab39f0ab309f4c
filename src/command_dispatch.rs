//! Purpose: Hold top-level CLI command dispatch for `kvtable`.
//! Exports: `CommandContext`, `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command opens the store once and builds one `Table`.
//! Invariants: Lookups are compiled before the table is scanned.

use super::*;
use clap::CommandFactory;
use kvtable::api::{Criteria, FileStore, Lookup, MissingFieldPolicy, Table};

pub(super) struct CommandContext {
    pub(super) store_path: PathBuf,
    pub(super) schema: Schema,
    pub(super) output: OutputOptions,
}

impl CommandContext {
    fn open_table(&self, name: &str) -> Result<Table<FileStore>, Error> {
        let store = FileStore::open(&self.store_path)?;
        Table::new(store, name, self.schema.clone())
    }
}

pub(super) fn dispatch_command(command: Command, ctx: &CommandContext) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "kvtable", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Create { table } => {
            let table = ctx.open_table(&table)?;
            emit_json(json!({ "table": table.name(), "status": "ready" }), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::Drop { table } => {
            let mut table = ctx.open_table(&table)?;
            let removed = table.count()?;
            table.drop()?;
            emit_json(
                json!({ "table": table.name(), "status": "dropped", "removed": removed }),
                ctx.output,
            );
            Ok(RunOutcome::ok())
        }
        Command::Insert { table, id, data } => {
            let id = parse_row_id(&id);
            let data = parse_row_data(&data)?;
            let mut table = ctx.open_table(&table)?;
            table.insert(id.clone(), &data)?;
            emit_json(table.get(id)?.to_value(), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::Update { table, id, data } => {
            let id = parse_row_id(&id);
            let data = parse_row_data(&data)?;
            let mut table = ctx.open_table(&table)?;
            table.update(id.clone(), &data)?;
            emit_json(table.get(id)?.to_value(), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::Get { table, id } => {
            let table = ctx.open_table(&table)?;
            emit_json(table.get(parse_row_id(&id))?.to_value(), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::Exists { table, id } => {
            let id = parse_row_id(&id);
            let table = ctx.open_table(&table)?;
            let exists = table.exists(id.clone());
            emit_json(
                json!({ "table": table.name(), "id": id, "exists": exists }),
                ctx.output,
            );
            Ok(RunOutcome::ok())
        }
        Command::Delete { table, id } => {
            let id = parse_row_id(&id);
            let mut table = ctx.open_table(&table)?;
            table.delete(id.clone())?;
            emit_json(
                json!({ "table": table.name(), "id": id, "status": "deleted" }),
                ctx.output,
            );
            Ok(RunOutcome::ok())
        }
        Command::Count { table } => {
            let mut table = ctx.open_table(&table)?;
            let count = table.count()?;
            emit_json(json!({ "table": table.name(), "count": count }), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::All { table } => {
            let mut table = ctx.open_table(&table)?;
            let rows = table.all()?;
            emit_json(json!({ "table": table.name(), "rows": rows }), ctx.output);
            Ok(RunOutcome::ok())
        }
        Command::Filter {
            table,
            lookup,
            exclude_missing,
        } => {
            let spec = parse_json_arg(&lookup, "lookup")?;
            let policy = if exclude_missing {
                MissingFieldPolicy::Exclude
            } else {
                MissingFieldPolicy::Skip
            };
            let criteria = Criteria::Lookup(Lookup::compile(&spec)?.with_missing_fields(policy));
            let mut table = ctx.open_table(&table)?;
            let rows = table.filter(&criteria)?;
            emit_json(json!({ "table": table.name(), "rows": rows }), ctx.output);
            Ok(RunOutcome::ok())
        }
    }
}
