//! In-memory warehouse catalog.
//!
//! Understands the statement shapes snowcask issues: information-schema
//! selects, `SHOW`, `DESC`, `GET_DDL`, `SELECT *` and `CREATE OR REPLACE` for
//! every object kind. Like the real warehouse, `SHOW` and `DESC` only return
//! their rows through [`CatalogSession::run_and_capture`]; a plain `execute`
//! gets a status row back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use regex::{Captures, Regex};

use snowcask_core::{CatalogSession, Error, ObjectKind, Result, RowSet, UploadOutcome};

#[derive(Debug, Clone)]
enum Details {
    Plain,
    Stream {
        table: String,
    },
    Task {
        warehouse: Option<String>,
        schedule: Option<String>,
        condition: Option<String>,
        definition: String,
    },
}

#[derive(Debug, Clone)]
struct StoredObject {
    kind: ObjectKind,
    name: String,
    ddl: String,
    details: Details,
}

#[derive(Debug, Clone, Default)]
struct TableData {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<StoredObject>,
    tables: BTreeMap<String, TableData>,
    stages: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    failing_statements: Vec<String>,
    failing_downloads: BTreeSet<String>,
    failing_loads: BTreeSet<String>,
    statements: Vec<String>,
}

impl State {
    fn find(&self, kind: ObjectKind, name: &str) -> Option<&StoredObject> {
        self.objects
            .iter()
            .find(|object| object.kind == kind && object.name.eq_ignore_ascii_case(name))
    }

    fn exists(&self, kind: ObjectKind, name: &str) -> bool {
        self.find(kind, name).is_some()
    }

    fn upsert(&mut self, object: StoredObject) {
        match self
            .objects
            .iter_mut()
            .find(|existing| existing.kind == object.kind && existing.name.eq_ignore_ascii_case(&object.name))
        {
            Some(existing) => *existing = object,
            None => self.objects.push(object),
        }
    }

    fn names(&self, kind: ObjectKind) -> impl Iterator<Item = &StoredObject> {
        self.objects.iter().filter(move |object| object.kind == kind)
    }
}

/// In-memory `CatalogSession` with failure injection and a statement log.
#[derive(Debug)]
pub struct MemoryCatalog {
    database: String,
    schema: String,
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new(database: &str, schema: &str) -> Self {
        Self {
            database: database.to_string(),
            schema: schema.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Apply a statement to the catalog, panicking if it is rejected.
    pub fn seed(&self, statement: &str) -> &Self {
        let mut state = self.lock();
        apply(&self.database, &self.schema, &mut state, statement, false)
            .unwrap_or_else(|err| panic!("seed statement rejected: {statement}: {err}"));
        self
    }

    pub fn insert_rows(&self, table: &str, rows: &[&[&str]]) -> &Self {
        let mut state = self.lock();
        let data = find_table(&mut state.tables, table)
            .unwrap_or_else(|| panic!("table {table} not seeded"));
        for row in rows {
            data.rows
                .push(row.iter().map(|value| Some((*value).to_string())).collect());
        }
        self
    }

    pub fn put_stage_file(&self, stage: &str, file: &str, contents: &[u8]) -> &Self {
        let mut state = self.lock();
        let files = find_stage(&mut state.stages, stage)
            .unwrap_or_else(|| panic!("stage {stage} not seeded"));
        files.insert(file.to_string(), contents.to_vec());
        self
    }

    /// Replace the text `GET_DDL` returns for an existing object.
    pub fn override_ddl(&self, kind: ObjectKind, name: &str, ddl: &str) -> &Self {
        let mut state = self.lock();
        let object = state
            .objects
            .iter_mut()
            .find(|object| object.kind == kind && object.name.eq_ignore_ascii_case(name))
            .unwrap_or_else(|| panic!("{kind} {name} not seeded"));
        object.ddl = ddl.to_string();
        self
    }

    /// Reject every statement containing `pattern`.
    pub fn fail_statements_containing(&self, pattern: &str) -> &Self {
        self.lock().failing_statements.push(pattern.to_string());
        self
    }

    pub fn fail_download(&self, stage: &str) -> &Self {
        self.lock().failing_downloads.insert(stage.to_uppercase());
        self
    }

    pub fn fail_load(&self, table: &str) -> &Self {
        self.lock().failing_loads.insert(table.to_uppercase());
        self
    }

    /// Every statement and transfer received, in order. Transfers are logged
    /// as `GET <location>`, `PUT <file> <location>` and `LOAD <table>`.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn object_names(&self, kind: ObjectKind) -> Vec<String> {
        self.lock().names(kind).map(|object| object.name.clone()).collect()
    }

    pub fn table_rows(&self, table: &str) -> Option<Vec<Vec<Option<String>>>> {
        let mut state = self.lock();
        find_table(&mut state.tables, table).map(|data| data.rows.clone())
    }

    pub fn stage_files(&self, stage: &str) -> Option<BTreeMap<String, Vec<u8>>> {
        let mut state = self.lock();
        find_stage(&mut state.stages, stage).map(|files| files.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("catalog state poisoned")
    }

    fn run(&self, statement: &str, capture: bool) -> Result<RowSet> {
        let mut state = self.lock();
        state.statements.push(statement.trim().to_string());
        if let Some(pattern) = state
            .failing_statements
            .iter()
            .find(|pattern| statement.contains(pattern.as_str()))
        {
            return Err(Error::Session(format!("injected failure matching '{pattern}'")));
        }
        apply(&self.database, &self.schema, &mut state, statement, capture)
    }
}

#[async_trait]
impl CatalogSession for MemoryCatalog {
    async fn execute(&self, statement: &str) -> Result<RowSet> {
        self.run(statement, false)
    }

    async fn run_and_capture(&self, statement: &str) -> Result<RowSet> {
        self.run(statement, true)
    }

    async fn download(&self, location: &str, dest: &Path) -> Result<Vec<PathBuf>> {
        let mut state = self.lock();
        state.statements.push(format!("GET {location}"));
        let stage = location.trim_start_matches('@');
        if state.failing_downloads.contains(&stage.to_uppercase()) {
            return Err(Error::Session(format!("access denied to stage {stage}")));
        }
        let files = find_stage(&mut state.stages, stage)
            .ok_or_else(|| not_found("Stage", stage))?
            .clone();

        std::fs::create_dir_all(dest)?;
        let mut written = Vec::new();
        for (name, contents) in files {
            let path = dest.join(&name);
            std::fs::write(&path, contents)?;
            written.push(path);
        }
        Ok(written)
    }

    async fn upload(&self, local: &Path, location: &str) -> Result<UploadOutcome> {
        let mut state = self.lock();
        state
            .statements
            .push(format!("PUT {} {location}", local.display()));
        let stage = location.trim_start_matches('@');
        let file_name = local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Session(format!("invalid upload source {}", local.display())))?;
        let contents = std::fs::read(local)?;
        let files = find_stage(&mut state.stages, stage).ok_or_else(|| not_found("Stage", stage))?;
        files.insert(file_name.clone(), contents);
        Ok(UploadOutcome {
            source: file_name,
            status: "UPLOADED".to_string(),
        })
    }

    async fn bulk_load(&self, table: &str, data: &RowSet) -> Result<u64> {
        let mut state = self.lock();
        state.statements.push(format!("LOAD {table}"));
        if state.failing_loads.contains(&table.to_uppercase()) {
            return Err(Error::Session(format!("insufficient privileges on {table}")));
        }
        let target = find_table(&mut state.tables, table).ok_or_else(|| not_found("Table", table))?;

        let mut positions = Vec::with_capacity(data.columns.len());
        for column in &data.columns {
            let position = target
                .columns
                .iter()
                .position(|existing| existing.eq_ignore_ascii_case(column))
                .ok_or_else(|| {
                    Error::Session(format!("invalid identifier '{column}' for table {table}"))
                })?;
            positions.push(position);
        }

        for row in &data.rows {
            let mut values = vec![None; target.columns.len()];
            for (value, position) in row.iter().zip(&positions) {
                values[*position] = value.clone();
            }
            target.rows.push(values);
        }
        Ok(data.rows.len() as u64)
    }
}

fn find_table<'a>(tables: &'a mut BTreeMap<String, TableData>, name: &str) -> Option<&'a mut TableData> {
    tables.get_mut(&name.to_uppercase())
}

fn find_stage<'a>(
    stages: &'a mut BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    name: &str,
) -> Option<&'a mut BTreeMap<String, Vec<u8>>> {
    stages.get_mut(&name.to_uppercase())
}

fn not_found(kind: &str, name: &str) -> Error {
    Error::Session(format!(
        "SQL compilation error: {kind} '{}' does not exist or not authorized.",
        name.to_uppercase()
    ))
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid statement pattern")
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map(|m| m.as_str()).unwrap_or_default()
}

fn apply(
    database: &str,
    schema: &str,
    state: &mut State,
    statement: &str,
    capture: bool,
) -> Result<RowSet> {
    let statement = statement.trim().trim_end_matches(';').trim();

    if let Some(caps) =
        re(r"(?is)^SELECT\s+(\w+)\s+FROM\s+INFORMATION_SCHEMA\.(\w+)(?:\s+WHERE\s+(.*))?$").captures(statement)
    {
        return select_metadata(
            database,
            schema,
            state,
            group(&caps, 1),
            group(&caps, 2),
            group(&caps, 3),
        );
    }

    if let Some(caps) = re(r"(?is)^SELECT\s+GET_DDL\(\s*'(\w+)'\s*,\s*'([^']+)'\s*\)$").captures(statement) {
        return get_ddl(state, group(&caps, 1), group(&caps, 2));
    }

    if let Some(caps) = re(r"(?i)^SHOW\s+(\w+)$").captures(statement) {
        let rows = show(database, schema, state, group(&caps, 1))?;
        return Ok(captured_or_status(rows, capture));
    }

    if let Some(caps) = re(r"(?i)^DESC(?:RIBE)?\s+(\w+)\s+(\S+)$").captures(statement) {
        let rows = describe(database, schema, state, group(&caps, 1), group(&caps, 2))?;
        return Ok(captured_or_status(rows, capture));
    }

    if let Some(caps) = re(r"(?is)^SELECT\s+\*\s+FROM\s+(\S+)$").captures(statement) {
        return select_all(state, group(&caps, 1));
    }

    if let Some(caps) = re(r"(?is)^CREATE\s+OR\s+REPLACE\s+(.*)$").captures(statement) {
        return create_or_replace(state, group(&caps, 1), statement);
    }

    Err(Error::Session(format!(
        "SQL compilation error: unsupported statement '{statement}'"
    )))
}

fn captured_or_status(rows: RowSet, capture: bool) -> RowSet {
    if capture {
        rows
    } else {
        RowSet::scalar("status", format!("{} row(s) produced.", rows.len()))
    }
}

fn metadata_rows(database: &str, schema: &str, state: &State, view: &str) -> Result<RowSet> {
    let (prefix, kinds): (&str, &[ObjectKind]) = match view.to_uppercase().as_str() {
        "TABLES" => ("TABLE", &[ObjectKind::Table, ObjectKind::View]),
        "VIEWS" => ("TABLE", &[ObjectKind::View]),
        "FILE_FORMATS" => ("FILE_FORMAT", &[ObjectKind::FileFormat]),
        "PROCEDURES" => ("PROCEDURE", &[ObjectKind::Procedure]),
        other => return Err(not_found("Object", &format!("INFORMATION_SCHEMA.{other}"))),
    };

    let mut columns = vec![
        format!("{prefix}_NAME"),
        format!("{prefix}_SCHEMA"),
        format!("{prefix}_CATALOG"),
    ];
    let with_type = view.eq_ignore_ascii_case("TABLES");
    if with_type {
        columns.push("TABLE_TYPE".to_string());
    }

    let mut rows = RowSet::new(columns);
    for object in state.objects.iter().filter(|object| kinds.contains(&object.kind)) {
        let mut row = vec![
            Some(object.name.clone()),
            Some(schema.to_string()),
            Some(database.to_string()),
        ];
        if with_type {
            let table_type = if object.kind == ObjectKind::View {
                "VIEW"
            } else {
                "BASE TABLE"
            };
            row.push(Some(table_type.to_string()));
        }
        rows.push_row(row);
    }
    Ok(rows)
}

fn select_metadata(
    database: &str,
    schema: &str,
    state: &State,
    field: &str,
    view: &str,
    conditions: &str,
) -> Result<RowSet> {
    let rows = metadata_rows(database, schema, state, view)?;
    let field_index = rows
        .column_index(field)
        .ok_or_else(|| Error::Session(format!("SQL compilation error: invalid identifier '{field}'")))?;

    let condition = re(r"(?s)^(\w+)\s*(=|<>)\s*'((?:[^']|'')*)'$");
    let mut filters = Vec::new();
    for part in re(r"(?i)\s+AND\s+").split(conditions) {
        let part = part.trim();
        if part.is_empty() || part == "1=1" {
            continue;
        }
        let caps = condition
            .captures(part)
            .ok_or_else(|| Error::Session(format!("SQL compilation error: unsupported condition '{part}'")))?;
        let column = rows.column_index(group(&caps, 1)).ok_or_else(|| {
            Error::Session(format!(
                "SQL compilation error: invalid identifier '{}'",
                group(&caps, 1)
            ))
        })?;
        let equal = group(&caps, 2) == "=";
        filters.push((column, equal, group(&caps, 3).replace("''", "'")));
    }

    let mut projected = RowSet::new(vec![field.to_uppercase()]);
    for (index, row) in rows.rows.iter().enumerate() {
        let keep = filters.iter().all(|(column, equal, value)| {
            (rows.value(index, *column) == Some(value.as_str())) == *equal
        });
        if keep {
            projected.push_row(vec![row[field_index].clone()]);
        }
    }
    Ok(projected)
}

fn show(database: &str, schema: &str, state: &State, plural: &str) -> Result<RowSet> {
    let kind = ObjectKind::ALL
        .into_iter()
        .find(|kind| kind.plural().eq_ignore_ascii_case(plural))
        .ok_or_else(|| Error::Session(format!("SQL compilation error: unsupported SHOW {plural}")))?;

    let mut rows = RowSet::new(vec![
        "created_on".to_string(),
        "name".to_string(),
        "database_name".to_string(),
        "schema_name".to_string(),
    ]);
    for object in state.names(kind) {
        rows.push_row(vec![
            Some("2024-01-01 00:00:00.000 +0000".to_string()),
            Some(object.name.clone()),
            Some(database.to_string()),
            Some(schema.to_string()),
        ]);
    }
    Ok(rows)
}

fn describe(
    database: &str,
    schema: &str,
    state: &State,
    label: &str,
    name: &str,
) -> Result<RowSet> {
    let kind: ObjectKind = label.parse()?;
    let object = state.find(kind, name).ok_or_else(|| not_found(kind.label(), name))?;

    match &object.details {
        Details::Stream { table } => {
            let mut rows = RowSet::new(
                ["name", "database_name", "schema_name", "table_name", "mode"]
                    .map(String::from)
                    .to_vec(),
            );
            rows.push_row(vec![
                Some(object.name.clone()),
                Some(database.to_string()),
                Some(schema.to_string()),
                Some(table.clone()),
                Some("DEFAULT".to_string()),
            ]);
            Ok(rows)
        }
        Details::Task {
            warehouse,
            schedule,
            condition,
            definition,
        } => {
            let mut rows = RowSet::new(
                [
                    "name",
                    "database_name",
                    "schema_name",
                    "warehouse",
                    "schedule",
                    "condition",
                    "definition",
                    "state",
                ]
                .map(String::from)
                .to_vec(),
            );
            rows.push_row(vec![
                Some(object.name.clone()),
                Some(database.to_string()),
                Some(schema.to_string()),
                warehouse.clone(),
                schedule.clone(),
                condition.clone(),
                Some(definition.clone()),
                Some("suspended".to_string()),
            ]);
            Ok(rows)
        }
        Details::Plain => Err(Error::Session(format!(
            "SQL compilation error: DESC {} is not supported",
            kind.label()
        ))),
    }
}

fn get_ddl(state: &State, label: &str, qualified: &str) -> Result<RowSet> {
    let kind: ObjectKind = label.parse()?;
    let mut name = qualified.rsplit('.').next().unwrap_or(qualified).to_string();
    if kind == ObjectKind::Procedure {
        name = name
            .strip_suffix("()")
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Session(format!(
                    "SQL compilation error: procedure signature required for '{qualified}'"
                ))
            })?;
    }

    let object = state.find(kind, &name).ok_or_else(|| not_found(kind.label(), &name))?;
    Ok(RowSet::scalar(
        &format!("GET_DDL('{label}', '{qualified}')"),
        object.ddl.clone(),
    ))
}

fn select_all(state: &mut State, table: &str) -> Result<RowSet> {
    let name = table.rsplit('.').next().unwrap_or(table);
    let data = find_table(&mut state.tables, name).ok_or_else(|| not_found("Table", name))?;
    Ok(RowSet {
        columns: data.columns.clone(),
        rows: data.rows.clone(),
    })
}

fn create_or_replace(state: &mut State, body: &str, statement: &str) -> Result<RowSet> {
    let ddl = format!("{statement};");

    if let Some(caps) = re(r#"(?is)^TABLE\s+("[^"]+"|\w+)\s*\((.*)\)$"#).captures(body) {
        let name = unquote(group(&caps, 1));
        let columns = split_columns(group(&caps, 2));
        state.tables.insert(
            name.to_uppercase(),
            TableData {
                columns,
                rows: Vec::new(),
            },
        );
        return Ok(created(state, ObjectKind::Table, name, ddl, Details::Plain));
    }

    if let Some(caps) = re(r"(?is)^VIEW\s+(\w+)\s+AS\s+(.*)$").captures(body) {
        let name = group(&caps, 1).to_string();
        for source in re(r"(?i)\b(?:FROM|JOIN)\s+(\w+)").captures_iter(group(&caps, 2)) {
            let source = group(&source, 1);
            if !state.exists(ObjectKind::Table, source) && !state.exists(ObjectKind::View, source) {
                return Err(not_found("Object", source));
            }
        }
        return Ok(created(state, ObjectKind::View, name, ddl, Details::Plain));
    }

    if let Some(caps) = re(r"(?is)^FILE\s+FORMAT\s+(\w+)").captures(body) {
        let name = group(&caps, 1).to_string();
        return Ok(created(state, ObjectKind::FileFormat, name, ddl, Details::Plain));
    }

    if let Some(caps) = re(r"(?is)^PROCEDURE\s+(\w+)\s*\(").captures(body) {
        let name = group(&caps, 1).to_string();
        return Ok(created(state, ObjectKind::Procedure, name, ddl, Details::Plain));
    }

    if let Some(caps) = re(r"(?is)^STREAM\s+(\w+)\s+ON\s+TABLE\s+(\w+)").captures(body) {
        let name = group(&caps, 1).to_string();
        let table = group(&caps, 2).to_string();
        if !state.exists(ObjectKind::Table, &table) {
            return Err(not_found("Table", &table));
        }
        return Ok(created(state, ObjectKind::Stream, name, ddl, Details::Stream { table }));
    }

    if let Some(caps) = re(r"(?is)^TASK\s+(\w+)\s+(.*)$").captures(body) {
        let name = group(&caps, 1).to_string();
        let clauses = group(&caps, 2);
        let body_caps = re(r"(?is)\bAS\s+(.*)$")
            .captures(clauses)
            .ok_or_else(|| Error::Session(format!("SQL compilation error: task {name} has no body")))?;
        let definition = group(&body_caps, 1).trim().to_string();
        let head = body_caps
            .get(0)
            .map_or(clauses, |body| &clauses[..body.start()]);
        let details = Details::Task {
            warehouse: re(r"(?i)\bWAREHOUSE\s*=\s*(\w+)")
                .captures(head)
                .map(|caps| group(&caps, 1).to_string()),
            schedule: re(r"(?i)\bSCHEDULE\s*=\s*'([^']*)'")
                .captures(head)
                .map(|caps| group(&caps, 1).to_string()),
            condition: re(r"(?is)\bWHEN\s+(.*)$")
                .captures(head)
                .map(|caps| group(&caps, 1).trim().to_string()),
            definition,
        };
        return Ok(created(state, ObjectKind::Task, name, ddl, details));
    }

    if let Some(caps) = re(r#"(?is)^STAGE\s+("[^"]+"|\w+)"#).captures(body) {
        let name = unquote(group(&caps, 1));
        state.stages.insert(name.to_uppercase(), BTreeMap::new());
        return Ok(created(state, ObjectKind::Stage, name, ddl, Details::Plain));
    }

    Err(Error::Session(format!(
        "SQL compilation error: unsupported CREATE OR REPLACE {body}"
    )))
}

fn created(
    state: &mut State,
    kind: ObjectKind,
    name: String,
    ddl: String,
    details: Details,
) -> RowSet {
    let message = format!("{} {name} successfully created.", title_case(kind));
    state.upsert(StoredObject {
        kind,
        name,
        ddl,
        details,
    });
    RowSet::scalar("status", message)
}

/// Quoted identifiers keep their text verbatim, including separators.
fn unquote(identifier: &str) -> String {
    identifier.trim_matches('"').to_string()
}

fn title_case(kind: ObjectKind) -> String {
    let lower = kind.label().replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lower,
    }
}

/// Column names of a table body, skipping out-of-line constraints.
fn split_columns(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .iter()
        .filter_map(|part| part.split_whitespace().next())
        .filter(|first| {
            !["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN"]
                .iter()
                .any(|keyword| first.eq_ignore_ascii_case(keyword))
        })
        .map(|first| first.trim_matches('"').to_string())
        .collect()
}
