//! Common test utilities and helpers
//!
//! A scripted in-process database that speaks the `Connection` / `Cursor`
//! boundary. It answers the existence checks rendered from a catalog and
//! records every statement, so provisioning can be tested for all three
//! dialects without a server.

#![allow(dead_code)]

use sqlhelpers::audit::{Bindings, Operation, TemplateCatalog, TemplateRole};
use sqlhelpers::db::provider::{Connection, ConnectionProvider, Cursor};
use sqlhelpers::db::types::{CellValue, ColumnDef, DataType, Dialect, Row};
use sqlhelpers::error::{DbError, DbResult};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

enum Probe {
    AuditTable,
    Function(String),
    Triggers(String),
    Columns,
}

/// Objects the fake database holds and everything sent to it
pub struct FakeDb {
    probes: Vec<(String, Probe)>,
    pub objects: BTreeSet<String>,
    pub columns: Vec<String>,
    pub executed: Vec<String>,
    pub commits: usize,
    pub connects: usize,
    pub fail_on: Option<String>,
}

impl FakeDb {
    /// Recognize the checks `catalog` renders for `tables`
    pub fn new(catalog: &TemplateCatalog, schema_name: &str, tables: &[&str]) -> Self {
        let schema = Bindings::new().schema_name(schema_name);
        let render = |role, bindings: &Bindings<'_>| catalog.render(role, bindings).unwrap();

        let mut probes = vec![(
            render(TemplateRole::AuditTableExistsCheck, &schema),
            Probe::AuditTable,
        )];
        if catalog.dialect() == Dialect::Postgres {
            for op in Operation::ALL {
                let bindings = schema.clone().function_name(op.function_name());
                probes.push((
                    render(TemplateRole::FunctionExistsCheck, &bindings),
                    Probe::Function(op.function_name()),
                ));
            }
        }
        for table in tables {
            let bindings = schema.clone().table(table);
            probes.push((
                render(TemplateRole::TriggerExistsCheck, &bindings),
                Probe::Triggers(table.to_string()),
            ));
            probes.push((render(TemplateRole::ColumnNamesQuery, &bindings), Probe::Columns));
        }

        Self {
            probes,
            objects: BTreeSet::new(),
            columns: vec!["id".to_string(), "name".to_string()],
            executed: Vec::new(),
            commits: 0,
            connects: 0,
            fail_on: None,
        }
    }

    /// Statements that created something
    pub fn ddl(&self) -> Vec<&str> {
        self.executed
            .iter()
            .map(String::as_str)
            .filter(|sql| sql.trim_start().starts_with("CREATE"))
            .collect()
    }

    fn handle(&mut self, sql: &str) -> DbResult<(Option<Vec<ColumnDef>>, Vec<Row>)> {
        self.executed.push(sql.to_string());
        if self.fail_on.as_deref().is_some_and(|needle| sql.contains(needle)) {
            return Err(DbError::QueryFailed("injected failure".to_string()));
        }

        if let Some((_, probe)) = self.probes.iter().find(|(text, _)| text == sql) {
            let names: Vec<String> = match probe {
                Probe::AuditTable => self
                    .objects
                    .iter()
                    .filter(|o| *o == "audit_log")
                    .cloned()
                    .collect(),
                Probe::Function(name) => self.objects.iter().filter(|o| *o == name).cloned().collect(),
                Probe::Triggers(table) => {
                    let prefix = format!("after_{}_", table).to_lowercase();
                    self.objects
                        .iter()
                        .filter(|o| o.to_lowercase().starts_with(&prefix))
                        .cloned()
                        .collect()
                }
                Probe::Columns => self.columns.clone(),
            };
            let rows = names
                .into_iter()
                .map(|n| Row::new(vec![CellValue::Text(n)]))
                .collect();
            return Ok((Some(vec![ColumnDef::new("name", DataType::Text)]), rows));
        }

        let sql = sql.trim_start();
        let created = if sql.starts_with("CREATE TABLE") {
            Some("audit_log".to_string())
        } else if let Some(rest) = sql.strip_prefix("CREATE OR REPLACE FUNCTION ") {
            let qualified = rest.split('(').next().unwrap_or_default();
            let name = qualified.rsplit('.').next().unwrap_or_default();
            self.objects.remove(name);
            Some(name.to_string())
        } else if let Some(rest) = sql.strip_prefix("CREATE TRIGGER ") {
            rest.split_whitespace().next().map(str::to_string)
        } else {
            None
        };

        if let Some(object) = created {
            if !self.objects.insert(object.clone()) {
                return Err(DbError::QueryFailed(format!("{} already exists", object)));
            }
        }
        Ok((None, Vec::new()))
    }
}

pub type SharedDb = Rc<RefCell<FakeDb>>;

/// Provider handing out connections to one shared [`FakeDb`]
pub struct FakeProvider {
    pub dialect: Dialect,
    pub db: SharedDb,
}

impl FakeProvider {
    pub fn new(dialect: Dialect, tables: &[&str]) -> (Self, SharedDb) {
        let catalog = TemplateCatalog::for_dialect(dialect);
        Self::with_catalog(&catalog, tables)
    }

    pub fn with_catalog(catalog: &TemplateCatalog, tables: &[&str]) -> (Self, SharedDb) {
        let db = Rc::new(RefCell::new(FakeDb::new(catalog, "public", tables)));
        let provider = Self {
            dialect: catalog.dialect(),
            db: Rc::clone(&db),
        };
        (provider, db)
    }
}

impl ConnectionProvider for FakeProvider {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        self.db.borrow_mut().connects += 1;
        Ok(Box::new(FakeConnection {
            db: Rc::clone(&self.db),
            open: Rc::new(RefCell::new(true)),
        }))
    }

    fn describe(&self) -> String {
        format!("fake:{}", self.dialect)
    }
}

struct FakeConnection {
    db: SharedDb,
    open: Rc<RefCell<bool>>,
}

impl Connection for FakeConnection {
    fn cursor(&mut self) -> DbResult<Box<dyn Cursor>> {
        Ok(Box::new(FakeCursor {
            db: Rc::clone(&self.db),
            open: Rc::clone(&self.open),
            columns: None,
            rows: Vec::new(),
        }))
    }

    fn commit(&mut self) -> DbResult<()> {
        self.db.borrow_mut().commits += 1;
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        *self.open.borrow_mut() = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        *self.open.borrow()
    }
}

struct FakeCursor {
    db: SharedDb,
    open: Rc<RefCell<bool>>,
    columns: Option<Vec<ColumnDef>>,
    rows: Vec<Row>,
}

impl Cursor for FakeCursor {
    fn execute(&mut self, sql: &str) -> DbResult<()> {
        if !*self.open.borrow() {
            return Err(DbError::NoConnectionInitialized);
        }
        let (columns, rows) = self.db.borrow_mut().handle(sql)?;
        self.columns = columns;
        self.rows = rows;
        Ok(())
    }

    fn fetch_all(&mut self) -> DbResult<Vec<Row>> {
        Ok(std::mem::take(&mut self.rows))
    }

    fn description(&self) -> Option<&[ColumnDef]> {
        self.columns.as_deref()
    }
}

/// A fresh SQLite file in a temporary directory
pub fn temp_db_path() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("audit.db");
    (dir, path)
}
