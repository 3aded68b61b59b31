//! End-to-end tests for the DEFAULTS/CREATE/LOAD command flow, driven
//! through the public surface with an in-memory warehouse client.

use chrono::{NaiveDate, NaiveDateTime};
use dwuse::{
    DbColumnMetaData, DbError, DbResult, DbRow, DwClient, NativeType, Session, VariableStore,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::future::Future;

/// One cell of a scripted result row.
#[derive(Debug, Clone)]
enum Value {
    Null,
    Num(f64),
    Text(String),
    Stamp(NaiveDateTime),
}

struct MockRow<'a>(&'a [Value]);

impl DbRow for MockRow<'_> {
    fn is_null(&self, pos: usize) -> bool {
        matches!(self.0.get(pos - 1), Some(Value::Null) | None)
    }

    fn get_f64(&self, pos: usize) -> DbResult<f64> {
        match self.0.get(pos - 1) {
            Some(Value::Num(n)) => Ok(*n),
            other => Err(DbError::type_conversion(format!(
                "not a number at {}: {:?}",
                pos, other
            ))),
        }
    }

    fn get_string(&self, pos: usize) -> DbResult<String> {
        match self.0.get(pos - 1) {
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(Value::Num(n)) => Ok(n.to_string()),
            Some(Value::Null) | None => Ok(String::new()),
            other => Err(DbError::type_conversion(format!(
                "not a string at {}: {:?}",
                pos, other
            ))),
        }
    }

    fn get_datetime(&self, pos: usize) -> DbResult<NaiveDateTime> {
        match self.0.get(pos - 1) {
            Some(Value::Stamp(dt)) => Ok(*dt),
            other => Err(DbError::type_conversion(format!(
                "not a date at {}: {:?}",
                pos, other
            ))),
        }
    }
}

/// Scripted warehouse content for one connection.
#[derive(Debug, Clone, Default)]
struct Fixture {
    columns: Vec<DbColumnMetaData>,
    variable_labels: Vec<(String, String)>,
    /// Value labels per upper-cased column name.
    value_labels: HashMap<String, Vec<(String, String)>>,
    rows: Vec<Vec<Value>>,
    refuse_connect: bool,
}

thread_local! {
    static NEXT_FIXTURE: RefCell<Option<Fixture>> = const { RefCell::new(None) };
}

fn install(fixture: Fixture) {
    NEXT_FIXTURE.with(|slot| *slot.borrow_mut() = Some(fixture));
}

/// In-memory client: `connect` picks up the thread's installed fixture.
struct MockDb {
    fixture: Fixture,
}

impl DwClient for MockDb {
    fn connect(
        _username: &str,
        _password: &str,
        _database: &str,
    ) -> impl Future<Output = DbResult<Self>> + Send {
        let fixture = NEXT_FIXTURE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default();
        async move {
            if fixture.refuse_connect {
                return Err(DbError::ConnectionRefused {
                    message: "no listener".to_string(),
                });
            }
            Ok(MockDb { fixture })
        }
    }

    async fn describe(&mut self, _sql: &str) -> DbResult<Vec<DbColumnMetaData>> {
        Ok(self.fixture.columns.clone())
    }

    async fn select<F>(&mut self, sql: &str, params: &[String], mut on_row: F) -> DbResult<()>
    where
        F: FnMut(&dyn DbRow) -> DbResult<()> + Send,
    {
        if sql.contains("DW_VARIABLE_LABELS") {
            for (key, label) in &self.fixture.variable_labels {
                let row = [Value::Text(key.clone()), Value::Text(label.clone())];
                on_row(&MockRow(&row))?;
            }
        } else if sql.contains("DW_VALUE_LABELS") {
            let column = &params[1];
            if let Some(labels) = self.fixture.value_labels.get(column) {
                for (key, label) in labels {
                    let row = [Value::Text(key.clone()), Value::Text(label.clone())];
                    on_row(&MockRow(&row))?;
                }
            }
        } else if sql.starts_with("select count(1) from (") {
            let row = [Value::Num(self.fixture.rows.len() as f64)];
            on_row(&MockRow(&row))?;
        } else {
            for row in &self.fixture.rows {
                on_row(&MockRow(row))?;
            }
        }
        Ok(())
    }
}

/// Captures stored cells for assertions.
#[derive(Debug, Default)]
struct MemoryStore {
    numbers: Vec<(usize, usize, f64)>,
    strings: Vec<(usize, usize, String)>,
}

impl VariableStore for MemoryStore {
    fn store_number(&mut self, var: usize, obs: usize, value: f64) {
        self.numbers.push((var, obs, value));
    }

    fn store_string(&mut self, var: usize, obs: usize, value: &str) {
        self.strings.push((var, obs, value.to_string()));
    }
}

fn people_fixture() -> Fixture {
    Fixture {
        columns: vec![
            DbColumnMetaData::new("ID", NativeType::Number).with_precision(9, 0),
            DbColumnMetaData::new("NAME", NativeType::Varchar2).with_size(20),
            DbColumnMetaData::new("BIRTH", NativeType::Date),
        ],
        variable_labels: vec![("ID".to_string(), "Person identifier".to_string())],
        value_labels: HashMap::new(),
        rows: vec![
            vec![
                Value::Num(1.0),
                Value::Text("Alice".to_string()),
                Value::Stamp(date(1960, 1, 2)),
            ],
            vec![
                Value::Null,
                Value::Text("Bob".to_string()),
                Value::Stamp(date(1960, 1, 1)),
            ],
        ],
        refuse_connect: false,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn tokens(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn test_session(dir: &tempfile::TempDir) -> Session<MockDb> {
    Session::with_log_path(dir.path().join("dwcommands.do"))
}

const CREDENTIALS: [&str; 6] = ["username", "u", "password", "p", "database", "db"];

fn create_args(extra: &[&str]) -> Vec<String> {
    let mut words = vec!["CREATE"];
    words.extend_from_slice(extra);
    words.extend_from_slice(&CREDENTIALS);
    tokens(&words)
}

#[tokio::test]
async fn create_writes_the_plan_and_installs_the_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    install(people_fixture());
    let display = session
        .dispatch(
            &create_args(&["using", "people", "limit", "10", "label_variable", "id"]),
            &mut store,
        )
        .await;

    assert!(display.iter().any(|l| l.starts_with("Options: ")));
    assert!(display.iter().any(|l| l.contains("Saved commands")));

    let plan = fs::read_to_string(dir.path().join("dwcommands.do")).unwrap();
    assert!(plan.contains("set obs 2"));
    assert!(plan.contains("qui gen long ID = ."));
    assert!(plan.contains("format ID %12.0g"));
    assert!(plan.contains("qui gen str20 NAME = \"\""));
    assert!(plan.contains("format NAME %20s"));
    assert!(plan.contains("qui gen double BIRTH = ."));
    assert!(plan.contains("format BIRTH %td"));
    assert!(plan.contains("label variable ID \"Person identifier\" "));
    // NAME has no label row, so no directive for it
    assert!(!plan.contains("label variable NAME"));

    let query = session.query().expect("query installed");
    assert_eq!(
        query.query_sql(),
        "select ID, NAME, BIRTH from people where rownum <= 10"
    );
}

#[tokio::test]
async fn filters_combine_with_the_row_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    install(people_fixture());
    session
        .dispatch(
            &create_args(&["if a==1|b==2", "using", "people", "nulldata"]),
            &mut store,
        )
        .await;

    let query = session.query().expect("query installed");
    assert_eq!(
        query.query_sql(),
        "select ID, NAME, BIRTH from people where (a=1 or b=2) and rownum = 0"
    );
}

#[tokio::test]
async fn load_streams_rows_into_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    install(people_fixture());
    session
        .dispatch(&create_args(&["using", "people", "limit", "10"]), &mut store)
        .await;
    let display = session.dispatch(&tokens(&["LOAD"]), &mut store).await;
    assert!(display.is_empty());

    // ID: row 1 only, row 2 is NULL and stays missing
    // BIRTH: day offsets from 1960-01-01
    assert_eq!(
        store.numbers,
        vec![(1, 1, 1.0), (3, 1, 1.0), (3, 2, 0.0)]
    );
    assert_eq!(
        store.strings,
        vec![
            (2, 1, "Alice".to_string()),
            (2, 2, "Bob".to_string()),
        ]
    );
}

#[tokio::test]
async fn load_before_create_instructs_the_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    let display = session.dispatch(&tokens(&["LOAD"]), &mut store).await;
    assert_eq!(display, vec!["First you have to CREATE a dataset. "]);
}

#[tokio::test]
async fn failed_create_keeps_the_previous_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    install(people_fixture());
    session
        .dispatch(&create_args(&["using", "people", "limit", "5"]), &mut store)
        .await;
    assert!(session.query().is_some());

    // second CREATE names a label target that does not exist
    install(people_fixture());
    let display = session
        .dispatch(
            &create_args(&["using", "people", "label_variable", "missing_col"]),
            &mut store,
        )
        .await;
    assert!(display
        .iter()
        .any(|l| l.contains("Error: Cannot label 'MISSING_COL'")));

    // the first query survives untouched
    let query = session.query().expect("previous query kept");
    assert!(query.query_sql().ends_with("rownum <= 5"));
}

#[tokio::test]
async fn value_labels_turn_the_column_into_commented_directives() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    let mut fixture = Fixture {
        columns: vec![DbColumnMetaData::new("KOD", NativeType::Number).with_precision(2, 0)],
        rows: vec![vec![Value::Text("1".to_string())]],
        ..Default::default()
    };
    fixture.value_labels.insert(
        "KOD".to_string(),
        vec![("1".to_string(), "One".to_string())],
    );
    install(fixture);

    session
        .dispatch(
            &create_args(&["using", "codes", "limit", "10", "label_values", "kod"]),
            &mut store,
        )
        .await;

    let plan = fs::read_to_string(dir.path().join("dwcommands.do")).unwrap();
    // value translation renders the column as text, so the variable is a
    // string and the label directives are kept as comments
    assert!(plan.contains("qui gen str100 KOD = \"\""));
    assert!(plan.contains("format KOD %100s"));
    assert!(plan.contains("* label define KOD_label 1 \"One\" "));
    assert!(plan.contains("* label values KOD KOD_label"));

    // LOAD stores the translated text
    let display = session.dispatch(&tokens(&["LOAD"]), &mut store).await;
    assert!(display.is_empty());
    assert_eq!(store.strings, vec![(1, 1, "One".to_string())]);
}

#[tokio::test]
async fn defaults_supply_credentials_and_casing() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    let defaults = tokens(&[
        "DEFAULTS", "username", "u", "password", "p", "database", "db", "lowercase",
    ]);
    assert!(session.dispatch(&defaults, &mut store).await.is_empty());

    install(people_fixture());
    let display = session
        .dispatch(&tokens(&["CREATE", "using", "people", "limit", "1"]), &mut store)
        .await;
    assert!(!display.iter().any(|l| l.starts_with("Error")), "{display:?}");

    let plan = fs::read_to_string(dir.path().join("dwcommands.do")).unwrap();
    // lowercase casing came from the defaults
    assert!(plan.contains("qui gen long id = ."));
    assert!(plan.contains("qui gen str20 name = \"\""));
}

#[tokio::test]
async fn missing_credentials_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    let display = session
        .dispatch(&tokens(&["CREATE", "using", "people"]), &mut store)
        .await;
    assert!(display
        .iter()
        .any(|l| l.contains("Error: Database credentials are missing!")));

    // the parsed options are echoed before the failing check runs
    let echo = display
        .iter()
        .position(|l| l == "Options: ")
        .expect("options echo on the error path");
    assert!(display.iter().any(|l| l.contains("using: people")));
    let error = display
        .iter()
        .position(|l| l.starts_with("Error: "))
        .unwrap();
    assert!(echo < error);
}

#[tokio::test]
async fn connection_failures_are_reported_with_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    install(Fixture {
        refuse_connect: true,
        ..Default::default()
    });
    let display = session
        .dispatch(&create_args(&["using", "people"]), &mut store)
        .await;
    assert!(display
        .iter()
        .any(|l| l.starts_with("Error: Error connecting to the database with u@db")));
}

#[tokio::test]
async fn unknown_modes_and_empty_commands_print_help() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = test_session(&dir);
    let mut store = MemoryStore::default();

    let display = session.dispatch(&tokens(&["FROBNICATE"]), &mut store).await;
    assert_eq!(
        display,
        vec!["Unknown mode FROBNICATE. Use DEFAULTS, CREATE or LOAD!"]
    );

    let usage = session.dispatch(&[], &mut store).await;
    assert!(usage.iter().any(|l| l.contains("DEFAULTS")));
    assert!(usage.iter().any(|l| l.contains("LOAD")));
}
