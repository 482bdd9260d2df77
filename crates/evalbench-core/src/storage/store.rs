use crate::errors::PersistenceError;
use crate::model::{AppState, Dataset, ExperimentResult, Grader, TestCase};
use crate::storage::StateGateway;
use rusqlite::{params, Connection, Transaction};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub datasets: u64,
    pub test_cases: u64,
    pub graders: u64,
    pub results: u64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<u64, rusqlite::Error> {
            conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| {
                r.get::<_, i64>(0)
            })
            .map(|n| n as u64)
        };
        Ok(StoreStats {
            datasets: count("datasets")?,
            test_cases: count("test_cases")?,
            graders: count("graders")?,
            results: count("results")?,
        })
    }

    pub fn load_state(&self) -> Result<AppState, PersistenceError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, dataset_id, input, expected_output FROM test_cases
             ORDER BY dataset_id, position, rowid",
        )?;
        let mut cases_by_dataset: HashMap<String, Vec<TestCase>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                TestCase {
                    id: row.get(0)?,
                    input: row.get(2)?,
                    expected_output: row.get(3)?,
                },
            ))
        })?;
        for r in rows {
            let (dataset_id, tc) = r?;
            cases_by_dataset.entry(dataset_id).or_default().push(tc);
        }

        let mut stmt = conn.prepare("SELECT id, name FROM datasets ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut datasets = Vec::new();
        for r in rows {
            let (id, name) = r?;
            let test_cases = cases_by_dataset.remove(&id).unwrap_or_default();
            datasets.push(Dataset {
                id,
                name,
                test_cases,
            });
        }

        let mut stmt =
            conn.prepare("SELECT id, name, description, rubric FROM graders ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Grader {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                rubric: row.get(3)?,
            })
        })?;
        let mut graders = Vec::new();
        for r in rows {
            graders.push(r?);
        }

        let mut stmt = conn.prepare(
            "SELECT test_case_id, grader_id, pass, reason, generated_output FROM results
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let generated: Option<String> = row.get(4)?;
            Ok(ExperimentResult {
                test_case_id: row.get(0)?,
                grader_id: row.get(1)?,
                pass: row.get::<_, i64>(2)? == 1,
                reason: row.get(3)?,
                generated_output: generated.filter(|s| !s.is_empty()),
            })
        })?;
        let mut results = Vec::new();
        for r in rows {
            results.push(r?);
        }

        Ok(AppState {
            datasets,
            graders,
            results,
        })
    }

    /// Saves the full state incrementally: upsert everything present, then
    /// delete whatever is no longer in the payload. One transaction; any
    /// failure rolls back and leaves the previous state intact.
    pub fn save_state(&self, state: &AppState) -> Result<(), PersistenceError> {
        check_integrity(state)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for d in &state.datasets {
            tx.execute(
                "INSERT INTO datasets(id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name=excluded.name",
                params![d.id, d.name],
            )?;
            for (pos, tc) in d.test_cases.iter().enumerate() {
                tx.execute(
                    "INSERT INTO test_cases(id, dataset_id, position, input, expected_output)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                        dataset_id=excluded.dataset_id,
                        position=excluded.position,
                        input=excluded.input,
                        expected_output=excluded.expected_output",
                    params![tc.id, d.id, pos as i64, tc.input, tc.expected_output],
                )?;
            }
        }

        for g in &state.graders {
            tx.execute(
                "INSERT INTO graders(id, name, description, rubric) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name=excluded.name,
                    description=excluded.description,
                    rubric=excluded.rubric",
                params![g.id, g.name, g.description, g.rubric],
            )?;
        }

        let keep_pairs: HashSet<(&str, &str)> = state.results.iter().map(|r| r.key()).collect();
        let stale_pairs: Vec<(String, String)> = select_pairs(&tx)?
            .into_iter()
            .filter(|(tc, g)| !keep_pairs.contains(&(tc.as_str(), g.as_str())))
            .collect();
        for (tc, g) in &stale_pairs {
            tx.execute(
                "DELETE FROM results WHERE test_case_id=?1 AND grader_id=?2",
                params![tc, g],
            )?;
        }

        for r in &state.results {
            tx.execute(
                "INSERT INTO results(test_case_id, grader_id, pass, reason, generated_output)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(test_case_id, grader_id) DO UPDATE SET
                    pass=excluded.pass,
                    reason=excluded.reason,
                    generated_output=excluded.generated_output",
                params![
                    r.test_case_id,
                    r.grader_id,
                    if r.pass { 1 } else { 0 },
                    r.reason,
                    r.generated_output
                ],
            )?;
        }

        let keep_cases: HashSet<&str> = state
            .datasets
            .iter()
            .flat_map(|d| d.test_cases.iter().map(|tc| tc.id.as_str()))
            .collect();
        delete_missing(&tx, "test_cases", &keep_cases)?;

        let keep_datasets: HashSet<&str> = state.datasets.iter().map(|d| d.id.as_str()).collect();
        delete_missing(&tx, "datasets", &keep_datasets)?;

        let keep_graders: HashSet<&str> = state.graders.iter().map(|g| g.id.as_str()).collect();
        delete_missing(&tx, "graders", &keep_graders)?;

        tx.commit()?;

        tracing::debug!(
            event = "state_saved",
            datasets = state.datasets.len(),
            graders = state.graders.len(),
            results = state.results.len(),
            stale_results = stale_pairs.len()
        );
        Ok(())
    }
}

impl StateGateway for Store {
    fn load(&self) -> Result<AppState, PersistenceError> {
        self.load_state()
    }

    fn save(&self, state: &AppState) -> Result<(), PersistenceError> {
        self.save_state(state)
    }
}

fn check_integrity(state: &AppState) -> Result<(), PersistenceError> {
    unique("dataset", state.datasets.iter().map(|d| d.id.as_str()))?;
    unique(
        "test case",
        state
            .datasets
            .iter()
            .flat_map(|d| d.test_cases.iter().map(|tc| tc.id.as_str())),
    )?;
    unique("grader", state.graders.iter().map(|g| g.id.as_str()))?;

    let mut pairs = HashSet::new();
    for r in &state.results {
        if !pairs.insert((r.test_case_id.as_str(), r.grader_id.as_str())) {
            return Err(PersistenceError::Integrity(format!(
                "duplicate result for test case '{}' and grader '{}'",
                r.test_case_id, r.grader_id
            )));
        }
    }

    let cases: HashSet<&str> = state
        .datasets
        .iter()
        .flat_map(|d| d.test_cases.iter().map(|tc| tc.id.as_str()))
        .collect();
    let graders: HashSet<&str> = state.graders.iter().map(|g| g.id.as_str()).collect();

    for r in &state.results {
        if !cases.contains(r.test_case_id.as_str()) {
            return Err(PersistenceError::Integrity(format!(
                "result references unknown test case '{}'",
                r.test_case_id
            )));
        }
        if !graders.contains(r.grader_id.as_str()) {
            return Err(PersistenceError::Integrity(format!(
                "result references unknown grader '{}'",
                r.grader_id
            )));
        }
    }
    Ok(())
}

/// Ids are primary keys: a repeat would upsert over the earlier row.
fn unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), PersistenceError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PersistenceError::Integrity(format!(
                "duplicate {kind} id '{id}'"
            )));
        }
    }
    Ok(())
}

fn select_pairs(tx: &Transaction<'_>) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = tx.prepare("SELECT test_case_id, grader_id FROM results")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let pairs = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(pairs)
}

fn delete_missing(
    tx: &Transaction<'_>,
    table: &'static str,
    keep: &HashSet<&str>,
) -> Result<(), rusqlite::Error> {
    let mut stmt = tx.prepare(&format!("SELECT id FROM {table}"))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    for id in ids.iter().filter(|id| !keep.contains(id.as_str())) {
        tx.execute(&format!("DELETE FROM {table} WHERE id=?1"), params![id])?;
    }
    Ok(())
}
