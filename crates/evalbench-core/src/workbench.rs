//! Session-owned application state.
//!
//! Every mutation builds the next state, saves it through the gateway and
//! only then commits it in memory and notifies observers. A failed save
//! leaves both the persisted and the in-memory state untouched.

use crate::errors::PersistenceError;
use crate::model::{AppState, Dataset, ExperimentResult, Grader, TestCase};
use crate::reconcile;
use crate::storage::StateGateway;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("test case not found: {test_case_id} (dataset {dataset_id})")]
    TestCaseNotFound {
        dataset_id: String,
        test_case_id: String,
    },
    #[error("grader not found: {0}")]
    GraderNotFound(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

type Observer = Arc<dyn Fn(&AppState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Default)]
pub struct TestCasePatch {
    pub input: Option<String>,
    pub expected_output: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GraderPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rubric: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewGrader {
    pub name: String,
    pub description: String,
    pub rubric: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Newly added datasets.
    pub datasets: usize,
    pub test_cases: usize,
    /// Newly added graders.
    pub graders: usize,
    /// Datasets or graders that replaced an entry with the same id.
    pub replaced: usize,
}

pub struct Workbench {
    gateway: Arc<dyn StateGateway>,
    state: Mutex<AppState>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl Workbench {
    /// Loads the persisted state. A failing load degrades to an empty state
    /// so the session can still start.
    pub fn open(gateway: Arc<dyn StateGateway>) -> Self {
        let state = match gateway.load() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(event = "state_load_failed", error = %e);
                AppState::default()
            }
        };
        Self::with_state(gateway, state)
    }

    pub fn with_state(gateway: Arc<dyn StateGateway>, state: AppState) -> Self {
        Self {
            gateway,
            state: Mutex::new(state),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> AppState {
        self.state.lock().unwrap().clone()
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.state.lock().unwrap().datasets.clone()
    }

    pub fn graders(&self) -> Vec<Grader> {
        self.state.lock().unwrap().graders.clone()
    }

    pub fn results(&self) -> Vec<ExperimentResult> {
        self.state.lock().unwrap().results.clone()
    }

    pub fn dataset(&self, id: &str) -> Option<Dataset> {
        self.state.lock().unwrap().dataset(id).cloned()
    }

    pub fn grader(&self, id: &str) -> Option<Grader> {
        self.state.lock().unwrap().grader(id).cloned()
    }

    /// Resolves by id first, then by exact name.
    pub fn find_dataset(&self, id_or_name: &str) -> Option<Dataset> {
        let state = self.state.lock().unwrap();
        state
            .dataset(id_or_name)
            .or_else(|| state.datasets.iter().find(|d| d.name == id_or_name))
            .cloned()
    }

    pub fn find_grader(&self, id_or_name: &str) -> Option<Grader> {
        let state = self.state.lock().unwrap();
        state
            .grader(id_or_name)
            .or_else(|| state.graders.iter().find(|g| g.name == id_or_name))
            .cloned()
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap()
            .push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    pub fn add_dataset(&self, name: &str) -> Result<Dataset, WorkbenchError> {
        self.mutate("add_dataset", |s| {
            let dataset = Dataset {
                id: gen_id(),
                name: name.to_string(),
                test_cases: Vec::new(),
            };
            let mut next = s.clone();
            next.datasets.push(dataset.clone());
            Ok((next, dataset))
        })
    }

    pub fn rename_dataset(&self, id: &str, name: &str) -> Result<(), WorkbenchError> {
        self.mutate("rename_dataset", |s| {
            let mut next = s.clone();
            let d = next
                .datasets
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| WorkbenchError::DatasetNotFound(id.to_string()))?;
            d.name = name.to_string();
            Ok((next, ()))
        })
    }

    /// Removes the dataset, its test cases and every result keyed by them.
    pub fn delete_dataset(&self, id: &str) -> Result<(), WorkbenchError> {
        self.mutate("delete_dataset", |s| {
            let dataset = s
                .dataset(id)
                .ok_or_else(|| WorkbenchError::DatasetNotFound(id.to_string()))?;
            let mut next = s.clone();
            next.results = reconcile::remove_where(&s.results, |r| {
                dataset.test_case(&r.test_case_id).is_some()
            });
            next.datasets.retain(|d| d.id != id);
            Ok((next, ()))
        })
    }

    pub fn add_test_case(
        &self,
        dataset_id: &str,
        input: &str,
        expected_output: &str,
    ) -> Result<TestCase, WorkbenchError> {
        self.mutate("add_test_case", |s| {
            let mut next = s.clone();
            let d = next
                .datasets
                .iter_mut()
                .find(|d| d.id == dataset_id)
                .ok_or_else(|| WorkbenchError::DatasetNotFound(dataset_id.to_string()))?;
            let tc = TestCase {
                id: gen_id(),
                input: input.to_string(),
                expected_output: expected_output.to_string(),
            };
            d.test_cases.push(tc.clone());
            Ok((next, tc))
        })
    }

    /// Applies the patch. Changing the input or expected output drops the
    /// results graded against the old text.
    pub fn update_test_case(
        &self,
        dataset_id: &str,
        test_case_id: &str,
        patch: TestCasePatch,
    ) -> Result<TestCase, WorkbenchError> {
        self.mutate("update_test_case", |s| {
            let mut next = s.clone();
            let tc = next
                .datasets
                .iter_mut()
                .find(|d| d.id == dataset_id)
                .ok_or_else(|| WorkbenchError::DatasetNotFound(dataset_id.to_string()))?
                .test_cases
                .iter_mut()
                .find(|tc| tc.id == test_case_id)
                .ok_or_else(|| WorkbenchError::TestCaseNotFound {
                    dataset_id: dataset_id.to_string(),
                    test_case_id: test_case_id.to_string(),
                })?;

            let before = tc.clone();
            if let Some(input) = patch.input {
                tc.input = input;
            }
            if let Some(expected) = patch.expected_output {
                tc.expected_output = expected;
            }
            let updated = tc.clone();

            if updated != before {
                next.results =
                    reconcile::remove_where(&next.results, |r| r.test_case_id == test_case_id);
            }
            Ok((next, updated))
        })
    }

    pub fn delete_test_case(
        &self,
        dataset_id: &str,
        test_case_id: &str,
    ) -> Result<(), WorkbenchError> {
        self.mutate("delete_test_case", |s| {
            let mut next = s.clone();
            let d = next
                .datasets
                .iter_mut()
                .find(|d| d.id == dataset_id)
                .ok_or_else(|| WorkbenchError::DatasetNotFound(dataset_id.to_string()))?;
            let before = d.test_cases.len();
            d.test_cases.retain(|tc| tc.id != test_case_id);
            if d.test_cases.len() == before {
                return Err(WorkbenchError::TestCaseNotFound {
                    dataset_id: dataset_id.to_string(),
                    test_case_id: test_case_id.to_string(),
                });
            }
            next.results = reconcile::remove_where(&next.results, |r| r.test_case_id == test_case_id);
            Ok((next, ()))
        })
    }

    pub fn add_grader(&self, grader: NewGrader) -> Result<Grader, WorkbenchError> {
        self.mutate("add_grader", |s| {
            let g = Grader {
                id: gen_id(),
                name: grader.name,
                description: grader.description,
                rubric: grader.rubric,
            };
            let mut next = s.clone();
            next.graders.push(g.clone());
            Ok((next, g))
        })
    }

    pub fn update_grader(&self, id: &str, patch: GraderPatch) -> Result<Grader, WorkbenchError> {
        self.mutate("update_grader", |s| {
            let mut next = s.clone();
            let g = next
                .graders
                .iter_mut()
                .find(|g| g.id == id)
                .ok_or_else(|| WorkbenchError::GraderNotFound(id.to_string()))?;
            if let Some(name) = patch.name {
                g.name = name;
            }
            if let Some(description) = patch.description {
                g.description = description;
            }
            if let Some(rubric) = patch.rubric {
                g.rubric = rubric;
            }
            let updated = g.clone();
            Ok((next, updated))
        })
    }

    pub fn delete_grader(&self, id: &str) -> Result<(), WorkbenchError> {
        self.mutate("delete_grader", |s| {
            if s.grader(id).is_none() {
                return Err(WorkbenchError::GraderNotFound(id.to_string()));
            }
            let mut next = s.clone();
            next.graders.retain(|g| g.id != id);
            next.results = reconcile::remove_where(&next.results, |r| r.grader_id == id);
            Ok((next, ()))
        })
    }

    /// Reconciles a run's results into the stored set; returns the number of
    /// results written.
    pub fn merge_results(&self, batch: &[ExperimentResult]) -> Result<usize, WorkbenchError> {
        self.mutate("merge_results", |s| {
            let mut next = s.clone();
            next.results = reconcile::merge(&s.results, batch);
            Ok((next, batch.len()))
        })
    }

    /// Replaces datasets, graders and results wholesale.
    pub fn replace_state(&self, state: AppState) -> Result<(), WorkbenchError> {
        self.mutate("replace_state", |_| Ok((state, ())))
    }

    /// Imports datasets and graders in one save. Entries whose id already
    /// exists replace the stored one; results for test cases that changed or
    /// disappeared are dropped, results for replaced graders are kept.
    pub fn import(
        &self,
        datasets: Vec<Dataset>,
        graders: Vec<Grader>,
    ) -> Result<ImportSummary, WorkbenchError> {
        self.mutate("import", |s| {
            let mut next = s.clone();
            let mut summary = ImportSummary::default();

            for d in datasets {
                summary.test_cases += d.test_cases.len();
                match next.datasets.iter_mut().find(|x| x.id == d.id) {
                    Some(slot) => {
                        let stale: Vec<String> = slot
                            .test_cases
                            .iter()
                            .filter(|old| d.test_case(&old.id) != Some(old))
                            .map(|old| old.id.clone())
                            .collect();
                        next.results = reconcile::remove_where(&next.results, |r| {
                            stale.contains(&r.test_case_id)
                        });
                        *slot = d;
                        summary.replaced += 1;
                    }
                    None => {
                        next.datasets.push(d);
                        summary.datasets += 1;
                    }
                }
            }
            for g in graders {
                match next.graders.iter_mut().find(|x| x.id == g.id) {
                    Some(slot) => {
                        *slot = g;
                        summary.replaced += 1;
                    }
                    None => {
                        next.graders.push(g);
                        summary.graders += 1;
                    }
                }
            }
            Ok((next, summary))
        })
    }

    fn mutate<T, F>(&self, op: &'static str, f: F) -> Result<T, WorkbenchError>
    where
        F: FnOnce(&AppState) -> Result<(AppState, T), WorkbenchError>,
    {
        let mut guard = self.state.lock().unwrap();
        let (next, out) = f(&*guard)?;
        if let Err(e) = self.gateway.save(&next) {
            tracing::error!(event = "state_save_failed", op = op, error = %e);
            return Err(e.into());
        }
        *guard = next.clone();
        drop(guard);

        tracing::debug!(event = "state_committed", op = op);
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for o in observers {
            o(&next);
        }
        Ok(out)
    }
}

/// Short random id: 9 lowercase base-36 characters.
pub fn gen_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
