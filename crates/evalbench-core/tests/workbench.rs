use evalbench_core::errors::PersistenceError;
use evalbench_core::model::{AppState, ExperimentResult};
use evalbench_core::storage::{StateGateway, Store, Unconfigured};
use evalbench_core::workbench::{
    GraderPatch, NewGrader, TestCasePatch, Workbench, WorkbenchError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn grader(name: &str) -> NewGrader {
    NewGrader {
        name: name.into(),
        description: String::new(),
        rubric: "Be strict.".into(),
    }
}

fn verdict(tc: &str, g: &str, pass: bool) -> ExperimentResult {
    ExperimentResult {
        test_case_id: tc.into(),
        grader_id: g.into(),
        pass,
        reason: String::new(),
        generated_output: None,
    }
}

/// Store wrapper whose saves can be switched to fail.
struct Flaky {
    inner: Store,
    fail: AtomicBool,
}

impl StateGateway for Flaky {
    fn load(&self) -> Result<AppState, PersistenceError> {
        self.inner.load()
    }

    fn save(&self, state: &AppState) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Integrity("disk full".into()));
        }
        self.inner.save(state)
    }
}

#[test]
fn test_mutations_persist() -> anyhow::Result<()> {
    let store = Arc::new(Store::memory()?);
    let wb = Workbench::open(store.clone());

    let d = wb.add_dataset("Math")?;
    let t = wb.add_test_case(&d.id, "2+2?", "4")?;
    let g = wb.add_grader(grader("Strict"))?;
    wb.rename_dataset(&d.id, "Arithmetic")?;

    let reopened = Workbench::open(store);
    let ds = reopened.dataset(&d.id).expect("dataset persisted");
    assert_eq!(ds.name, "Arithmetic");
    assert_eq!(ds.test_cases, vec![t]);
    assert_eq!(reopened.grader(&g.id), Some(g));
    assert_eq!(reopened.find_dataset("Arithmetic").map(|d| d.id), Some(d.id));
    Ok(())
}

#[test]
fn test_editing_case_clears_its_results() -> anyhow::Result<()> {
    let wb = Workbench::open(Arc::new(Store::memory()?));
    let d = wb.add_dataset("Math")?;
    let t1 = wb.add_test_case(&d.id, "2+2?", "4")?;
    let t2 = wb.add_test_case(&d.id, "3+3?", "6")?;
    let g = wb.add_grader(grader("Strict"))?;
    wb.merge_results(&[verdict(&t1.id, &g.id, true), verdict(&t2.id, &g.id, true)])?;

    // no-op patch keeps results
    wb.update_test_case(&d.id, &t1.id, TestCasePatch::default())?;
    assert_eq!(wb.results().len(), 2);

    let updated = wb.update_test_case(
        &d.id,
        &t1.id,
        TestCasePatch {
            expected_output: Some("four".into()),
            ..Default::default()
        },
    )?;
    assert_eq!(updated.expected_output, "four");
    assert_eq!(wb.results(), vec![verdict(&t2.id, &g.id, true)]);
    Ok(())
}

#[test]
fn test_deletes_cascade() -> anyhow::Result<()> {
    let wb = Workbench::open(Arc::new(Store::memory()?));
    let d = wb.add_dataset("Math")?;
    let t1 = wb.add_test_case(&d.id, "2+2?", "4")?;
    let g1 = wb.add_grader(grader("Strict"))?;
    let g2 = wb.add_grader(grader("Lenient"))?;
    wb.merge_results(&[verdict(&t1.id, &g1.id, true), verdict(&t1.id, &g2.id, false)])?;

    wb.delete_grader(&g1.id)?;
    assert_eq!(wb.results(), vec![verdict(&t1.id, &g2.id, false)]);

    wb.delete_dataset(&d.id)?;
    assert!(wb.results().is_empty());
    assert!(wb.datasets().is_empty());
    assert_eq!(wb.graders().len(), 1);
    Ok(())
}

#[test]
fn test_unknown_ids_are_reported() -> anyhow::Result<()> {
    let wb = Workbench::open(Arc::new(Store::memory()?));
    assert!(matches!(
        wb.rename_dataset("nope", "x"),
        Err(WorkbenchError::DatasetNotFound(_))
    ));
    let d = wb.add_dataset("Math")?;
    assert!(matches!(
        wb.delete_test_case(&d.id, "nope"),
        Err(WorkbenchError::TestCaseNotFound { .. })
    ));
    assert!(matches!(
        wb.update_grader("nope", GraderPatch::default()),
        Err(WorkbenchError::GraderNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_failed_save_changes_nothing() -> anyhow::Result<()> {
    let gateway = Arc::new(Flaky {
        inner: Store::memory()?,
        fail: AtomicBool::new(false),
    });
    let wb = Workbench::open(gateway.clone());
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    wb.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    wb.add_dataset("Math")?;
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    let before = wb.state();

    gateway.fail.store(true, Ordering::SeqCst);
    let err = wb.add_dataset("Trivia").unwrap_err();
    assert!(matches!(err, WorkbenchError::Persistence(_)));
    assert_eq!(wb.state(), before);
    assert_eq!(gateway.inner.load()?, before);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_unsubscribe_stops_notifications() -> anyhow::Result<()> {
    let wb = Workbench::open(Arc::new(Store::memory()?));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let id = wb.subscribe(move |state| {
        counter.store(state.datasets.len(), Ordering::SeqCst);
    });

    wb.add_dataset("A")?;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(wb.unsubscribe(id));
    assert!(!wb.unsubscribe(id));
    wb.add_dataset("B")?;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_unconfigured_storage_keeps_state_in_memory_only_on_success() {
    let wb = Workbench::open(Arc::new(Unconfigured));
    assert!(wb.state().is_empty());
    let err = wb.add_dataset("Math").unwrap_err();
    assert!(matches!(
        err,
        WorkbenchError::Persistence(PersistenceError::NotConfigured)
    ));
    assert!(wb.datasets().is_empty());
}

#[test]
fn test_import_replaces_by_id() -> anyhow::Result<()> {
    let wb = Workbench::open(Arc::new(Store::memory()?));
    let seed = evalbench_core::config::seed::parse_seed(
        r#"
datasets:
  - id: ds_1
    name: Math
    cases:
      - { id: tc_1, input: "2+2?", expected_output: "4" }
      - { id: tc_2, input: "3+3?", expected_output: "6" }
graders:
  - { id: g_1, name: Strict, rubric: Exact. }
"#,
        true,
    )?;
    let (datasets, graders) = seed.clone().into_parts();
    let first = wb.import(datasets, graders)?;
    assert_eq!((first.datasets, first.test_cases, first.graders), (1, 2, 1));
    wb.merge_results(&[verdict("tc_1", "g_1", true), verdict("tc_2", "g_1", true)])?;

    let mut again = seed;
    again.datasets[0].cases[1].expected_output = "six".into();
    let (datasets, graders) = again.into_parts();
    let second = wb.import(datasets, graders)?;
    assert_eq!(second.replaced, 2);
    assert_eq!(wb.datasets().len(), 1);
    assert_eq!(wb.results(), vec![verdict("tc_1", "g_1", true)]);
    Ok(())
}
