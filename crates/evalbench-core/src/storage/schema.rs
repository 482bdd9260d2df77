pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_cases (
  id TEXT PRIMARY KEY,
  dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
  position INTEGER NOT NULL DEFAULT 0,
  input TEXT NOT NULL,
  expected_output TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS graders (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  description TEXT NOT NULL,
  rubric TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS results (
  test_case_id TEXT NOT NULL REFERENCES test_cases(id) ON DELETE CASCADE,
  grader_id TEXT NOT NULL REFERENCES graders(id) ON DELETE CASCADE,
  pass INTEGER NOT NULL,
  reason TEXT NOT NULL,
  generated_output TEXT,
  PRIMARY KEY (test_case_id, grader_id)
);

CREATE INDEX IF NOT EXISTS idx_test_cases_dataset ON test_cases(dataset_id);
CREATE INDEX IF NOT EXISTS idx_results_test_case ON results(test_case_id);
CREATE INDEX IF NOT EXISTS idx_results_grader ON results(grader_id);
"#;
