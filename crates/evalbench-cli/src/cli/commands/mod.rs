use super::args::*;
use anyhow::Context;
use evalbench_core::api;
use evalbench_core::config::{seed, EvalbenchConfig};
use evalbench_core::engine::Runner;
use evalbench_core::model::{Dataset, Grader};
use evalbench_core::storage::{StateGateway, Store, Unconfigured};
use evalbench_core::workbench::Workbench;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub mod dataset;
pub mod grader;
pub mod serve;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub const DEFAULT_DB: &str = ".evalbench/evalbench.db";

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let cfg = resolve_config(&cli.global);
    match cli.cmd {
        Command::Grade(args) => cmd_grade(&cfg, args).await,
        Command::Generate(args) => cmd_generate(&cfg, args).await,
        Command::Run(args) => cmd_run(&cfg, args).await,
        Command::Export(args) => cmd_export(&cfg, args),
        Command::Import(args) => cmd_import(&cfg, args),
        Command::Dataset(args) => dataset::run(&open_workbench(&cfg)?, args.cmd),
        Command::Grader(args) => grader::run(&open_workbench(&cfg)?, args.cmd),
        Command::Serve => serve::run(&cfg).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Environment first, then flags. Without `--no-db` a database is always
/// configured, falling back to [`DEFAULT_DB`].
pub fn resolve_config(args: &GlobalArgs) -> EvalbenchConfig {
    let mut cfg = EvalbenchConfig::from_env();
    let set = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

    if let Some(key) = set(&args.api_key) {
        cfg.api_key = Some(key.trim().to_string());
    }
    if let Some(model) = set(&args.model) {
        cfg.model = model;
    }
    if let Some(url) = set(&args.base_url) {
        cfg.base_url = url;
    }
    if let Some(secs) = args.timeout_secs.filter(|s| *s > 0) {
        cfg.timeout_secs = secs;
    }
    if let Some(reply) = &args.fake_reply {
        cfg.fake_reply = Some(reply.clone());
    }
    if let Some(db) = &args.db {
        cfg.db_path = Some(db.clone());
    }
    if args.no_db {
        cfg.db_path = None;
    } else if cfg.db_path.is_none() {
        cfg.db_path = Some(PathBuf::from(DEFAULT_DB));
    }
    cfg
}

pub fn open_gateway(cfg: &EvalbenchConfig) -> anyhow::Result<Arc<dyn StateGateway>> {
    match &cfg.db_path {
        Some(path) => {
            let store = Store::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(Unconfigured)),
    }
}

pub fn open_workbench(cfg: &EvalbenchConfig) -> anyhow::Result<Workbench> {
    Ok(Workbench::open(open_gateway(cfg)?))
}

async fn cmd_grade(cfg: &EvalbenchConfig, args: GradeArgs) -> anyhow::Result<i32> {
    let body = match &args.request {
        Some(path) => {
            let raw = read_input(path).await?;
            serde_json::from_str(&raw).context("invalid grade request JSON")?
        }
        None => serde_json::json!({
            "input": args.input,
            "expected_output": args.expected,
            "rubric": args.rubric,
            "graderName": args.grader_name,
            "actual_output": args.actual,
        }),
    };

    let policy = cfg.build_policy();
    let resp = api::grade(&policy, &body).await;
    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    Ok(if resp.is_success() {
        exit_codes::OK
    } else {
        exit_codes::TEST_FAILED
    })
}

async fn cmd_generate(cfg: &EvalbenchConfig, args: GenerateArgs) -> anyhow::Result<i32> {
    let policy = cfg.build_policy();
    let resp = api::generate(&policy, &serde_json::json!({ "input": args.input })).await;
    match resp.status {
        200 => {
            println!("{}", resp.body["output"].as_str().unwrap_or_default());
            Ok(exit_codes::OK)
        }
        503 => {
            eprintln!("config error: {}", error_text(&resp));
            Ok(exit_codes::CONFIG_ERROR)
        }
        _ => {
            eprintln!("error: {}", error_text(&resp));
            Ok(exit_codes::TEST_FAILED)
        }
    }
}

async fn cmd_run(cfg: &EvalbenchConfig, args: RunArgs) -> anyhow::Result<i32> {
    let wb = open_workbench(cfg)?;
    let dataset = resolve_dataset(&wb, &args.dataset)?;
    let grader_ids: Vec<String> = if args.graders.is_empty() {
        wb.graders().into_iter().map(|g| g.id).collect()
    } else {
        // unknown names are passed through as ids; the runner skips them
        args.graders
            .iter()
            .map(|k| wb.find_grader(k).map(|g| g.id).unwrap_or_else(|| k.clone()))
            .collect()
    };
    if grader_ids.is_empty() {
        anyhow::bail!("no graders to run; add one with `evalbench grader add`");
    }

    let runner = Runner::new(cfg.build_policy());
    let report = runner.run(&wb, &dataset.id, &grader_ids).await?;

    let graders = wb.graders();
    evalbench_core::report::console::print_summary(&report, &dataset, &graders);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(decide_exit_code(
        report.failures(),
        report.failed_pairs.len(),
        args.strict,
    ))
}

fn decide_exit_code(failures: usize, failed_pairs: usize, strict: bool) -> i32 {
    if strict && (failures > 0 || failed_pairs > 0) {
        return exit_codes::TEST_FAILED;
    }
    exit_codes::OK
}

fn cmd_export(cfg: &EvalbenchConfig, args: ExportArgs) -> anyhow::Result<i32> {
    let wb = open_workbench(cfg)?;
    let dataset = resolve_dataset(&wb, &args.dataset)?;
    let graders = resolve_graders(&wb, &args.graders)?;

    let csv = evalbench_core::report::csv::export_csv(&dataset, &graders, &wb.results());
    match &args.out {
        Some(path) => {
            ensure_parent_dir(path)?;
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{csv}"),
    }
    Ok(exit_codes::OK)
}

fn cmd_import(cfg: &EvalbenchConfig, args: ImportArgs) -> anyhow::Result<i32> {
    let seed = match seed::load_seed(&args.file, args.strict) {
        Ok(seed) => seed,
        Err(e) => {
            eprintln!("{e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let wb = open_workbench(cfg)?;
    let (datasets, graders) = seed.into_parts();
    let summary = wb.import(datasets, graders)?;
    eprintln!(
        "imported: datasets={} test_cases={} graders={} replaced={}",
        summary.datasets, summary.test_cases, summary.graders, summary.replaced
    );
    Ok(exit_codes::OK)
}

pub fn resolve_dataset(wb: &Workbench, key: &str) -> anyhow::Result<Dataset> {
    wb.find_dataset(key)
        .ok_or_else(|| anyhow::anyhow!("unknown dataset: {key}"))
}

pub fn resolve_grader(wb: &Workbench, key: &str) -> anyhow::Result<Grader> {
    wb.find_grader(key)
        .ok_or_else(|| anyhow::anyhow!("unknown grader: {key}"))
}

fn resolve_graders(wb: &Workbench, keys: &[String]) -> anyhow::Result<Vec<Grader>> {
    if keys.is_empty() {
        return Ok(wb.graders());
    }
    keys.iter().map(|k| resolve_grader(wb, k)).collect()
}

fn error_text(resp: &api::ApiResponse) -> String {
    resp.body["error"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| resp.body.to_string())
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
