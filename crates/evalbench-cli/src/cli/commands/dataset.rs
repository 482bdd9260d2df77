use super::{exit_codes, resolve_dataset};
use crate::cli::args::DatasetSub;
use evalbench_core::workbench::{TestCasePatch, Workbench};

pub fn run(wb: &Workbench, cmd: DatasetSub) -> anyhow::Result<i32> {
    match cmd {
        DatasetSub::List => {
            for d in wb.datasets() {
                println!("{}\t{}\t{} cases", d.id, d.name, d.test_cases.len());
            }
        }
        DatasetSub::Add { name } => {
            let d = wb.add_dataset(&name)?;
            println!("{}", d.id);
        }
        DatasetSub::Rename { dataset, name } => {
            let d = resolve_dataset(wb, &dataset)?;
            wb.rename_dataset(&d.id, &name)?;
            eprintln!("renamed {} -> {}", d.name, name);
        }
        DatasetSub::Rm { dataset } => {
            let d = resolve_dataset(wb, &dataset)?;
            wb.delete_dataset(&d.id)?;
            eprintln!("removed dataset {} ({} cases)", d.name, d.test_cases.len());
        }
        DatasetSub::AddCase {
            dataset,
            input,
            expected,
        } => {
            let d = resolve_dataset(wb, &dataset)?;
            let tc = wb.add_test_case(&d.id, &input, &expected)?;
            println!("{}", tc.id);
        }
        DatasetSub::EditCase {
            dataset,
            case_id,
            input,
            expected,
        } => {
            let d = resolve_dataset(wb, &dataset)?;
            wb.update_test_case(
                &d.id,
                &case_id,
                TestCasePatch {
                    input,
                    expected_output: expected,
                },
            )?;
            eprintln!("updated case {case_id}");
        }
        DatasetSub::RmCase { dataset, case_id } => {
            let d = resolve_dataset(wb, &dataset)?;
            wb.delete_test_case(&d.id, &case_id)?;
            eprintln!("removed case {case_id}");
        }
    }
    Ok(exit_codes::OK)
}
