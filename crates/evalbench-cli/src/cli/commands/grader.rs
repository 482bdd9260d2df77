use super::{exit_codes, resolve_grader};
use crate::cli::args::GraderSub;
use evalbench_core::workbench::{GraderPatch, NewGrader, Workbench};

pub fn run(wb: &Workbench, cmd: GraderSub) -> anyhow::Result<i32> {
    match cmd {
        GraderSub::List => {
            for g in wb.graders() {
                println!("{}\t{}\t{}", g.id, g.name, g.description);
            }
        }
        GraderSub::Add {
            name,
            description,
            rubric,
        } => {
            let g = wb.add_grader(NewGrader {
                name,
                description,
                rubric,
            })?;
            println!("{}", g.id);
        }
        GraderSub::Edit {
            grader,
            name,
            description,
            rubric,
        } => {
            let g = resolve_grader(wb, &grader)?;
            wb.update_grader(
                &g.id,
                GraderPatch {
                    name,
                    description,
                    rubric,
                },
            )?;
            eprintln!("updated grader {}", g.id);
        }
        GraderSub::Rm { grader } => {
            let g = resolve_grader(wb, &grader)?;
            wb.delete_grader(&g.id)?;
            eprintln!("removed grader {}", g.name);
        }
    }
    Ok(exit_codes::OK)
}
