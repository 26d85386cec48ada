// Human-readable run summary on stdout

use shopmerge_merge::RunReport;

pub fn print(report: &RunReport) {
    println!("task {}  ->  {}", report.task_id, report.output_dir.display());
    for category in &report.categories {
        let status = match &category.error {
            Some(_) => "FAILED",
            None if category.outputs.is_empty() => "empty",
            None => "ok",
        };
        println!(
            "  {:<18} {:<6} files {}/{}  rows {}  skipped {}",
            category.category.id(),
            status,
            category.files_read,
            category.files_matched,
            category.rows_merged,
            category.skipped.len()
        );
        for output in &category.outputs {
            println!("      {}", output.display());
        }
        if let Some(error) = &category.error {
            println!("      {}", error);
        }
    }
    println!(
        "{} outputs in {} ms",
        report.outputs().count(),
        report.elapsed_ms
    );
}
