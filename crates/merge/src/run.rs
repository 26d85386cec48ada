use std::time::Instant;

use crate::catalog::descriptor;
use crate::context::MergeContext;
use crate::engine::merge_into;
use crate::error::MergeError;
use crate::model::{CategoryId, CategoryReport, RunReport};

/// Run the selected categories, in canonical order, against one context.
///
/// A missing source directory, or Amazon settlement without a country
/// mapping, stops the run before anything is scanned. Any other category
/// error is logged and stored in that category's report, next to the
/// outputs written before it, and the run moves on.
pub fn run(ctx: &MergeContext, selected: &[CategoryId]) -> Result<RunReport, MergeError> {
    let started = Instant::now();

    if !ctx.source_dir.is_dir() {
        return Err(MergeError::SourceRootMissing(ctx.source_dir.clone()));
    }
    if selected.contains(&CategoryId::AmazonSettlement) && ctx.mapping.is_none() {
        return Err(MergeError::MappingRequired);
    }
    std::fs::create_dir_all(&ctx.output_dir).map_err(|source| MergeError::OutputDir {
        path: ctx.output_dir.clone(),
        source,
    })?;

    log::info!(
        "task {}: {} -> {}",
        ctx.task_id,
        ctx.source_dir.display(),
        ctx.output_dir.display()
    );

    let mut categories = Vec::new();
    for category in CategoryId::ALL.into_iter().filter(|c| selected.contains(c)) {
        log::info!("processing {}", category);
        let mut report = CategoryReport::new(category);
        if let Err(err) = merge_into(ctx, descriptor(category), &mut report) {
            log::error!(
                "{} failed after {} outputs: {}",
                category,
                report.outputs.len(),
                err
            );
            report.error = Some(err.to_string());
        }
        categories.push(report);
    }

    let report = RunReport {
        task_id: ctx.task_id.to_string(),
        source_dir: ctx.source_dir.clone(),
        output_dir: ctx.output_dir.clone(),
        categories,
        elapsed_ms: started.elapsed().as_millis(),
    };
    log::info!(
        "task {} finished: {} outputs, {} failed categories, {} ms",
        report.task_id,
        report.outputs().count(),
        report.failed().count(),
        report.elapsed_ms
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskId;
    use tempfile::tempdir;

    #[test]
    fn missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let ctx = MergeContext::new(dir.path().join("missing"), dir.path().join("out"), TaskId::new("T"));
        let err = run(&ctx, &CategoryId::ALL).unwrap_err();
        assert!(matches!(err, MergeError::SourceRootMissing(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn amazon_without_mapping_is_fatal() {
        let dir = tempdir().unwrap();
        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        let err = run(&ctx, &[CategoryId::Order, CategoryId::AmazonSettlement]).unwrap_err();
        assert!(matches!(err, MergeError::MappingRequired));
    }

    #[test]
    fn categories_run_in_canonical_order() {
        let dir = tempdir().unwrap();
        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        let report = run(&ctx, &[CategoryId::KodaWarehouse, CategoryId::Order]).unwrap();
        let ran: Vec<CategoryId> = report.categories.iter().map(|c| c.category).collect();
        assert_eq!(ran, vec![CategoryId::Order, CategoryId::KodaWarehouse]);
        assert_eq!(report.outputs().count(), 0);
        assert!(dir.path().join("out").is_dir());
    }
}
