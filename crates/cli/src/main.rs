// shopmerge - merge TEMU/Amazon seller exports into consolidated workbooks

mod exit_codes;
mod summary;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shopmerge_config::{CountryMapping, Settings};
use shopmerge_merge::{
    descriptors, rename_bill_details, run, CategoryId, MergeContext, MergeError, TaskId,
};

use exit_codes::{
    merge_exit_code, EXIT_ERROR, EXIT_MAPPING, EXIT_PARTIAL, EXIT_SETTINGS, EXIT_SUCCESS,
    EXIT_USAGE,
};

/// Directory under the working directory that holds every task's output.
const RESULTS_DIR: &str = "处理结果";

#[derive(Parser)]
#[command(name = "shopmerge")]
#[command(about = "Merge TEMU and Amazon seller exports into consolidated workbooks")]
#[command(version)]
struct Cli {
    /// Log debug details
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the selected categories found under a source directory
    #[command(after_help = "\
Examples:
  shopmerge merge --source ./数据源
  shopmerge merge --source ./数据源 --category order --category bill
  shopmerge merge --source ./数据源 --all --mapping country.json --json")]
    Merge {
        /// Source directory (one folder per store)
        #[arg(long, short = 's')]
        source: PathBuf,

        /// Output directory [default: 处理结果/<date>/TASK_<task id>]
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Task id embedded in every output name [default: local timestamp]
        #[arg(long)]
        task_id: Option<String>,

        /// Category to merge, repeatable [default: all]
        #[arg(long = "category", short = 'c', value_name = "ID")]
        categories: Vec<CategoryId>,

        /// Merge every category
        #[arg(long, conflicts_with = "categories")]
        all: bool,

        /// Amazon country/column mapping (JSON)
        #[arg(long, env = "SHOPMERGE_MAPPING")]
        mapping: Option<PathBuf>,

        /// Settings file [default: <config dir>/shopmerge/settings.json]
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Rename 对账中心-明细 files to 账务中心-明细 before merging
        #[arg(long)]
        rename_details: bool,
    },

    /// Rename 对账中心-明细 files to 账务中心-明细 under a directory
    RenameDetails {
        /// Directory to scan recursively
        dir: PathBuf,
    },

    /// List the known categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn merge(err: MergeError) -> Self {
        let hint = match &err {
            MergeError::SourceRootMissing(_) => {
                Some("pass the folder that holds one sub-folder per store".to_string())
            }
            MergeError::MappingRequired => {
                Some("pass --mapping <country.json> or set amazon.mappingPath in settings".to_string())
            }
            _ => None,
        };
        Self { code: merge_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Merge {
            source,
            output,
            task_id,
            categories,
            all,
            mapping,
            settings,
            json,
            rename_details,
        } => cmd_merge(source, output, task_id, categories, all, mapping, settings, json, rename_details),
        Commands::RenameDetails { dir } => cmd_rename_details(&dir),
        Commands::Categories { json } => cmd_categories(json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

// ============================================================================
// merge
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_merge(
    source: PathBuf,
    output: Option<PathBuf>,
    task_id: Option<String>,
    categories: Vec<CategoryId>,
    all: bool,
    mapping: Option<PathBuf>,
    settings: Option<PathBuf>,
    json: bool,
    rename_details: bool,
) -> Result<(), CliError> {
    let settings = load_settings(settings.as_deref())?;

    let mapping_path = mapping.or_else(|| settings.mapping_path.clone());
    let selected = select_categories(categories, all, mapping_path.is_some());
    let wants_amazon = selected.contains(&CategoryId::AmazonSettlement);

    let mapping = match mapping_path {
        Some(path) => match CountryMapping::load(&path) {
            Ok(mapping) => Some(mapping),
            Err(e) if wants_amazon => {
                return Err(CliError::new(EXIT_MAPPING, e.to_string())
                    .with_hint("the mapping is a JSON object: {country: {canonical column: source column}}"));
            }
            Err(e) => {
                log::warn!("ignoring country mapping: {}", e);
                None
            }
        },
        None => None,
    };

    let task_id = match task_id {
        Some(id) if id.trim().is_empty() => return Err(CliError::args("--task-id must not be empty")),
        Some(id) => TaskId::new(id),
        None => TaskId::generate(),
    };
    let output = output.unwrap_or_else(|| default_output_dir(&task_id));

    if rename_details {
        let renamed = rename_bill_details(&source).map_err(CliError::merge)?;
        log::info!("renamed {} bill detail files", renamed);
    }

    let mut ctx = MergeContext::new(source, output, task_id).with_settings(settings);
    if let Some(mapping) = mapping {
        ctx = ctx.with_mapping(mapping);
    }

    let report = run(&ctx, &selected).map_err(CliError::merge)?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{}", out);
    } else {
        summary::print(&report);
    }

    let failed: Vec<String> = report.failed().map(|c| c.category.to_string()).collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::new(EXIT_PARTIAL, format!("categories failed: {}", failed.join(", "))))
    }
}

/// Explicit `--category` values win. The default selection leaves out
/// Amazon settlement when no mapping is configured.
fn select_categories(explicit: Vec<CategoryId>, all: bool, has_mapping: bool) -> Vec<CategoryId> {
    if !all && !explicit.is_empty() {
        return explicit;
    }
    if has_mapping {
        return CategoryId::ALL.to_vec();
    }
    log::warn!("no country mapping configured, skipping {}", CategoryId::AmazonSettlement);
    CategoryId::ALL
        .into_iter()
        .filter(|c| *c != CategoryId::AmazonSettlement)
        .collect()
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let loaded = match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    loaded.map_err(|e| {
        CliError::new(EXIT_SETTINGS, e.to_string()).with_hint(format!(
            "fix or remove the settings file (default location: {})",
            Settings::config_path_display()
        ))
    })
}

/// `处理结果/{YYYYMMDD}/TASK_{task_id}` under the working directory.
fn default_output_dir(task_id: &TaskId) -> PathBuf {
    let date = chrono::Local::now().format("%Y%m%d").to_string();
    PathBuf::from(RESULTS_DIR)
        .join(date)
        .join(format!("TASK_{}", task_id))
}

// ============================================================================
// rename-details
// ============================================================================

fn cmd_rename_details(dir: &Path) -> Result<(), CliError> {
    let renamed = rename_bill_details(dir).map_err(CliError::merge)?;
    println!("{} files renamed", renamed);
    Ok(())
}

// ============================================================================
// categories
// ============================================================================

#[derive(serde::Serialize)]
struct CategoryInfo {
    id: CategoryId,
    label: String,
    keywords: Vec<&'static str>,
}

fn cmd_categories(json: bool) -> Result<(), CliError> {
    let infos: Vec<CategoryInfo> = descriptors()
        .iter()
        .map(|d| CategoryInfo {
            id: d.id,
            label: d.output_stem(None),
            keywords: d.passes.iter().map(|p| p.keyword).collect(),
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&infos)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    for info in &infos {
        println!("{:<18} {:<22} {}", info.id.id(), info.label, info.keywords.join(", "));
    }
    Ok(())
}
