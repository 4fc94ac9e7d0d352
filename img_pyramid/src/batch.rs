//! Directory conversion
//!
//! Converts every image under a directory on a rayon pool. Each job gets its
//! own workspace below the template's `temp_dir`, so sources sharing a file
//! stem never collide.

use crate::agent::PyramidAgent;
use crate::params::{ConvertParams, OutputSummary};
use rayon::prelude::*;
use shared_utils::{collect_files, create_progress_bar, BatchResult, IMAGE_EXTENSIONS};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    /// Worker threads, 0 = number of CPUs
    pub jobs: usize,
    /// Skip sources whose output already exists
    pub skip_existing: bool,
    pub quiet: bool,
}

/// Outcome of one batch job
#[derive(Debug)]
pub enum JobOutcome {
    Converted(OutputSummary),
    Skipped,
    Failed(String),
}

/// Output path for `source`: its path relative to `input_dir`, under
/// `output_dir`, with a `.tif` extension.
pub fn output_path_for(input_dir: &Path, output_dir: &Path, source: &Path) -> PathBuf {
    let relative = source
        .strip_prefix(input_dir)
        .unwrap_or_else(|_| Path::new(source.file_name().unwrap_or(source.as_os_str())));
    output_dir.join(relative).with_extension("tif")
}

/// Workspace for job `index`.
pub fn job_workspace(temp_dir: &Path, index: usize) -> PathBuf {
    temp_dir.join(format!("job-{:05}", index))
}

/// Parameters for job `index` converting `source`, derived from `template`.
pub fn job_params(
    template: &ConvertParams,
    options: &BatchOptions,
    index: usize,
    source: &Path,
) -> ConvertParams {
    let mut params = template.clone();
    params.input = source.to_path_buf();
    params.output = output_path_for(&options.input_dir, &options.output_dir, source);
    params.temp_dir = job_workspace(&template.temp_dir, index);
    if let Some(dir) = &template.magick_temp_dir {
        params.magick_temp_dir = Some(job_workspace(dir, index));
    }
    params
}

/// Parameters for every source in `files`, in order. Sources differing only
/// in extension map to the same output; the first one keeps it and the rest
/// get an error instead of parameters.
pub fn plan_jobs(
    template: &ConvertParams,
    options: &BatchOptions,
    files: &[PathBuf],
) -> Vec<(PathBuf, Result<ConvertParams, String>)> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();

    files
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let params = job_params(template, options, index, source);
            let plan = match claimed.get(&params.output) {
                Some(first) => Err(format!(
                    "output {} is already produced from {}",
                    params.output.display(),
                    first.display()
                )),
                None => {
                    claimed.insert(params.output.clone(), source.as_path());
                    Ok(params)
                }
            };
            (source.clone(), plan)
        })
        .collect()
}

fn run_job(agent: &PyramidAgent<'_>, params: &ConvertParams, skip_existing: bool) -> JobOutcome {
    if skip_existing && params.output.exists() {
        info!(output = ?params.output, "Output exists, skipping");
        return JobOutcome::Skipped;
    }
    if let Some(parent) = params.output.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return JobOutcome::Failed(format!("cannot create {}: {}", parent.display(), e));
        }
    }

    match agent.convert(params) {
        Ok(summary) => JobOutcome::Converted(summary),
        Err(e) => {
            let chain = shared_utils::error_chain(&e).join(": ");
            error!(input = ?params.input, error = %chain, "Conversion failed");
            JobOutcome::Failed(chain)
        }
    }
}

/// Convert every image under `options.input_dir`.
pub fn convert_directory(
    agent: &PyramidAgent<'_>,
    template: &ConvertParams,
    options: &BatchOptions,
) -> anyhow::Result<(BatchResult, Vec<OutputSummary>)> {
    let files = collect_files(&options.input_dir, IMAGE_EXTENSIONS, options.recursive);
    if files.is_empty() {
        warn!(dir = ?options.input_dir, "No image files found");
        return Ok((BatchResult::new(), Vec::new()));
    }

    let jobs = if options.jobs == 0 {
        num_cpus::get()
    } else {
        options.jobs
    };
    info!(files = files.len(), jobs, "Starting batch conversion");

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let pb = create_progress_bar(files.len() as u64, "Pyramid", options.quiet);

    let plans = plan_jobs(template, options, &files);
    let outcomes: Vec<(PathBuf, JobOutcome)> = pool.install(|| {
        plans
            .par_iter()
            .map(|(source, plan)| {
                let outcome = match plan {
                    Ok(params) => run_job(agent, params, options.skip_existing),
                    Err(reason) => {
                        warn!(input = ?source, reason = %reason, "Duplicate output, not converting");
                        JobOutcome::Failed(reason.clone())
                    }
                };
                pb.inc(1);
                (source.clone(), outcome)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut result = BatchResult::new();
    let mut summaries = Vec::new();
    for (source, outcome) in outcomes {
        match outcome {
            JobOutcome::Converted(summary) => {
                result.success();
                summaries.push(summary);
            }
            JobOutcome::Skipped => result.skip(),
            JobOutcome::Failed(reason) => result.fail(source, reason),
        }
    }
    Ok((result, summaries))
}
