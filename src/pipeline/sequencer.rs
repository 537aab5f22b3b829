use std::fs;
use std::io::ErrorKind;
use std::time::Instant;

use log::{debug, info, warn};

use crate::pipeline::{
    write_summary, Execution, PipelineContext, Runner, Step, StepRecord, StepStatus,
};
use crate::runtime::{Config, Error, Result};
use crate::utils::check_step_tools;

/// The linear pipeline: every enabled step, in order, halting on the first failure
pub struct Pipeline;

impl Pipeline {
    /// Steps that will run for this configuration, in order
    pub fn plan(config: &Config) -> Vec<Step> {
        Step::ALL
            .into_iter()
            .filter(|s| s.is_enabled(config))
            .collect()
    }

    /// Everything checked before a directory is created: inputs, databases, and unless this is
    /// a dry run, that every enabled tool can be executed
    pub fn preflight(config: &Config) -> Result<()> {
        config.validate()?;
        if !config.dry_run {
            check_step_tools(config)?;
        }
        Ok(())
    }

    /// Run the algorithm
    pub fn run(config: &Config, runner: &mut dyn Runner) -> Result<PipelineContext> {
        Self::preflight(config)?;
        Self::execute(config, runner)
    }

    /// Run the enabled steps of a configuration that already passed preflight
    pub fn execute(config: &Config, runner: &mut dyn Runner) -> Result<PipelineContext> {
        Self::log_summary(config);

        if !config.dry_run {
            create_dir(&config.out_dir)?;
        }

        let mut ctx = PipelineContext::default();
        let result = Self::run_steps(config, runner, &mut ctx);

        if !config.dry_run {
            if let Err(e) = write_summary(config.summary_path(), &ctx.records) {
                warn!("Could not write run summary: {}", e);
            }
        }

        result?;
        info!("Pipeline finished for sample {}", config.sample);
        Ok(ctx)
    }

    fn run_steps(
        config: &Config,
        runner: &mut dyn Runner,
        ctx: &mut PipelineContext,
    ) -> Result<()> {
        for step in Self::plan(config) {
            let start = Instant::now();
            let outcome = Self::run_step(step, config, runner, ctx);

            let (status, exit_code) = match &outcome {
                Ok(Some(exec)) => match exec.status {
                    Some(s) => (StepStatus::Ok, s.code()),
                    None => (StepStatus::Planned, None),
                },
                Ok(None) if config.dry_run => (StepStatus::Planned, None),
                Ok(None) => (StepStatus::Ok, None),
                Err(Error::StepFailure { status, .. }) => {
                    (StepStatus::Failed, status.and_then(|s| s.code()))
                }
                Err(_) => (StepStatus::Failed, None),
            };
            ctx.records.push(StepRecord {
                step,
                tool: step.program().unwrap_or("-").to_string(),
                status,
                exit_code,
                seconds: start.elapsed().as_secs_f64(),
            });

            outcome?;
        }
        Ok(())
    }

    /// Run one step. Returns the tool execution, or None for steps done by the driver itself
    fn run_step(
        step: Step,
        config: &Config,
        runner: &mut dyn Runner,
        ctx: &mut PipelineContext,
    ) -> Result<Option<Execution>> {
        if step == Step::Cleanup {
            remove_trimmed_reads(config, ctx)?;
            return Ok(None);
        }

        if !config.dry_run {
            if let Some(dir) = step.output_dir(config) {
                create_dir(&dir)?;
            }
            remove_stale_outputs(step, config)?;
        }

        let invocation = match step.invocation(config, ctx)? {
            Some(invocation) => invocation,
            None => return Ok(None),
        };
        let exec = runner.run(&invocation)?;

        if !config.dry_run {
            for path in step.expected_outputs(config) {
                if !path.exists() {
                    return Err(Error::missing_output(step, path));
                }
            }
        }

        match step {
            Step::Trim => ctx.trimmed = Some(config.trimmed_paths()),
            Step::Assemble => ctx.contigs = Some(config.contigs_path()),
            _ => {}
        }
        Ok(Some(exec))
    }

    fn log_summary(config: &Config) {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        info!("Sample:           {}", config.sample);
        info!("Reads:            {} {}", config.fastq_1.display(), config.fastq_2.display());
        info!("Output directory: {}", config.out_dir.display());
        info!("Threads:          {}", config.n_threads);
        info!("Quality control:  {}", yes_no(config.qc_run));
        info!("MLST:             {}", yes_no(config.mlst_run));
        info!("AMR:              {}", yes_no(config.amr_run));
        if config.dry_run {
            info!("Dry run: commands are printed, not executed");
        }
        let plan: Vec<&str> = Self::plan(config).iter().map(|s| s.name()).collect();
        info!("Steps:            {}", plan.join(" -> "));
    }
}

fn create_dir(dir: &std::path::Path) -> Result<()> {
    debug!("Creating directory {}", dir.display());
    fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))
}

/// Outputs left by an earlier run must not pass for this run's
fn remove_stale_outputs(step: Step, config: &Config) -> Result<()> {
    for path in step.expected_outputs(config) {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::filesystem(&path, e)),
        }
    }
    Ok(())
}

/// Delete the trimmed reads once assembly has consumed them, and the temp directory if it is ours and empty
fn remove_trimmed_reads(config: &Config, ctx: &mut PipelineContext) -> Result<()> {
    let (t1, t2) = ctx.trimmed_reads()?;
    if config.dry_run {
        info!("[dry-run] would delete {} and {}", t1.display(), t2.display());
        ctx.trimmed = None;
        return Ok(());
    }

    for p in [&t1, &t2] {
        match fs::remove_file(p) {
            Ok(()) => debug!("Deleted {}", p.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::filesystem(p, e)),
        }
    }
    ctx.trimmed = None;

    if config.owns_tmp_dir() {
        let is_empty = fs::read_dir(&config.path_tmp)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(&config.path_tmp).map_err(|e| Error::filesystem(&config.path_tmp, e))?;
        }
    }
    info!("Removed trimmed reads");
    Ok(())
}
