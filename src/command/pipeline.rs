use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use super::constants::*;
use crate::pipeline::{DryRunner, Pipeline, ProcessRunner, Runner};
use crate::runtime::{Config, Error, LogFile, ToolEnvironments};
use crate::utils::expand_and_resolve_path;

#[derive(Args, Debug, Clone)]
pub struct PipelineCMD {
    /// First read file of the pair (FASTQ, optionally compressed)
    #[arg(short = '1', value_parser = clap::value_parser!(PathBuf))]
    pub path_fastq_1: PathBuf,

    /// Second read file of the pair
    #[arg(short = '2', value_parser = clap::value_parser!(PathBuf))]
    pub path_fastq_2: PathBuf,

    /// Output directory; one result directory per tool is created below it
    #[arg(short = 'o', value_parser = clap::value_parser!(PathBuf))]
    pub path_out: PathBuf,

    /// Threads handed to each tool
    #[arg(short = 't', value_parser = clap::value_parser!(u64).range(1..), default_value_t = PIPELINE_DEFAULT_THREADS as u64)]
    pub num_threads: u64,

    /// Run taxonomic classification, completeness/contamination check and assembly statistics
    #[arg(long = "qc")]
    pub qc: bool,

    /// Run MLST allele calling
    #[arg(long = "mlst")]
    pub mlst: bool,

    /// Run AMR gene detection on the assembly
    #[arg(long = "amr")]
    pub amr: bool,

    /// Directory for the trimmed reads. Defaults to <out>/tmp
    #[arg(long = "tmp-dir", value_parser = clap::value_parser!(PathBuf))]
    pub path_tmp: Option<PathBuf>,

    /// Sample name. Defaults to the first read file name without suffixes
    #[arg(long = "sample")]
    pub sample: Option<String>,

    /// Identifier scoping the CheckM output directory. Defaults to the sample name
    #[arg(long = "task-id")]
    pub task_id: Option<String>,

    /// Genome size estimate passed to the assembler
    #[arg(long = "gsize", default_value = PIPELINE_DEFAULT_GENOME_SIZE)]
    pub genome_size: String,

    /// Kraken2 database directory, used with --qc
    #[arg(long = "kraken-db", value_parser = clap::value_parser!(PathBuf), default_value = PIPELINE_DEFAULT_KRAKEN_DB)]
    pub path_kraken_db: PathBuf,

    /// MentaliST allele database, used with --mlst
    #[arg(long = "mentalist-db", value_parser = clap::value_parser!(PathBuf), default_value = PIPELINE_DEFAULT_MENTALIST_DB)]
    pub path_mentalist_db: PathBuf,

    /// abricate database name; the tool's default when not given
    #[arg(long = "abricate-db")]
    pub abricate_db: Option<String>,

    /// Directory holding one isolated environment per tool (fastp, kraken2, mentalist, shovill, checkm, quast, abricate)
    #[arg(long = "env-root", value_parser = clap::value_parser!(PathBuf))]
    pub path_env_root: Option<PathBuf>,

    /// Tab-separated table overriding where single tools run from (columns: step kind path timeout)
    #[arg(long = "tools", value_parser = clap::value_parser!(PathBuf))]
    pub path_tools: Option<PathBuf>,

    /// Kill any tool that runs longer than this many seconds
    #[arg(long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Print the commands without running anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Keep the trimmed reads
    #[arg(long = "keep-tmp")]
    pub keep_tmp: bool,
}

impl PipelineCMD {
    /// Turn the command line into a run configuration
    pub fn to_config(&self) -> Result<Config> {
        let fastq_1 = expand_and_resolve_path(&self.path_fastq_1)?;
        let fastq_2 = expand_and_resolve_path(&self.path_fastq_2)?;
        let out_dir = expand_and_resolve_path(&self.path_out)?;

        let mut config = match &self.sample {
            Some(sample) => Config::with_sample(fastq_1, fastq_2, out_dir, sample.clone()),
            None => Config::new(fastq_1, fastq_2, out_dir)?,
        };

        if let Some(path_tmp) = &self.path_tmp {
            config.path_tmp = expand_and_resolve_path(path_tmp)?;
        }
        if let Some(task_id) = &self.task_id {
            config.task_id = task_id.clone();
        }

        config.n_threads = usize::try_from(self.num_threads)
            .map_err(|_| Error::config(format!("Too many threads: {}", self.num_threads)))?;
        config.qc_run = self.qc;
        config.mlst_run = self.mlst;
        config.amr_run = self.amr;
        config.genome_size = self.genome_size.clone();
        config.kraken_db = expand_and_resolve_path(&self.path_kraken_db)?;
        config.mentalist_db = expand_and_resolve_path(&self.path_mentalist_db)?;
        config.abricate_db = self.abricate_db.clone();
        config.timeout = self.timeout_secs.map(Duration::from_secs);
        config.dry_run = self.dry_run;
        config.keep_tmp = self.keep_tmp;

        config.environments = match &self.path_env_root {
            Some(root) => ToolEnvironments::with_env_root(&expand_and_resolve_path(root)?),
            None => ToolEnvironments::inherit(),
        };
        if let Some(path_tools) = &self.path_tools {
            config
                .environments
                .apply_table_file(expand_and_resolve_path(path_tools)?)?;
        }

        Ok(config)
    }

    /// Run the commandline option. The log file, if any, is only attached once preflight has
    /// passed, so a rejected run or a dry run leaves no trace on disk
    pub fn try_execute(&mut self, log_file: Option<&LogFile>) -> Result<()> {
        let config = self.to_config()?;

        let preflight = Pipeline::preflight(&config);
        if let Some(log_file) = log_file {
            if preflight.is_ok() && !config.dry_run {
                log_file.attach(&config.out_dir.join(PIPELINE_FILENAME_LOG))?;
            } else {
                log_file.fall_back_to_terminal();
            }
        }
        preflight?;

        let mut runner: Box<dyn Runner> = if config.dry_run {
            Box::new(DryRunner::default())
        } else {
            Box::new(ProcessRunner::new())
        };
        Pipeline::execute(&config, runner.as_mut())?;

        log::info!("Bacpipe has finished succesfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        cmd: PipelineCMD,
    }

    fn parse(args: &[&str]) -> std::result::Result<PipelineCMD, clap::Error> {
        TestCli::try_parse_from(std::iter::once("bacpipe").chain(args.iter().copied()))
            .map(|cli| cli.cmd)
    }

    #[test]
    fn test_parse_minimal() {
        let cmd = parse(&["-1", "a_R1.fq", "-2", "a_R2.fq", "-o", "out"]).unwrap();
        assert_eq!(cmd.num_threads, 1);
        assert!(!cmd.qc && !cmd.mlst && !cmd.amr);
        assert_eq!(cmd.genome_size, "5M");
    }

    #[test]
    fn test_parse_flags() {
        let cmd = parse(&[
            "-1", "a_R1.fq", "-2", "a_R2.fq", "-o", "out", "-t", "8", "--qc", "--mlst", "--amr",
        ])
        .unwrap();
        assert_eq!(cmd.num_threads, 8);
        assert!(cmd.qc && cmd.mlst && cmd.amr);
    }

    #[test]
    fn test_missing_required_reads() {
        assert!(parse(&["-2", "a_R2.fq", "-o", "out"]).is_err());
        assert!(parse(&["-1", "a_R1.fq", "-2", "a_R2.fq"]).is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(parse(&["-1", "a_R1.fq", "-2", "a_R2.fq", "-o", "out", "-t", "0"]).is_err());
    }

    #[test]
    fn test_to_config() {
        let cmd = parse(&[
            "-1", "/data/S7_R1.fastq.gz", "-2", "/data/S7_R2.fastq.gz", "-o", "/nonexistent-out",
            "-t", "3", "--amr", "--task-id", "17", "--env-root", "/nonexistent-envs",
        ])
        .unwrap();
        let config = cmd.to_config().unwrap();
        assert_eq!(config.sample, "S7");
        assert_eq!(config.task_id, "17");
        assert_eq!(config.n_threads, 3);
        assert!(config.amr_run && !config.qc_run);
        assert_eq!(config.path_tmp, PathBuf::from("/nonexistent-out/tmp"));
        assert_eq!(
            config.environments.env(crate::pipeline::Step::Trim),
            crate::runtime::ExecEnv::Prefix(PathBuf::from("/nonexistent-envs/fastp"))
        );
    }

    #[test]
    fn test_help_documents_paths() {
        let help = TestCli::command().render_help().to_string();
        assert!(help.contains("Directory for the trimmed reads"));
        assert!(help.contains("Kraken2 database directory"));
        assert!(help.contains("MentaliST allele database"));
    }
}
