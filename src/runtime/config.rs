use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::command::constants::*;
use crate::pipeline::Step;
use crate::runtime::{Error, Result, ToolEnvironments};
use crate::utils::sample_name_from_path;

///////////////////////////////
/// Immutable settings of one pipeline run
#[derive(Clone, Debug)]
pub struct Config {
    pub fastq_1: PathBuf,
    pub fastq_2: PathBuf,
    pub out_dir: PathBuf,

    // Where trimmed reads live until assembly has consumed them
    pub path_tmp: PathBuf,

    pub n_threads: usize,

    pub qc_run: bool,
    pub mlst_run: bool,
    pub amr_run: bool,

    pub sample: String,
    pub task_id: String,
    pub genome_size: String,

    pub kraken_db: PathBuf,
    pub mentalist_db: PathBuf,
    pub abricate_db: Option<String>,

    pub environments: ToolEnvironments,
    pub timeout: Option<Duration>,

    pub dry_run: bool,
    pub keep_tmp: bool,
}

impl Config {
    /// Configuration with defaults for everything but the inputs and output directory.
    /// The sample name is taken from the first read file
    pub fn new<P1, P2, P3>(fastq_1: P1, fastq_2: P2, out_dir: P3) -> Result<Config>
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
        P3: Into<PathBuf>,
    {
        let fastq_1 = fastq_1.into();
        let sample = sample_name_from_path(&fastq_1).ok_or_else(|| {
            Error::config(format!(
                "Cannot derive a sample name from {:?}; pass one explicitly",
                fastq_1
            ))
        })?;
        Ok(Config::with_sample(fastq_1, fastq_2, out_dir, sample))
    }

    pub fn with_sample<P1, P2, P3>(fastq_1: P1, fastq_2: P2, out_dir: P3, sample: String) -> Config
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
        P3: Into<PathBuf>,
    {
        let out_dir = out_dir.into();
        Config {
            fastq_1: fastq_1.into(),
            fastq_2: fastq_2.into(),
            path_tmp: out_dir.join(PIPELINE_DIRNAME_TMP),
            out_dir,
            n_threads: PIPELINE_DEFAULT_THREADS,
            qc_run: false,
            mlst_run: false,
            amr_run: false,
            task_id: sample.clone(),
            sample,
            genome_size: PIPELINE_DEFAULT_GENOME_SIZE.to_string(),
            kraken_db: PathBuf::from(PIPELINE_DEFAULT_KRAKEN_DB),
            mentalist_db: PathBuf::from(PIPELINE_DEFAULT_MENTALIST_DB),
            abricate_db: None,
            environments: ToolEnvironments::inherit(),
            timeout: None,
            dry_run: false,
            keep_tmp: false,
        }
    }

    /// Check everything that can be checked before a single directory is created
    pub fn validate(&self) -> Result<()> {
        if self.n_threads < 1 {
            return Err(Error::config("Number of threads must be at least 1"));
        }
        if self.sample.trim().is_empty() {
            return Err(Error::config("Sample name is empty"));
        }
        if !is_file_name(&self.sample) {
            return Err(Error::config(format!(
                "Sample name '{}' must be usable as a file name",
                self.sample
            )));
        }
        if !is_file_name(&self.task_id) {
            return Err(Error::config(format!(
                "Task id '{}' must be a single path component",
                self.task_id
            )));
        }

        for fastq in [&self.fastq_1, &self.fastq_2] {
            if !fastq.is_file() {
                return Err(Error::config(format!("Input reads {:?} not found", fastq)));
            }
        }
        if self.fastq_1 == self.fastq_2 {
            return Err(Error::config("-1 and -2 point to the same file"));
        }
        if self.out_dir.exists() && !self.out_dir.is_dir() {
            return Err(Error::config(format!(
                "Output directory {:?} exists and is not a directory",
                self.out_dir
            )));
        }

        if self.qc_run && !self.kraken_db.is_dir() {
            return Err(Error::config(format!(
                "Kraken2 database {:?} not found (needed by --qc)",
                self.kraken_db
            )));
        }
        if self.mlst_run && !self.mentalist_db.exists() {
            return Err(Error::config(format!(
                "MentaliST database {:?} not found (needed by --mlst)",
                self.mentalist_db
            )));
        }
        Ok(())
    }

    pub fn timeout_for(&self, step: Step) -> Option<Duration> {
        self.environments.timeout(step).or(self.timeout)
    }

    pub fn trimmed_paths(&self) -> (PathBuf, PathBuf) {
        (
            self.path_tmp
                .join(format!("{}_1.trimmed.fastq.gz", self.sample)),
            self.path_tmp
                .join(format!("{}_2.trimmed.fastq.gz", self.sample)),
        )
    }

    pub fn fastp_json_path(&self) -> PathBuf {
        self.out_dir.join(PIPELINE_FILENAME_FASTP_JSON)
    }

    pub fn fastp_html_path(&self) -> PathBuf {
        self.out_dir.join(PIPELINE_FILENAME_FASTP_HTML)
    }

    pub fn kraken_report_path(&self) -> PathBuf {
        self.result_dir(Step::Classify)
            .join(format!("{}.kreport", self.sample))
    }

    pub fn mentalist_calls_path(&self) -> PathBuf {
        self.result_dir(Step::AlleleCall)
            .join(format!("{}.tsv", self.sample))
    }

    pub fn contigs_path(&self) -> PathBuf {
        self.assembly_dir().join(PIPELINE_FILENAME_CONTIGS)
    }

    pub fn assembly_dir(&self) -> PathBuf {
        self.result_dir(Step::Assemble)
    }

    pub fn quast_dir(&self) -> PathBuf {
        self.result_dir(Step::AssemblyStats)
    }

    pub fn quast_report_path(&self) -> PathBuf {
        self.quast_dir().join("report.tsv")
    }

    pub fn checkm_task_dir(&self) -> PathBuf {
        self.result_dir(Step::Completeness).join(&self.task_id)
    }

    pub fn checkm_report_path(&self) -> PathBuf {
        self.checkm_task_dir().join("checkm_report.tsv")
    }

    pub fn abricate_table_path(&self) -> PathBuf {
        self.result_dir(Step::Amr)
            .join(format!("{}.tsv", self.sample))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join(PIPELINE_FILENAME_SUMMARY)
    }

    /// Whether the temp directory is ours to remove once it is empty
    pub fn owns_tmp_dir(&self) -> bool {
        self.path_tmp.starts_with(&self.out_dir)
    }

    fn result_dir(&self, step: Step) -> PathBuf {
        match step.result_dirname() {
            Some(dirname) => self.out_dir.join(dirname),
            None => self.out_dir.clone(),
        }
    }
}

/// Exactly one normal path component: no separators, no `.` or `..`
fn is_file_name(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
