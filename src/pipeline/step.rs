use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::command::constants::FASTP_MAX_THREADS;
use crate::pipeline::{Invocation, PipelineContext, StdoutTarget};
use crate::runtime::{Config, Result};

///////////////////////////////
/// The steps of the pipeline, declared in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Trim,
    Classify,
    AlleleCall,
    Assemble,
    Cleanup,
    Completeness,
    AssemblyStats,
    Amr,
}

impl Step {
    /// Every step in the order the sequencer visits them
    pub const ALL: [Step; 8] = [
        Step::Trim,
        Step::Classify,
        Step::AlleleCall,
        Step::Assemble,
        Step::Cleanup,
        Step::Completeness,
        Step::AssemblyStats,
        Step::Amr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Trim => "trim",
            Step::Classify => "classify",
            Step::AlleleCall => "allele-call",
            Step::Assemble => "assemble",
            Step::Cleanup => "cleanup",
            Step::Completeness => "completeness",
            Step::AssemblyStats => "assembly-stats",
            Step::Amr => "amr",
        }
    }

    /// External program run by this step. Cleanup is done by the driver itself
    pub fn program(&self) -> Option<&'static str> {
        match self {
            Step::Trim => Some("fastp"),
            Step::Classify => Some("kraken2"),
            Step::AlleleCall => Some("mentalist"),
            Step::Assemble => Some("shovill"),
            Step::Cleanup => None,
            Step::Completeness => Some("checkm"),
            Step::AssemblyStats => Some("quast.py"),
            Step::Amr => Some("abricate"),
        }
    }

    /// Name of the isolated environment this step's tool is installed in
    pub fn env_name(&self) -> Option<&'static str> {
        match self {
            Step::Trim => Some("fastp"),
            Step::Classify => Some("kraken2"),
            Step::AlleleCall => Some("mentalist"),
            Step::Assemble => Some("shovill"),
            Step::Cleanup => None,
            Step::Completeness => Some("checkm"),
            Step::AssemblyStats => Some("quast"),
            Step::Amr => Some("abricate"),
        }
    }

    /// Result directory below the output directory
    pub fn result_dirname(&self) -> Option<&'static str> {
        match self {
            Step::Classify => Some("kraken2_res"),
            Step::AlleleCall => Some("mentalist_res"),
            Step::Assemble => Some("shovill_res"),
            Step::Completeness => Some("checkm_res"),
            Step::AssemblyStats => Some("quast_res"),
            Step::Amr => Some("abricate_res"),
            Step::Trim | Step::Cleanup => None,
        }
    }

    /// Directory that must exist before the step runs. Trimming writes to the temp directory
    pub fn output_dir(&self, config: &Config) -> Option<PathBuf> {
        match self {
            Step::Trim => Some(config.path_tmp.clone()),
            _ => self.result_dirname().map(|d| config.out_dir.join(d)),
        }
    }

    pub fn is_enabled(&self, config: &Config) -> bool {
        match self {
            Step::Trim | Step::Assemble => true,
            Step::Classify | Step::Completeness | Step::AssemblyStats => config.qc_run,
            Step::AlleleCall => config.mlst_run,
            Step::Cleanup => !config.keep_tmp,
            Step::Amr => config.amr_run,
        }
    }

    /// Process exit code when this step fails
    pub fn exit_code(&self) -> u8 {
        10 + Step::ALL.iter().position(|s| s == self).unwrap_or(0) as u8
    }

    /// Files the tool must have produced for the step to count as successful
    pub fn expected_outputs(&self, config: &Config) -> Vec<PathBuf> {
        match self {
            Step::Trim => {
                let (t1, t2) = config.trimmed_paths();
                vec![t1, t2]
            }
            Step::Classify => vec![config.kraken_report_path()],
            Step::AlleleCall => vec![config.mentalist_calls_path()],
            Step::Assemble => vec![config.contigs_path()],
            Step::Cleanup => vec![],
            Step::Completeness => vec![config.checkm_report_path()],
            Step::AssemblyStats => vec![config.quast_report_path()],
            Step::Amr => vec![config.abricate_table_path()],
        }
    }

    /// Build the command line for this step from the configuration and what earlier steps produced
    pub fn invocation(&self, config: &Config, ctx: &PipelineContext) -> Result<Option<Invocation>> {
        let program = match self.program() {
            Some(program) => program,
            None => return Ok(None),
        };
        let threads = config.n_threads.to_string();
        let inv = Invocation::new(*self, program, config.environments.env(*self))
            .timeout(config.timeout_for(*self));

        let inv = match self {
            Step::Trim => {
                let (t1, t2) = config.trimmed_paths();
                inv.arg("-i")
                    .arg(&config.fastq_1)
                    .arg("-I")
                    .arg(&config.fastq_2)
                    .arg("-o")
                    .arg(t1)
                    .arg("-O")
                    .arg(t2)
                    .arg("-w")
                    .arg(config.n_threads.min(FASTP_MAX_THREADS).to_string())
                    .arg("-j")
                    .arg(config.fastp_json_path())
                    .arg("-h")
                    .arg(config.fastp_html_path())
            }

            Step::Classify => inv
                .arg("--db")
                .arg(&config.kraken_db)
                .arg("--threads")
                .arg(&threads)
                .arg("--paired")
                .arg("--report")
                .arg(config.kraken_report_path())
                .arg("--output")
                .arg("-")
                .arg(&config.fastq_1)
                .arg(&config.fastq_2)
                .stdout(StdoutTarget::Null),

            Step::AlleleCall => {
                let (t1, t2) = ctx.trimmed_reads()?;
                inv.arg("call")
                    .arg("-o")
                    .arg(config.mentalist_calls_path())
                    .arg("-s")
                    .arg(&config.sample)
                    .arg("--db")
                    .arg(&config.mentalist_db)
                    .arg("-1")
                    .arg(t1)
                    .arg("-2")
                    .arg(t2)
            }

            Step::Assemble => {
                let (t1, t2) = ctx.trimmed_reads()?;
                inv.arg("--R1")
                    .arg(t1)
                    .arg("--R2")
                    .arg(t2)
                    .arg("--outdir")
                    .arg(config.assembly_dir())
                    .arg("--gsize")
                    .arg(&config.genome_size)
                    .arg("--cpus")
                    .arg(&threads)
                    .arg("--force")
            }

            Step::Completeness => {
                let contigs = ctx.contigs()?;
                let bin_dir = contigs
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| config.assembly_dir());
                inv.arg("taxonomy_wf")
                    .arg("--tab_table")
                    .arg("-f")
                    .arg(config.checkm_report_path())
                    .arg("-x")
                    .arg("fa")
                    .arg("-t")
                    .arg(&threads)
                    .arg("domain")
                    .arg("Bacteria")
                    .arg(bin_dir)
                    .arg(config.checkm_task_dir())
            }

            Step::AssemblyStats => inv
                .arg(ctx.contigs()?)
                .arg("-o")
                .arg(config.quast_dir())
                .arg("-t")
                .arg(&threads),

            Step::Amr => {
                let mut inv = inv.arg("--threads").arg(&threads);
                if let Some(db) = &config.abricate_db {
                    inv = inv.arg("--db").arg(db);
                }
                inv.arg(ctx.contigs()?)
                    .stdout(StdoutTarget::File(config.abricate_table_path()))
            }

            Step::Cleanup => unreachable!("cleanup has no program"),
        };
        Ok(Some(inv))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Step::ALL
            .into_iter()
            .find(|step| step.name() == normalized)
            .ok_or_else(|| format!("Unknown step: {}", s))
    }
}
