pub const PIPELINE_DEFAULT_THREADS: usize = 1;
pub const PIPELINE_DEFAULT_GENOME_SIZE: &str = "5M";
pub const PIPELINE_DEFAULT_KRAKEN_DB: &str = "/db/kraken2/standard";
pub const PIPELINE_DEFAULT_MENTALIST_DB: &str = "/db/mentalist/cgmlst.jld";
pub const PIPELINE_DEFAULT_LOG_MODE: &str = "terminal";

pub const PIPELINE_DIRNAME_TMP: &str = "tmp";
pub const PIPELINE_FILENAME_LOG: &str = "bacpipe.log";
pub const PIPELINE_FILENAME_SUMMARY: &str = "pipeline_summary.tsv";
pub const PIPELINE_FILENAME_FASTP_JSON: &str = "fastp_report.json";
pub const PIPELINE_FILENAME_FASTP_HTML: &str = "fastp_report.html";
pub const PIPELINE_FILENAME_CONTIGS: &str = "contigs.fa";

// fastp refuses more worker threads than this
pub const FASTP_MAX_THREADS: usize = 16;
