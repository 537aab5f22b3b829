use std::path::Path;

use serde::Serialize;

use crate::pipeline::Step;
use crate::runtime::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Planned,
    Failed,
}

/// One row of pipeline_summary.tsv
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub tool: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub seconds: f64,
}

/// Write the per-step summary table as TSV
pub fn write_summary<P: AsRef<Path>>(path: P, records: &[StepRecord]) -> Result<()> {
    let path = path.as_ref();
    let to_fs_error = |e: csv::Error| {
        let io = std::io::Error::new(std::io::ErrorKind::Other, e.to_string());
        Error::filesystem(path, io)
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(to_fs_error)?;
    for record in records {
        writer.serialize(record).map_err(to_fs_error)?;
    }
    writer.flush().map_err(|e| Error::filesystem(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline_summary.tsv");
        let records = vec![
            StepRecord {
                step: Step::AlleleCall,
                tool: "mentalist".to_string(),
                status: StepStatus::Ok,
                exit_code: Some(0),
                seconds: 1.5,
            },
            StepRecord {
                step: Step::Assemble,
                tool: "shovill".to_string(),
                status: StepStatus::Failed,
                exit_code: None,
                seconds: 0.25,
            },
        ];
        write_summary(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "step\ttool\tstatus\texit_code\tseconds");
        assert_eq!(lines[1], "allele-call\tmentalist\tok\t0\t1.5");
        assert_eq!(lines[2], "assemble\tshovill\tfailed\t\t0.25");
    }
}
