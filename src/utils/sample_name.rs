use std::path::Path;

const COMPRESSION_SUFFIXES: [&str; 3] = [".gz", ".bz2", ".xz"];
const FASTQ_SUFFIXES: [&str; 2] = [".fastq", ".fq"];
// Longest first, so _R1_001 is not cut down to _R1
const MATE_SUFFIXES: [&str; 5] = ["_R1_001", "_R1", "_1", ".R1", ".1"];

fn strip_any<'a>(s: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if s.len() < suffix.len() || !s.is_char_boundary(s.len() - suffix.len()) {
            continue;
        }
        let (head, tail) = s.split_at(s.len() - suffix.len());
        if tail.eq_ignore_ascii_case(suffix) {
            return head;
        }
    }
    s
}

/// Derive a sample name from the first read file of a pair, e.g. `x/S12_R1_001.fastq.gz` -> `S12`
pub fn sample_name_from_path<P: AsRef<Path>>(p: P) -> Option<String> {
    let file_name = p.as_ref().file_name()?.to_str()?;
    let name = strip_any(file_name, &COMPRESSION_SUFFIXES);
    let name = strip_any(name, &FASTQ_SUFFIXES);
    let name = strip_any(name, &MATE_SUFFIXES);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_name_from_path() {
        assert_eq!(sample_name_from_path("/a/S12_R1_001.fastq.gz"), Some("S12".to_string()));
        assert_eq!(sample_name_from_path("S12_1.fq"), Some("S12".to_string()));
        assert_eq!(sample_name_from_path("iso.R1.FASTQ.GZ"), Some("iso".to_string()));
        assert_eq!(sample_name_from_path("reads.fastq"), Some("reads".to_string()));
        assert_eq!(sample_name_from_path("ERR123456_1.fastq.bz2"), Some("ERR123456".to_string()));
        assert_eq!(sample_name_from_path("_R1.fq"), None);
        assert_eq!(sample_name_from_path("/"), None);
    }
}
