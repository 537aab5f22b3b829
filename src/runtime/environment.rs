use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::pipeline::Step;
use crate::runtime::{Error, Result};
use crate::utils::expand_and_resolve_path;

///////////////////////////////
/// Where a tool is executed from. Tools are never activated in the driver's own process;
/// only the child process sees the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecEnv {
    /// Resolve the program on the inherited PATH
    #[default]
    Inherit,
    /// An isolated install prefix (for example a conda environment) with the program under bin/
    Prefix(PathBuf),
    /// One explicit executable
    Executable(PathBuf),
}

impl ExecEnv {
    /// Program to hand to the OS. For Inherit this is left to PATH lookup at spawn time
    pub fn program_path(&self, program: &str) -> PathBuf {
        match self {
            ExecEnv::Inherit => PathBuf::from(program),
            ExecEnv::Prefix(prefix) => prefix.join("bin").join(program),
            ExecEnv::Executable(path) => path.clone(),
        }
    }

    /// PATH the child should see, or None to inherit it unchanged
    pub fn child_path_var(&self) -> Result<Option<OsString>> {
        match self {
            ExecEnv::Prefix(prefix) => {
                let bin = prefix.join("bin");
                let inherited = std::env::var_os("PATH").unwrap_or_default();
                let paths = std::iter::once(bin).chain(std::env::split_paths(&inherited));
                let joined = std::env::join_paths(paths).map_err(|e| {
                    Error::config(format!("Cannot use {:?} as a tool prefix: {}", prefix, e))
                })?;
                Ok(Some(joined))
            }
            _ => Ok(None),
        }
    }

    /// Check that the program can be executed from this environment, and return its full path
    pub fn resolve(&self, program: &str) -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::filesystem(".", e))?;
        let found = match self {
            ExecEnv::Inherit => which::which(program),
            ExecEnv::Prefix(prefix) => which::which_in(program, Some(prefix.join("bin")), &cwd),
            ExecEnv::Executable(path) => which::which(path),
        };
        found.map_err(|_| Error::utility_not_executable(program, self.to_string()))
    }
}

impl fmt::Display for ExecEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecEnv::Inherit => write!(f, "$PATH"),
            ExecEnv::Prefix(prefix) => write!(f, "environment {}", prefix.display()),
            ExecEnv::Executable(path) => write!(f, "executable {}", path.display()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolSetting {
    pub env: ExecEnv,
    pub timeout: Option<Duration>,
}

/// One row of a tools table: step, kind, path, timeout
#[derive(Debug, Deserialize)]
struct ToolRow {
    step: String,
    kind: String,
    path: Option<String>,
    timeout: Option<u64>,
}

///////////////////////////////
/// Execution environment and timeout for each step
#[derive(Clone, Debug, Default)]
pub struct ToolEnvironments {
    settings: BTreeMap<Step, ToolSetting>,
}

impl ToolEnvironments {
    /// All tools from the inherited PATH
    pub fn inherit() -> Self {
        Self::default()
    }

    /// One isolated environment per tool, named after the tool, below a common root
    pub fn with_env_root(root: &Path) -> Self {
        let mut envs = Self::default();
        for step in Step::ALL {
            if let Some(env_name) = step.env_name() {
                envs.set_env(step, ExecEnv::Prefix(root.join(env_name)));
            }
        }
        envs
    }

    pub fn set_env(&mut self, step: Step, env: ExecEnv) {
        self.settings.entry(step).or_default().env = env;
    }

    pub fn set_timeout(&mut self, step: Step, timeout: Duration) {
        self.settings.entry(step).or_default().timeout = Some(timeout);
    }

    pub fn env(&self, step: Step) -> ExecEnv {
        self.settings
            .get(&step)
            .map(|s| s.env.clone())
            .unwrap_or_default()
    }

    pub fn timeout(&self, step: Step) -> Option<Duration> {
        self.settings.get(&step).and_then(|s| s.timeout)
    }

    /// Override settings from a tab-separated tools table on disk
    pub fn apply_table_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::filesystem(path, e))?;
        self.apply_table(file)
            .map_err(|e| Error::config(format!("Tools table {:?}: {}", path, e)))
    }

    /// Override settings from a tab-separated table with header `step kind path timeout`
    pub fn apply_table<R: std::io::Read>(&mut self, reader: R) -> Result<()> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        for (index, row) in rdr.deserialize::<ToolRow>().enumerate() {
            let row = row.map_err(|e| Error::config(format!("Row {}: {}", index + 1, e)))?;
            let step: Step = row
                .step
                .parse()
                .map_err(|e: String| Error::config(format!("Row {}: {}", index + 1, e)))?;

            let env = match (row.kind.to_lowercase().as_str(), row.path) {
                ("inherit", _) => ExecEnv::Inherit,
                ("prefix", Some(p)) => ExecEnv::Prefix(resolve_table_path(&p)?),
                ("executable", Some(p)) => ExecEnv::Executable(resolve_table_path(&p)?),
                ("prefix", None) | ("executable", None) => {
                    return Err(Error::config(format!(
                        "Row {}: kind '{}' needs a path",
                        index + 1,
                        row.kind
                    )))
                }
                (other, _) => {
                    return Err(Error::config(format!(
                        "Row {}: unknown kind '{}'. Expected inherit, prefix or executable",
                        index + 1,
                        other
                    )))
                }
            };

            if step.program().is_none() {
                return Err(Error::config(format!(
                    "Row {}: step '{}' does not run a tool",
                    index + 1,
                    step
                )));
            }

            log::debug!("Tools table: step {} runs from {}", step, env);
            self.set_env(step, env);
            if let Some(seconds) = row.timeout {
                self.set_timeout(step, Duration::from_secs(seconds));
            }
        }
        Ok(())
    }
}

fn resolve_table_path(p: &str) -> Result<PathBuf> {
    expand_and_resolve_path(p).map_err(|e| Error::config(format!("{:#}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_program_path() {
        let env = ExecEnv::Prefix(PathBuf::from("/opt/envs/shovill"));
        assert_eq!(
            env.program_path("shovill"),
            PathBuf::from("/opt/envs/shovill/bin/shovill")
        );
        assert_eq!(ExecEnv::Inherit.program_path("fastp"), PathBuf::from("fastp"));
    }

    #[test]
    fn test_prefix_goes_first_on_child_path() {
        let env = ExecEnv::Prefix(PathBuf::from("/opt/envs/checkm"));
        let path = env.child_path_var().unwrap().unwrap();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/opt/envs/checkm/bin"));
        assert_eq!(ExecEnv::Inherit.child_path_var().unwrap(), None);
    }

    #[test]
    fn test_env_root_covers_every_tool() {
        let envs = ToolEnvironments::with_env_root(Path::new("/envs"));
        assert_eq!(
            envs.env(Step::AssemblyStats),
            ExecEnv::Prefix(PathBuf::from("/envs/quast"))
        );
        assert_eq!(envs.env(Step::Cleanup), ExecEnv::Inherit);
    }

    #[test]
    fn test_apply_table() {
        let table = "step\tkind\tpath\ttimeout\n\
                     # comment line\n\
                     assemble\tprefix\t/opt/bacpipe-test/envs/asm\t3600\n\
                     amr\texecutable\t/opt/bacpipe-test/bin/abricate\t\n\
                     trim\tinherit\t\t\n";
        let mut envs = ToolEnvironments::with_env_root(Path::new("/envs"));
        envs.apply_table(table.as_bytes()).unwrap();

        assert_eq!(envs.env(Step::Assemble), ExecEnv::Prefix(PathBuf::from("/opt/bacpipe-test/envs/asm")));
        assert_eq!(envs.timeout(Step::Assemble), Some(Duration::from_secs(3600)));
        assert_eq!(
            envs.env(Step::Amr),
            ExecEnv::Executable(PathBuf::from("/opt/bacpipe-test/bin/abricate"))
        );
        assert_eq!(envs.timeout(Step::Amr), None);
        assert_eq!(envs.env(Step::Trim), ExecEnv::Inherit);
        assert_eq!(envs.env(Step::Classify), ExecEnv::Prefix(PathBuf::from("/envs/kraken2")));
    }

    #[test]
    fn test_apply_table_rejects_bad_rows() {
        let mut envs = ToolEnvironments::inherit();
        let unknown_step = "step\tkind\tpath\ttimeout\nspades\tinherit\t\t\n";
        assert!(matches!(
            envs.apply_table(unknown_step.as_bytes()),
            Err(Error::Config { .. })
        ));

        let missing_path = "step\tkind\tpath\ttimeout\nassemble\tprefix\t\t\n";
        assert!(envs.apply_table(missing_path.as_bytes()).is_err());

        let cleanup = "step\tkind\tpath\ttimeout\ncleanup\tinherit\t\t\n";
        assert!(envs.apply_table(cleanup.as_bytes()).is_err());
    }
}
