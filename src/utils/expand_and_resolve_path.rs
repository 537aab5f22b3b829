use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// `~` and `$VAR` expansion. Paths that are not UTF-8, or name an unset variable, are kept as given
fn expand_vars(input: &Path) -> Cow<'_, Path> {
    let Some(s) = input.to_str() else {
        log::warn!("Path {:?} is not valid UTF-8, not expanding it", input);
        return Cow::Borrowed(input);
    };
    match shellexpand::full(s) {
        Ok(Cow::Borrowed(_)) => Cow::Borrowed(input),
        Ok(Cow::Owned(expanded)) => Cow::Owned(PathBuf::from(expanded)),
        Err(e) => {
            log::warn!("Cannot expand {:?}: {}. Using it as given", input, e);
            Cow::Borrowed(input)
        }
    }
}

/// Expand a user-supplied path and make it absolute. Existing paths are canonicalized;
/// paths that do not exist yet (output directories, log files) are joined onto the working directory
pub fn expand_and_resolve_path<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    let expanded = expand_vars(input.as_ref());

    if let Ok(canonical) = expanded.canonicalize() {
        return Ok(canonical);
    }
    if expanded.is_absolute() {
        return Ok(expanded.into_owned());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_becomes_absolute() {
        let p = expand_and_resolve_path("surely/not/here.fq").unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("surely/not/here.fq"));
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("BACPIPE_TEST_ROOT", "/nonexistent-bacpipe-root");
        let p = expand_and_resolve_path("$BACPIPE_TEST_ROOT/envs").unwrap();
        assert_eq!(p, PathBuf::from("/nonexistent-bacpipe-root/envs"));
    }

    #[test]
    fn test_unset_variable_is_kept() {
        let p = expand_and_resolve_path("/nonexistent/$BACPIPE_SURELY_UNSET/x").unwrap();
        assert_eq!(p, PathBuf::from("/nonexistent/$BACPIPE_SURELY_UNSET/x"));
    }
}
