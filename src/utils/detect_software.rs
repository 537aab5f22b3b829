use log::debug;
use log::info;

use crate::pipeline::Step;
use crate::runtime::{Config, Result};

/// Make sure the tool of every enabled step can be executed from its environment
pub fn check_step_tools(config: &Config) -> Result<()> {
    for step in Step::ALL.into_iter().filter(|s| s.is_enabled(config)) {
        if let Some(program) = step.program() {
            let env = config.environments.env(step);
            debug!("Checking for {} in {}", program, env);
            let path = env.resolve(program)?;
            info!("Found {} at {}", program, path.display());
        }
    }
    Ok(())
}
