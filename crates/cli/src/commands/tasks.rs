//! `prospector tasks`: print the progress report of the last run.

use std::path::Path;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let path = &config.paths.task_log;

    match std::fs::read_to_string(path) {
        Ok(report) => print!("{report}"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No task report yet at {}. Start one with `prospector run`.", path.display());
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to read {}: {e}", path.display())),
    }
    Ok(())
}
