use specwalk_core::changelog::{commit_changelog, update_changelog_file, Bump, ChangelogError, Version};
use specwalk_core::config::DEFAULT_CHANGELOG_FILE;
use std::path::Path;
use std::process::ExitCode;

/// Bump `./CHANGELOG.md` and commit it. Prints `OK` or the error message.
pub fn execute(args: &[String]) -> ExitCode {
    match release(Path::new("."), args) {
        Ok(version) => {
            tracing::info!(%version, "released");
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn release(dir: &Path, args: &[String]) -> Result<Version, ChangelogError> {
    let bump = Bump::from_args(args)?;
    let today = chrono::Local::now().date_naive();
    let version = update_changelog_file(&dir.join(DEFAULT_CHANGELOG_FILE), bump, today)?;
    commit_changelog(dir, &version)?;
    Ok(version)
}
