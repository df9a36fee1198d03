use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Environment variable overriding the local repository location.
pub const LOCAL_REPO_ENV: &str = "APPC_LOCAL_REPO";

/// Maven Central, consulted when nothing else is configured.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Returns the local repository, or None if the user's home cannot be resolved.
pub fn try_local_repo() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(LOCAL_REPO_ENV) {
        if !val.is_empty() {
            return Some(PathBuf::from(val));
        }
    }
    home_dir().map(|h| h.join(".m2").join("repository"))
}

/// Local repository to use: the explicit override if any, else
/// [`try_local_repo`].
pub fn local_repo(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(try_local_repo)
}

/// Runner jar path: `<output>/<final-name>-runner.jar`
pub fn runner_jar_path(output_dir: &Path, final_name: &str) -> PathBuf {
    output_dir.join(format!("{final_name}-runner.jar"))
}

/// Plain application jar path: `<output>/<final-name>.jar`
pub fn plain_jar_path(output_dir: &Path, final_name: &str) -> PathBuf {
    output_dir.join(format!("{final_name}.jar"))
}

/// Where a plain jar is moved in uber-jar mode: `<output>/<final-name>.jar.original`
pub fn original_jar_path(output_dir: &Path, final_name: &str) -> PathBuf {
    output_dir.join(format!("{final_name}.jar.original"))
}
