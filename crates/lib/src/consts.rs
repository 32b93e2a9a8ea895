//! Well-known names and limits shared across the crate.

use std::time::Duration;

/// Job variable controlling attempts of the `get_sources` stage.
pub const GET_SOURCES_ATTEMPTS: &str = "GET_SOURCES_ATTEMPTS";

/// Job variable controlling attempts of the `download_artifacts` stage.
pub const ARTIFACT_DOWNLOAD_ATTEMPTS: &str = "ARTIFACT_DOWNLOAD_ATTEMPTS";

/// Job variable controlling attempts of the `restore_cache` stage.
pub const RESTORE_CACHE_ATTEMPTS: &str = "RESTORE_CACHE_ATTEMPTS";

/// Attempts used when a stage's attempts variable is absent or not a number.
pub const DEFAULT_STAGE_ATTEMPTS: u32 = 1;

/// Smallest attempt count a job may request.
pub const MIN_STAGE_ATTEMPTS: i64 = 1;

/// Largest attempt count a job may request.
pub const MAX_STAGE_ATTEMPTS: i64 = 10;

/// Number of executor preparation attempts. Agent policy, not job-configurable.
pub const PREPARE_ATTEMPTS: u32 = 3;

/// Delay between executor preparation attempts.
pub const PREPARE_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// User name embedded in credential-carrying clone URLs.
pub const CLONE_URL_USER: &str = "gitlab-ci-token";

/// Variable carrying the job token.
pub const CI_JOB_TOKEN: &str = "CI_JOB_TOKEN";

/// Variable carrying the `namespace/project` path.
pub const CI_PROJECT_PATH: &str = "CI_PROJECT_PATH";

/// Environment variable overriding the default config path.
pub const CONFIG_PATH_ENV: &str = "GANTRY_CONFIG";

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Executor name of the built-in local process backend.
pub const SHELL_EXECUTOR: &str = "shell";

/// Name of the built-in bash script generator.
pub const BASH_SHELL: &str = "bash";

/// Directory jobs are checked out under when the runner sets none.
pub const DEFAULT_BUILDS_DIR: &str = "builds";
