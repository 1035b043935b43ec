//! Fixtures shared by the runner's unit tests

use feedrun_core::domain::job::{JobDescriptor, OutputConfig, OutputFormat, SourceConfig};
use feedrun_core::dto::job_config::CONFIG_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a job directory with a config and a trivial `run.sh`
pub(crate) fn write_job(root: &Path, dir_name: &str, config: serde_json::Value) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("run.sh"), "#!/bin/sh\nexit 0\n").unwrap();
    fs::write(dir.join(CONFIG_FILE_NAME), config.to_string()).unwrap();
    dir
}

/// Valid config running `run.sh` through `/bin/sh`
pub(crate) fn job_config(id: &str) -> serde_json::Value {
    serde_json::json!({
        "job_id": id,
        "name": format!("{} scraper", id),
        "description": "test job",
        "enabled": true,
        "source": {
            "type": "script",
            "script_path": "run.sh",
            "interpreter": "/bin/sh",
            "timeout_seconds": 30,
            "retry_attempts": 2,
            "retry_delay_seconds": 1
        },
        "output": { "format": "csv", "directory": "data", "filename": "out.csv" }
    })
}

/// Descriptor running `body` as a shell script inside `dir`
pub(crate) fn script_job(dir: &Path, id: &str, body: &str) -> JobDescriptor {
    let script = dir.join(format!("{}.sh", id));
    fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();

    JobDescriptor {
        id: id.to_string(),
        name: format!("{} scraper", id),
        description: String::new(),
        enabled: true,
        job_dir: dir.to_path_buf(),
        source: SourceConfig {
            entry_point: script,
            interpreter: Some("/bin/sh".to_string()),
            args: Vec::new(),
            working_directory: dir.to_path_buf(),
            timeout_seconds: 10,
            retry_attempts: 0,
            retry_delay_seconds: 0,
        },
        output: OutputConfig {
            format: OutputFormat::Json,
            directory: PathBuf::from("data"),
            filename: format!("{}.json", id),
        },
    }
}
