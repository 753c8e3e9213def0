use std::fs;
use tempfile::tempdir;
use veneer_logger::{FileOutput, LevelFilter, Logger};

#[test]
fn json_files_hold_one_object_per_event() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let logs = dir.path().join("logs");

    let logger = Logger::builder()
        .console(false)
        .level(LevelFilter::INFO)
        .file(FileOutput::new(&logs).prefix("file-test").json())
        .install()?;
    assert!(logger.writes_files());

    tracing::info!(module = "Widget", "Module booted");
    tracing::debug!("filtered out");
    drop(logger);

    let path = fs::read_dir(&logs)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "log"))
        .expect("a log file");
    let contents = fs::read_to_string(path)?;

    let line = contents.lines().find(|l| l.contains("Module booted")).expect("booted event");
    let event: serde_json::Value = serde_json::from_str(line)?;
    assert_eq!(event["fields"]["module"], "Widget");
    assert!(!contents.contains("filtered out"));
    Ok(())
}
