use veneer_logger::{LevelFilter, Logger};

#[test]
fn console_logger_has_no_file_output() {
    let logger = Logger::builder().level(LevelFilter::WARN).install().expect("install");

    assert!(!logger.writes_files());
    tracing::warn!(key = "flags", "Durable write failed; keeping previous value");
}
