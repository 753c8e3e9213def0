use veneer_logger::{Logger, LoggerError};

#[test]
fn second_install_reports_the_existing_subscriber() {
    let _first = Logger::builder().install().expect("first install");

    let err = Logger::builder().install().expect_err("second install");

    assert!(matches!(err, LoggerError::Subscriber { .. }));
}
