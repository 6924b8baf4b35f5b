use mdock_logger::{LevelFilter, Logger};

#[test]
fn console_only_logger_has_no_file_guard() {
    let logger = Logger::builder()
        .name("console-only")
        .console(true)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    tracing::info!("console-only logger is up");
    logger.flush();

    assert!(logger.guard().is_none(), "no file appender was configured");
}
