use hypack_shared::log::LevelFilter;

/// Initializes logging for tests. Safe to call from every test; repeated
/// initialization is ignored.
pub fn setup_logger() {
    let _ = simple_logger::SimpleLogger::new().with_level(LevelFilter::Debug).init();
}
