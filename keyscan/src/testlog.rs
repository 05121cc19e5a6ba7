//! Logging for unit tests.

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}
