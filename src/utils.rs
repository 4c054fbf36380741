/// Install `env_logger` for tests. Safe to call more than once.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
