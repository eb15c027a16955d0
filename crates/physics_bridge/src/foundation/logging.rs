//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_is_repeatable() {
        super::init();
        super::init();
        super::debug!("logging initialized twice");
    }
}
