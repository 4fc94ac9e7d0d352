//! Error reporting helpers for the binaries
//!
//! - `report_error()`: print an error and its full cause chain to stderr and the log
//! - `install_panic_handler()`: log panics before the default hook runs

use std::panic;

/// Cause chain of `error`, outermost first.
pub fn error_chain<E: std::error::Error + ?Sized>(error: &E) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(err) = source {
        chain.push(err.to_string());
        source = err.source();
    }
    chain
}

pub fn report_error<E: std::error::Error + ?Sized>(error: &E) {
    let chain = error_chain(error);

    eprintln!("🔥 ERROR: {}", chain[0]);
    for (level, cause) in chain.iter().enumerate().skip(1) {
        eprintln!("   {}. Caused by: {}", level, cause);
    }

    tracing::error!("Error occurred: {}", chain[0]);
    for (level, cause) in chain.iter().enumerate().skip(1) {
        tracing::error!("  Caused by (level {}): {}", level, cause);
    }
}

pub fn install_panic_handler() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic payload".to_string()
        };

        let location = if let Some(loc) = panic_info.location() {
            format!("{}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            "Unknown location".to_string()
        };

        eprintln!("💥 PANIC occurred!");
        eprintln!("   Message: {}", message);
        eprintln!("   Location: {}", location);

        tracing::error!("PANIC: {} at {}", message, location);

        default_hook(panic_info);
    }));
}
