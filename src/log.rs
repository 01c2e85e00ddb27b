use slog::{Discard, Logger, o, Drain};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

pub fn create_logger(for_module: &str) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator)
        .use_utc_timestamp()  // Use UTC timestamp
        .use_original_order() // Maintain the order of log fields as declared
        .build()
        .fuse();
    let async_drain = Async::new(drain).build().fuse();
    Logger::root(async_drain, o!("component" => "EcgCore", "module" => for_module.to_string()))
}

/// Logger that drops every record; used when the caller did not ask for output.
pub fn silent_logger() -> Logger {
    Logger::root(Discard, o!())
}
