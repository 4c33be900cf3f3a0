pub mod event_worker;
pub mod fetch_worker;

pub use event_worker::run as run_event_worker;
pub use fetch_worker::run as run_fetch_worker;
