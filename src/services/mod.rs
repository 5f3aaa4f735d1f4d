pub mod backend;
pub mod http;
pub mod notify;

pub use backend::Backend;
pub use http::HttpBackend;
pub use notify::{NotificationKind, Notifier, TracingNotifier};
