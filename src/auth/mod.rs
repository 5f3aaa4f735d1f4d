mod session;

pub use session::{SessionProvider, TokenSession};
