pub mod settings;
pub mod transport;

pub use settings::{Settings, DEFAULT_ENDPOINT};
pub use transport::{ListenStrategy, TransportConfig};
