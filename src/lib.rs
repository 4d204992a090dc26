// Library exports for testing

pub mod config;
pub mod engine;
pub mod fetch;
pub mod frame;
pub mod routes;
pub mod server;
pub mod shell;
pub mod translation;
pub mod watch;

// Re-export commonly used types for tests
pub use config::ShimConfig;
pub use engine::{DispatchOutcome, Engine, Facet, FacetRegistry};
pub use fetch::{BundleFetcher, MemoryFetcher, ResourceFetcher};
pub use frame::{EmbeddedContext, NavigationOutcome, NavigationRouter};
pub use routes::RouteTable;
pub use shell::{Shell, ShellHandle};
pub use translation::Translations;
