mod adapter;
mod registry;
mod sybil;

pub use adapter::{ModelAdapter, Payload, Series};
pub use registry::{ModelConstructor, ModelRegistry};
pub use sybil::SybilModel;
pub use tokio_util::sync::CancellationToken;
