pub mod handle;
pub mod ops;

pub use dbr_core::Config;
pub use dbr_proto::ErrorCode;
pub use handle::NamespaceHandle;
