pub mod constants;
pub mod error;
pub mod sge;

pub use constants::*;
pub use error::ErrorCode;
pub use sge::{ParseResult, Sge, SgeError, SgeList, deserialize, serialize};
