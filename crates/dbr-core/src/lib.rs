pub mod arena;
pub mod backend;
pub mod completion;
pub mod locator_conn_list;
pub mod namespace;
pub mod ready_queue;
pub mod request;
pub mod tag;

pub use arena::Arena;
pub use backend::{Backend, PostError};
pub use dbr_proto::ErrorCode;
pub use completion::map_completion;
pub use locator_conn_list::{LocatorConnList, LocatorError};
pub use namespace::{Config, Namespace};
pub use ready_queue::ReadyQueue;
pub use request::{Completion, Opcode, Request, RequestContext, RequestStatus};
pub use tag::TagPool;
