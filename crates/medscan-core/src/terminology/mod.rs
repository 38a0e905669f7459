//! Terminology sources: the remote RxNav client and the local regional index.

mod local;
mod query;
mod remote;

pub use local::*;
pub use query::clean_query;
pub use remote::*;
