pub mod auth;
pub mod common;
pub mod credit;
pub mod pagination;
pub mod queue;
pub mod stats;
pub mod topup;
pub mod umkm;

pub use auth::*;
pub use common::*;
pub use credit::*;
pub use pagination::*;
pub use queue::*;
pub use stats::*;
pub use topup::*;
pub use umkm::*;
