#![allow(non_snake_case)]

pub mod error;
pub mod org;
pub mod role;
pub mod session;
pub mod user;

pub use error::*;
pub use org::*;
pub use role::*;
pub use session::*;
pub use user::*;
