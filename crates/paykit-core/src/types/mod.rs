mod button;
mod callbacks;
mod common;
mod environment;
mod request;
mod response;

pub use button::*;
pub use callbacks::*;
pub use common::*;
pub use environment::*;
pub use request::*;
pub use response::*;
