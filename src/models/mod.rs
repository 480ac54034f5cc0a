pub mod file;
pub mod user;

pub use file::*;
pub use user::*;
