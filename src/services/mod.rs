pub mod auth;
pub mod file;
pub mod pagination;
pub mod token;
pub mod user;

pub use auth::AuthService;
pub use file::FileService;
pub use pagination::PaginationService;
pub use token::TokenService;
pub use user::UserService;
