pub mod config;
mod delete;
mod download;
mod list;
mod upload;

pub use config::config;
pub use delete::delete;
pub use download::download;
pub use list::list;
pub use upload::upload;
