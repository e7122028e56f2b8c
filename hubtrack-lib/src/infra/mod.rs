//! Concrete collaborators used by the command-line tool.

mod catalog;
mod catalog_lock;
mod git;
mod http;
mod image_store;
mod index_loader;

pub use catalog::JsonCatalog;
pub use git::GitCloner;
pub use http::ReqwestGetter;
pub use image_store::DirImageStore;
pub use index_loader::HttpIndexLoader;
