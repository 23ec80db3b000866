pub mod product;
pub mod http;
pub mod memory;

pub use product::Product;
pub use http::HttpCatalogClient;
pub use memory::InMemoryCatalog;
