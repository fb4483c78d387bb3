pub mod client;
pub mod decompress;
pub mod reqwest_client;
pub mod settings;

// Re-export some types to use with the http client.
pub use reqwest::header::{self, HeaderMap};
pub use reqwest::{Method, Request, StatusCode};
pub use url::Url;
