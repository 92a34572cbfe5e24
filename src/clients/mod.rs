pub mod lms_client;

pub use lms_client::LmsClient;
