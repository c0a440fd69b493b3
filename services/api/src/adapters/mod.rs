pub mod db;
pub mod gemini_llm;
pub mod openalex;
pub mod otp;

pub use db::DbAdapter;
pub use gemini_llm::GeminiTextAdapter;
pub use openalex::OpenAlexAdapter;
pub use otp::LogOtpDelivery;
