pub mod conversation;
pub mod gemini;
pub mod marketplace;

pub use gemini::GeminiService;
pub use marketplace::MarketplaceService;
