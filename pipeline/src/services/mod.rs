//! Remote service client implementations

pub mod gemini;

#[cfg(test)]
pub mod tests;

pub use gemini::GeminiClient;
