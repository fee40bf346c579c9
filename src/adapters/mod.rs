// Adapters layer: concrete implementations for external systems (generative-language HTTP API, image sources)

pub mod gemini;
pub mod image_source;
