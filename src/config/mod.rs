// mod.rs - Configuration module

pub mod settings;
pub mod validation;

// Re-export main types for convenience
pub use settings::ScanConfig;
pub use validation::ValidatedConfig;
