use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Verse {sura}:{ayah} not found")]
    LookupNotFound { sura: u32, ayah: u32 },

    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    #[error("No timing data for verse {sura}:{ayah}")]
    TimingDataMissing { sura: u32, ayah: u32 },

    #[error("Failed to build composition: {0}")]
    CompositionBuild(String),

    #[error("External engine failed: {0}")]
    ExternalEngine(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid ayah range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ReelError>;
