use thiserror::Error;

/// Errors raised while loading, indexing or rendering site content.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Duplicate slug '{0}'")]
    DuplicateSlug(String),

    #[error("Slug '{0}' is reserved for generated pages")]
    ReservedSlug(String),

    #[error("No page with slug '{0}'")]
    NotFound(String),

    #[error("Invalid content block: {0}")]
    InvalidBlock(String),

    #[error("Missing required field '{0}'")]
    MissingRequiredField(&'static str),

    #[error("Front matter error: {0}")]
    FrontMatter(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
