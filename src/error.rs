use thiserror::Error;

pub type Result<T> = std::result::Result<T, LfsError>;

#[derive(Debug, Error)]
pub enum LfsError {
    #[error("Error handlers are already installed on this dispatcher")]
    AlreadyInstalled,

    #[error("Invalid error status code: {0}")]
    InvalidStatus(u16),
}
