pub mod core;
pub mod render;
pub mod runtime;
pub mod view;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrataError {
    /// Scene description could not be read or is inconsistent.
    InvalidScene,
    /// Camera matrices are singular or not finite.
    Projection,
    Io,
}

impl fmt::Display for StrataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScene => write!(f, "invalid scene description"),
            Self::Projection => write!(f, "unusable camera projection"),
            Self::Io => write!(f, "scene i/o failed"),
        }
    }
}

impl std::error::Error for StrataError {}

pub type Result<T> = std::result::Result<T, error_stack::Report<StrataError>>;

pub mod prelude {
    pub use crate::core::*;
    pub use crate::render::*;
    pub use crate::runtime::*;
    pub use crate::view::*;
}
