use std::fmt;

/// A native resource owned by the [`Driver`](crate::Driver).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Window,
    Renderer,
    Context,
    Bindings,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Window => "window",
            Resource::Renderer => "renderer",
            Resource::Context => "GUI context",
            Resource::Bindings => "backend bindings",
        };
        f.write_str(name)
    }
}

/// The step of a frame where an error happened.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Input,
    Begin,
    Convert,
    Draw,
    Present,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "polling input",
            Stage::Begin => "beginning frame",
            Stage::Convert => "converting commands",
            Stage::Draw => "drawing",
            Stage::Present => "presenting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("creating {resource}: {message}")]
    Init { resource: Resource, message: String },
    #[error("{stage}: {message}")]
    Frame { stage: Stage, message: String },
    #[error("releasing {resource}: {message}")]
    Destroy { resource: Resource, message: String },
}

impl Error {
    pub fn init(resource: Resource, e: impl fmt::Display) -> Error {
        Error::Init {
            resource,
            message: e.to_string(),
        }
    }
    pub fn frame(stage: Stage, e: impl fmt::Display) -> Error {
        Error::Frame {
            stage,
            message: e.to_string(),
        }
    }
    pub fn destroy(resource: Resource, e: impl fmt::Display) -> Error {
        Error::Destroy {
            resource,
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
