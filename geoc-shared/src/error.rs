//! Error type shared by every host component.
//!
//! Variants follow the four failure classes of the host layer:
//! - environment capability failures (no graphics context),
//! - resource creation failures carrying the native diagnostic log,
//! - invalid handles or unregistered operations,
//! - invalid numeric input coming from the UI.

use thiserror::Error;

use crate::scene::Operation;

pub type Result<T> = std::result::Result<T, GeocError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocError {
    // ========================================================================
    // Environment
    // ========================================================================
    /// The browser could not provide the requested graphics context.
    #[error("No WebGL support on this browser")]
    NoGraphicsContext,

    /// A host facility (window, document, canvas) is missing.
    #[error("Host environment error: {0}")]
    Environment(String),

    // ========================================================================
    // Guest memory
    // ========================================================================
    /// A pointer/length pair reaches past the end of linear memory.
    #[error("Memory range {ptr:#x}+{len} is outside linear memory of {size} bytes")]
    OutOfBounds { ptr: u32, len: u32, size: usize },

    /// A string crossing the boundary is not valid UTF-8.
    #[error("Invalid UTF-8 at {ptr:#x}+{len}")]
    InvalidUtf8 { ptr: u32, len: u32 },

    /// No free scratch region is large enough for the requested index array.
    #[error("Scratch region exhausted: {requested} bytes requested, {available} available")]
    ScratchExhausted { requested: usize, available: usize },

    // ========================================================================
    // Graphics resources
    // ========================================================================
    #[error("Invalid shader type {0}")]
    InvalidShaderType(u32),

    #[error("Failed to compile shader: {0}")]
    ShaderCompile(String),

    #[error("Failed to link program: {0}")]
    ProgramLink(String),

    /// The graphics context refused to allocate an object.
    #[error("Failed to create {0}")]
    ResourceCreation(&'static str),

    /// A resource needed to build another one is absent.
    #[error("Missing {kind} for handle {handle}")]
    MissingDependency { kind: &'static str, handle: u32 },

    #[error("Unknown vertex attribute type {0}")]
    UnknownAttribType(u32),

    #[error("Unsupported draw mode {0}")]
    UnsupportedDrawMode(u32),

    #[error("Unknown buffer usage {0}")]
    UnknownBufferUsage(u32),

    #[error("Handle space exhausted")]
    HandlesExhausted,

    // ========================================================================
    // Scene / guest calls
    // ========================================================================
    #[error("Scene entity pointer has not been registered")]
    SceneNotRegistered,

    #[error("No function pointer registered for {0:?}")]
    UnregisteredOperation(Operation),

    /// The exported function threw or trapped.
    #[error("Guest call `{export}` failed: {message}")]
    GuestTrap { export: String, message: String },

    #[error("No animation run with id {0}")]
    UnknownRun(u64),

    // ========================================================================
    // Input
    // ========================================================================
    #[error("Invalid numeric input {0:?}")]
    InvalidInput(String),

    #[error("Transform has no effect")]
    EmptyTransform,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for GeocError {
    fn from(e: toml::de::Error) -> Self {
        GeocError::Config(e.to_string())
    }
}
