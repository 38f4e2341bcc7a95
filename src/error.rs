//! Error types.

use crate::components::scene::NodeId;
use std::io;
use thiserror::Error;

/// Errors raised while drawing a screen.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error while presenting: {0}")]
    Io(#[from] io::Error),

    #[error("presentation surface has no buffer strategy even after recreating it")]
    NoBufferStrategy,

    #[error("back buffer contents were lost {attempts} times in a row")]
    ContentsLost { attempts: u32 },

    #[error("node {0:?} is not a screen in this scene")]
    UnknownScreen(NodeId),
}

/// Reasons why a component could not be attached to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0:?} is a widget and cannot hold components")]
    NotAContainer(NodeId),

    #[error("attaching {child:?} to {parent:?} would create a containment cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("{child:?} is already a component of {parent:?}")]
    AlreadyAttached { parent: NodeId, child: NodeId },

    #[error("{child:?} already belongs to {owner:?}; only screens can have several parents")]
    AlreadyOwned { child: NodeId, owner: NodeId },
}

/// Errors raised while building a glyph font.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontError {
    #[error("glyph size must be non-zero, got {width}x{height}")]
    InvalidGlyphSize { width: u32, height: u32 },

    #[error(
        "sprite sheet of {sheet_width}x{sheet_height} cannot hold a single {glyph_width}x{glyph_height} glyph"
    )]
    SheetTooSmall {
        sheet_width: u32,
        sheet_height: u32,
        glyph_width: u32,
        glyph_height: u32,
    },

    #[error("glyph for {character:?} is {actual:?}, expected {expected:?}")]
    GlyphSizeMismatch {
        character: char,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Errors raised while reading a render configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the terminal application loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}
