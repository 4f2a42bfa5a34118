//! Core library for Dovetail, an NBT document viewer and editor.
//! Provides the binary NBT and SNBT codecs, the tree view walker, the format options form and
//! the open/save session that ties them to a platform.

pub mod binary;
pub mod codec;
pub mod format;
mod gui;
pub mod session;
pub mod snbt;
pub mod statics;
pub mod tag;
pub mod tree;

pub use codec::{Codec, DecodeError, DecodeOptions, EncodeError, NbtCodec};
pub use format::{CompressionChoice, FormatForm, ValidationError};
pub use gui::{DesktopPlatform, FsHandle, run_gui};
pub use session::{
    Blob, FileHandle, FileSource, OpenDocument, OpenOutcome, Platform, SaveOutcome, SavedFile,
    Session, SessionError, SessionOptions, SessionState,
};
pub use snbt::SnbtError;
pub use tag::{Compression, Endianness, FormatMetadata, RootDocument, Tag, TagId, TagList};
pub use tree::{DisplayNode, DisplayTree, Expansion, NameRequired, NodePath};
