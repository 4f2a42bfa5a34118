//! Open/edit/save lifecycle of one document.
//!
//! The session owns the open document, the editor text, the format form and the tree's
//! expansion state. Everything that talks to the outside world (pickers, dialogs, file
//! writes, sharing) goes through a [`Platform`], so the same flow drives the desktop shell
//! and the tests.

use crate::codec::{Codec, DecodeError, DecodeOptions, EncodeError, NbtCodec};
use crate::format::{FormatForm, ValidationError};
use crate::snbt::SnbtError;
use crate::statics;
use crate::tag::{FormatMetadata, RootDocument, Tag};
use crate::tree::{self, DisplayTree, Expansion, NameRequired, NodePath};
use std::io;

/// A file-system entry the session can read from and write back to.
pub trait FileHandle {
    fn name(&self) -> &str;
    fn read(&self) -> io::Result<Vec<u8>>;
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// File contents without a way to write them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Everything `open` accepts.
#[derive(Debug)]
pub enum FileSource<H> {
    Handle(H),
    Blob(Blob),
    /// A drag-and-drop item. The handle wins when both are present.
    Dropped {
        handle: Option<H>,
        file: Option<Blob>,
    },
}

/// Bytes produced by `save`, ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub trait Platform {
    type Handle: FileHandle;

    /// Shows the open-file picker. `Ok(None)` means the user cancelled.
    fn pick_file(&mut self) -> anyhow::Result<Option<FileSource<Self::Handle>>>;

    fn confirm(&mut self, message: &str) -> bool;

    fn alert(&mut self, message: &str);

    /// Whether saving must go through the share sheet instead of the file system.
    fn share_required(&self) -> bool {
        false
    }

    fn share(&mut self, file: &SavedFile) -> anyhow::Result<()>;

    /// Saves `file` somewhere the user picks. `Ok(false)` means the dialog was dismissed.
    fn download(&mut self, file: &SavedFile) -> anyhow::Result<bool>;

    fn state_changed(&mut self, _state: SessionState) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Opening,
    Decoding,
    Ready,
    Encoding,
    Saving,
}

impl SessionState {
    /// Editing is disabled while an operation is in flight.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SessionState::Opening
                | SessionState::Decoding
                | SessionState::Encoding
                | SessionState::Saving
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => statics::EN_STATUS_NO_FILE,
            SessionState::Opening => statics::EN_STATUS_OPENING,
            SessionState::Decoding => statics::EN_STATUS_DECODING,
            SessionState::Ready => statics::EN_STATUS_READY,
            SessionState::Encoding => statics::EN_STATUS_ENCODING,
            SessionState::Saving => statics::EN_STATUS_SAVING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// `recovered` is set when trailing bytes were dropped to read the file.
    Opened { name: String, recovered: bool },
    Cancelled,
    /// The user refused the non-strict retry.
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Shared,
    WrittenInPlace,
    /// `fallback` is set when an in-place write failed first.
    Downloaded { fallback: bool },
    /// Nothing was written: the user refused the manual save or dismissed the save dialog.
    Declined,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Could not read '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not read '{name}' as NBT data.\n\n{source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("Could not parse SNBT: {0}")]
    TextParse(#[from] SnbtError),

    #[error("Invalid format options: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not write '{name}' as NBT data: {source}")]
    Encode {
        name: String,
        #[source]
        source: EncodeError,
    },

    #[error("Could not share '{name}': {source:#}")]
    Share {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not save '{name}': {source:#}")]
    Download {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No file is open")]
    NoDocument,

    #[error("Could not open the file picker: {0:#}")]
    Picker(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Spaces per nesting level in the editor text.
    pub indent: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// The document currently being edited, with the handle it was opened from.
#[derive(Debug)]
pub struct OpenDocument<H> {
    pub name: String,
    pub document: RootDocument,
    pub handle: Option<H>,
}

struct ResolvedFile<H> {
    name: String,
    bytes: Vec<u8>,
    handle: Option<H>,
}

/// Whether `name` is a text-notation file rather than binary NBT.
pub fn is_text_notation(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(statics::TEXT_EXTENSION))
}

pub struct Session<P: Platform, C: Codec = NbtCodec> {
    platform: P,
    codec: C,
    options: SessionOptions,
    state: SessionState,
    document: Option<OpenDocument<P::Handle>>,
    form: FormatForm,
    editor_text: String,
    /// Last edit that parsed, and the error of the current text when it does not.
    edited: Option<Tag>,
    text_error: Option<SnbtError>,
    expansion: Expansion,
}

impl<P: Platform> Session<P, NbtCodec> {
    pub fn new(platform: P) -> Self {
        Self::with_codec(platform, NbtCodec, SessionOptions::default())
    }
}

impl<P: Platform, C: Codec> Session<P, C> {
    pub fn with_codec(platform: P, codec: C, options: SessionOptions) -> Self {
        Self {
            platform,
            codec,
            options,
            state: SessionState::Idle,
            document: None,
            form: FormatForm::default(),
            editor_text: String::new(),
            edited: None,
            text_error: None,
            expansion: Expansion::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&OpenDocument<P::Handle>> {
        self.document.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn format_form(&self) -> &FormatForm {
        &self.form
    }

    pub fn format_form_mut(&mut self) -> &mut FormatForm {
        &mut self.form
    }

    pub fn editor_text(&self) -> &str {
        &self.editor_text
    }

    pub fn set_editor_text(&mut self, text: impl Into<String>) {
        self.editor_text = text.into();
        match self.codec.parse_text(&self.editor_text) {
            Ok(tag) => {
                self.edited = Some(tag);
                self.text_error = None;
            }
            Err(e) => self.text_error = Some(e),
        }
    }

    /// Why the current editor text does not parse, if it does not.
    pub fn editor_text_error(&self) -> Option<&SnbtError> {
        self.text_error.as_ref()
    }

    pub fn title(&self) -> String {
        match &self.document {
            Some(open) => format!(
                "{}{}{}",
                statics::EN_APP_TITLE,
                statics::EN_TITLE_SEPARATOR,
                open.name
            ),
            None => statics::EN_APP_TITLE.to_string(),
        }
    }

    /// Format options do not apply to text-notation files.
    pub fn is_editing_text_notation(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|open| is_text_notation(&open.name))
    }

    /// Flips a container in the tree view. The document root stays open.
    pub fn toggle_expansion(&mut self, path: &NodePath) -> bool {
        if path.is_root() {
            return true;
        }
        self.expansion.toggle(path)
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    /// Renders the last edit that parsed, or the open document before any edit.
    /// `None` when nothing is open.
    pub fn display_tree(&self) -> Option<Result<DisplayTree, NameRequired>> {
        let open = self.document.as_ref()?;
        let tag = self.edited.as_ref().unwrap_or(&open.document.root_tag);
        let name = open.document.format.root_name.as_deref();
        Some(tree::render(name, tag, true, &self.expansion))
    }

    /// Opens `source`, or asks the platform for a file when `None`.
    pub fn open(
        &mut self,
        source: Option<FileSource<P::Handle>>,
    ) -> Result<OpenOutcome, SessionError> {
        self.set_state(SessionState::Opening);
        let result = self.open_inner(source);
        self.settle();
        match result {
            Ok(outcome) => {
                match &outcome {
                    OpenOutcome::Opened { name, recovered } => {
                        log::info!("Opened {name} (recovered: {recovered})");
                    }
                    OpenOutcome::Cancelled => log::debug!("Open cancelled"),
                    OpenOutcome::Declined => log::info!("Non-strict retry declined"),
                }
                Ok(outcome)
            }
            Err(error) => Err(self.report(error)),
        }
    }

    /// Parses the editor text and delivers it in the document's format.
    pub fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        if self.document.is_none() {
            return Err(self.report(SessionError::NoDocument));
        }
        self.set_state(SessionState::Encoding);
        let result = self.save_inner();
        self.settle();
        match result {
            Ok(outcome) => {
                log::info!("Save finished: {outcome:?}");
                Ok(outcome)
            }
            Err(error) => Err(self.report(error)),
        }
    }

    fn open_inner(
        &mut self,
        source: Option<FileSource<P::Handle>>,
    ) -> Result<OpenOutcome, SessionError> {
        let source = match source {
            Some(source) => source,
            None => match self.platform.pick_file().map_err(SessionError::Picker)? {
                Some(source) => source,
                None => return Ok(OpenOutcome::Cancelled),
            },
        };
        let Some(file) = resolve(source)? else {
            return Ok(OpenOutcome::Cancelled);
        };

        self.set_state(SessionState::Decoding);
        let Some((document, recovered)) = self.decode(&file)? else {
            return Ok(OpenOutcome::Declined);
        };

        self.form.import_metadata(&document);
        self.editor_text = self
            .codec
            .stringify_text(&document.root_tag, self.options.indent);
        self.edited = None;
        self.text_error = None;
        self.expansion.clear();
        let name = file.name;
        self.document = Some(OpenDocument {
            name: name.clone(),
            document,
            handle: file.handle,
        });
        Ok(OpenOutcome::Opened { name, recovered })
    }

    /// `Ok(None)` when the user declines the non-strict retry.
    fn decode(
        &mut self,
        file: &ResolvedFile<P::Handle>,
    ) -> Result<Option<(RootDocument, bool)>, SessionError> {
        if is_text_notation(&file.name) {
            let text = std::str::from_utf8(&file.bytes).map_err(|e| SessionError::Read {
                name: file.name.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;
            let tag = self.codec.parse_text(text)?;
            return Ok(Some((RootDocument::new(tag, FormatMetadata::default()), false)));
        }

        let decode_error = |source| SessionError::Decode {
            name: file.name.clone(),
            source,
        };
        match self.codec.decode(&file.bytes, DecodeOptions { strict: true }) {
            Ok(document) => Ok(Some((document, false))),
            Err(error) if error.is_trailing_data() => {
                log::warn!("{}: {error}", file.name);
                let prompt = format!(
                    "{error}\n\n{}",
                    statics::with_name(statics::EN_PROMPT_TRAILING_DATA, &file.name)
                );
                if !self.platform.confirm(&prompt) {
                    return Ok(None);
                }
                let document = self
                    .codec
                    .decode(&file.bytes, DecodeOptions { strict: false })
                    .map_err(decode_error)?;
                Ok(Some((document, true)))
            }
            Err(error) => Err(decode_error(error)),
        }
    }

    fn save_inner(&mut self) -> Result<SaveOutcome, SessionError> {
        let open = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let name = open.name.clone();

        let root_tag = self.codec.parse_text(&self.editor_text)?;
        let format = self.form.export_metadata()?;
        let document = RootDocument::new(root_tag, format);

        let bytes = if is_text_notation(&name) {
            self.codec
                .stringify_text(&document.root_tag, self.options.indent)
                .into_bytes()
        } else {
            self.codec
                .encode(&document)
                .map_err(|source| SessionError::Encode {
                    name: name.clone(),
                    source,
                })?
        };
        let file = SavedFile { name, bytes };

        self.set_state(SessionState::Saving);
        let outcome = self.deliver(&file)?;
        if outcome != SaveOutcome::Declined
            && let Some(open) = self.document.as_mut()
        {
            open.document = document;
        }
        Ok(outcome)
    }

    fn deliver(&mut self, file: &SavedFile) -> Result<SaveOutcome, SessionError> {
        if self.platform.share_required() {
            self.platform
                .share(file)
                .map_err(|source| SessionError::Share {
                    name: file.name.clone(),
                    source,
                })?;
            return Ok(SaveOutcome::Shared);
        }

        let handle = self.document.as_ref().and_then(|open| open.handle.as_ref());
        let mut fallback = false;
        if let Some(handle) = handle {
            match handle.write(&file.bytes) {
                Ok(()) => return Ok(SaveOutcome::WrittenInPlace),
                Err(error) => {
                    log::warn!("In-place write of {} failed: {error}", file.name);
                    let prompt = statics::with_name(statics::EN_PROMPT_SAVE_MANUALLY, &file.name);
                    if !self.platform.confirm(&prompt) {
                        return Ok(SaveOutcome::Declined);
                    }
                    fallback = true;
                }
            }
        }

        let downloaded =
            self.platform
                .download(file)
                .map_err(|source| SessionError::Download {
                    name: file.name.clone(),
                    source,
                })?;
        if !downloaded {
            log::info!("Save dialog for {} dismissed", file.name);
            return Ok(SaveOutcome::Declined);
        }
        Ok(SaveOutcome::Downloaded { fallback })
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!("Session state {:?} -> {state:?}", self.state);
            self.state = state;
            self.platform.state_changed(state);
        }
    }

    /// Returns to the resting state for whatever is open now.
    fn settle(&mut self) {
        let resting = if self.document.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        };
        self.set_state(resting);
    }

    fn report(&mut self, error: SessionError) -> SessionError {
        log::error!("{error}");
        self.platform.alert(&error.to_string());
        error
    }
}

fn resolve<H: FileHandle>(source: FileSource<H>) -> Result<Option<ResolvedFile<H>>, SessionError> {
    let from_handle = |handle: H| {
        let name = handle.name().to_string();
        match handle.read() {
            Ok(bytes) => Ok(ResolvedFile {
                name,
                bytes,
                handle: Some(handle),
            }),
            Err(source) => Err(SessionError::Read { name, source }),
        }
    };
    let from_blob = |blob: Blob| ResolvedFile {
        name: blob.name,
        bytes: blob.bytes,
        handle: None,
    };

    match source {
        FileSource::Handle(handle)
        | FileSource::Dropped {
            handle: Some(handle),
            ..
        } => from_handle(handle).map(Some),
        FileSource::Blob(blob)
        | FileSource::Dropped {
            handle: None,
            file: Some(blob),
        } => Ok(Some(from_blob(blob))),
        FileSource::Dropped {
            handle: None,
            file: None,
        } => Ok(None),
    }
}
