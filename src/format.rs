use crate::tag::{Compression, Endianness, FormatMetadata, RootDocument};

/// The compression radio group, including the explicit "none" choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionChoice {
    #[default]
    None,
    Gzip,
    Zlib,
    RawDeflate,
}

impl CompressionChoice {
    pub const ALL: [CompressionChoice; 4] = [
        CompressionChoice::None,
        CompressionChoice::Gzip,
        CompressionChoice::Zlib,
        CompressionChoice::RawDeflate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CompressionChoice::None => "None",
            CompressionChoice::Gzip => "gzip",
            CompressionChoice::Zlib => "deflate (zlib)",
            CompressionChoice::RawDeflate => "deflate-raw",
        }
    }

    fn from_compression(compression: Option<Compression>) -> Self {
        match compression {
            None => CompressionChoice::None,
            Some(Compression::Gzip) => CompressionChoice::Gzip,
            Some(Compression::Zlib) => CompressionChoice::Zlib,
            Some(Compression::RawDeflate) => CompressionChoice::RawDeflate,
        }
    }

    fn to_compression(self) -> Option<Compression> {
        match self {
            CompressionChoice::None => None,
            CompressionChoice::Gzip => Some(Compression::Gzip),
            CompressionChoice::Zlib => Some(Compression::Zlib),
            CompressionChoice::RawDeflate => Some(Compression::RawDeflate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Bedrock level '{0}' is not a whole number")]
    NotAnInteger(String),

    #[error("Bedrock level '{0}' must be between 0 and 4294967295")]
    OutOfRange(String),
}

/// Editable state of the Format Options form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatForm {
    pub name: String,
    pub name_disabled: bool,
    pub endianness: Endianness,
    pub compression: CompressionChoice,
    /// Raw text of the Bedrock level field; empty means no header.
    pub bedrock_level: String,
}

impl FormatForm {
    /// Loads a document's format metadata into the form.
    pub fn import_metadata(&mut self, doc: &RootDocument) -> FormatMetadata {
        let format = &doc.format;
        match &format.root_name {
            Some(name) => {
                self.name = name.clone();
                self.name_disabled = false;
            }
            None => {
                self.name.clear();
                self.name_disabled = true;
            }
        }
        self.endianness = format.endianness;
        self.compression = CompressionChoice::from_compression(format.compression);
        self.bedrock_level = format
            .bedrock_level
            .map(|level| level.to_string())
            .unwrap_or_default();
        format.clone()
    }

    /// Reads the form back into format metadata.
    pub fn export_metadata(&self) -> Result<FormatMetadata, ValidationError> {
        let root_name = (!self.name_disabled).then(|| self.name.clone());

        let text = self.bedrock_level.trim();
        let bedrock_level = if text.is_empty() {
            None
        } else {
            let level = match text.parse::<i128>() {
                Ok(value) => u32::try_from(value).ok(),
                Err(_) if is_whole_number(text) => None,
                Err(_) => return Err(ValidationError::NotAnInteger(text.to_string())),
            };
            Some(level.ok_or_else(|| ValidationError::OutOfRange(text.to_string()))?)
        };

        Ok(FormatMetadata {
            root_name,
            endianness: self.endianness,
            compression: self.compression.to_compression(),
            bedrock_level,
        })
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Checking "disable" drops the name; unchecking starts from an empty one.
    pub fn set_name_disabled(&mut self, disabled: bool) {
        self.name_disabled = disabled;
        self.name.clear();
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub fn set_compression(&mut self, compression: CompressionChoice) {
        self.compression = compression;
    }

    pub fn set_bedrock_level(&mut self, text: impl Into<String>) {
        self.bedrock_level = text.into();
    }
}

/// An optionally signed run of digits, however long.
fn is_whole_number(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{CompressionChoice, FormatForm, ValidationError};
    use crate::tag::{Compression, Endianness, FormatMetadata, RootDocument, Tag};
    use indexmap::IndexMap;

    fn doc(format: FormatMetadata) -> RootDocument {
        RootDocument::new(Tag::Compound(IndexMap::new()), format)
    }

    #[test]
    fn export_after_import_is_identity() {
        let formats = [
            FormatMetadata::default(),
            FormatMetadata {
                root_name: None,
                endianness: Endianness::LittleVarint,
                compression: Some(Compression::RawDeflate),
                bedrock_level: Some(u32::MAX),
            },
            FormatMetadata {
                root_name: Some("Level".to_string()),
                endianness: Endianness::Little,
                compression: Some(Compression::Zlib),
                bedrock_level: Some(0),
            },
            FormatMetadata {
                root_name: Some(String::new()),
                endianness: Endianness::Big,
                compression: Some(Compression::Gzip),
                bedrock_level: None,
            },
        ];
        for format in formats {
            let mut form = FormatForm::default();
            let imported = form.import_metadata(&doc(format.clone()));
            assert_eq!(imported, format);
            assert_eq!(form.export_metadata().unwrap(), format);
        }
    }

    #[test]
    fn import_maps_nulls_to_empty_fields() {
        let mut form = FormatForm::default();
        form.import_metadata(&doc(FormatMetadata {
            root_name: None,
            endianness: Endianness::Big,
            compression: None,
            bedrock_level: None,
        }));
        assert!(form.name_disabled);
        assert_eq!(form.name, "");
        assert_eq!(form.compression, CompressionChoice::None);
        assert_eq!(form.bedrock_level, "");
    }

    #[test]
    fn bedrock_level_is_validated() {
        let mut form = FormatForm::default();
        form.set_bedrock_level(" 8 ");
        assert_eq!(form.export_metadata().unwrap().bedrock_level, Some(8));

        form.set_bedrock_level("4294967296");
        assert_eq!(
            form.export_metadata(),
            Err(ValidationError::OutOfRange("4294967296".to_string()))
        );

        form.set_bedrock_level("-1");
        assert!(matches!(
            form.export_metadata(),
            Err(ValidationError::OutOfRange(_))
        ));

        form.set_bedrock_level("eight");
        assert!(matches!(
            form.export_metadata(),
            Err(ValidationError::NotAnInteger(_))
        ));

        form.set_bedrock_level("");
        assert_eq!(form.export_metadata().unwrap().bedrock_level, None);
    }

    #[test]
    fn huge_whole_numbers_are_out_of_range() {
        let mut form = FormatForm::default();
        let digits = "9".repeat(40);
        form.set_bedrock_level(digits.as_str());
        assert_eq!(
            form.export_metadata(),
            Err(ValidationError::OutOfRange(digits.clone()))
        );

        form.set_bedrock_level(format!("-{digits}"));
        assert!(matches!(
            form.export_metadata(),
            Err(ValidationError::OutOfRange(_))
        ));

        form.set_bedrock_level("12x4");
        assert!(matches!(
            form.export_metadata(),
            Err(ValidationError::NotAnInteger(_))
        ));
    }

    #[test]
    fn toggling_disable_resets_the_name() {
        let mut form = FormatForm::default();
        form.set_name("Data");
        form.set_name_disabled(true);
        assert_eq!(form.export_metadata().unwrap().root_name, None);
        form.set_name_disabled(false);
        assert_eq!(form.export_metadata().unwrap().root_name.as_deref(), Some(""));
    }
}
