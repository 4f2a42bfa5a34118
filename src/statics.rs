// Central place for UI strings and other non-localized constants.
// Keep these out of gui.rs and session.rs to reduce duplication and make tweaks safer.

// External links
pub const GITHUB_URL: &str = "https://github.com/dovetail-nbt/dovetail";

// Recognized file extensions (without the leading dot).
pub const BINARY_EXTENSIONS: &[&str] = &[
    "nbt",
    "dat",
    "dat_old",
    "mcstructure",
    "litematic",
    "schem",
    "schematic",
];
pub const TEXT_EXTENSION: &str = "snbt";

// English UI strings (EN_ prefix to make future localization easier)
pub const EN_APP_TITLE: &str = "Dovetail";
pub const EN_TITLE_SEPARATOR: &str = " - ";

pub const EN_BTN_OPEN: &str = "Open...";
pub const EN_BTN_SAVE: &str = "Save";
pub const EN_BTN_FORMAT_OPTIONS: &str = "Format Options";
pub const EN_BTN_ABOUT: &str = "About";
pub const EN_BTN_TOGGLE_THEME: &str = "Theme";
pub const EN_CHECKBOX_TREE_VIEW: &str = "Tree View";

pub const EN_WINDOW_FORMAT_OPTIONS: &str = "Format Options";
pub const EN_WINDOW_ABOUT: &str = "About";

pub const EN_ABOUT_HEADING: &str = "Dovetail: NBT Editor";
pub const EN_ABOUT_VERSION: &str = "Version:";
pub const EN_PROJECT_REPO: &str = "GitHub Repo";

pub const EN_HOME_HEADING: &str = "Dovetail: NBT Editor";
pub const EN_HOME_INSTRUCTIONS: &str =
    "Open an NBT file (.nbt, .dat, .mcstructure, .litematic, .schem, .snbt) or drop one here.";

pub const EN_FORMAT_ROOT_NAME: &str = "Root Name";
pub const EN_FORMAT_DISABLE_NAME: &str = "Disable";
pub const EN_FORMAT_ENDIAN: &str = "Endian";
pub const EN_FORMAT_COMPRESSION: &str = "Compression";
pub const EN_FORMAT_BEDROCK_LEVEL: &str = "Bedrock Level";
pub const EN_FORMAT_TEXT_NOTATION: &str = "Format options do not apply to SNBT files.";

pub const EN_FILTER_NBT: &str = "NBT";
pub const EN_FILTER_SNBT: &str = "SNBT";
pub const EN_FILTER_ALL: &str = "All files";

pub const EN_STATUS_READY: &str = "Ready";
pub const EN_STATUS_OPENING: &str = "Opening...";
pub const EN_STATUS_DECODING: &str = "Reading...";
pub const EN_STATUS_ENCODING: &str = "Writing...";
pub const EN_STATUS_SAVING: &str = "Saving...";
pub const EN_STATUS_NO_FILE: &str = "No file open";

// Tree view labels for containers without a usable name.
pub const EN_TREE_UNNAMED: &str = "(unnamed)";
pub const EN_TREE_EMPTY_NAME: &str = "\"\"";
pub const EN_TREE_INVALID_TEXT: &str = "The text editor does not contain valid SNBT.";

// Prompts. `{name}` is replaced with the file name.
pub const EN_PROMPT_TRAILING_DATA: &str = "'{name}' has extra data after the NBT content. Open it anyway without strict mode? The trailing data will be lost when the file is saved again.";
pub const EN_PROMPT_SAVE_MANUALLY: &str =
    "'{name}' could not be saved in-place. Choose another location to save it to instead?";

/// Fills the `{name}` placeholder of a prompt template.
pub fn with_name(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}
