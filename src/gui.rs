use crate::format::CompressionChoice;
use crate::session::{
    Blob, FileHandle, FileSource, OpenOutcome, Platform, SaveOutcome, SavedFile, Session,
    SessionState,
};
use crate::statics;
use crate::tag::Endianness;
use crate::tree::{DisplayNode, NodePath};
use anyhow::Context as _;
use eframe::egui;
use std::io;
use std::path::{Path, PathBuf};

pub fn run_gui() -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        statics::EN_APP_TITLE,
        options,
        Box::new(|_cc| Ok(Box::new(DovetailApp::new()))),
    )
}

/// A file on disk that can be written back in place.
#[derive(Debug, Clone)]
pub struct FsHandle {
    path: PathBuf,
    name: String,
}

impl FsHandle {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileHandle for FsHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(&self.path, bytes)
    }
}

/// Native dialogs for pickers and prompts. There is no share sheet on desktop.
#[derive(Default)]
pub struct DesktopPlatform {
    dialog_dir: Option<PathBuf>,
    state: SessionState,
}

impl DesktopPlatform {
    fn file_dialog(&self) -> rfd::FileDialog {
        let mut dlg = rfd::FileDialog::new()
            .add_filter(statics::EN_FILTER_NBT, statics::BINARY_EXTENSIONS)
            .add_filter(statics::EN_FILTER_SNBT, &[statics::TEXT_EXTENSION])
            .add_filter(statics::EN_FILTER_ALL, &["*"]);
        if let Some(dir) = self.dialog_dir.clone() {
            dlg = dlg.set_directory(dir);
        }
        dlg
    }

    fn remember_dir(&mut self, path: &Path) {
        self.dialog_dir = path.parent().map(PathBuf::from);
    }
}

impl Platform for DesktopPlatform {
    type Handle = FsHandle;

    fn pick_file(&mut self) -> anyhow::Result<Option<FileSource<FsHandle>>> {
        let Some(path) = self.file_dialog().pick_file() else {
            return Ok(None);
        };
        self.remember_dir(&path);
        Ok(Some(FileSource::Handle(FsHandle::new(path))))
    }

    fn confirm(&mut self, message: &str) -> bool {
        rfd::MessageDialog::new()
            .set_title(statics::EN_APP_TITLE)
            .set_description(message)
            .set_level(rfd::MessageLevel::Warning)
            .set_buttons(rfd::MessageButtons::OkCancel)
            .show()
            == rfd::MessageDialogResult::Ok
    }

    fn alert(&mut self, message: &str) {
        rfd::MessageDialog::new()
            .set_title(statics::EN_APP_TITLE)
            .set_description(message)
            .set_level(rfd::MessageLevel::Error)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }

    fn share(&mut self, _file: &SavedFile) -> anyhow::Result<()> {
        anyhow::bail!("sharing is not available on this platform")
    }

    fn download(&mut self, file: &SavedFile) -> anyhow::Result<bool> {
        let Some(path) = self.file_dialog().set_file_name(&file.name).save_file() else {
            return Ok(false);
        };
        std::fs::write(&path, &file.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.remember_dir(&path);
        Ok(true)
    }

    fn state_changed(&mut self, state: SessionState) {
        self.state = state;
    }
}

struct DovetailApp {
    session: Session<DesktopPlatform>,
    // Mirror of the session's editor text for the egui text widget.
    editor_buffer: String,
    tree_view: bool,
    format_open: bool,
    about_open: bool,
    theme_dark: bool,
    title: String,
    status: String,
}

impl DovetailApp {
    fn new() -> Self {
        Self {
            session: Session::new(DesktopPlatform::default()),
            editor_buffer: String::new(),
            tree_view: true,
            format_open: false,
            about_open: false,
            theme_dark: true,
            title: statics::EN_APP_TITLE.to_string(),
            status: String::new(),
        }
    }

    fn open(&mut self, source: Option<FileSource<FsHandle>>) {
        match self.session.open(source) {
            Ok(OpenOutcome::Opened { name, recovered }) => {
                self.editor_buffer = self.session.editor_text().to_string();
                self.status = if recovered {
                    format!("Loaded {name} (trailing data dropped)")
                } else {
                    format!("Loaded {name}")
                };
            }
            Ok(OpenOutcome::Cancelled | OpenOutcome::Declined) => {}
            Err(e) => self.status = e.to_string(),
        }
    }

    fn save(&mut self) {
        self.status = match self.session.save() {
            Ok(SaveOutcome::WrittenInPlace) => "Saved in place".to_string(),
            Ok(SaveOutcome::Downloaded { .. }) => "Saved".to_string(),
            Ok(SaveOutcome::Shared) => "Shared".to_string(),
            Ok(SaveOutcome::Declined) => "Not saved".to_string(),
            Err(e) => e.to_string(),
        };
    }

    fn dropped_file(ctx: &egui::Context) -> Option<FileSource<FsHandle>> {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned())?;
        let handle = dropped.path.clone().map(FsHandle::new);
        let file = dropped.bytes.map(|bytes| Blob {
            name: dropped.name.clone(),
            bytes: bytes.to_vec(),
        });
        Some(FileSource::Dropped { handle, file })
    }

    fn render_format_options(&mut self, ctx: &egui::Context) {
        let mut open = self.format_open;
        let text_notation = self.session.is_editing_text_notation();
        egui::Window::new(statics::EN_WINDOW_FORMAT_OPTIONS)
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                if text_notation {
                    ui.label(statics::EN_FORMAT_TEXT_NOTATION);
                    ui.separator();
                }
                ui.add_enabled_ui(!text_notation, |ui| {
                    let form = self.session.format_form_mut();
                    egui::Grid::new("format_grid")
                        .num_columns(2)
                        .spacing([12.0, 6.0])
                        .show(ui, |ui| {
                            ui.label(statics::EN_FORMAT_ROOT_NAME);
                            ui.horizontal(|ui| {
                                ui.add_enabled(
                                    !form.name_disabled,
                                    egui::TextEdit::singleline(&mut form.name),
                                );
                                let mut disabled = form.name_disabled;
                                if ui
                                    .checkbox(&mut disabled, statics::EN_FORMAT_DISABLE_NAME)
                                    .changed()
                                {
                                    form.set_name_disabled(disabled);
                                }
                            });
                            ui.end_row();

                            ui.label(statics::EN_FORMAT_ENDIAN);
                            ui.horizontal(|ui| {
                                for endianness in Endianness::ALL {
                                    ui.radio_value(
                                        &mut form.endianness,
                                        endianness,
                                        endianness.label(),
                                    );
                                }
                            });
                            ui.end_row();

                            ui.label(statics::EN_FORMAT_COMPRESSION);
                            ui.horizontal(|ui| {
                                for choice in CompressionChoice::ALL {
                                    ui.radio_value(&mut form.compression, choice, choice.label());
                                }
                            });
                            ui.end_row();

                            ui.label(statics::EN_FORMAT_BEDROCK_LEVEL);
                            ui.text_edit_singleline(&mut form.bedrock_level);
                            ui.end_row();
                        });
                    if let Err(e) = form.export_metadata() {
                        ui.colored_label(egui::Color32::RED, e.to_string());
                    }
                });
            });
        self.format_open = open;
    }

    fn render_tree(&mut self, ui: &mut egui::Ui) {
        let Some(tree) = self.session.display_tree() else {
            return;
        };
        let tree = match tree {
            Ok(tree) => tree,
            Err(e) => {
                ui.colored_label(egui::Color32::RED, e.to_string());
                return;
            }
        };
        if let Some(e) = self.session.editor_text_error() {
            ui.colored_label(
                egui::Color32::YELLOW,
                format!("{} {e}", statics::EN_TREE_INVALID_TEXT),
            );
            ui.separator();
        }

        let mut toggle: Option<NodePath> = None;
        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in tree.rows() {
                    let node = tree.node(row.id);
                    ui.horizontal(|ui| {
                        ui.add_space(row.depth as f32 * 18.0);
                        match node {
                            DisplayNode::Container { open, path, .. } => {
                                let glyph = if *open { "v" } else { ">" };
                                let text = format!("{glyph} {}", node.label());
                                if ui.selectable_label(false, text).clicked() {
                                    toggle = Some(path.clone());
                                }
                            }
                            DisplayNode::Primitive { .. } => {
                                ui.label(egui::RichText::new(node.label()).monospace());
                            }
                        }
                    });
                }
            });
        if let Some(path) = toggle {
            self.session.toggle_expansion(&path);
        }
    }
}

impl eframe::App for DovetailApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(source) = Self::dropped_file(ctx) {
            self.open(Some(source));
        }

        let title = self.session.title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }

        let busy = self.session.platform().state.is_busy();
        let has_doc = self.session.document().is_some();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new(statics::EN_BTN_OPEN))
                    .clicked()
                {
                    self.open(None);
                }
                if ui
                    .add_enabled(has_doc && !busy, egui::Button::new(statics::EN_BTN_SAVE))
                    .clicked()
                {
                    self.save();
                }
                if ui
                    .add_enabled(has_doc, egui::Button::new(statics::EN_BTN_FORMAT_OPTIONS))
                    .clicked()
                {
                    self.format_open = true;
                }
                ui.checkbox(&mut self.tree_view, statics::EN_CHECKBOX_TREE_VIEW);

                ui.separator();
                if ui.button(statics::EN_BTN_ABOUT).clicked() {
                    self.about_open = true;
                }
                if ui.button(statics::EN_BTN_TOGGLE_THEME).clicked() {
                    self.theme_dark = !self.theme_dark;
                    if self.theme_dark {
                        ctx.set_visuals(egui::Visuals::dark());
                    } else {
                        ctx.set_visuals(egui::Visuals::light());
                    }
                }

                ui.separator();
                ui.label(self.session.platform().state.label());
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        if self.format_open {
            self.render_format_options(ctx);
        }

        if self.about_open {
            let mut open = self.about_open;
            egui::Window::new(statics::EN_WINDOW_ABOUT)
                .collapsible(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.heading(statics::EN_ABOUT_HEADING);
                    ui.label(format!(
                        "{} {}",
                        statics::EN_ABOUT_VERSION,
                        env!("CARGO_PKG_VERSION")
                    ));
                    ui.separator();
                    ui.hyperlink_to(
                        format!("{} @ {}", statics::EN_PROJECT_REPO, statics::GITHUB_URL),
                        statics::GITHUB_URL,
                    );
                });
            self.about_open = open;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if !has_doc {
                ui.heading(statics::EN_HOME_HEADING);
                ui.label(statics::EN_HOME_INSTRUCTIONS);
                return;
            }

            if self.tree_view {
                self.render_tree(ui);
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let editor = egui::TextEdit::multiline(&mut self.editor_buffer)
                        .code_editor()
                        .desired_width(f32::INFINITY);
                    let response = ui.add_enabled(!busy, editor);
                    if response.changed() {
                        self.session.set_editor_text(self.editor_buffer.clone());
                    }
                });
        });
    }
}
