use eframe::egui;
use egui::{
    Color32, ColorImage, Key, KeyboardShortcut, Modifiers, Sense, Stroke, TextureFilter,
    TextureHandle, TextureOptions, Vec2,
};

use crate::canvas::{
    CANVAS_SIDE, CanvasEngine, GRID_SIZE_CHOICES, LoadOutcome, ResizePolicy, unpack_argb,
};
use crate::components::colors::ColorsPanel;
use crate::io::{self, FileHandler};
use crate::{log_err, log_info};

// Menu accelerators, matching the original editor's bindings (note: redo is
// Cmd/Ctrl+X here, not cut — there is no clipboard in this app).
const SHORTCUT_OPEN: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::O);
const SHORTCUT_SAVE: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::S);
const SHORTCUT_UNDO: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Z);
const SHORTCUT_REDO: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::X);
const SHORTCUT_INVERT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::I);
const SHORTCUT_CLEAR: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::C);

// ============================================================================
// MODAL DIALOG STATE — at most one open at a time
// ============================================================================

/// Every confirmation the original drove with a blocking dialog is modelled
/// as a state the update loop resolves into plain engine calls.
enum ActiveDialog {
    None,
    /// "Are you sure you want to clear?"
    ConfirmClear,
    /// Loaded image exceeds the canvas — Fit / Stretch / Cancel.
    ResizeChoice { width: u32, height: u32 },
    /// Loading will overwrite the current image — confirm with the chosen
    /// resize policy, or drop the staged load.
    ConfirmLoadOverwrite { policy: ResizePolicy },
    /// Plain message with an OK button.
    Notice { title: String, message: String },
}

impl ActiveDialog {
    fn is_open(&self) -> bool {
        !matches!(self, ActiveDialog::None)
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

pub struct PixelEdApp {
    engine: CanvasEngine,
    colors_panel: ColorsPanel,

    canvas_texture: Option<TextureHandle>,
    /// Engine revision currently uploaded to `canvas_texture`.
    uploaded_revision: Option<u64>,

    active_dialog: ActiveDialog,
    /// True while the "exit with unsaved edits?" dialog is showing.
    pending_exit: bool,
    /// True after the user confirmed the exit — lets the next close request
    /// through instead of re-showing the dialog.
    force_exit: bool,
}

impl PixelEdApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        log_info!("canvas engine ready ({0}x{0})", CANVAS_SIDE);
        Self {
            engine: CanvasEngine::new(CANVAS_SIDE),
            colors_panel: ColorsPanel::default(),
            canvas_texture: None,
            uploaded_revision: None,
            active_dialog: ActiveDialog::None,
            pending_exit: false,
            force_exit: false,
        }
    }

    // -- menu actions --------------------------------------------------------

    fn start_open_flow(&mut self) {
        let Some(path) = FileHandler::pick_open_png() else {
            return;
        };
        match io::load_png(&path) {
            Ok(img) => {
                log_info!(
                    "decoded {} ({}x{})",
                    path.display(),
                    img.width(),
                    img.height()
                );
                self.active_dialog = match self.engine.begin_load(img) {
                    LoadOutcome::Fits => ActiveDialog::ConfirmLoadOverwrite {
                        policy: ResizePolicy::Keep,
                    },
                    LoadOutcome::NeedsResizeDecision { width, height } => {
                        ActiveDialog::ResizeChoice { width, height }
                    }
                };
            }
            Err(e) => {
                log_err!("open {} failed: {}", path.display(), e);
                self.active_dialog = ActiveDialog::Notice {
                    title: "File Error".into(),
                    message: format!("Unable to open file.\n\nDetails:\n{}", e),
                };
            }
        }
    }

    fn start_save_flow(&mut self) {
        let Some(path) = FileHandler::pick_save_png() else {
            return;
        };
        if let Err(e) = self.engine.save_to(&path) {
            log_err!("save {} failed: {}", path.display(), e);
            self.active_dialog = ActiveDialog::Notice {
                title: "File Error".into(),
                message: format!("Unable to save file.\n\nDetails:\n{}", e),
            };
        }
    }

    fn do_undo(&mut self) {
        if !self.engine.undo() {
            self.active_dialog = ActiveDialog::Notice {
                title: "Whoops!".into(),
                message: "No undos left.".into(),
            };
        }
    }

    fn do_redo(&mut self) {
        if !self.engine.redo() {
            self.active_dialog = ActiveDialog::Notice {
                title: "Whoops!".into(),
                message: "No redos left.".into(),
            };
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_UNDO)) {
            self.do_undo();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_REDO)) {
            self.do_redo();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_INVERT)) {
            self.engine.invert_colors();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_CLEAR)) {
            self.active_dialog = ActiveDialog::ConfirmClear;
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_OPEN)) {
            self.start_open_flow();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SHORTCUT_SAVE)) {
            self.start_save_flow();
        }
    }

    // -- menu bar ------------------------------------------------------------

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui
                        .add(
                            egui::Button::new("Open…")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_OPEN)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.start_open_flow();
                    }
                    if ui
                        .add(
                            egui::Button::new("Save…")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_SAVE)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.start_save_flow();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui
                        .add(
                            egui::Button::new("Undo")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_UNDO)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.do_undo();
                    }
                    if ui
                        .add(
                            egui::Button::new("Redo")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_REDO)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.do_redo();
                    }
                    ui.separator();
                    if ui
                        .add(
                            egui::Button::new("Invert")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_INVERT)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.engine.invert_colors();
                    }
                    if ui
                        .add(
                            egui::Button::new("Clear")
                                .shortcut_text(ctx.format_shortcut(&SHORTCUT_CLEAR)),
                        )
                        .clicked()
                    {
                        ui.close_menu();
                        self.active_dialog = ActiveDialog::ConfirmClear;
                    }
                });
            });
        });
    }

    // -- canvas view ---------------------------------------------------------

    fn canvas_view(&mut self, ui: &mut egui::Ui, input_enabled: bool) {
        let side = self.engine.side();

        // Re-upload the texture only when the engine's pixels moved.
        if self.uploaded_revision != Some(self.engine.revision()) || self.canvas_texture.is_none()
        {
            let img = ColorImage::from_rgba_unmultiplied(
                [side as usize, side as usize],
                &self.engine.image().to_rgba_bytes(),
            );
            let options = TextureOptions {
                magnification: TextureFilter::Nearest,
                minification: TextureFilter::Nearest,
                ..Default::default()
            };
            match &mut self.canvas_texture {
                Some(tex) => tex.set(img, options),
                None => self.canvas_texture = Some(ui.ctx().load_texture("canvas", img, options)),
            }
            self.uploaded_revision = Some(self.engine.revision());
        }

        let (rect, resp) =
            ui.allocate_exact_size(Vec2::splat(side as f32), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if let Some(tex) = &self.canvas_texture {
            painter.image(
                tex.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // Translucent grid overlay; pointless at 1px cells.
        if self.engine.show_grid() && self.engine.grid_size() > 1 {
            let grid_color = Color32::from_rgba_unmultiplied(50, 50, 150, 30);
            let stroke = Stroke::new(1.0, grid_color);
            let step = self.engine.grid_size() as usize;
            for x in (0..side as usize).step_by(step) {
                let sx = rect.min.x + x as f32;
                painter.line_segment(
                    [egui::pos2(sx, rect.min.y), egui::pos2(sx, rect.max.y)],
                    stroke,
                );
            }
            for y in (0..side as usize).step_by(step) {
                let sy = rect.min.y + y as f32;
                painter.line_segment(
                    [egui::pos2(rect.min.x, sy), egui::pos2(rect.max.x, sy)],
                    stroke,
                );
            }
        }

        ui.painter().rect_stroke(
            rect,
            0.0,
            Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color),
        );

        if !input_enabled {
            return;
        }

        // Pointer → edit session. Mirrors the original's mouse listener:
        // press starts a stroke, drags extend it, release commits, leaving
        // the canvas mid-stroke commits too.
        let primary_pressed = ui.input(|i| i.pointer.primary_pressed());
        let primary_down = ui.input(|i| i.pointer.primary_down());
        let primary_released = ui.input(|i| i.pointer.primary_released());
        let pointer_pos = ui.input(|i| i.pointer.interact_pos());

        if let Some(pos) = pointer_pos {
            let inside = rect.contains(pos);
            // hovered() is false when a menu popup or window overlaps the
            // canvas, so a click on those never paints through them.
            let press_on_canvas = primary_pressed && inside && resp.hovered();
            let x = (pos.x - rect.min.x).floor() as i32;
            let y = (pos.y - rect.min.y).floor() as i32;

            if self.colors_panel.eyedropper_armed {
                if press_on_canvas && let Some(argb) = self.engine.sample(x, y) {
                    let [a, r, g, b] = unpack_argb(argb);
                    self.colors_panel.set_active_rgba([r, g, b, a]);
                    self.colors_panel.eyedropper_armed = false;
                }
            } else if press_on_canvas {
                self.engine.pointer_down(x, y);
            } else if primary_down {
                if inside {
                    self.engine.pointer_drag(x, y);
                } else {
                    self.engine.pointer_leave();
                }
            }
        }
        if primary_released {
            self.engine.pointer_up();
        }
    }

    // -- side panel -----------------------------------------------------------

    fn controls_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        self.colors_panel.show(ui);

        ui.separator();

        let mut fill = self.engine.fill_mode();
        if ui
            .checkbox(&mut fill, "Fill Mode")
            .on_hover_text("Flood-fill the clicked pixel's region instead of painting")
            .changed()
        {
            self.engine.set_fill_mode(fill);
        }

        let mut grid = self.engine.show_grid();
        if ui.checkbox(&mut grid, "Show Grid").changed() {
            self.engine.set_show_grid(grid);
        }

        let mut grid_size = self.engine.grid_size();
        egui::ComboBox::from_label("Grid Size")
            .selected_text(format!("{} px", grid_size))
            .show_ui(ui, |ui| {
                for &n in GRID_SIZE_CHOICES {
                    ui.selectable_value(&mut grid_size, n, format!("{} px", n));
                }
            });
        if grid_size != self.engine.grid_size() {
            self.engine.set_grid_size(grid_size);
        }

        ui.separator();

        let history = self.engine.history();
        ui.label(
            egui::RichText::new(format!(
                "History: {} frames ({:.1} MB)",
                history.frame_count(),
                history.memory_usage() as f64 / (1024.0 * 1024.0)
            ))
            .weak()
            .small(),
        );
    }

    // -- modal dialogs ---------------------------------------------------------

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        let mut next = None;

        match &self.active_dialog {
            ActiveDialog::None => {}

            ActiveDialog::ConfirmClear => {
                modal(ctx, "Confirm", |ui| {
                    ui.label("Are you sure you want to clear?");
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            self.engine.clear();
                            next = Some(ActiveDialog::None);
                        }
                        if ui.button("No").clicked() {
                            next = Some(ActiveDialog::None);
                        }
                    });
                });
            }

            ActiveDialog::ResizeChoice { width, height } => {
                let (width, height) = (*width, *height);
                modal(ctx, "Warning", |ui| {
                    ui.label(format!(
                        "This image is too large for the canvas ({}x{}).",
                        width, height
                    ));
                    ui.label(format!(
                        "Do you want it stretched or fitted to {0}x{0}?",
                        self.engine.side()
                    ));
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Fit").clicked() {
                            next = Some(ActiveDialog::ConfirmLoadOverwrite {
                                policy: ResizePolicy::Fit,
                            });
                        }
                        if ui.button("Stretched").clicked() {
                            next = Some(ActiveDialog::ConfirmLoadOverwrite {
                                policy: ResizePolicy::Stretch,
                            });
                        }
                        if ui.button("Cancel").clicked() {
                            self.engine.cancel_load();
                            next = Some(ActiveDialog::None);
                        }
                    });
                });
            }

            ActiveDialog::ConfirmLoadOverwrite { policy } => {
                let policy = *policy;
                modal(ctx, "Confirm", |ui| {
                    ui.label("This will overwrite the image.");
                    ui.label("Are you sure?");
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            self.engine.apply_loaded_image(policy);
                            next = Some(ActiveDialog::None);
                        }
                        if ui.button("No").clicked() {
                            self.engine.cancel_load();
                            next = Some(ActiveDialog::None);
                        }
                    });
                });
            }

            ActiveDialog::Notice { title, message } => {
                let mut done = false;
                modal(ctx, title, |ui| {
                    ui.label(message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        done = true;
                    }
                });
                if done {
                    next = Some(ActiveDialog::None);
                }
            }
        }

        if let Some(dialog) = next {
            self.active_dialog = dialog;
        }
    }

    fn show_exit_dialog(&mut self, ctx: &egui::Context) {
        let mut do_exit = false;
        let mut do_cancel = false;
        modal(ctx, "Unsaved Edits", |ui| {
            ui.label("Your image is unsaved. Are you sure you want to exit?");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Exit without Saving").clicked() {
                    do_exit = true;
                }
                if ui.button("Cancel").clicked() {
                    do_cancel = true;
                }
            });
        });
        if do_exit {
            self.pending_exit = false;
            self.force_exit = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if do_cancel {
            self.pending_exit = false;
        }
    }
}

/// Fixed, centered, non-collapsible window — the shape all of this app's
/// dialogs share.
fn modal(ctx: &egui::Context, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, add_contents);
}

impl eframe::App for PixelEdApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Window title carries the dirty marker.
        let marker = if self.engine.is_saved() { "" } else { "*" };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!("PixelEd{}", marker)));

        // Intercept the OS close button while there are unsaved edits.
        if ctx.input(|i| i.viewport().close_requested())
            && !self.force_exit
            && !self.engine.is_saved()
        {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.pending_exit = true;
        }

        let modal_open = self.active_dialog.is_open() || self.pending_exit;
        if !modal_open {
            self.handle_shortcuts(ctx);
        }

        self.menu_bar(ctx);

        egui::SidePanel::right("controls")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| self.controls_panel(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);
            self.canvas_view(ui, !modal_open);
        });

        // The panel may have moved a slider this frame; the engine's brush
        // always mirrors the active slot.
        self.engine.set_brush_color(self.colors_panel.active_argb());

        self.show_dialogs(ctx);
        if self.pending_exit {
            self.show_exit_dialog(ctx);
        }
    }
}
