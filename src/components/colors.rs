use eframe::egui;
use egui::{Color32, Pos2, Sense, Stroke, Vec2};

use crate::canvas::pack_argb;

/// Startup colors for the two slots (r, g, b, a).
pub const DEFAULT_PRIMARY: [u8; 4] = [40, 50, 80, 255];
pub const DEFAULT_SECONDARY: [u8; 4] = [200, 50, 100, 255];

const SWATCH_SIZE: Vec2 = Vec2::new(42.0, 26.0);
const FIELD_SIZE: Vec2 = Vec2::new(180.0, 100.0);
const SELECTED_BORDER: Color32 = Color32::YELLOW;

// ============================================================================
// HEX PARSING
// ============================================================================

/// Invalid hex color input. Surfaced inline next to the field; the current
/// color is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexColorError {
    BadLength(usize),
    BadDigit(char),
}

impl std::fmt::Display for HexColorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexColorError::BadLength(n) => write!(f, "expected 6 hex digits, got {}", n),
            HexColorError::BadDigit(c) => write!(f, "'{}' is not a hex digit", c),
        }
    }
}

impl std::error::Error for HexColorError {}

/// Parse `#RRGGBB` (leading `#` optional, case-insensitive) into RGB.
pub fn parse_hex_color(text: &str) -> Result<[u8; 3], HexColorError> {
    let digits = text.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(HexColorError::BadLength(digits.len()));
    }
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(HexColorError::BadDigit(c));
    }
    // Digits validated above, the parse cannot fail.
    let val = u32::from_str_radix(digits, 16).unwrap_or(0);
    Ok([(val >> 16) as u8, (val >> 8) as u8, val as u8])
}

pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

// ============================================================================
// HSB <-> RGB
// ============================================================================

/// RGB bytes to hue/saturation/brightness, each 0.0..=1.0.
pub fn rgb_to_hsb(rgb: [u8; 3]) -> [f32; 3] {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let h = if d == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / d % 6.0) / 6.0
    } else if max == g {
        (((b - r) / d) + 2.0) / 6.0
    } else {
        (((r - g) / d) + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };
    let s = if max == 0.0 { 0.0 } else { d / max };
    [h, s, max]
}

/// Hue/saturation/brightness (each 0.0..=1.0) to RGB bytes.
pub fn hsb_to_rgb(h: f32, s: f32, b: f32) -> [u8; 3] {
    let h6 = h.clamp(0.0, 1.0) * 6.0;
    let c = b * s;
    let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = b - c;
    let (r, g, bl) = match h6 as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((bl + m) * 255.0).round() as u8,
    ]
}

// ============================================================================
// COLOR SLOT
// ============================================================================

/// One of the two active colors. RGB and HSB are kept side by side so that
/// slider edits in either model don't drift through lossy conversions.
#[derive(Clone, Copy)]
struct ColorSlot {
    rgba: [u8; 4],
    hsb: [f32; 3],
}

impl ColorSlot {
    fn from_rgba(rgba: [u8; 4]) -> Self {
        Self {
            rgba,
            hsb: rgb_to_hsb([rgba[0], rgba[1], rgba[2]]),
        }
    }

    fn argb(&self) -> u32 {
        pack_argb(self.rgba[3], self.rgba[0], self.rgba[1], self.rgba[2])
    }

    fn color32(&self) -> Color32 {
        Color32::from_rgba_unmultiplied(self.rgba[0], self.rgba[1], self.rgba[2], self.rgba[3])
    }
}

// ============================================================================
// COLORS PANEL — dual swatches, HS field, value rows, hex, eyedropper
// ============================================================================

pub struct ColorsPanel {
    primary: ColorSlot,
    secondary: ColorSlot,
    editing_primary: bool,
    hex_input: String,
    hex_error: Option<HexColorError>,
    /// Armed by the eyedropper button; the next canvas click samples a pixel
    /// into the active slot instead of painting.
    pub eyedropper_armed: bool,
}

impl Default for ColorsPanel {
    fn default() -> Self {
        let primary = ColorSlot::from_rgba(DEFAULT_PRIMARY);
        Self {
            primary,
            secondary: ColorSlot::from_rgba(DEFAULT_SECONDARY),
            editing_primary: true,
            hex_input: format_hex_color([
                DEFAULT_PRIMARY[0],
                DEFAULT_PRIMARY[1],
                DEFAULT_PRIMARY[2],
            ]),
            hex_error: None,
            eyedropper_armed: false,
        }
    }
}

impl ColorsPanel {
    /// The active slot's color as ARGB, for the engine's brush.
    pub fn active_argb(&self) -> u32 {
        self.active().argb()
    }

    /// Overwrite the active slot (eyedropper pickup).
    pub fn set_active_rgba(&mut self, rgba: [u8; 4]) {
        *self.active_mut() = ColorSlot::from_rgba(rgba);
        self.refresh_hex();
    }

    fn active(&self) -> &ColorSlot {
        if self.editing_primary { &self.primary } else { &self.secondary }
    }

    fn active_mut(&mut self) -> &mut ColorSlot {
        if self.editing_primary { &mut self.primary } else { &mut self.secondary }
    }

    fn refresh_hex(&mut self) {
        let [r, g, b, _] = self.active().rgba;
        self.hex_input = format_hex_color([r, g, b]);
        self.hex_error = None;
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.draw_swatches(ui);
        ui.add_space(6.0);
        self.draw_hs_field(ui);
        ui.add_space(6.0);
        self.draw_value_rows(ui);
        ui.add_space(4.0);
        self.draw_hex_row(ui);
    }

    // -- swatch row ----------------------------------------------------------

    fn draw_swatches(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for is_primary in [true, false] {
                let slot = if is_primary { self.primary } else { self.secondary };
                let (rect, resp) = ui.allocate_exact_size(SWATCH_SIZE, Sense::click());
                if ui.is_rect_visible(rect) {
                    let p = ui.painter();
                    draw_checkerboard(p, rect, 5.0);
                    p.rect_filled(rect, 2.0, slot.color32());
                    let border = if self.editing_primary == is_primary {
                        Stroke::new(2.0, SELECTED_BORDER)
                    } else {
                        Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
                    };
                    p.rect_stroke(rect, 2.0, border);
                }
                if resp.clicked() && self.editing_primary != is_primary {
                    self.editing_primary = is_primary;
                    self.refresh_hex();
                }
            }

            let eyedropper = ui.selectable_label(self.eyedropper_armed, "Eyedropper");
            if eyedropper
                .on_hover_text("Click the canvas to pick up a color")
                .clicked()
            {
                self.eyedropper_armed = !self.eyedropper_armed;
            }
        });
    }

    // -- hue/saturation field ------------------------------------------------

    fn draw_hs_field(&mut self, ui: &mut egui::Ui) {
        let (rect, resp) = ui.allocate_exact_size(FIELD_SIZE, Sense::click_and_drag());
        let [h, s, b] = self.active().hsb;

        if ui.is_rect_visible(rect) {
            let p = ui.painter();

            // Hue left-to-right, saturation top-to-bottom, at the slot's
            // current brightness. A coarse vertex grid with interpolated
            // colors is plenty smooth and far cheaper than per-pixel rects.
            let cols = 36;
            let rows = 10;
            let mut mesh = egui::Mesh::default();
            for row in 0..=rows {
                for col in 0..=cols {
                    let fx = col as f32 / cols as f32;
                    let fy = row as f32 / rows as f32;
                    let [r, g, bl] = hsb_to_rgb(fx, fy, b);
                    mesh.colored_vertex(
                        Pos2::new(
                            rect.min.x + fx * rect.width(),
                            rect.min.y + fy * rect.height(),
                        ),
                        Color32::from_rgb(r, g, bl),
                    );
                }
            }
            let stride = (cols + 1) as u32;
            for row in 0..rows as u32 {
                for col in 0..cols as u32 {
                    let i = row * stride + col;
                    mesh.add_triangle(i, i + 1, i + stride);
                    mesh.add_triangle(i + 1, i + stride + 1, i + stride);
                }
            }
            p.add(egui::Shape::mesh(mesh));

            // Crosshair at the current hue/saturation, in a contrasting tone.
            let cx = rect.min.x + h * rect.width();
            let cy = rect.min.y + s * rect.height();
            let contrast = {
                let [r, g, bl] = hsb_to_rgb(h, b, 1.0 - b);
                Color32::from_rgb(r, g, bl)
            };
            p.line_segment(
                [Pos2::new(rect.min.x, cy), Pos2::new(rect.max.x, cy)],
                Stroke::new(1.0, contrast),
            );
            p.line_segment(
                [Pos2::new(cx, rect.min.y), Pos2::new(cx, rect.max.y)],
                Stroke::new(1.0, contrast),
            );
            let probe =
                egui::Rect::from_center_size(Pos2::new(cx, cy), Vec2::splat(12.0)).intersect(rect);
            let [r, g, bl] = hsb_to_rgb(h, s, b);
            p.rect_filled(probe, 0.0, Color32::from_rgb(r, g, bl));
            p.rect_stroke(probe, 0.0, Stroke::new(1.0, contrast));
        }

        if (resp.dragged() || resp.clicked())
            && let Some(pos) = resp.interact_pointer_pos()
        {
            let nh = ((pos.x - rect.min.x) / rect.width()).clamp(0.0, 1.0);
            let ns = ((pos.y - rect.min.y) / rect.height()).clamp(0.0, 1.0);
            self.apply_hsb([nh, ns, b]);
        }
    }

    // -- RGB / Alpha / HSB value rows ----------------------------------------

    fn draw_value_rows(&mut self, ui: &mut egui::Ui) {
        let slot = *self.active();
        let [mut r, mut g, mut b, mut a] = slot.rgba;
        let [h, s, br] = slot.hsb;

        let mut rgb_changed = false;
        egui::Grid::new("rgba_values").num_columns(4).show(ui, |ui| {
            rgb_changed |= byte_field(ui, "Red", &mut r);
            rgb_changed |= byte_field(ui, "Green", &mut g);
            ui.end_row();
            rgb_changed |= byte_field(ui, "Blue", &mut b);
            // Alpha feeds the slot directly; it is not part of the HSB model.
            let mut alpha_changed = false;
            alpha_changed |= byte_field(ui, "Opacity", &mut a);
            if alpha_changed {
                self.active_mut().rgba[3] = a;
            }
            ui.end_row();
        });
        if rgb_changed {
            self.apply_rgb([r, g, b]);
        }

        ui.add_space(4.0);

        let mut hue = (h * 360.0).round() as u32;
        let mut sat = (s * 100.0).round() as u32;
        let mut bright = (br * 100.0).round() as u32;
        let mut hsb_changed = false;
        egui::Grid::new("hsb_values").num_columns(4).show(ui, |ui| {
            ui.label("Hue");
            hsb_changed |= ui
                .add(egui::DragValue::new(&mut hue).clamp_range(0..=360).suffix("°"))
                .changed();
            ui.label("Saturation");
            hsb_changed |= ui
                .add(egui::DragValue::new(&mut sat).clamp_range(0..=100).suffix("%"))
                .changed();
            ui.end_row();
            ui.label("Brightness");
            hsb_changed |= ui
                .add(egui::DragValue::new(&mut bright).clamp_range(0..=100).suffix("%"))
                .changed();
            ui.end_row();
        });
        if hsb_changed {
            self.apply_hsb([
                hue as f32 / 360.0,
                sat as f32 / 100.0,
                bright as f32 / 100.0,
            ]);
        }
    }

    // -- hex row -------------------------------------------------------------

    fn draw_hex_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Hex Code");
            let resp = ui.add_sized(
                [70.0, 18.0],
                egui::TextEdit::singleline(&mut self.hex_input)
                    .font(egui::TextStyle::Monospace),
            );

            // Commit on Enter, like the original's hex field. Anything else
            // leaves the color untouched.
            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                match parse_hex_color(&self.hex_input) {
                    Ok(rgb) => {
                        self.apply_rgb(rgb);
                        self.refresh_hex();
                    }
                    Err(e) => self.hex_error = Some(e),
                }
            } else if !resp.has_focus() && self.hex_error.is_none() {
                // Keep the field mirroring the slot while it is not edited.
                let [r, g, b, _] = self.active().rgba;
                self.hex_input = format_hex_color([r, g, b]);
            }
        });
        if let Some(e) = self.hex_error {
            ui.label(
                egui::RichText::new(format!("Invalid hex code: {}", e))
                    .small()
                    .color(ui.visuals().error_fg_color),
            );
        }
    }

    // -- single-source updates ----------------------------------------------
    //
    // Exactly one model is the source per update: RGB edits recompute HSB,
    // HSB edits recompute RGB, alpha rides along. Derived values are never
    // written back in the same pass, so there is no update loop to guard.

    fn apply_rgb(&mut self, rgb: [u8; 3]) {
        let a = self.active().rgba[3];
        let slot = self.active_mut();
        slot.rgba = [rgb[0], rgb[1], rgb[2], a];
        slot.hsb = rgb_to_hsb(rgb);
    }

    fn apply_hsb(&mut self, hsb: [f32; 3]) {
        let a = self.active().rgba[3];
        let rgb = hsb_to_rgb(hsb[0], hsb[1], hsb[2]);
        let slot = self.active_mut();
        slot.rgba = [rgb[0], rgb[1], rgb[2], a];
        slot.hsb = hsb;
    }
}

fn byte_field(ui: &mut egui::Ui, label: &str, value: &mut u8) -> bool {
    ui.label(label);
    ui.add(egui::DragValue::new(value).clamp_range(0..=255)).changed()
}

/// Checkerboard backdrop so translucent swatches read as translucent.
fn draw_checkerboard(painter: &egui::Painter, rect: egui::Rect, cell: f32) {
    painter.rect_filled(rect, 0.0, Color32::WHITE);
    let cols = (rect.width() / cell).ceil() as i32;
    let rows = (rect.height() / cell).ceil() as i32;
    for row in 0..rows {
        for col in 0..cols {
            if (row + col) % 2 == 1 {
                let cr = egui::Rect::from_min_size(
                    Pos2::new(rect.min.x + col as f32 * cell, rect.min.y + row as f32 * cell),
                    Vec2::splat(cell),
                )
                .intersect(rect);
                painter.rect_filled(cr, 0.0, Color32::from_gray(200));
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_accepts_hash_and_case() {
        assert_eq!(parse_hex_color("#A00000"), Ok([0xA0, 0, 0]));
        assert_eq!(parse_hex_color("a00000"), Ok([0xA0, 0, 0]));
        assert_eq!(parse_hex_color("  #FFffFF "), Ok([255, 255, 255]));
    }

    #[test]
    fn hex_parsing_rejects_garbage_without_panicking() {
        assert_eq!(parse_hex_color("#F00"), Err(HexColorError::BadLength(3)));
        assert_eq!(parse_hex_color(""), Err(HexColorError::BadLength(0)));
        assert_eq!(parse_hex_color("#12345G"), Err(HexColorError::BadDigit('G')));
        assert_eq!(parse_hex_color("zzzzzz"), Err(HexColorError::BadDigit('z')));
    }

    #[test]
    fn hex_formatting_roundtrips() {
        let rgb = [0xA0, 0x1B, 0xFF];
        assert_eq!(parse_hex_color(&format_hex_color(rgb)), Ok(rgb));
    }

    #[test]
    fn hsb_hits_the_primaries() {
        assert_eq!(hsb_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsb_to_rgb(1.0 / 3.0, 1.0, 1.0), [0, 255, 0]);
        assert_eq!(hsb_to_rgb(2.0 / 3.0, 1.0, 1.0), [0, 0, 255]);
        assert_eq!(hsb_to_rgb(0.0, 0.0, 1.0), [255, 255, 255]);
        assert_eq!(hsb_to_rgb(0.5, 1.0, 0.0), [0, 0, 0]);
    }

    #[test]
    fn rgb_hsb_roundtrip_is_close() {
        for rgb in [[12, 200, 33], [255, 0, 128], [9, 9, 9], [240, 240, 2]] {
            let [h, s, b] = rgb_to_hsb(rgb);
            let back = hsb_to_rgb(h, s, b);
            for c in 0..3 {
                assert!(
                    (back[c] as i16 - rgb[c] as i16).abs() <= 1,
                    "{:?} -> {:?}",
                    rgb,
                    back
                );
            }
        }
    }

    #[test]
    fn slot_packs_argb_with_alpha_high() {
        let panel = ColorsPanel::default();
        assert_eq!(panel.active_argb(), 0xFF28_3250); // 40, 50, 80 opaque
    }

    #[test]
    fn eyedropper_pickup_replaces_the_active_slot() {
        let mut panel = ColorsPanel::default();
        panel.set_active_rgba([1, 2, 3, 200]);
        assert_eq!(panel.active_argb(), pack_argb(200, 1, 2, 3));
        assert_eq!(panel.hex_input, "#010203");
    }
}
