use image::{RgbaImage, imageops};

use crate::components::history::HistoryStack;
use crate::{io, log_info, log_warn};

/// Edge length of the editable canvas, in pixels.
pub const CANVAS_SIDE: u32 = 300;

/// Grid sizes offered by the UI. The brush paints one grid cell per event.
pub const GRID_SIZE_CHOICES: &[u32] = &[1, 5, 10, 15, 20, 30, 50, 60];
pub const DEFAULT_GRID_SIZE: u32 = 5;

pub const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;

/// XOR mask for color inversion — flips RGB, leaves alpha alone.
const INVERT_MASK: u32 = 0x00FF_FFFF;

// ============================================================================
// ARGB HELPERS
// ============================================================================

/// Pack channels into a 32-bit ARGB value (alpha in the high byte).
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Unpack an ARGB value into `[a, r, g, b]`.
#[inline]
pub fn unpack_argb(argb: u32) -> [u8; 4] {
    [
        (argb >> 24) as u8,
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
    ]
}

/// Source-over blend of `src` onto a destination that is treated as opaque.
/// The result is always opaque. Used when flattening a loaded image onto the
/// white canvas background.
#[inline]
pub fn blend_over(dst: u32, src: u32) -> u32 {
    let [sa, sr, sg, sb] = unpack_argb(src);
    match sa {
        0xFF => src,
        0 => dst,
        _ => {
            let [_, dr, dg, db] = unpack_argb(dst);
            let sa = sa as u32;
            let inv = 255 - sa;
            let mix = |s: u8, d: u8| ((s as u32 * sa + d as u32 * inv) / 255) as u8;
            pack_argb(0xFF, mix(sr, dr), mix(sg, dg), mix(sb, db))
        }
    }
}

/// Top-left corner of the grid cell covering pointer position `(x, y)`.
#[inline]
pub fn cell_origin(x: i32, y: i32, grid_size: u32) -> (i32, i32) {
    let g = grid_size as i32;
    (x - x.rem_euclid(g), y - y.rem_euclid(g))
}

// ============================================================================
// ERRORS
// ============================================================================

/// Out-of-range pixel access. This is a programmer error from the mapping
/// layer — the engine filters pointer input before it reaches `PixelImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasError {
    OutOfBounds { x: i32, y: i32, side: u32 },
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::OutOfBounds { x, y, side } => {
                write!(f, "pixel ({x}, {y}) outside {side}x{side} canvas")
            }
        }
    }
}

impl std::error::Error for CanvasError {}

// ============================================================================
// PIXEL IMAGE — the raw ARGB buffer
// ============================================================================

/// A fixed-size square ARGB raster, row-major.
///
/// `clone()` is the snapshot operation: history frames are deep copies and
/// never alias the live buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelImage {
    side: u32,
    buffer: Vec<u32>,
}

impl PixelImage {
    pub fn new(side: u32, argb: u32) -> Self {
        Self {
            side,
            buffer: vec![argb; (side * side) as usize],
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.side && (y as u32) < self.side
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.side as usize + x as usize
    }

    pub fn get(&self, x: i32, y: i32) -> Result<u32, CanvasError> {
        if !self.in_bounds(x, y) {
            return Err(CanvasError::OutOfBounds { x, y, side: self.side });
        }
        Ok(self.buffer[self.index(x, y)])
    }

    pub fn set(&mut self, x: i32, y: i32, argb: u32) -> Result<(), CanvasError> {
        if !self.in_bounds(x, y) {
            return Err(CanvasError::OutOfBounds { x, y, side: self.side });
        }
        let i = self.index(x, y);
        self.buffer[i] = argb;
        Ok(())
    }

    /// Write a `w`×`h` block with its top-left corner at `(x, y)`, clipped to
    /// the image bounds. Clipping (not failure) is the policy here: brush
    /// cells that overlap the canvas edge are legal.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, argb: u32) {
        let side = self.side as i32;
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w as i32).min(side);
        let y1 = y.saturating_add(h as i32).min(side);
        for yy in y0..y1 {
            let row = yy as usize * self.side as usize;
            for xx in x0..x1 {
                self.buffer[row + xx as usize] = argb;
            }
        }
    }

    /// Set every pixel to `argb`.
    pub fn fill(&mut self, argb: u32) {
        self.buffer.fill(argb);
    }

    /// XOR the RGB channels of every pixel with `0xFFFFFF`, in place.
    /// Alpha is untouched; applying twice restores the original buffer.
    pub fn invert(&mut self) {
        for px in &mut self.buffer {
            *px ^= INVERT_MASK;
        }
    }

    /// Row-major ARGB pixels.
    pub fn as_pixels(&self) -> &[u32] {
        &self.buffer
    }

    /// Flatten to RGBA bytes for texture upload / PNG encoding.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buffer.len() * 4);
        for &px in &self.buffer {
            let [a, r, g, b] = unpack_argb(px);
            out.extend_from_slice(&[r, g, b, a]);
        }
        out
    }

    pub fn memory_bytes(&self) -> usize {
        self.buffer.len() * 4
    }
}

// ============================================================================
// FLOOD FILL — iterative, 4-connected, exact color match
// ============================================================================

/// Replace the maximal 4-connected region of pixels matching the color at
/// `(seed_x, seed_y)` with `replacement`. Returns the number of painted
/// pixels (0 when the region already has the replacement color).
///
/// Uses an explicit work-list of packed flat indices rather than recursion,
/// so region size never translates into call-stack depth. A popped pixel
/// that no longer matches the target has either been painted already or
/// never belonged to the region; it is skipped, which is what terminates
/// the traversal.
pub fn flood_fill(
    image: &mut PixelImage,
    seed_x: i32,
    seed_y: i32,
    replacement: u32,
) -> Result<usize, CanvasError> {
    let target = image.get(seed_x, seed_y)?;
    if target == replacement {
        return Ok(0);
    }

    let side = image.side as usize;
    let mut painted = 0usize;

    // Packed flat index = y * side + x; side <= a few hundred, far below u32.
    let mut stack: Vec<u32> = Vec::with_capacity(1024);
    stack.push((seed_y as usize * side + seed_x as usize) as u32);

    while let Some(idx) = stack.pop() {
        let i = idx as usize;
        if image.buffer[i] != target {
            continue;
        }
        image.buffer[i] = replacement;
        painted += 1;

        let x = i % side;
        let y = i / side;
        if x > 0 {
            stack.push(idx - 1);
        }
        if x + 1 < side {
            stack.push(idx + 1);
        }
        if y > 0 {
            stack.push(idx - side as u32);
        }
        if y + 1 < side {
            stack.push(idx + side as u32);
        }
    }

    Ok(painted)
}

// ============================================================================
// CANVAS ENGINE — edit session state machine over image + history
// ============================================================================

/// Result of staging a decoded image for loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image fits the canvas; apply with [`ResizePolicy::Keep`].
    Fits,
    /// The image exceeds the canvas — the caller must pick a resize policy
    /// (or cancel) before the load is applied.
    NeedsResizeDecision { width: u32, height: u32 },
}

/// How an oversized loaded image is brought down to canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Blit at original size (only valid when the image fits).
    Keep,
    /// Scale preserving aspect ratio so the larger edge matches the canvas.
    Fit,
    /// Scale both edges to the canvas size, ignoring aspect ratio.
    Stretch,
}

/// The editable canvas: live pixel buffer, snapshot history, and the
/// press/drag/release edit session.
///
/// All mutation goes through this type on the UI thread. History frames are
/// pushed once per committed edit: on pointer release (or the pointer
/// leaving the canvas mid-stroke), and immediately for clear / invert /
/// apply-loaded-image.
pub struct CanvasEngine {
    image: PixelImage,
    history: HistoryStack,

    brush_color: u32,
    grid_size: u32,
    fill_mode: bool,
    show_grid: bool,

    /// True between pointer-down and the commit on release/leave.
    edit_in_progress: bool,
    /// False whenever the live image has diverged from the last PNG save.
    saved: bool,
    /// Decoded image staged by `begin_load`, waiting on a resize/overwrite
    /// decision from the UI.
    pending_load: Option<RgbaImage>,

    /// Bumped on every visible pixel change; the UI re-uploads its texture
    /// only when this moved.
    revision: u64,
}

impl CanvasEngine {
    pub fn new(side: u32) -> Self {
        let image = PixelImage::new(side, OPAQUE_WHITE);
        let mut history = HistoryStack::default();
        // The blank canvas is the first frame, so undo never walks off the
        // front of history. It is not an edit: the document starts clean.
        history.push(image.clone());
        Self {
            image,
            history,
            brush_color: pack_argb(255, 40, 50, 80),
            grid_size: DEFAULT_GRID_SIZE,
            fill_mode: false,
            show_grid: true,
            edit_in_progress: false,
            saved: true,
            pending_load: None,
            revision: 0,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn side(&self) -> u32 {
        self.image.side()
    }

    pub fn image(&self) -> &PixelImage {
        &self.image
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn brush_color(&self) -> u32 {
        self.brush_color
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn fill_mode(&self) -> bool {
        self.fill_mode
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn has_pending_load(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Read a pixel for the eyedropper; `None` outside the canvas.
    pub fn sample(&self, x: i32, y: i32) -> Option<u32> {
        self.image.get(x, y).ok()
    }

    // -- session settings ----------------------------------------------------

    pub fn set_brush_color(&mut self, argb: u32) {
        self.brush_color = argb;
    }

    pub fn set_fill_mode(&mut self, on: bool) {
        self.fill_mode = on;
    }

    pub fn set_show_grid(&mut self, on: bool) {
        self.show_grid = on;
    }

    pub fn set_grid_size(&mut self, n: u32) {
        self.grid_size = n.max(1);
    }

    // -- pointer state machine ----------------------------------------------

    /// Idle → Editing. Applies one paint/fill operation; no history push.
    pub fn pointer_down(&mut self, x: i32, y: i32) {
        self.edit_in_progress = true;
        self.apply_tool(x, y);
    }

    /// One paint/fill operation per drag event while Editing; ignored when
    /// no press opened the session (e.g. after the pointer left the canvas).
    pub fn pointer_drag(&mut self, x: i32, y: i32) {
        if self.edit_in_progress {
            self.apply_tool(x, y);
        }
    }

    /// Editing → Idle; commits exactly one snapshot for the whole stroke.
    pub fn pointer_up(&mut self) {
        if self.edit_in_progress {
            self.edit_in_progress = false;
            self.commit();
        }
    }

    /// The pointer left the canvas mid-stroke — same commit as a release.
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    fn apply_tool(&mut self, x: i32, y: i32) {
        // Input-mapping boundary: positions outside the canvas are dropped
        // here, so PixelImage's bounds checks never fire in normal use.
        if self.image.get(x, y).is_err() {
            return;
        }
        if self.fill_mode {
            // Fill targets the exact clicked pixel — the grid only shapes
            // the brush.
            if let Ok(painted) = flood_fill(&mut self.image, x, y, self.brush_color)
                && painted > 0
            {
                self.revision += 1;
            }
        } else {
            let (cx, cy) = cell_origin(x, y, self.grid_size);
            self.image
                .fill_rect(cx, cy, self.grid_size, self.grid_size, self.brush_color);
            self.revision += 1;
        }
    }

    // -- committed edits -----------------------------------------------------

    fn commit(&mut self) {
        self.history.push(self.image.clone());
        self.saved = false;
    }

    /// Reset the canvas to opaque white. Atomic committed edit.
    pub fn clear(&mut self) {
        self.image.fill(OPAQUE_WHITE);
        self.revision += 1;
        self.commit();
    }

    /// Invert the RGB channels of every pixel. Atomic committed edit.
    pub fn invert_colors(&mut self) {
        self.image.invert();
        self.revision += 1;
        self.commit();
    }

    /// Step back one history frame; `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(frame) = self.history.undo().cloned() else {
            return false;
        };
        self.image = frame;
        self.saved = false;
        self.revision += 1;
        true
    }

    /// Step forward one history frame; `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(frame) = self.history.redo().cloned() else {
            return false;
        };
        self.image = frame;
        self.saved = false;
        self.revision += 1;
        true
    }

    // -- load / save ---------------------------------------------------------

    /// Stage a decoded image. The canvas is untouched until
    /// `apply_loaded_image`; the caller resolves the returned outcome
    /// (resize decision, overwrite confirmation) first.
    pub fn begin_load(&mut self, image: RgbaImage) -> LoadOutcome {
        let (width, height) = image.dimensions();
        let side = self.image.side();
        let outcome = if width > side || height > side {
            LoadOutcome::NeedsResizeDecision { width, height }
        } else {
            LoadOutcome::Fits
        };
        self.pending_load = Some(image);
        outcome
    }

    /// Drop the staged image without touching the canvas.
    pub fn cancel_load(&mut self) {
        self.pending_load = None;
    }

    /// Blit the staged image onto a white canvas under `policy` and commit.
    /// Returns `false` when no load was staged.
    pub fn apply_loaded_image(&mut self, policy: ResizePolicy) -> bool {
        let Some(src) = self.pending_load.take() else {
            return false;
        };
        let side = self.image.side();

        let scaled = match policy {
            ResizePolicy::Keep => src,
            ResizePolicy::Fit => {
                let (w, h) = src.dimensions();
                let scale = side as f32 / w.max(h) as f32;
                let nw = ((w as f32 * scale).round() as u32).max(1);
                let nh = ((h as f32 * scale).round() as u32).max(1);
                imageops::resize(&src, nw, nh, imageops::FilterType::Nearest)
            }
            ResizePolicy::Stretch => {
                imageops::resize(&src, side, side, imageops::FilterType::Nearest)
            }
        };

        self.image.fill(OPAQUE_WHITE);
        for (x, y, px) in scaled.enumerate_pixels() {
            if x >= side || y >= side {
                log_warn!("loaded image still exceeds canvas after {:?} resize", policy);
                continue;
            }
            let argb = pack_argb(px[3], px[0], px[1], px[2]);
            let flattened = blend_over(OPAQUE_WHITE, argb);
            // In-bounds by the check above.
            let _ = self.image.set(x as i32, y as i32, flattened);
        }

        log_info!(
            "applied loaded image ({}x{}, {:?})",
            scaled.width(),
            scaled.height(),
            policy
        );
        self.revision += 1;
        self.commit();
        true
    }

    /// Encode the live buffer as PNG at `path`. Success marks the document
    /// saved; failure leaves both the canvas and the saved flag untouched.
    pub fn save_to(&mut self, path: &std::path::Path) -> Result<(), io::ImageIoError> {
        io::save_png(&self.image, path)?;
        self.saved = true;
        log_info!("saved canvas to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0xFFFF_0000;
    const BLUE: u32 = 0xFF00_00FF;
    const GREEN: u32 = 0xFF00_FF00;

    #[test]
    fn bounds_are_rejected_not_clamped() {
        let img = PixelImage::new(10, OPAQUE_WHITE);
        assert!(matches!(
            img.get(-1, 0),
            Err(CanvasError::OutOfBounds { .. })
        ));
        assert!(matches!(
            img.get(10, 0),
            Err(CanvasError::OutOfBounds { .. })
        ));
        assert!(img.get(0, 0).is_ok());
        assert!(img.get(9, 9).is_ok());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut img = PixelImage::new(8, OPAQUE_WHITE);
        img.set(3, 5, RED).unwrap();
        assert_eq!(img.get(3, 5).unwrap(), RED);
        assert_eq!(img.get(5, 3).unwrap(), OPAQUE_WHITE);
        assert!(img.set(8, 0, RED).is_err());
    }

    #[test]
    fn fill_rect_clips_at_edges() {
        let mut img = PixelImage::new(10, OPAQUE_WHITE);
        img.fill_rect(8, 8, 5, 5, BLUE);
        assert_eq!(img.get(8, 8).unwrap(), BLUE);
        assert_eq!(img.get(9, 9).unwrap(), BLUE);
        assert_eq!(img.get(7, 7).unwrap(), OPAQUE_WHITE);
        // Fully negative origin clips to nothing painted below (0,0).
        img.fill_rect(-3, -3, 2, 2, RED);
        assert_eq!(img.get(0, 0).unwrap(), OPAQUE_WHITE);
        // Partially negative origin paints the in-bounds remainder.
        img.fill_rect(-1, -1, 3, 3, RED);
        assert_eq!(img.get(0, 0).unwrap(), RED);
        assert_eq!(img.get(1, 1).unwrap(), RED);
        assert_eq!(img.get(2, 2).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn invert_is_an_involution_and_keeps_alpha() {
        let mut img = PixelImage::new(4, pack_argb(128, 10, 200, 33));
        img.set(1, 1, pack_argb(0, 255, 255, 255)).unwrap();
        let original = img.clone();

        img.invert();
        assert_eq!(img.get(0, 0).unwrap(), pack_argb(128, 245, 55, 222));
        assert_eq!(unpack_argb(img.get(1, 1).unwrap())[0], 0); // alpha untouched

        img.invert();
        assert_eq!(img.as_pixels(), original.as_pixels());
    }

    #[test]
    fn flood_fill_same_color_is_a_noop() {
        let mut img = PixelImage::new(6, RED);
        let before = img.clone();
        let painted = flood_fill(&mut img, 2, 2, RED).unwrap();
        assert_eq!(painted, 0);
        assert_eq!(img.as_pixels(), before.as_pixels());
    }

    #[test]
    fn flood_fill_stays_inside_a_closed_region() {
        // A blue ring at radius 3 around (5,5) on white; fill the interior.
        let mut img = PixelImage::new(11, OPAQUE_WHITE);
        for i in 2..=8 {
            img.set(i, 2, BLUE).unwrap();
            img.set(i, 8, BLUE).unwrap();
            img.set(2, i, BLUE).unwrap();
            img.set(8, i, BLUE).unwrap();
        }

        flood_fill(&mut img, 5, 5, GREEN).unwrap();

        // Interior is green, boundary untouched, exterior untouched.
        for y in 3..8 {
            for x in 3..8 {
                assert_eq!(img.get(x, y).unwrap(), GREEN, "interior ({x},{y})");
            }
        }
        assert_eq!(img.get(2, 5).unwrap(), BLUE);
        assert_eq!(img.get(0, 0).unwrap(), OPAQUE_WHITE);
        assert_eq!(img.get(10, 10).unwrap(), OPAQUE_WHITE);
        assert_eq!(img.get(9, 5).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn flood_fill_covers_the_whole_canvas_from_a_corner() {
        let mut img = PixelImage::new(50, OPAQUE_WHITE);
        let painted = flood_fill(&mut img, 0, 0, RED).unwrap();
        assert_eq!(painted, 50 * 50);
        assert!(img.as_pixels().iter().all(|&p| p == RED));
    }

    #[test]
    fn flood_fill_rejects_out_of_bounds_seed() {
        let mut img = PixelImage::new(5, OPAQUE_WHITE);
        assert!(flood_fill(&mut img, 5, 0, RED).is_err());
        assert!(flood_fill(&mut img, 0, -1, RED).is_err());
    }

    #[test]
    fn cell_origin_snaps_to_grid() {
        assert_eq!(cell_origin(12, 18, 5), (10, 15));
        assert_eq!(cell_origin(10, 15, 5), (10, 15));
        assert_eq!(cell_origin(0, 0, 5), (0, 0));
        assert_eq!(cell_origin(299, 299, 60), (240, 240));
        assert_eq!(cell_origin(7, 3, 1), (7, 3));
    }

    #[test]
    fn blend_over_flattens_to_opaque() {
        assert_eq!(blend_over(OPAQUE_WHITE, RED), RED);
        assert_eq!(blend_over(OPAQUE_WHITE, 0x0000_0000), OPAQUE_WHITE);
        // 50% black over white -> mid grey, opaque.
        let half_black = pack_argb(128, 0, 0, 0);
        let [a, r, g, b] = unpack_argb(blend_over(OPAQUE_WHITE, half_black));
        assert_eq!(a, 255);
        assert!(r == g && g == b);
        assert!((126..=128).contains(&r));
    }

    // -- engine ---------------------------------------------------------------

    fn engine() -> CanvasEngine {
        let mut e = CanvasEngine::new(20);
        e.set_brush_color(RED);
        e.set_grid_size(5);
        e
    }

    #[test]
    fn new_engine_is_white_saved_and_has_one_frame() {
        let e = engine();
        assert!(e.is_saved());
        assert_eq!(e.history().frame_count(), 1);
        assert!(e.image().as_pixels().iter().all(|&p| p == OPAQUE_WHITE));
        assert!(!e.history().can_undo());
    }

    #[test]
    fn a_stroke_commits_exactly_one_frame() {
        let mut e = engine();
        e.pointer_down(2, 2);
        for i in 0..5 {
            e.pointer_drag(2 + i, 2);
        }
        assert_eq!(e.history().frame_count(), 1); // nothing committed yet
        e.pointer_up();
        assert_eq!(e.history().frame_count(), 2);
        assert!(!e.is_saved());

        // A release with no press in progress commits nothing.
        e.pointer_up();
        assert_eq!(e.history().frame_count(), 2);
    }

    #[test]
    fn pointer_leave_commits_like_a_release() {
        let mut e = engine();
        e.pointer_down(0, 0);
        e.pointer_leave();
        assert_eq!(e.history().frame_count(), 2);
        // Drags after the leave are ignored until the next press.
        e.pointer_drag(6, 6);
        assert_eq!(e.image().get(6, 6).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn brush_paints_a_grid_snapped_cell() {
        let mut e = engine();
        e.pointer_down(12, 18);
        e.pointer_up();
        // Cell origin (10, 15), 5x5 block.
        assert_eq!(e.image().get(10, 15).unwrap(), RED);
        assert_eq!(e.image().get(14, 19).unwrap(), RED);
        assert_eq!(e.image().get(9, 15).unwrap(), OPAQUE_WHITE);
        assert_eq!(e.image().get(10, 14).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn fill_mode_targets_the_raw_pixel() {
        let mut e = engine();
        // Block the fill with a blue pixel right next to the seed. A
        // grid-snapped fill would start from (5, 5) and see a different
        // neighborhood; the raw-pixel fill keys off (7, 7) itself.
        e.image.set(6, 7, BLUE).unwrap();
        e.set_fill_mode(true);
        e.pointer_down(7, 7);
        e.pointer_up();
        assert_eq!(e.image().get(6, 7).unwrap(), BLUE);
        assert_eq!(e.image().get(7, 7).unwrap(), RED);
        assert_eq!(e.image().get(0, 0).unwrap(), RED);
    }

    #[test]
    fn out_of_canvas_pointer_positions_are_ignored() {
        let mut e = engine();
        e.pointer_down(-4, 3);
        e.pointer_drag(25, 3);
        e.pointer_up();
        // Session ran, one frame committed, no pixels changed.
        assert_eq!(e.history().frame_count(), 2);
        assert!(e.image().as_pixels().iter().all(|&p| p == OPAQUE_WHITE));
    }

    #[test]
    fn undo_redo_round_trip_is_bit_exact() {
        let mut e = engine();
        let mut stages = vec![e.image().clone()];

        for i in 0..4 {
            e.pointer_down(i * 5, 0);
            e.pointer_drag(i * 5, 10);
            e.pointer_up();
            stages.push(e.image().clone());
        }
        e.invert_colors();
        stages.push(e.image().clone());

        let n = stages.len() - 1;
        for i in (0..n).rev() {
            assert!(e.undo());
            assert_eq!(e.image().as_pixels(), stages[i].as_pixels());
        }
        assert!(!e.undo()); // initial frame reached

        for stage in &stages[1..] {
            assert!(e.redo());
            assert_eq!(e.image().as_pixels(), stage.as_pixels());
        }
        assert!(!e.redo());
    }

    #[test]
    fn editing_after_undo_truncates_the_redo_tail() {
        let mut e = engine();
        e.pointer_down(0, 0);
        e.pointer_up(); // frame A
        e.pointer_down(10, 10);
        e.pointer_up(); // frame B
        assert_eq!(e.history().frame_count(), 3);

        assert!(e.undo()); // back to A
        e.set_brush_color(BLUE);
        e.pointer_down(15, 15);
        e.pointer_up(); // frame C replaces B

        assert_eq!(e.history().frame_count(), 3); // [initial, A, C]
        assert!(!e.redo()); // B is gone
        assert_eq!(e.image().get(15, 15).unwrap(), BLUE);
        assert_eq!(e.image().get(10, 10).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn clear_and_invert_commit_immediately() {
        let mut e = engine();
        e.invert_colors();
        assert_eq!(e.history().frame_count(), 2);
        assert!(!e.is_saved());
        e.clear();
        assert_eq!(e.history().frame_count(), 3);
        assert!(e.image().as_pixels().iter().all(|&p| p == OPAQUE_WHITE));
    }

    #[test]
    fn load_staging_leaves_canvas_untouched_until_applied() {
        let mut e = engine();
        let big = RgbaImage::from_pixel(40, 30, image::Rgba([0, 0, 255, 255]));
        let rev = e.revision();

        match e.begin_load(big) {
            LoadOutcome::NeedsResizeDecision { width, height } => {
                assert_eq!((width, height), (40, 30));
            }
            LoadOutcome::Fits => panic!("40x30 does not fit a 20px canvas"),
        }
        assert!(e.has_pending_load());
        assert_eq!(e.revision(), rev);
        assert!(e.image().as_pixels().iter().all(|&p| p == OPAQUE_WHITE));

        e.cancel_load();
        assert!(!e.has_pending_load());
        assert!(!e.apply_loaded_image(ResizePolicy::Fit));
        assert_eq!(e.history().frame_count(), 1);
    }

    #[test]
    fn applying_a_fitting_image_blits_top_left_over_white() {
        let mut e = engine();
        let small = RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        assert_eq!(e.begin_load(small), LoadOutcome::Fits);
        assert!(e.apply_loaded_image(ResizePolicy::Keep));

        assert_eq!(e.image().get(0, 0).unwrap(), RED);
        assert_eq!(e.image().get(3, 3).unwrap(), RED);
        assert_eq!(e.image().get(4, 4).unwrap(), OPAQUE_WHITE);
        assert_eq!(e.history().frame_count(), 2);
        assert!(!e.is_saved());
    }

    #[test]
    fn fit_policy_preserves_aspect_ratio() {
        let mut e = engine();
        let wide = RgbaImage::from_pixel(40, 20, image::Rgba([0, 255, 0, 255]));
        e.begin_load(wide);
        assert!(e.apply_loaded_image(ResizePolicy::Fit));
        // 40x20 scaled by 20/40 -> 20x10: green strip on top, white below.
        assert_eq!(e.image().get(0, 0).unwrap(), GREEN);
        assert_eq!(e.image().get(19, 9).unwrap(), GREEN);
        assert_eq!(e.image().get(0, 10).unwrap(), OPAQUE_WHITE);
    }

    #[test]
    fn stretch_policy_covers_the_canvas() {
        let mut e = engine();
        let wide = RgbaImage::from_pixel(40, 20, image::Rgba([0, 255, 0, 255]));
        e.begin_load(wide);
        assert!(e.apply_loaded_image(ResizePolicy::Stretch));
        assert!(e.image().as_pixels().iter().all(|&p| p == GREEN));
    }

    #[test]
    fn translucent_loads_are_flattened_onto_white() {
        let mut e = engine();
        let ghost = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0]));
        e.begin_load(ghost);
        e.apply_loaded_image(ResizePolicy::Keep);
        assert_eq!(e.image().get(0, 0).unwrap(), OPAQUE_WHITE);
    }
}
