//! Confusion-matrix heatmap rendering.
//!
//! Renders the accumulated confusion matrix as an annotated PNG heatmap
//! using the `image` crate: Blues colormap, per-cell count annotations,
//! class names as tick labels (x-axis labels drawn at 45 degrees), and
//! axis titles. Text is drawn with a small embedded 5x7 bitmap font.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::utils::error::Result;
use crate::utils::metrics::ConfusionMatrix;

const MARGIN_LEFT: u32 = 110;
const MARGIN_TOP: u32 = 40;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_BOTTOM: u32 = 110;

const COLOR_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const COLOR_TEXT: Rgb<u8> = Rgb([44, 62, 80]);
const COLOR_GRID: Rgb<u8> = Rgb([236, 240, 241]);

// Blues colormap endpoints
const BLUES_LOW: [u8; 3] = [247, 251, 255];
const BLUES_HIGH: [u8; 3] = [8, 48, 107];

/// Render `matrix` as an annotated heatmap PNG at `path`.
///
/// `class_names` label both axes in their given order. Cell annotations are
/// suppressed when cells are too small to hold them (large class counts),
/// matching how oversized matrices are elided in console output.
pub fn render_confusion_matrix(
    matrix: &ConfusionMatrix,
    class_names: &[String],
    path: &Path,
) -> Result<()> {
    let n = matrix.num_classes.max(1) as u32;
    let cell = (640 / n).clamp(6, 48);
    let plot = n * cell;

    let width = MARGIN_LEFT + plot + MARGIN_RIGHT;
    let height = MARGIN_TOP + plot + MARGIN_BOTTOM;

    let mut img = RgbImage::from_pixel(width, height, COLOR_BACKGROUND);

    // Title
    draw_text_centered(&mut img, width / 2, 14, "confusion matrix", COLOR_TEXT);

    // Cells
    let max_cell = matrix.max_cell().max(1);
    for row in 0..n {
        for col in 0..n {
            let value = matrix.get(row as usize, col as usize);
            let color = blues(value as f64 / max_cell as f64);

            let x0 = MARGIN_LEFT + col * cell;
            let y0 = MARGIN_TOP + row * cell;
            fill_rect(&mut img, x0, y0, cell, cell, color);
        }
    }

    // Grid lines between cells
    if cell >= 12 {
        for i in 0..=n {
            let x = MARGIN_LEFT + i * cell;
            let y = MARGIN_TOP + i * cell;
            draw_vline(&mut img, x, MARGIN_TOP, plot, COLOR_GRID);
            draw_hline(&mut img, MARGIN_LEFT, y, plot, COLOR_GRID);
        }
    }

    // Cell annotations (counts)
    if matrix.num_classes <= 20 && cell >= 16 {
        for row in 0..n {
            for col in 0..n {
                let value = matrix.get(row as usize, col as usize);
                let intensity = value as f64 / max_cell as f64;
                let text_color = if intensity > 0.5 {
                    COLOR_BACKGROUND
                } else {
                    COLOR_TEXT
                };

                let cx = MARGIN_LEFT + col * cell + cell / 2;
                let cy = MARGIN_TOP + row * cell + cell / 2 - 3;
                draw_text_centered(&mut img, cx, cy, &value.to_string(), text_color);
            }
        }
    }

    // Tick labels: thin out when cells are too small to label every class
    let label_step = (12 / cell).max(1) as usize;
    let max_y_chars = ((MARGIN_LEFT - 8) / 6) as usize;
    let max_x_chars = ((MARGIN_BOTTOM - 10) / 5) as usize;

    for (idx, name) in class_names.iter().enumerate().take(n as usize) {
        if idx % label_step != 0 {
            continue;
        }
        let label: String = name.chars().take(max_y_chars).collect();

        // y-axis: horizontal, right-aligned to the plot edge
        let ty = MARGIN_TOP + idx as u32 * cell + cell / 2 - 3;
        let tx = MARGIN_LEFT.saturating_sub(6 + text_width(&label));
        draw_text(&mut img, tx, ty, &label, COLOR_TEXT);

        // x-axis: drawn at 45 degrees below each column center
        let label: String = name.chars().take(max_x_chars).collect();
        let bx = MARGIN_LEFT + idx as u32 * cell + cell / 2;
        let by = MARGIN_TOP + plot + 8;
        draw_text_diagonal(&mut img, bx, by, &label, COLOR_TEXT);
    }

    // Axis titles
    draw_text_centered(
        &mut img,
        MARGIN_LEFT + plot / 2,
        height - 12,
        "predicted labels",
        COLOR_TEXT,
    );
    draw_text_vertical(&mut img, 8, MARGIN_TOP + plot / 2 - 40, "true labels", COLOR_TEXT);

    img.save(path)?;
    Ok(())
}

/// Blues colormap: 0.0 maps to near-white, 1.0 to dark blue
fn blues(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let lerp = |low: u8, high: u8| (low as f64 + (high as f64 - low as f64) * t).round() as u8;
    Rgb([
        lerp(BLUES_LOW[0], BLUES_HIGH[0]),
        lerp(BLUES_LOW[1], BLUES_HIGH[1]),
        lerp(BLUES_LOW[2], BLUES_HIGH[2]),
    ])
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_hline(img: &mut RgbImage, x0: u32, y: u32, len: u32, color: Rgb<u8>) {
    if y >= img.height() {
        return;
    }
    for x in x0..(x0 + len).min(img.width()) {
        img.put_pixel(x, y, color);
    }
}

fn draw_vline(img: &mut RgbImage, x: u32, y0: u32, len: u32, color: Rgb<u8>) {
    if x >= img.width() {
        return;
    }
    for y in y0..(y0 + len).min(img.height()) {
        img.put_pixel(x, y, color);
    }
}

/// Pixel width of `text` in the embedded font
fn text_width(text: &str) -> u32 {
    (text.chars().count() as u32) * 6
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let mut cx = x;
    for c in text.chars() {
        draw_glyph(img, cx, y, c, color);
        cx += 6;
    }
}

fn draw_text_centered(img: &mut RgbImage, cx: u32, y: u32, text: &str, color: Rgb<u8>) {
    let x = cx.saturating_sub(text_width(text) / 2);
    draw_text(img, x, y, text, color);
}

/// Draw text sloping down-right at 45 degrees (one glyph step per char)
fn draw_text_diagonal(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let mut cx = x;
    let mut cy = y;
    for c in text.chars() {
        draw_glyph(img, cx, cy, c, color);
        cx += 5;
        cy += 5;
    }
}

/// Draw text top-to-bottom, one glyph per line
fn draw_text_vertical(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let mut cy = y;
    for c in text.chars() {
        draw_glyph(img, x, cy, c, color);
        cy += 8;
    }
}

fn draw_glyph(img: &mut RgbImage, x: u32, y: u32, c: char, color: Rgb<u8>) {
    let rows = glyph(c);
    for (dy, row) in rows.iter().enumerate() {
        for dx in 0..5u32 {
            if row & (0x10 >> dx) != 0 {
                let px = x + dx;
                let py = y + dy as u32;
                if px < img.width() && py < img.height() {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }
}

/// 5x7 bitmap for `c`, row-major, bit 0x10 is the leftmost column.
/// Letters share uppercase shapes; unknown characters render blank.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => [0x00; 7],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blues_endpoints() {
        assert_eq!(blues(0.0), Rgb(BLUES_LOW));
        assert_eq!(blues(1.0), Rgb(BLUES_HIGH));
        assert_eq!(blues(-0.5), Rgb(BLUES_LOW));
    }

    #[test]
    fn test_glyph_lookup_case_insensitive() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_ne!(glyph('a'), [0x00; 7]);
        assert_eq!(glyph('?'), [0x00; 7]);
    }

    #[test]
    fn test_render_produces_nonempty_png() {
        let mut cm = ConfusionMatrix::new(3);
        cm.update(&[0, 1, 2, 0], &[0, 1, 1, 2]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confusion_matrix.png");
        render_confusion_matrix(&cm, &names(&["cat", "dog", "frog"]), &path).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }

    #[test]
    fn test_render_large_matrix() {
        // 100 classes: annotations and most tick labels are suppressed,
        // but rendering must still succeed.
        let cm = ConfusionMatrix::new(100);
        let class_names: Vec<String> = (0..100).map(|i| format!("class_{}", i)).collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confusion_matrix.png");
        render_confusion_matrix(&cm, &class_names, &path).unwrap();
        assert!(path.exists());
    }
}
