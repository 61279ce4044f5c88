//! Layout export: SVG text output and a PNG debug render.
//!
//! The PNG writer stamps each placement's actual sprite mask, so the pixels
//! it produces are exactly the pixels that were collision-tested. The SVG
//! writer emits `<text>` elements centered on each placement's ink box; it
//! is the drawing-layer-friendly form and depends on the viewer's font
//! matching the rasterizer's.

use image::{Rgba, RgbaImage};

use crate::place::Placement;

/// Render placements as an SVG document.
pub fn to_svg(
    placements: &[Placement],
    width: u32,
    height: u32,
    background: Option<&str>,
    font_family: &str,
) -> String {
    let mut svg = String::with_capacity(4096);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    ));
    if let Some(bg) = background {
        svg.push_str(&format!(
            r#"<rect width="100%" height="100%" fill="{}"/>"#,
            html_escape::encode_double_quoted_attribute(bg)
        ));
    }
    svg.push_str(&format!(
        r#"<style>text{{font-family:'{}',sans-serif}}</style>"#,
        html_escape::encode_text(font_family)
    ));
    for p in placements {
        let b = p.sprite.bbox;
        let cx = p.x as f32 + (b.x0 + b.x1 + 1) as f32 / 2.0;
        let cy = p.y as f32 + (b.y0 + b.y1 + 1) as f32 / 2.0;
        let degrees = p.rotation.to_degrees();
        svg.push_str(&format!(
            r#"<text x="{cx:.1}" y="{cy:.1}" fill="{}" font-size="{:.1}" text-anchor="middle" dominant-baseline="central" transform="rotate({degrees:.1} {cx:.1} {cy:.1})">{}</text>"#,
            html_escape::encode_double_quoted_attribute(&p.color),
            p.font_size,
            html_escape::encode_text(&p.text)
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// Stamp each placement's sprite ink into an RGBA image.
pub fn to_png(placements: &[Placement], width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for p in placements {
        let color = parse_hex(&p.color).unwrap_or([33, 37, 41]);
        let pixel = Rgba([color[0], color[1], color[2], 255]);
        let b = p.sprite.bbox;
        for sy in b.y0..=b.y1 {
            for sx in b.x0..=b.x1 {
                if !p.sprite.mask.is_set(sx, sy) {
                    continue;
                }
                let gx = p.x + sx as i32;
                let gy = p.y + sy as i32;
                if gx >= 0 && gy >= 0 && (gx as u32) < width && (gy as u32) < height {
                    img.put_pixel(gx as u32, gy as u32, pixel);
                }
            }
        }
    }
    img
}

fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
