use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::geometry::OrderedCorners;

/// Draw the closed outline tl -> tr -> br -> bl -> tl on an RGBA copy of `image`.
///
/// The outline is `thickness` pixels wide (at least one), built from
/// one-pixel segments offset around the corner-to-corner line.
pub fn draw_outline(
    image: &DynamicImage,
    corners: &OrderedCorners,
    color: Rgba<u8>,
    thickness: u32,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let pts = corners.to_array();
    let thickness = i64::from(thickness.max(1));
    let offsets = || (0..thickness).map(move |o| (o - thickness / 2) as f32);

    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[(i + 1) % pts.len()];
        for oy in offsets() {
            for ox in offsets() {
                draw_line_segment_mut(
                    &mut canvas,
                    (a.x as f32 + ox, a.y as f32 + oy),
                    (b.x as f32 + ox, b.y as f32 + oy),
                    color,
                );
            }
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_outline_marks_edges_only() {
        let img = DynamicImage::new_rgb8(20, 20);
        let corners = OrderedCorners::from_array([
            Point::new(2.0, 2.0),
            Point::new(17.0, 2.0),
            Point::new(17.0, 17.0),
            Point::new(2.0, 17.0),
        ])
        .unwrap();
        let green = Rgba([0, 255, 0, 255]);
        let out = draw_outline(&img, &corners, green, 1);

        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(*out.get_pixel(10, 2), green);
        assert_eq!(*out.get_pixel(2, 10), green);
        assert_eq!(*out.get_pixel(10, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_outline_thickness_is_exact() {
        let img = DynamicImage::new_rgb8(20, 20);
        let corners = OrderedCorners::from_array([
            Point::new(4.0, 6.0),
            Point::new(15.0, 6.0),
            Point::new(15.0, 15.0),
            Point::new(4.0, 15.0),
        ])
        .unwrap();
        let red = Rgba([255, 0, 0, 255]);
        let out = draw_outline(&img, &corners, red, 2);

        // Top edge at y = 6 widens to rows 5 and 6 only
        let painted: Vec<u32> = (0..20).filter(|&y| *out.get_pixel(10, y) == red).collect();
        assert_eq!(painted, vec![5, 6, 14, 15]);
    }
}
