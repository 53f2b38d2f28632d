//! Four-point perspective rectification.
//!
//! Given corners in canonical order, derive the output size, solve the
//! homography onto the output rectangle and resample the image through it.

use image::{DynamicImage, ImageBuffer, Pixel};
use log::debug;

use crate::error::{RectifyError, Result};
use crate::geometry::{order_points, DestinationStyle, OrderedCorners, Point, RectDimensions};
use crate::homography::Homography;
use crate::transform::{warp_perspective, Sample};

/// Knobs for a rectification call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectifyOptions {
    /// Where the bottom-right destination corner goes
    pub destination: DestinationStyle,
    /// Fill value for pixels with no source, in the image's native sample scale
    pub background: f64,
    /// Resample rows on the rayon pool
    pub parallel: bool,
}

impl RectifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: DestinationStyle) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for RectifyOptions {
    fn default() -> Self {
        Self {
            destination: DestinationStyle::Legacy,
            background: 0.0,
            parallel: true,
        }
    }
}

/// The geometry of one rectification, before any pixels are touched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectifyPlan {
    pub corners: OrderedCorners,
    pub dimensions: RectDimensions,
    pub destination: [Point; 4],
    /// Maps source pixels onto the output rectangle
    pub homography: Homography,
}

/// Derive output size, destination corners and the source-to-output homography
pub fn plan(corners: &OrderedCorners, options: &RectifyOptions) -> Result<RectifyPlan> {
    if !options.background.is_finite() {
        return Err(RectifyError::InvalidInput(format!(
            "background must be finite, got {}",
            options.background
        )));
    }

    let longest = corners.longest_edge();
    if longest.floor() > u32::MAX as f64 {
        return Err(RectifyError::InvalidInput(format!(
            "corner edge of {longest:.0} px exceeds the largest output size"
        )));
    }

    let dimensions = corners.dimensions();
    if dimensions.is_empty() {
        return Err(RectifyError::DegenerateGeometry(format!(
            "corners span a {}x{} rectangle",
            dimensions.width, dimensions.height
        )));
    }

    let destination = dimensions.destination_corners(options.destination);
    let homography = Homography::from_correspondences(&corners.to_array(), &destination)?;

    debug!(
        "rectifying to {}x{} ({:?} destination)",
        dimensions.width, dimensions.height, options.destination
    );
    let m = homography.matrix();
    debug!("perspective matrix:");
    for row in 0..3 {
        debug!(
            "  [{:10.5}, {:10.5}, {:10.5}]",
            m[(row, 0)],
            m[(row, 1)],
            m[(row, 2)]
        );
    }

    Ok(RectifyPlan {
        corners: *corners,
        dimensions,
        destination,
        homography,
    })
}

/// Rectify a typed image buffer, keeping its pixel type
pub fn rectify_buffer<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    corners: &OrderedCorners,
    options: &RectifyOptions,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + Send + Sync,
    P::Subpixel: Sample,
{
    if image.width() == 0 || image.height() == 0 {
        return Err(RectifyError::InvalidInput("source image is empty".to_string()));
    }
    let plan = plan(corners, options)?;
    warp_perspective(
        image,
        &plan.homography,
        plan.dimensions,
        options.background,
        options.parallel,
    )
}

/// Rectify a decoded image, returning the same `DynamicImage` variant
pub fn rectify(
    image: &DynamicImage,
    corners: &OrderedCorners,
    options: &RectifyOptions,
) -> Result<DynamicImage> {
    let out: DynamicImage = match image {
        DynamicImage::ImageLuma8(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageLumaA8(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgb8(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgba8(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageLuma16(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageLumaA16(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgb16(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgba16(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgb32F(img) => rectify_buffer(img, corners, options)?.into(),
        DynamicImage::ImageRgba32F(img) => rectify_buffer(img, corners, options)?.into(),
        other => {
            return Err(RectifyError::UnsupportedImage(format!(
                "{:?}",
                other.color()
            )))
        }
    };
    Ok(out)
}

/// Order four raw corner points and rectify the region they bound
pub fn four_point_transform(
    image: &DynamicImage,
    points: &[Point],
    options: &RectifyOptions,
) -> Result<DynamicImage> {
    let corners = order_points(points)?;
    rectify(image, &corners, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    fn corners(coords: [(f64, f64); 4]) -> OrderedCorners {
        OrderedCorners::from_array(coords.map(|(x, y)| Point::new(x, y))).unwrap()
    }

    #[test]
    fn test_plan_axis_aligned() {
        let c = corners([(10.0, 10.0), (110.0, 10.0), (110.0, 60.0), (10.0, 60.0)]);
        let plan = plan(&c, &RectifyOptions::default()).unwrap();
        assert_eq!(plan.dimensions, RectDimensions::new(100, 50));
        assert_eq!(plan.destination[2], Point::new(98.0, 49.0));
    }

    #[test]
    fn test_zero_height_is_degenerate() {
        let c = corners([(0.0, 0.0), (30.0, 0.0), (30.0, 0.0), (0.0, 0.0)]);
        assert!(matches!(
            plan(&c, &RectifyOptions::default()),
            Err(RectifyError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_edge_beyond_u32_rejected() {
        let c = corners([(0.0, 0.0), (5e9, 0.0), (5e9, 10.0), (0.0, 10.0)]);
        assert!(matches!(
            plan(&c, &RectifyOptions::default()),
            Err(RectifyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_background_rejected() {
        let c = corners([(0.0, 0.0), (30.0, 0.0), (30.0, 20.0), (0.0, 20.0)]);
        let options = RectifyOptions::new().with_background(f64::NAN);
        assert!(matches!(
            plan(&c, &options),
            Err(RectifyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rectify_keeps_pixel_type() {
        let img = RgbaImage::from_pixel(64, 48, Rgba([10, 20, 30, 255]));
        let c = corners([(4.0, 4.0), (60.0, 6.0), (58.0, 44.0), (2.0, 40.0)]);
        let out = rectify_buffer(&img, &c, &RectifyOptions::default()).unwrap();
        let dims = c.dimensions();
        assert_eq!(out.dimensions(), (dims.width, dims.height));
        assert_eq!(*out.get_pixel(10, 10), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_dynamic_variant_preserved() {
        let img = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(20, 20, Luma([4000u16])));
        let c = corners([(2.0, 2.0), (17.0, 2.0), (17.0, 17.0), (2.0, 17.0)]);
        let out = rectify(&img, &c, &RectifyOptions::default()).unwrap();
        assert!(matches!(out, DynamicImage::ImageLuma16(_)));
        assert_eq!((out.width(), out.height()), (15, 15));
    }

    #[test]
    fn test_empty_source_rejected() {
        let img = GrayImage::new(0, 0);
        let c = corners([(0.0, 0.0), (30.0, 0.0), (30.0, 20.0), (0.0, 20.0)]);
        assert!(matches!(
            rectify_buffer(&img, &c, &RectifyOptions::default()),
            Err(RectifyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_background_outside_source() {
        // Corners reach past the right edge of a 20x20 image
        let img = GrayImage::from_pixel(20, 20, Luma([90]));
        let c = corners([(0.0, 0.0), (40.0, 0.0), (40.0, 19.0), (0.0, 19.0)]);
        let options = RectifyOptions::new()
            .with_destination(DestinationStyle::Corrected)
            .with_background(255.0);
        let out = rectify_buffer(&img, &c, &options).unwrap();
        assert_eq!(out.dimensions(), (40, 19));
        assert_eq!(out.get_pixel(0, 5)[0], 90);
        assert_eq!(out.get_pixel(39, 5)[0], 255);
    }
}
