use image::{ImageBuffer, Pixel, Primitive};
use log::trace;
use rayon::prelude::*;

use crate::error::{RectifyError, Result};
use crate::geometry::{Point, RectDimensions};
use crate::homography::Transform2D;

/// Sample types the resampler can interpolate
pub trait Sample: Primitive + Send + Sync {
    fn as_f64(self) -> f64;

    /// Round and saturate an interpolated value back to the sample type
    fn saturate(v: f64) -> Self;
}

impl Sample for u8 {
    fn as_f64(self) -> f64 {
        self as f64
    }

    fn saturate(v: f64) -> Self {
        v.round().clamp(0.0, u8::MAX as f64) as u8
    }
}

impl Sample for u16 {
    fn as_f64(self) -> f64 {
        self as f64
    }

    fn saturate(v: f64) -> Self {
        v.round().clamp(0.0, u16::MAX as f64) as u16
    }
}

impl Sample for f32 {
    fn as_f64(self) -> f64 {
        self as f64
    }

    fn saturate(v: f64) -> Self {
        v as f32
    }
}

/// Borrowed row-major source samples
struct SourceView<'a, S> {
    data: &'a [S],
    width: usize,
    height: usize,
    channels: usize,
}

impl<S: Sample> SourceView<'_, S> {
    /// Sample value, or `background` outside the image (constant border)
    #[inline]
    fn get(&self, x: i64, y: i64, c: usize, background: f64) -> f64 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return background;
        }
        let idx = (y as usize * self.width + x as usize) * self.channels + c;
        self.data[idx].as_f64()
    }

    /// Bilinear interpolation of every channel at `(x, y)` into `out`
    fn bilinear_into(&self, x: f64, y: f64, background: f64, out: &mut [S]) {
        // Nothing within one pixel of the image: all four taps are border
        if !x.is_finite()
            || !y.is_finite()
            || x <= -1.0
            || y <= -1.0
            || x >= self.width as f64
            || y >= self.height as f64
        {
            out.fill(S::saturate(background));
            return;
        }

        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        for (c, value) in out.iter_mut().enumerate() {
            let p00 = self.get(x0, y0, c, background);
            let p10 = self.get(x0 + 1, y0, c, background);
            let p01 = self.get(x0, y0 + 1, c, background);
            let p11 = self.get(x0 + 1, y0 + 1, c, background);

            let top = p00 + fx * (p10 - p00);
            let bottom = p01 + fx * (p11 - p01);
            *value = S::saturate(top + fy * (bottom - top));
        }
    }
}

fn fill_row<S: Sample, T: Transform2D>(
    row: &mut [S],
    y: usize,
    src: &SourceView<'_, S>,
    transform: &T,
    background: f64,
) {
    for (x, pixel) in row.chunks_mut(src.channels).enumerate() {
        let p = transform.apply_inverse(Point::new(x as f64, y as f64));
        src.bilinear_into(p.x, p.y, background, pixel);
    }
}

/// Resample `src` into a `dims`-sized image by inverse mapping.
///
/// `transform` maps source pixels to destination pixels; every destination
/// pixel at integer `(x, y)` is pulled back through its inverse and sampled
/// bilinearly. Taps outside the source read as `background`. Rows are
/// processed on the rayon pool when `parallel` is set.
///
/// Fails with `InvalidInput` when the output buffer cannot be sized or
/// allocated.
pub fn warp_perspective<P, T>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    transform: &T,
    dims: RectDimensions,
    background: f64,
    parallel: bool,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + Send + Sync,
    P::Subpixel: Sample,
    T: Transform2D + Sync,
{
    let len = output_len(dims, P::CHANNEL_COUNT as usize)?;
    let mut data: Vec<P::Subpixel> = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        RectifyError::InvalidInput(format!(
            "cannot allocate a {}x{} output: {e}",
            dims.width, dims.height
        ))
    })?;
    data.resize(len, <P::Subpixel as Sample>::saturate(0.0));
    let mut output = ImageBuffer::<P, Vec<P::Subpixel>>::from_raw(dims.width, dims.height, data)
        .ok_or_else(|| {
            RectifyError::InvalidInput(format!(
                "output buffer does not fit {}x{}",
                dims.width, dims.height
            ))
        })?;
    if dims.is_empty() || src.width() == 0 || src.height() == 0 {
        return Ok(output);
    }

    let view = SourceView {
        data: src.as_raw(),
        width: src.width() as usize,
        height: src.height() as usize,
        channels: P::CHANNEL_COUNT as usize,
    };
    let row_len = dims.width as usize * view.channels;

    trace!(
        "warping {}x{} -> {}x{} ({} channels, parallel={})",
        view.width,
        view.height,
        dims.width,
        dims.height,
        view.channels,
        parallel
    );

    let buffer: &mut [P::Subpixel] = &mut output;
    if parallel {
        buffer
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill_row(row, y, &view, transform, background));
    } else {
        buffer
            .chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill_row(row, y, &view, transform, background));
    }

    Ok(output)
}

/// Number of samples in a `dims` image with `channels` per pixel
pub fn output_len(dims: RectDimensions, channels: usize) -> Result<usize> {
    (dims.width as usize)
        .checked_mul(dims.height as usize)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| {
            RectifyError::InvalidInput(format!(
                "a {}x{} output with {} channels overflows memory",
                dims.width, dims.height, channels
            ))
        })
}
