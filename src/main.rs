use anyhow::{Context, Result};
use clap::Parser;
use image::{ImageReader, Rgba};
use log::{debug, info, LevelFilter};

use birdseye::{draw_outline, order_quadrilateral, rectify, Cli, Quadrilateral};

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load input image
    let img = ImageReader::open(&cli.input)
        .with_context(|| format!("Failed to open input file: {:?}", cli.input))?
        .decode()
        .with_context(|| format!("Failed to decode image: {:?}", cli.input))?;
    debug!("Loaded image: {:?} ({}x{})", cli.input, img.width(), img.height());

    // Order corners in full-resolution coordinates
    let quad = Quadrilateral::from_points(&cli.corners.0)
        .and_then(|q| q.scaled(cli.corner_scale))
        .context("Invalid corner points")?;
    let corners = order_quadrilateral(&quad);
    debug!(
        "Ordered corners: tl=({:.1}, {:.1}) tr=({:.1}, {:.1}) br=({:.1}, {:.1}) bl=({:.1}, {:.1})",
        corners.top_left.x,
        corners.top_left.y,
        corners.top_right.x,
        corners.top_right.y,
        corners.bottom_right.x,
        corners.bottom_right.y,
        corners.bottom_left.x,
        corners.bottom_left.y
    );

    if let Some(outline_path) = &cli.outline {
        let overlay = draw_outline(&img, &corners, Rgba([0, 255, 0, 255]), 2);
        overlay
            .save(outline_path)
            .with_context(|| format!("Failed to save outline: {:?}", outline_path))?;
        info!("Saved outline: {:?}", outline_path);
    }

    let options = cli.options();
    let rectified = rectify(&img, &corners, &options).context("Failed to rectify image")?;

    let output_path = cli.output_path();
    rectified
        .save(&output_path)
        .with_context(|| format!("Failed to save output: {:?}", output_path))?;

    info!("Saved rectified image: {:?}", output_path);
    info!(
        "Dimensions: {}x{} -> {}x{}",
        img.width(),
        img.height(),
        rectified.width(),
        rectified.height()
    );

    Ok(())
}
