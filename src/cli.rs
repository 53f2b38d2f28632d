use clap::Parser;
use std::path::PathBuf;

use crate::geometry::{DestinationStyle, Point};
use crate::rectify::RectifyOptions;

#[derive(Parser, Debug)]
#[command(name = "birdseye")]
#[command(version, about = "Rectify a photographed document to a top-down view from its four corners")]
pub struct Cli {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Four corner points in any order, e.g. "10,10 110,12 108,60 12,58"
    #[arg(short, long, value_parser = parse_corners, allow_hyphen_values = true)]
    pub corners: Corners,

    /// Output path [default: input_rectified.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Multiply corner coordinates by this factor before use
    /// (for corners found on a downscaled copy)
    #[arg(long, default_value = "1.0")]
    pub corner_scale: f64,

    /// Map the bottom-right corner to (width-1, height-1) instead of (width-2, height-1)
    #[arg(long)]
    pub corrected_destination: bool,

    /// Fill value for pixels outside the source image
    #[arg(long, default_value = "0")]
    pub background: f64,

    /// Also write the source image with the corner outline drawn on it
    #[arg(long)]
    pub outline: Option<PathBuf>,

    /// Resample on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Show geometry details
    #[arg(long)]
    pub verbose: bool,
}

/// Parsed `--corners` value
#[derive(Debug, Clone, PartialEq)]
pub struct Corners(pub Vec<Point>);

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            let parent = self.input.parent().unwrap_or(std::path::Path::new("."));
            parent.join(format!("{}_rectified.png", stem))
        })
    }

    pub fn options(&self) -> RectifyOptions {
        let destination = if self.corrected_destination {
            DestinationStyle::Corrected
        } else {
            DestinationStyle::Legacy
        };
        RectifyOptions::new()
            .with_destination(destination)
            .with_background(self.background)
            .with_parallel(!self.sequential)
    }
}

fn parse_corners(s: &str) -> Result<Corners, String> {
    let points = s
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|part| !part.is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() != 4 {
        return Err(format!(
            "Expected 4 corner points, got {} in '{}'",
            points.len(),
            s
        ));
    }

    Ok(Corners(points))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid point '{}', expected X,Y", s))?;

    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| format!("Invalid x coordinate: {}", x))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| format!("Invalid y coordinate: {}", y))?;

    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corners() {
        let corners = parse_corners("10,10 110,10;110,60  10.5,60").unwrap();
        assert_eq!(corners.0.len(), 4);
        assert_eq!(corners.0[3], Point::new(10.5, 60.0));
    }

    #[test]
    fn test_parse_corners_rejects_bad_input() {
        assert!(parse_corners("10,10 110,10 110,60").is_err());
        assert!(parse_corners("10,10 110,10 110,60 10;60").is_err());
        assert!(parse_corners("10,10 110,10 110,60 x,60").is_err());
    }

    #[test]
    fn test_options_from_flags() {
        let cli = Cli::parse_from([
            "birdseye",
            "scan.jpg",
            "--corners",
            "0,0 10,0 10,10 0,10",
            "--corrected-destination",
            "--background",
            "255",
        ]);
        let options = cli.options();
        assert_eq!(options.destination, DestinationStyle::Corrected);
        assert_eq!(options.background, 255.0);
        assert!(options.parallel);
        assert_eq!(cli.output_path(), PathBuf::from("scan_rectified.png"));
    }
}
