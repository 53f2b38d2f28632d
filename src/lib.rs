pub mod cli;
pub mod error;
pub mod geometry;
pub mod homography;
pub mod overlay;
pub mod rectify;
pub mod transform;

pub use cli::Cli;
pub use error::{RectifyError, Result};
pub use geometry::{
    order_points, order_quadrilateral, DestinationStyle, OrderedCorners, Point, Quadrilateral,
    RectDimensions,
};
pub use homography::{Homography, Transform2D};
pub use overlay::draw_outline;
pub use rectify::{
    four_point_transform, plan, rectify, rectify_buffer, RectifyOptions, RectifyPlan,
};
pub use transform::{warp_perspective, Sample};
