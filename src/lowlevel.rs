//! Low-level building blocks for custom detection pipelines.
//!
//! These expose the filters, quantizers and index internals used by the
//! stages. Most users should prefer `Detector`.

pub use crate::features::{
    canny, describe, extract_features, gradient_at, normal_bin_at, qualifying_points,
    quantize_normal, quantize_orientation, sample_points, stable_mask, surface_normal,
};
pub use crate::hashing::{
    generate_triplets, DepthBins, GridCell, HashTable, ReferenceGrid, TableKey, Triplet,
    TripletKey,
};
pub use crate::image::filters::{box_blur3, central_difference, sobel_magnitude};
pub use crate::image::IntegralImage;
pub use crate::objectness::edge_mask;
pub use crate::verify::checks::Check;
pub use crate::verify::{colors_agree, normalize_hsv};
