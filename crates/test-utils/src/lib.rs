//! Shared test utilities for the GeotoolKit workspace.
//!
//! - WMS capabilities and WFS response documents ([`documents`])
//! - Layer names, boxes and config files used across tests ([`fixtures`])
//! - Temporary directories and files
//! - [`assert_bbox_approx_eq!`] for comparing bounding boxes
//!
//! ```ignore
//! use test_utils::{documents, assert_bbox_approx_eq};
//! ```

pub mod documents;
pub mod fixtures;
pub mod paths;

pub use paths::*;

#[doc(hidden)]
pub use approx;

/// Asserts that a value with `min_x`, `min_y`, `max_x` and `max_y` fields
/// matches `(min_x, min_y, max_x, max_y)` within an absolute `epsilon`.
///
/// ```ignore
/// assert_bbox_approx_eq!(prepared.envelope.bbox, (-180.0, -90.0, 180.0, 90.0), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_bbox_approx_eq {
    ($bbox:expr, ($min_x:expr, $min_y:expr, $max_x:expr, $max_y:expr), $epsilon:expr) => {{
        let bbox = &$bbox;
        let actual: [f64; 4] = [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y];
        let expected: [f64; 4] = [$min_x, $min_y, $max_x, $max_y];
        for (axis, (a, e)) in ["min_x", "min_y", "max_x", "max_y"]
            .iter()
            .zip(actual.iter().zip(expected.iter()))
        {
            if !$crate::approx::abs_diff_eq!(*a, *e, epsilon = $epsilon) {
                panic!(
                    "bbox {} differs: actual {:?}, expected {:?} (epsilon {:?})\n  actual bbox: {:?}",
                    axis, a, e, $epsilon, actual
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    struct Extent {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    }

    fn extent() -> Extent {
        Extent {
            min_x: -1.0,
            min_y: -2.0,
            max_x: 3.0,
            max_y: 4.00001,
        }
    }

    #[test]
    fn test_bbox_within_epsilon() {
        assert_bbox_approx_eq!(extent(), (-1.0, -2.0, 3.0, 4.0), 0.001);
    }

    #[test]
    #[should_panic(expected = "bbox max_y differs")]
    fn test_bbox_outside_epsilon() {
        assert_bbox_approx_eq!(extent(), (-1.0, -2.0, 3.0, 4.0), 1e-9);
    }
}
