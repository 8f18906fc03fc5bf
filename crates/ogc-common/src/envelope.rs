//! Envelopes: a 2D extent in a CRS plus optional time and elevation axes.

use serde::{Deserialize, Serialize};

use crate::crs::transform_bbox;
use crate::{BoundingBox, CrsCode, OgcResult, TimeRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub crs: CrsCode,
    /// Horizontal extent, always in x/y order.
    pub bbox: BoundingBox,
    /// Temporal axis, sent as the WMS TIME parameter.
    pub time: Option<TimeRange>,
    /// Vertical axis as (min, max), sent as the WMS ELEVATION parameter.
    pub elevation: Option<(f64, f64)>,
}

impl Envelope {
    pub fn new(crs: CrsCode, bbox: BoundingBox) -> Self {
        Self {
            crs,
            bbox,
            time: None,
            elevation: None,
        }
    }

    /// The whole world in CRS:84.
    pub fn wgs84_world() -> Self {
        Self::new(CrsCode::Crs84, crate::bbox::WORLD_WGS84)
    }

    pub fn with_time(mut self, time: TimeRange) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_elevation(mut self, min: f64, max: f64) -> Self {
        self.elevation = Some((min, max));
        self
    }

    /// Reproject the horizontal extent; time and elevation are carried over.
    pub fn transform_to(&self, target: &CrsCode) -> OgcResult<Envelope> {
        let bbox = transform_bbox(&self.crs, target, &self.bbox)?;
        Ok(Envelope {
            crs: target.clone(),
            bbox,
            time: self.time,
            elevation: self.elevation,
        })
    }

    /// Map a pixel centre of a `width` x `height` image covering this
    /// envelope to coordinates (row 0 is the top edge).
    pub fn pixel_to_coordinate(&self, i: f64, j: f64, width: u32, height: u32) -> (f64, f64) {
        let x = self.bbox.min_x + (i + 0.5) / width as f64 * self.bbox.width();
        let y = self.bbox.max_y - (j + 0.5) / height as f64 * self.bbox.height();
        (x, y)
    }

    /// Inverse of [`Envelope::pixel_to_coordinate`], returning fractional
    /// pixel positions (which may fall outside the image).
    pub fn coordinate_to_pixel(&self, x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
        let i = (x - self.bbox.min_x) / self.bbox.width() * width as f64 - 0.5;
        let j = (self.bbox.max_y - y) / self.bbox.height() * height as f64 - 0.5;
        (i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_transform_keeps_extra_axes() {
        let time = TimeRange::instant(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let env = Envelope::new(CrsCode::WGS84, BoundingBox::new(-10.0, -10.0, 10.0, 10.0))
            .with_time(time)
            .with_elevation(100.0, 100.0);

        let merc = env.transform_to(&CrsCode::WEB_MERCATOR).unwrap();
        assert_eq!(merc.crs, CrsCode::WEB_MERCATOR);
        assert_eq!(merc.time, Some(time));
        assert_eq!(merc.elevation, Some((100.0, 100.0)));
        assert!(merc.bbox.max_x > 1_000_000.0);
    }

    #[test]
    fn test_pixel_mapping_is_invertible() {
        let env = Envelope::new(CrsCode::WGS84, BoundingBox::new(0.0, 0.0, 100.0, 50.0));
        let (x, y) = env.pixel_to_coordinate(10.0, 20.0, 200, 100);
        let (i, j) = env.coordinate_to_pixel(x, y, 200, 100);
        assert!((i - 10.0).abs() < 1e-9);
        assert!((j - 20.0).abs() < 1e-9);
    }
}
