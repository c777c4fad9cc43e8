use aif_core::{GrayImage, Keypoint, Luma};
use image::ImageBuffer;
use imageproc::filter::horizontal_filter;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::error::{DetectError, DetectResult};
use crate::sampling::AffineSample;

const SINGULAR_EPS: f64 = 1e-12;

/// Forward 2x3 affine map, `[x', y'] = m * [x, y, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub m: [[f64; 3]; 2],
}

impl AffineMap {
    pub const IDENTITY: AffineMap = AffineMap { m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] };

    /// Counter-clockwise rotation by `phi` degrees about the origin, in image
    /// coordinates with y pointing down.
    pub fn rotation(phi: f64) -> Self {
        let (s, c) = phi.to_radians().sin_cos();
        AffineMap { m: [[c, s, 0.0], [-s, c, 0.0]] }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    pub fn determinant(&self) -> f64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    pub fn invert(&self) -> DetectResult<AffineMap> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return Err(DetectError::DegenerateAffine { determinant: det });
        }
        let [[a, b, tx], [c, d, ty]] = self.m;
        let (ia, ib, ic, id) = (d / det, -b / det, -c / det, a / det);
        Ok(AffineMap {
            m: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }

    fn to_projection(self) -> Option<Projection> {
        let [[a, b, tx], [c, d, ty]] = self.m;
        Projection::from_matrix([
            a as f32, b as f32, tx as f32,
            c as f32, d as f32, ty as f32,
            0.0, 0.0, 1.0,
        ])
    }
}

/// Geometry of one simulated view of a `width x height` image
#[derive(Debug, Clone, PartialEq)]
pub struct AffineWarp {
    sample: AffineSample,
    rotation_inverse: AffineMap,
    rotated_size: (u32, u32),
    map: AffineMap,
    inverse: AffineMap,
    size: (u32, u32),
}

impl AffineWarp {
    /// Fails for a sample that does not pass [`AffineSample::validate`].
    pub fn new(sample: AffineSample, width: u32, height: u32) -> DetectResult<Self> {
        sample.validate()?;

        let mut rotation = AffineMap::IDENTITY;
        let mut rotated_size = (width, height);

        if sample.phi != 0.0 {
            rotation = AffineMap::rotation(sample.phi);
            let corners = [
                (0.0, 0.0),
                (width as f64, 0.0),
                (width as f64, height as f64),
                (0.0, height as f64),
            ]
            .map(|(x, y)| rotation.apply(x, y));

            let (min_x, max_x) = min_max(corners.iter().map(|c| c.0));
            let (min_y, max_y) = min_max(corners.iter().map(|c| c.1));
            let (x0, y0) = (min_x.floor(), min_y.floor());

            rotation.m[0][2] = -x0;
            rotation.m[1][2] = -y0;
            rotated_size = (
                (max_x.floor() - x0) as u32 + 1,
                (max_y.floor() - y0) as u32 + 1,
            );
        }

        let mut map = rotation;
        let mut size = rotated_size;
        if sample.tilt != 1.0 {
            for v in map.m[0].iter_mut() {
                *v /= sample.tilt;
            }
            size.0 = ((rotated_size.0 as f64 / sample.tilt).round() as u32).max(1);
        }

        Ok(Self {
            sample,
            rotation_inverse: rotation.invert()?,
            rotated_size,
            map,
            inverse: map.invert()?,
            size,
        })
    }

    pub fn sample(&self) -> AffineSample {
        self.sample
    }

    /// Full source-to-view map
    pub fn map(&self) -> &AffineMap {
        &self.map
    }

    /// Size of the simulated view
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Render the simulated view: bilinear rotation with replicated borders,
    /// then anti-aliasing blur and nearest-neighbour horizontal shrink.
    pub fn apply_to_image(&self, image: &GrayImage) -> GrayImage {
        let mut view = if self.sample.phi != 0.0 {
            rotate_replicate(image, &self.rotation_inverse, self.rotated_size)
        } else {
            image.clone()
        };

        if self.sample.tilt != 1.0 {
            let sigma = 0.8 * (self.sample.tilt * self.sample.tilt - 1.0).sqrt();
            let blurred = horizontal_filter(&view, &gaussian_kernel(sigma));
            view = shrink_horizontal(&blurred, self.sample.tilt, self.size.0);
        }
        view
    }

    /// Validity mask of the simulated view. A missing mask means every
    /// source pixel is valid; pixels mapped from outside the source are invalid.
    pub fn apply_to_mask(
        &self,
        mask: Option<&GrayImage>,
        width: u32,
        height: u32,
    ) -> DetectResult<GrayImage> {
        let source = match mask {
            Some(m) => m.clone(),
            None => GrayImage::from_pixel(width, height, Luma([255])),
        };
        if self.sample.is_identity() {
            return Ok(source);
        }

        let projection = self.map.to_projection().ok_or(DetectError::DegenerateAffine {
            determinant: self.map.determinant(),
        })?;
        let mut out = GrayImage::new(self.size.0, self.size.1);
        warp_into(&source, &projection, Interpolation::Nearest, Luma([0]), &mut out);
        Ok(out)
    }

    /// Map key-point locations from the simulated view back to the source frame
    pub fn invert_keypoints(&self, keypoints: &mut [Keypoint]) {
        for kp in keypoints.iter_mut() {
            let (x, y) = self.inverse.apply(kp.x as f64, kp.y as f64);
            kp.x = x as f32;
            kp.y = y as f32;
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Normalized 1-D Gaussian kernel spanning three sigmas on each side
fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (3.0 * sigma).round().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / denom).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Sample `image` at `inverse(x, y)` for every output pixel
fn rotate_replicate(image: &GrayImage, inverse: &AffineMap, (width, height): (u32, u32)) -> GrayImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let raw = image.as_raw();
    let pixel = |x: i64, y: i64| -> f64 {
        let xx = x.clamp(0, w as i64 - 1) as usize;
        let yy = y.clamp(0, h as i64 - 1) as usize;
        raw[yy * w + xx] as f64
    };

    ImageBuffer::from_fn(width, height, |x, y| {
        let (sx, sy) = inverse.apply(x as f64, y as f64);
        let (x0, y0) = (sx.floor(), sy.floor());
        let (fx, fy) = (sx - x0, sy - y0);
        let (xi, yi) = (x0 as i64, y0 as i64);

        let top = pixel(xi, yi) * (1.0 - fx) + pixel(xi + 1, yi) * fx;
        let bottom = pixel(xi, yi + 1) * (1.0 - fx) + pixel(xi + 1, yi + 1) * fx;
        let v = top * (1.0 - fy) + bottom * fy;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// `dst(x', y) = src(floor(x' * tilt), y)`
fn shrink_horizontal(image: &GrayImage, tilt: f64, width: u32) -> GrayImage {
    let last = image.width().saturating_sub(1);
    ImageBuffer::from_fn(width, image.height(), |x, y| {
        let sx = ((x as f64 * tilt).floor() as u32).min(last);
        *image.get_pixel(sx, y)
    })
}
