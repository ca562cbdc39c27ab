//! Five-point face alignment.
//!
//! Maps host-supplied landmarks onto the canonical ArcFace template with a
//! least-squares similarity transform, then resamples the RGB face crop.

use crate::frame::FrameBuffer;

/// Canonical landmark positions in a 112×112 ArcFace crop.
pub const TEMPLATE_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const CROP_SIZE: usize = 112;

/// Similarity transform `dst = s·R·src + t`, stored as `(a, b, tx, ty)`
/// with `a = s·cosθ`, `b = s·sinθ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Closed-form least-squares fit from `src` points onto `dst` points.
    ///
    /// Returns `None` when the source points are degenerate (all coincident).
    pub fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Option<Self> {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(x, y), p| (x + p.0, y + p.1));
            (sx / n, sy / n)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let mut var = 0.0f32;
        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        for (s, d) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (s.0 - smx, s.1 - smy);
            let (dx, dy) = (d.0 - dmx, d.1 - dmy);
            var += sx * sx + sy * sy;
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
        }

        if var < 1e-9 {
            return None;
        }

        let a = dot / var;
        let b = cross / var;
        Some(Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        })
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Inverse mapping, `None` for a zero-scale transform.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let ia = self.a / det;
        let ib = -self.b / det;
        Some(Self {
            a: ia,
            b: ib,
            tx: -(ia * self.tx - ib * self.ty),
            ty: -(ib * self.tx + ia * self.ty),
        })
    }
}

/// Aligned 112×112 RGB crop, row-major, 3 bytes per pixel.
pub type AlignedFace = Vec<u8>;

/// Align the face described by `landmarks` to the ArcFace template.
///
/// Pixels that map outside the frame are black. Returns `None` for degenerate landmarks.
pub fn align_face(frame: &FrameBuffer, landmarks: &[(f32, f32); 5]) -> Option<AlignedFace> {
    let to_crop = Similarity::estimate(landmarks, &TEMPLATE_112)?;
    let to_frame = to_crop.inverse()?;

    let mut out = vec![0u8; CROP_SIZE * CROP_SIZE * 3];
    for oy in 0..CROP_SIZE {
        for ox in 0..CROP_SIZE {
            let (sx, sy) = to_frame.apply((ox as f32, oy as f32));
            let rgb = sample_bilinear(frame, sx, sy);
            let i = (oy * CROP_SIZE + ox) * 3;
            out[i..i + 3].copy_from_slice(&rgb);
        }
    }
    Some(out)
}

fn sample_bilinear(frame: &FrameBuffer, x: f32, y: f32) -> [u8; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let corners = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut acc = [0.0f32; 3];
    for (cx, cy, w) in corners {
        if let Some(px) = frame.rgb_at(cx, cy) {
            for c in 0..3 {
                acc[c] += px[c] as f32 * w;
            }
        }
    }
    acc.map(|v| v.round().clamp(0.0, 255.0) as u8)
}
