//! Zoom/pan controller over a continuous axis.
//!
//! A transform maps a base-scale pixel `s` to the screen pixel `k * s + x`. The controller keeps
//! `k` in `[1, max_scale]` and clamps `x` so the visible domain never leaves the base domain.
//! Continuous gestures are written to a single pending slot (latest wins) and only applied when
//! the frame driver drains it.

use serde::Serialize;

use crate::aggregate::YearRange;
use crate::scale::LinearScale;

pub const DEFAULT_MAX_ZOOM: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self { k: 1.0, x: 0.0 };

    pub fn new(k: f64, x: f64) -> Self {
        Self { k, x }
    }

    pub fn apply(&self, s: f64) -> f64 {
        self.k * s + self.x
    }

    pub fn invert(&self, p: f64) -> f64 {
        (p - self.x) / self.k
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    base: LinearScale,
    max_scale: f64,
    transform: ZoomTransform,
    pending: Option<ZoomTransform>,
}

impl ViewportController {
    /// Controller over `domain` drawn across `width` pixels.
    pub fn new(domain: (f64, f64), width: f64, max_scale: f64) -> Self {
        Self {
            base: LinearScale::new(domain, (0.0, width.max(0.0))),
            max_scale: max_scale.max(1.0),
            transform: ZoomTransform::IDENTITY,
            pending: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.base.range().1
    }

    pub fn base_domain(&self) -> (f64, f64) {
        self.base.domain()
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_zoomed(&self) -> bool {
        self.transform != ZoomTransform::IDENTITY
    }

    /// Clamp scale to `[1, max_scale]` and translate to `[w - w*k, 0]`.
    pub fn constrain(&self, t: ZoomTransform) -> ZoomTransform {
        let k = if t.k.is_finite() {
            t.k.clamp(1.0, self.max_scale)
        } else {
            1.0
        };
        let w = self.width();
        let x = if t.x.is_finite() { t.x } else { 0.0 };
        ZoomTransform {
            k,
            x: x.clamp(w - w * k, 0.0),
        }
    }

    /// The transform a further gesture builds on: the pending one if any, else the applied one.
    fn latest(&self) -> ZoomTransform {
        self.pending.unwrap_or(self.transform)
    }

    /// Queue `t`; replaces any transform still waiting for a frame.
    pub fn request(&mut self, t: ZoomTransform) {
        self.pending = Some(self.constrain(t));
    }

    /// Queue a zoom by `factor` keeping the point under `anchor_px` fixed.
    pub fn zoom_by(&mut self, factor: f64, anchor_px: f64) {
        let cur = self.latest();
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let k = (cur.k * factor).clamp(1.0, self.max_scale);
        let s = cur.invert(anchor_px);
        self.request(ZoomTransform::new(k, anchor_px - k * s));
    }

    /// Queue a pan by `dx` pixels.
    pub fn pan_by(&mut self, dx: f64) {
        let cur = self.latest();
        self.request(ZoomTransform::new(cur.k, cur.x + dx));
    }

    /// Drain the pending slot. Returns the applied transform, or `None` when nothing was queued.
    pub fn apply_pending(&mut self) -> Option<ZoomTransform> {
        let t = self.pending.take()?;
        self.transform = self.constrain(t);
        Some(self.transform)
    }

    /// Apply `t` immediately, discarding anything pending.
    pub fn set_transform(&mut self, t: ZoomTransform) {
        self.pending = None;
        self.transform = self.constrain(t);
    }

    pub fn reset(&mut self) {
        self.set_transform(ZoomTransform::IDENTITY);
    }

    /// New pixel width; translation scales with the width so the visible domain is preserved.
    pub fn resize(&mut self, width: f64) {
        let old = self.width();
        let width = width.max(0.0);
        self.base = self.base.with_range((0.0, width));
        let ratio = if old > 0.0 { width / old } else { 1.0 };
        let scale_x = |t: ZoomTransform| ZoomTransform::new(t.k, t.x * ratio);
        self.transform = self.constrain(scale_x(self.transform));
        self.pending = self.pending.map(|t| self.constrain(scale_x(t)));
    }

    /// Replace the base domain (new dataset extent); resets the transform.
    pub fn set_domain(&mut self, domain: (f64, f64)) {
        self.base = self.base.with_domain(domain);
        self.reset();
    }

    /// Base scale rescaled by the applied transform.
    pub fn rescaled(&self) -> LinearScale {
        let w = self.width();
        let t = self.transform;
        let d0 = self.base.invert(t.invert(0.0));
        let d1 = self.base.invert(t.invert(w));
        LinearScale::new((d0, d1), (0.0, w))
    }

    /// Visible `(lo, hi)`, ordered and clipped to the base domain.
    pub fn visible_domain(&self) -> (f64, f64) {
        let (b0, b1) = self.base.domain();
        let (b0, b1) = (b0.min(b1), b0.max(b1));
        let (v0, v1) = self.rescaled().domain();
        let lo = v0.min(v1).clamp(b0, b1);
        let hi = v0.max(v1).clamp(b0, b1);
        (lo, hi)
    }

    /// Visible `[t0, t1]` on a temporal axis.
    pub fn visible_range(&self) -> YearRange {
        let (lo, hi) = self.visible_domain();
        YearRange::new(lo, hi)
    }
}
