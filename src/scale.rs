//! Linear and square-root scales, "nice" domain rounding, tick generation and tick labels.

use serde::Serialize;

const E10: f64 = 7.071_067_811_865_475_5; // sqrt(50)
const E5: f64 = 3.162_277_660_168_379_5; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

pub const DEFAULT_TICK_COUNT: usize = 10;

/// Tick step for `count` ticks across `[start, stop]`. Positive values are the step itself; a
/// negative value `-n` means a step of `1/n` (keeps fractional steps exact). Zero when no step
/// can be derived.
pub fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let mult = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        mult * 10f64.powf(power)
    } else {
        -10f64.powf(-power) / mult
    }
}

/// Evenly spaced round values within `[start, stop]`.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !start.is_finite() || !stop.is_finite() || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (lo, hi, reversed) = if stop < start {
        (stop, start, true)
    } else {
        (start, stop, false)
    };
    let inc = tick_increment(lo, hi, count);
    let mut out: Vec<f64> = if inc > 0.0 {
        let i0 = (lo / inc).ceil() as i64;
        let i1 = (hi / inc).floor() as i64;
        (i0..=i1).map(|i| i as f64 * inc).collect()
    } else if inc < 0.0 {
        let inv = -inc;
        let i0 = (lo * inv).ceil() as i64;
        let i1 = (hi * inv).floor() as i64;
        (i0..=i1).map(|i| i as f64 / inv).collect()
    } else {
        Vec::new()
    };
    if reversed {
        out.reverse();
    }
    out
}

/// Continuous linear map from `domain` to `range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn with_domain(self, domain: (f64, f64)) -> Self {
        Self { domain, ..self }
    }

    pub fn with_range(self, range: (f64, f64)) -> Self {
        Self { range, ..self }
    }

    /// Domain value to range value. A zero-width domain maps everything to the range midpoint.
    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Range value back to domain value.
    pub fn invert(&self, r: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (r - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Extend the domain outward to round values. Converges in a handful of passes; capped at ten.
    pub fn nice(self, count: usize) -> Self {
        let (d0, d1) = self.domain;
        if !d0.is_finite() || !d1.is_finite() || d0 == d1 {
            return self;
        }
        let reversed = d1 < d0;
        let (mut start, mut stop) = if reversed { (d1, d0) } else { (d0, d1) };
        let mut prestep: Option<f64> = None;
        for _ in 0..10 {
            let step = tick_increment(start, stop, count);
            if prestep == Some(step) {
                break;
            }
            if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else if step < 0.0 {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            } else {
                break;
            }
            prestep = Some(step);
        }
        let domain = if reversed { (stop, start) } else { (start, stop) };
        Self { domain, ..self }
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count)
    }
}

/// Square-root scale (point radii).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SqrtScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl SqrtScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn map(&self, v: f64) -> f64 {
        let s = |x: f64| x.max(0.0).sqrt();
        let (d0, d1) = (s(self.domain.0), s(self.domain.1));
        let (r0, r1) = self.range;
        if d1 == d0 || !v.is_finite() {
            return r0;
        }
        r0 + (s(v) - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Label style for a tick sequence: whole numbers or two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickFormat {
    Integer,
    Fixed2,
}

impl TickFormat {
    /// Integer labels when every tick is whole.
    pub fn for_ticks(values: &[f64]) -> Self {
        if values.iter().all(|v| v.fract() == 0.0) {
            Self::Integer
        } else {
            Self::Fixed2
        }
    }

    pub fn format(self, v: f64) -> String {
        match self {
            Self::Integer => format!("{}", v.round() as i64),
            Self::Fixed2 => format!("{:.2}", v),
        }
    }
}

/// Tick count for a value-axis span: fewer ticks on narrow domains.
pub fn tick_count_for_span(span: f64) -> usize {
    if span < 10.0 {
        6
    } else if span < 50.0 {
        7
    } else {
        8
    }
}

/// Milliseconds as `m:ss`.
pub fn format_duration_ms(ms: f64) -> String {
    if !ms.is_finite() || ms < 0.0 {
        return "-".to_string();
    }
    let total_secs = (ms / 1000.0).round() as u64;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// One axis tick handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub position: f64,
    pub label: String,
}

/// Ticks for `scale` with adaptive labels.
pub fn axis_ticks(scale: &LinearScale, count: usize) -> Vec<Tick> {
    let values = scale.ticks(count);
    let format = TickFormat::for_ticks(&values);
    values
        .into_iter()
        .map(|value| Tick {
            value,
            position: scale.map(value),
            label: format.format(value),
        })
        .collect()
}

/// Ticks labelled with a caller-supplied formatter.
pub fn axis_ticks_with<F>(scale: &LinearScale, count: usize, label: F) -> Vec<Tick>
where
    F: Fn(f64) -> String,
{
    scale
        .ticks(count)
        .into_iter()
        .map(|value| Tick {
            value,
            position: scale.map(value),
            label: label(value),
        })
        .collect()
}
