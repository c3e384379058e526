//! Degree-indexed trigonometry lookup
//!
//! The particle hot path computes a rotation per vertex per frame, so
//! rotations go through a fixed-size table with nearest-index rounding
//! instead of libm calls. The table length is a power of two: folding an
//! index into range is a bitwise AND, which also handles negative angles
//! (two's-complement AND is an exact modulo for powers of two).

use std::sync::OnceLock;

/// Number of table entries covering a full turn. Must stay a power of two.
pub const TABLE_LEN: usize = 1024;

const INDEX_MASK: isize = TABLE_LEN as isize - 1;
const DEGREES_TO_INDEX: f32 = TABLE_LEN as f32 / 360.0;

struct TrigTable {
    sin: [f32; TABLE_LEN],
    cos: [f32; TABLE_LEN],
}

static TABLE: OnceLock<TrigTable> = OnceLock::new();

fn table() -> &'static TrigTable {
    TABLE.get_or_init(|| {
        let mut sin = [0.0; TABLE_LEN];
        let mut cos = [0.0; TABLE_LEN];
        for (i, (s, c)) in sin.iter_mut().zip(cos.iter_mut()).enumerate() {
            let radians = (i as f32 * 360.0 / TABLE_LEN as f32).to_radians();
            *s = radians.sin();
            *c = radians.cos();
        }
        TrigTable { sin, cos }
    })
}

fn index_for(degrees: f32) -> usize {
    let index = (degrees * DEGREES_TO_INDEX).round() as isize;
    (index & INDEX_MASK) as usize
}

/// Table sine of an angle in degrees
pub fn sin_deg(degrees: f32) -> f32 {
    table().sin[index_for(degrees)]
}

/// Table cosine of an angle in degrees
pub fn cos_deg(degrees: f32) -> f32 {
    table().cos[index_for(degrees)]
}

/// Sine and cosine of an angle in degrees with a single index computation
pub fn sin_cos_deg(degrees: f32) -> (f32, f32) {
    let t = table();
    let i = index_for(degrees);
    (t.sin[i], t.cos[i])
}
