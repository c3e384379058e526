//! Lightweight xorshift32 PRNG - no external crate needed

pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32)
    }

    /// Returns a float in [min, max); a degenerate range returns `min`
    /// without consuming randomness
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    /// Angle in degrees uniformly within +/- `spread / 2` of `center`
    pub fn angle_deg(&mut self, center: f32, spread: f32) -> f32 {
        if spread <= 0.0 {
            return center;
        }
        self.range(center - spread * 0.5, center + spread * 0.5)
    }
}
