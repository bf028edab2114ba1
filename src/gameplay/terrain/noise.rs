use crate::config::LevelData;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::Rng;

const PERLIN_SEED: i32 = 1337;
const OCTAVE_OFFSET: f32 = 1_000.0;
const SEED_OFFSET_RANGE: f32 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub scale: f32,
    pub amplitude: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
}

impl NoiseParams {
    pub fn from_level(level: &LevelData) -> Self {
        Self {
            scale: level.noise_scale,
            amplitude: level.noise_amplitude,
            octaves: level.octaves,
            persistence: level.persistence,
            lacunarity: level.lacunarity,
        }
    }
}

/// Each octave samples Perlin noise on the `y = 0` line remapped to `[0, 1]`,
/// so heights range over `[0, amplitude * sum(persistence^i)]`.
pub struct NoiseField {
    params: NoiseParams,
    seed_offset: f32,
    perlin: FastNoiseLite,
}

impl NoiseField {
    pub fn new(params: NoiseParams, seed_offset: f32) -> Self {
        let mut perlin = FastNoiseLite::with_seed(PERLIN_SEED);
        perlin.set_noise_type(Some(NoiseType::Perlin));
        perlin.set_frequency(Some(1.0));

        Self {
            params,
            seed_offset,
            perlin,
        }
    }

    pub fn seed_offset(&self) -> f32 {
        self.seed_offset
    }

    pub fn reseed(&mut self, seed_offset: f32) {
        self.seed_offset = seed_offset;
    }

    pub fn height(&self, x: f32) -> f32 {
        let mut amplitude = self.params.amplitude;
        let mut frequency = self.params.scale;
        let mut height = 0.0;

        for octave in 0..self.params.octaves {
            let sample_x = (x + self.seed_offset + (octave as f32 * OCTAVE_OFFSET)) * frequency;
            height += amplitude * self.coherent_noise(sample_x, 0.0);
            amplitude *= self.params.persistence;
            frequency *= self.params.lacunarity;
        }

        height
    }

    fn coherent_noise(&self, x: f32, y: f32) -> f32 {
        let raw = self.perlin.get_noise_2d(x, y);
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

pub fn random_seed_offset(rng: &mut impl Rng) -> f32 {
    rng.gen_range(0.0..SEED_OFFSET_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> NoiseParams {
        NoiseParams {
            scale: 0.05,
            amplitude: 5.0,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }

    #[test]
    fn height_is_deterministic_for_fixed_offset() {
        let a = NoiseField::new(params(), 412.5);
        let b = NoiseField::new(params(), 412.5);

        for step in 0..200 {
            let x = step as f32 * 0.73;
            assert_eq!(a.height(x).to_bits(), a.height(x).to_bits());
            assert_eq!(a.height(x).to_bits(), b.height(x).to_bits());
        }
    }

    #[test]
    fn height_stays_within_octave_amplitude_sum() {
        let field = NoiseField::new(params(), 12.0);
        let max_height = 5.0 + 2.5 + 1.25;

        for step in 0..500 {
            let height = field.height(step as f32 * 1.37);
            assert!((0.0..=max_height).contains(&height), "height {height}");
        }
    }

    #[test]
    fn zero_amplitude_is_flat() {
        let field = NoiseField::new(
            NoiseParams {
                amplitude: 0.0,
                ..params()
            },
            99.0,
        );

        for step in 0..50 {
            assert_eq!(field.height(step as f32), 0.0);
        }
    }

    #[test]
    fn height_is_continuous() {
        let field = NoiseField::new(params(), 3.0);
        for step in 0..400 {
            let x = step as f32 * 0.25;
            let delta = (field.height(x + 0.01) - field.height(x)).abs();
            assert!(delta < 0.1, "jump of {delta} at x = {x}");
        }
    }

    #[test]
    fn random_offsets_decorrelate_sessions() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = NoiseField::new(params(), random_seed_offset(&mut rng));
        let b = NoiseField::new(params(), random_seed_offset(&mut rng));

        assert!((0.0..1_000.0).contains(&a.seed_offset()));
        assert_ne!(a.seed_offset(), b.seed_offset());
        let differing = (0..100)
            .filter(|step| a.height(*step as f32 * 3.1) != b.height(*step as f32 * 3.1))
            .count();
        assert!(differing > 50);
    }

    #[test]
    fn noise_field_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoiseField>();
    }
}
