//! # Noise Fields
//!
//! Seeded 2D simplex noise and its fractal sum, the raw material for
//! terrain and ore placement.
//!
//! Generation code only sees the [`NoiseField`] trait; any `Fn(f64, f64) -> f64`
//! is a field, so tests pin terrain with plain closures.
//!
//! Sampling is pure: one seed, one field, on every platform. The permutation
//! is shuffled by `ChaCha8Rng`, whose output is stable across `rand`
//! releases.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Root of every random decision in a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Wraps a raw seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Raw seed.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Independent child seed for one generation channel.
    ///
    /// A multiply-xorshift mix, so neighbouring purposes land far apart.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// A coherent 2D scalar field with values in `[-1, 1]`.
pub trait NoiseField: Send {
    /// Samples the field at world tile coordinates.
    fn sample(&self, x: f64, y: f64) -> f64;
}

impl<F> NoiseField for F
where
    F: Fn(f64, f64) -> f64 + Send,
{
    fn sample(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Shuffled lattice hash.
struct PermutationTable {
    /// `0..=255` shuffled, stored twice so `perm[a + perm[b]]` never wraps.
    perm: [u8; 512],
}

impl PermutationTable {
    /// 12 gradient vectors for 2D simplex.
    const GRADIENTS: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    fn new(seed: WorldSeed) -> Self {
        let mut base = [0u8; 256];
        for (i, slot) in base.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *slot = i as u8;
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        base.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn gradient(hash: u8) -> [i8; 2] {
        Self::GRADIENTS[(hash % 12) as usize]
    }
}

/// Seeded 2D simplex noise, continuous, with values in `[-1, 1]`.
///
/// ```rust,ignore
/// let field = SimplexNoise::new(WorldSeed::new(9));
/// let height = field.sample(12.5, -3.25);
/// ```
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// `(sqrt(3) - 1) / 2`
    const F2: f64 = 0.366_025_403_784_439;
    /// `(3 - sqrt(3)) / 6`
    const G2: f64 = 0.211_324_865_405_187;

    /// Builds the field for `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Field value at `(x, y)`, in `[-1, 1]`.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::similar_names)]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Which skewed cell holds the point.
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = (f64::from(i) + f64::from(j)) * Self::G2;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);

        // Middle corner of the triangle.
        let (i1, j1) = if y0 < x0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - f64::from(i1) + Self::G2;
        let y1 = y0 - f64::from(j1) + Self::G2;
        let x2 = x0 + 2.0 * Self::G2 - 1.0;
        let y2 = y0 + 2.0 * Self::G2 - 1.0;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let i1 = i1 as usize;
        let j1 = j1 as usize;

        let hash = |di: usize, dj: usize| {
            let row = usize::from(self.perm_table.get(jj + dj));
            self.perm_table.get(ii + di + row)
        };

        let n0 = Self::contribution(x0, y0, hash(0, 0));
        let n1 = Self::contribution(x1, y1, hash(i1, j1));
        let n2 = Self::contribution(x2, y2, hash(1, 1));

        // Scale the corner sum to roughly unit amplitude.
        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    #[inline]
    fn contribution(x: f64, y: f64, gradient_index: u8) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let [gx, gy] = PermutationTable::gradient(gradient_index);
            let falloff = t * t * t * t;
            falloff * (f64::from(gx) * x + f64::from(gy) * y)
        }
    }

    /// Sum of `octaves` layers, each `lacunarity` times finer and
    /// `persistence` times weaker than the last, renormalised to `[-1, 1]`.
    #[must_use]
    pub fn octaved(&self, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        let (mut sum, mut weight) = (0.0, 0.0);
        let (mut amplitude, mut scale) = (1.0, 1.0);

        for _ in 0..octaves.max(1) {
            sum += amplitude * self.sample(x * scale, y * scale);
            weight += amplitude;
            amplitude *= persistence;
            scale *= lacunarity;
        }

        sum / weight
    }

    /// [`discrete`] applied to [`Self::sample`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_discrete(&self, x: f64, y: f64, max: u32) -> u32 {
        discrete(self.sample(x, y), max)
    }
}

impl NoiseField for SimplexNoise {
    fn sample(&self, x: f64, y: f64) -> f64 {
        SimplexNoise::sample(self, x, y)
    }
}

/// Octaved simplex noise at a fixed base frequency.
///
/// The default field type used by the terrain classifier.
pub struct FractalNoise {
    noise: SimplexNoise,
    frequency: f64,
    octaves: u32,
}

impl FractalNoise {
    /// Persistence between octaves.
    const PERSISTENCE: f64 = 0.5;
    /// Lacunarity between octaves.
    const LACUNARITY: f64 = 2.0;

    /// Creates a fractal field; `frequency` scales tile coordinates.
    #[must_use]
    pub fn new(seed: WorldSeed, frequency: f64, octaves: u32) -> Self {
        Self {
            noise: SimplexNoise::new(seed),
            frequency,
            octaves,
        }
    }
}

impl NoiseField for FractalNoise {
    fn sample(&self, x: f64, y: f64) -> f64 {
        self.noise.octaved(
            x * self.frequency,
            y * self.frequency,
            self.octaves,
            Self::PERSISTENCE,
            Self::LACUNARITY,
        )
    }
}

/// Maps a `[-1, 1]` value onto `[0, max)`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn discrete(value: f64, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    let unit = ((value + 1.0) * 0.5).clamp(0.0, 1.0);
    ((unit * f64::from(max)) as u32).min(max - 1)
}

/// `floor` without the libm call, saturating outside the `i32` range.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) { xi.saturating_sub(1) } else { xi }
}
