//! Lattice hashing and the primitive noise functions used by the evaluator.
//!
//! All functions take a point of up to four coordinates; only the first
//! `dims` entries are read.

const PRIMES: [i32; 4] = [501_125_321, 1_136_930_381, 1_720_413_743, 1_066_037_191];
const HASH_MUL: i32 = 0x27d4_eb2d;

#[inline]
fn hash(seed: i32, cell: &[i32]) -> i32 {
    let mut h = seed;
    for (c, p) in cell.iter().zip(PRIMES) {
        h ^= c.wrapping_mul(p);
    }
    h.wrapping_mul(HASH_MUL)
}

/// Hash mapped onto `[-1, 1)`.
#[inline]
fn hash_unit(seed: i32, cell: &[i32]) -> f32 {
    hash(seed, cell) as f32 * (1.0 / 2_147_483_648.0)
}

#[inline]
fn quintic(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn floor_cells(p: &[f32; 4], dims: usize) -> ([i32; 4], [f32; 4]) {
    let mut cell = [0i32; 4];
    let mut frac = [0f32; 4];
    for d in 0..dims {
        let f = p[d].floor();
        cell[d] = f as i32;
        frac[d] = p[d] - f;
    }
    (cell, frac)
}

/// Interpolate `corner(offsets)` over the 2^dims lattice corners around `p`.
fn blend_corners(p: &[f32; 4], dims: usize, corner: impl Fn(&[i32], &[f32]) -> f32) -> f32 {
    let (cell, frac) = floor_cells(p, dims);
    let mut values = [0f32; 16];
    for (mask, slot) in values.iter_mut().enumerate().take(1 << dims) {
        let mut c = [0i32; 4];
        let mut local = [0f32; 4];
        for d in 0..dims {
            let bit = ((mask >> d) & 1) as i32;
            c[d] = cell[d].wrapping_add(bit);
            local[d] = frac[d] - bit as f32;
        }
        *slot = corner(&c[..dims], &local[..dims]);
    }
    // collapse one axis at a time, lowest bit first
    let mut len = 1 << dims;
    for d in 0..dims {
        let t = quintic(frac[d]);
        len >>= 1;
        for i in 0..len {
            values[i] = lerp(values[2 * i], values[2 * i + 1], t);
        }
    }
    values[0]
}

pub(crate) fn white(seed: i32, p: &[f32; 4], dims: usize) -> f32 {
    let mut bits = [0i32; 4];
    for d in 0..dims {
        let b = p[d].to_bits();
        bits[d] = (b ^ (b >> 16)) as i32;
    }
    hash_unit(seed, &bits[..dims])
}

pub(crate) fn value(seed: i32, p: &[f32; 4], dims: usize) -> f32 {
    blend_corners(p, dims, |cell, _| hash_unit(seed, cell))
}

pub(crate) fn perlin(seed: i32, p: &[f32; 4], dims: usize) -> f32 {
    let norm = match dims {
        2 => 1.4142,
        3 => 1.1547,
        _ => 1.0,
    };
    let v = blend_corners(p, dims, |cell, local| {
        let h = hash(seed, cell);
        local
            .iter()
            .enumerate()
            .map(|(d, x)| {
                let g = ((h >> (d * 8)) & 0xff) as f32 * (2.0 / 255.0) - 1.0;
                g * x
            })
            .sum()
    });
    (v * norm).clamp(-1.0, 1.0)
}

pub(crate) fn checkerboard(size: f32, p: &[f32; 4], dims: usize) -> f32 {
    let parity = p[..dims]
        .iter()
        .map(|x| (x / size).floor() as i64)
        .fold(0i64, |acc, c| acc.wrapping_add(c));
    if parity.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

pub(crate) fn sine_waves(scale: f32, p: &[f32; 4], dims: usize) -> f32 {
    let sum: f32 = p[..dims]
        .iter()
        .map(|x| (std::f32::consts::TAU * scale * x).sin())
        .sum();
    sum / dims as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DistanceFn {
    Euclidean,
    EuclideanSquared,
    Manhattan,
    Chebyshev,
}

impl DistanceFn {
    pub(crate) fn from_ordinal(v: i32) -> Option<Self> {
        Some(match v {
            0 => DistanceFn::Euclidean,
            1 => DistanceFn::EuclideanSquared,
            2 => DistanceFn::Manhattan,
            3 => DistanceFn::Chebyshev,
            _ => return None,
        })
    }

    fn measure(self, delta: &[f32]) -> f32 {
        match self {
            DistanceFn::Euclidean => delta.iter().map(|d| d * d).sum::<f32>().sqrt(),
            DistanceFn::EuclideanSquared => delta.iter().map(|d| d * d).sum(),
            DistanceFn::Manhattan => delta.iter().map(|d| d.abs()).sum(),
            DistanceFn::Chebyshev => delta.iter().fold(0.0, |m, d| m.max(d.abs())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellularReturn {
    Index0,
    Index0Add1,
    Index0Sub1,
    Index0Mul1,
    Index0Div1,
}

impl CellularReturn {
    pub(crate) fn from_ordinal(v: i32) -> Option<Self> {
        Some(match v {
            0 => CellularReturn::Index0,
            1 => CellularReturn::Index0Add1,
            2 => CellularReturn::Index0Sub1,
            3 => CellularReturn::Index0Mul1,
            4 => CellularReturn::Index0Div1,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Cellular {
    pub distance: DistanceFn,
    pub index0: usize,
    pub index1: usize,
    pub output: CellularReturn,
}

/// Distances to feature points of the `3^dims` neighbouring cells, combined
/// according to `cfg.output`.
pub(crate) fn cellular(seed: i32, cfg: &Cellular, jitter: f32, p: &[f32; 4], dims: usize) -> f32 {
    let (cell, _) = floor_cells(p, dims);
    let mut nearest = [f32::INFINITY; 4];
    let neighbours = 3usize.pow(dims as u32);

    for n in 0..neighbours {
        let mut c = [0i32; 4];
        let mut rest = n;
        for d in 0..dims {
            c[d] = cell[d].wrapping_add((rest % 3) as i32 - 1);
            rest /= 3;
        }
        let h = hash(seed, &c[..dims]);
        let mut delta = [0f32; 4];
        for d in 0..dims {
            let r = ((h >> (d * 8)) & 0xff) as f32 * (1.0 / 255.0) - 0.5;
            let feature = c[d] as f32 + 0.5 + r * jitter;
            delta[d] = feature - p[d];
        }
        let dist = cfg.distance.measure(&delta[..dims]);
        if dist < nearest[3] {
            nearest[3] = dist;
            nearest.sort_by(|a, b| a.total_cmp(b));
        }
    }

    let d0 = nearest[cfg.index0];
    let d1 = nearest[cfg.index1];
    match cfg.output {
        CellularReturn::Index0 => d0,
        CellularReturn::Index0Add1 => d0 + d1,
        CellularReturn::Index0Sub1 => d0 - d1,
        CellularReturn::Index0Mul1 => d0 * d1,
        CellularReturn::Index0Div1 => {
            if d1 == 0.0 {
                0.0
            } else {
                d0 / d1
            }
        }
    }
}
