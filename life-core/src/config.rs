//! Compile-time tunables for the simulation core.
//!
//! Mirrors the `#define`s in the original C source (`W`, `BUCKETSZ`,
//! `QUADSZ`): these are `pub const`s instead of preprocessor macros so that
//! downstream crates (and tests) can reference and assert on them directly.

/// The cell coordinate type. Must be an unsigned integer; arithmetic on it
/// wraps at `2^W`.
pub type Coord = u16;

/// `W`: the coordinate width in bits. The usable plane is
/// `[0, 2^W) x [0, 2^W)`.
pub const W: u32 = 16;

/// `B`: the side length of a bucket, in cells. Must be a multiple of the
/// bitmap word width (64).
pub const B: u32 = 16;

/// Number of 64-bit words needed to store one bucket's `B*B` bits.
pub const BUCKET_WORDS: usize = (B * B) as usize / 64;

/// `QUADSZ`: the maximum number of buckets a leaf may hold before it must
/// split.
pub const QUADSZ: usize = 4;

/// Side length of the bucket-coordinate space, i.e. `ceil(2^W / B)`.
/// This is the root quad's side length in bucket-coordinates, and the
/// modulus bucket-coordinate arithmetic wraps under.
pub const BUCKET_DIM: u32 = {
    let plane = 1u32 << W;
    plane.div_ceil(B)
};

const _: () = assert!((B * B).is_multiple_of(64), "B must keep the bitmap word-aligned");
const _: () = assert!(BUCKET_DIM.is_power_of_two(), "root side must be a power of two");

/// Wrap a bucket-coordinate by one step in either direction.
#[inline]
pub fn wrap_bucket(v: Coord, delta: i32) -> Coord {
    let dim = BUCKET_DIM as i64;
    let wrapped = ((v as i64 + delta as i64) % dim + dim) % dim;
    wrapped as Coord
}

/// Compute an absolute cell coordinate from a bucket coordinate and a local
/// (possibly negative or `>= B`) offset, wrapping at `2^W` the same way the
/// C source's unsigned arithmetic does.
#[inline]
pub fn abs_coord(bucket: Coord, local: i32) -> Coord {
    ((bucket as i64) * (B as i64) + local as i64) as Coord
}
