//! Running the same seed with 8 worker threads must produce a grid
//! bit-for-bit identical to running it with 1, across many generations.
//! This is the one property that can only be checked by driving the
//! public [`Ctx`]/[`WorkQueue`] API end-to-end, so it lives here rather
//! than in an inline `#[cfg(test)] mod tests`.

use rand::{rngs::StdRng, Rng, SeedableRng};

use life_core::Ctx;

const REGION: u16 = 1024;
const SEED_CELLS: usize = 10_000;
const GENERATIONS: usize = 100;

fn seed_cells(seed: u64) -> Vec<(u16, u16)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..SEED_CELLS)
        .map(|_| (rng.gen_range(0..REGION), rng.gen_range(0..REGION)))
        .collect()
}

fn run(workers: usize, cells: &[(u16, u16)]) -> Vec<(u16, u16)> {
    let mut ctx = Ctx::new();
    ctx.start(workers).unwrap();
    for &(x, y) in cells {
        ctx.set(x, y, true).unwrap();
    }
    for _ in 0..GENERATIONS {
        ctx.run_generation().unwrap();
    }
    let mut live = Vec::new();
    for y in 0..REGION.saturating_add(REGION / 4) {
        for x in 0..REGION.saturating_add(REGION / 4) {
            if ctx.get(x, y) {
                live.push((x, y));
            }
        }
    }
    ctx.shutdown().unwrap();
    live
}

#[test]
fn eight_workers_matches_one_worker_bit_for_bit() {
    let cells = seed_cells(42);
    let one = run(1, &cells);
    let eight = run(8, &cells);
    assert_eq!(one, eight);
    assert!(!one.is_empty(), "population died out, test proves nothing");
}
