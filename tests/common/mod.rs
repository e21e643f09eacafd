#![allow(dead_code, non_snake_case)]

use ndarray::prelude::*;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

/// Gaussian template and residual, with every column of the template
/// shifted along `e` so that $`M_i^Te = \pm\frac12\|e\|^2`$
pub fn template(n: usize, p: usize, rng: &mut StdRng) -> (Array2<f64>, Array1<f64>) {
    let mut M = Array2::random_using((n, p), StandardNormal, rng);
    let e = Array1::random_using(n, StandardNormal, rng);
    let ee = e.dot(&e);
    for mut col in M.axis_iter_mut(Axis(1)) {
        let mte = col.dot(&e);
        let target = if mte < 0. { -0.5 * ee } else { 0.5 * ee };
        col.scaled_add((target - mte) / ee, &e);
    }
    (M, e)
}

pub fn relative_error(beta: &Array1<f64>, star: &Array1<f64>) -> f64 {
    let d = beta - star;
    d.dot(&d).sqrt() / star.dot(star).sqrt()
}
