#![allow(non_snake_case)]

mod common;

use ndarray::prelude::*;
use ndarray_parsimony::functions::{Function, RidgeL1TV, RidgeSmoothedL1TV, TotalVariation, L1TV};
use ndarray_parsimony::prox::Conesta;
use ndarray_parsimony::smooth::ExcessiveGap;
use ndarray_parsimony::Error;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

fn data() -> (Array2<f64>, Array1<f64>) {
    let mut rng = common::rng();
    let X = Array2::random_using((30, 8), StandardNormal, &mut rng);
    let y = Array1::random_using(30, StandardNormal, &mut rng);
    (X, y)
}

#[test]
fn agrees_with_conesta() {
    common::init();
    let (X, y) = data();
    let (k, l, g) = (1., 0.1, 0.1);

    let h = L1TV::from_shape(l, g, &[8], 1., 0).unwrap();
    let mut egm_func = RidgeSmoothedL1TV::new(X.clone(), y.clone(), k, h).unwrap();
    let egm = ExcessiveGap::new()
        .par(|p| {
            p.eps = 1e-6;
            p.output = true;
        })
        .run(&mut egm_func)
        .unwrap();
    assert!(egm.converged);

    let tv = TotalVariation::from_shape(g, &[8], 1., 0).unwrap();
    let mut conesta_func = RidgeL1TV::new(X, y, k, l, tv).unwrap();
    let conesta = Conesta::dynamic()
        .run(&mut conesta_func, Array1::zeros(8).view())
        .unwrap();

    // both objectives are the same function of beta
    let f_egm = conesta_func.f(egm.beta.view());
    assert!((f_egm - egm_func.f(egm.beta.view())).abs() < 1e-10);
    let f_conesta = conesta_func.f(conesta.beta.view());
    assert!((f_egm - f_conesta).abs() < 1e-4 * f_conesta.abs().max(1.));

    let trace = egm.trace.unwrap();
    let bound = *trace.upper_bound.last().unwrap();
    assert!(bound < 1e-6);
    assert!(trace.upper_bound.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn needs_strong_convexity() {
    let (X, y) = data();
    let h = L1TV::from_shape(0.1, 0.1, &[8], 1., 0).unwrap();
    assert!(matches!(
        RidgeSmoothedL1TV::new(X, y, 0., h),
        Err(Error::InvalidParameter { name: "k", .. })
    ));
}
