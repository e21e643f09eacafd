#![allow(non_snake_case)]

mod common;

use ndarray::prelude::*;
use ndarray_parsimony::functions::{CombinedFunction, Function, RidgeRegression, L1};
use ndarray_parsimony::prox::Fista;
use ndarray_parsimony::simulated::l1_l2_tv;

/// Lasso data with a sparse known minimiser
fn lasso(l: f64) -> (CombinedFunction, Array1<f64>) {
    let mut rng = common::rng();
    let (M, e) = common::template(50, 10, &mut rng);
    let beta = array![0., 1.5, 0., 0., -2., 0.5, 0., 0., 1., 0.];
    let (X, y, beta_star) = l1_l2_tv::load(l, 0., 0., &beta, &M, &e, Some(5.), None).unwrap();

    let func = CombinedFunction::new()
        .add_lipschitz_function(RidgeRegression::new(X, y, 0.).unwrap())
        .set_prox(L1::new(l));
    (func, beta_star)
}

#[test]
fn recovers_sparse_minimiser() {
    common::init();
    let (func, beta_star) = lasso(0.5);
    let sol = Fista::new()
        .par(|p| p.eps = 1e-10)
        .run(&func, Array1::zeros(10).view());

    assert!(sol.converged);
    assert!(common::relative_error(&sol.beta, &beta_star) < 1e-4);
    for (b, s) in sol.beta.iter().zip(&beta_star) {
        if *s == 0. {
            assert_eq!(*b, 0.);
        }
    }
}

#[test]
fn ista_and_fista_agree() {
    common::init();
    let (func, beta_star) = lasso(0.5);
    let fista = Fista::new().run(&func, Array1::zeros(10).view());
    let ista = Fista::ista()
        .par(|p| p.output = true)
        .run(&func, Array1::zeros(10).view());
    assert!(fista.converged && ista.converged);

    // ISTA descends monotonically
    let f = ista.f_values();
    assert!(f.windows(2).all(|w| w[1] <= w[0] + 1e-12));

    let f_star = func.f(beta_star.view());
    assert!(func.f(fista.beta.view()) - f_star < 1e-8 * f_star);
    assert!(func.f(ista.beta.view()) - f_star < 1e-8 * f_star);
    assert!(common::relative_error(&fista.beta, &ista.beta) < 1e-6);
}
