use super::*;
use crate::autograd::backward;
use crate::config::VaeConfig;
use crate::error::Error;
use crate::nn::WeightInit;
use crate::noise::{FixedNoise, GaussianNoise, ZeroNoise};
use crate::Tensor;
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn small_vae(seed: u64) -> Vae {
    let config = VaeConfig::new(12, 2).with_hidden_dim(8);
    Vae::new(config, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn batch(shape: &[usize]) -> Tensor {
    let n = shape.iter().product::<usize>();
    let data: Vec<f32> = (0..n).map(|i| ((i * 7) % 10) as f32 / 9.0).collect();
    Tensor::with_shape(data.into(), shape.to_vec(), false)
}

#[test]
fn test_elbo_shapes() {
    let vae = small_vae(0);
    let out = vae.elbo(&batch(&[3, 12]), 4, &mut GaussianNoise::seeded(1)).unwrap();

    assert_eq!(out.elbo.shape(), &[3, 4]);
    assert_eq!(out.reconstruction.shape(), &[3, 4, 12]);
    assert_eq!(out.recon_error.shape(), &[3, 4]);
    assert_eq!(out.kl.shape(), &[3]);
    assert_eq!(out.posterior.mean.shape(), &[3, 2]);
    assert!(out.elbo.data().iter().all(|v| v.is_finite()));
    assert!(out.reconstruction.data().iter().all(|&p| p > 0.0 && p < 1.0));
}

#[test]
fn test_elbo_is_negative_recon_minus_kl() {
    let vae = small_vae(1);
    let out = vae.elbo(&batch(&[2, 12]), 3, &mut GaussianNoise::seeded(2)).unwrap();

    for b in 0..2 {
        for s in 0..3 {
            let i = b * 3 + s;
            let expected = -out.recon_error.data()[i] - out.kl.data()[b];
            assert_abs_diff_eq!(out.elbo.data()[i], expected, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_kl_non_negative_and_elbo_bounded() {
    let vae = small_vae(2);
    let out = vae.elbo(&batch(&[5, 12]), 2, &mut GaussianNoise::seeded(3)).unwrap();

    assert!(out.kl.data().iter().all(|&k| k >= 0.0));
    assert!(out.recon_error.data().iter().all(|&r| r >= 0.0));
    assert!(out.elbo.data().iter().all(|&e| e <= 0.0));
}

#[test]
fn test_zero_init_scenario() {
    let config = VaeConfig::new(784, 2)
        .with_image_shape(28, 28)
        .with_init(WeightInit::Zeros);
    let vae = Vae::new(config, &mut StdRng::seed_from_u64(0)).unwrap();
    let x = Tensor::with_shape(vec![0.0; 4 * 784].into(), vec![4, 784], false);

    let out = vae.elbo(&x, 3, &mut GaussianNoise::seeded(9)).unwrap();

    assert_eq!(out.elbo.shape(), &[4, 3]);
    assert!(out.kl.data().iter().all(|&k| k == 0.0));
    // Decoder outputs sigmoid(0) = 0.5 everywhere: BCE is ln 2 per feature
    let expected = -784.0 * std::f32::consts::LN_2;
    for &e in out.elbo.data() {
        assert_abs_diff_eq!(e, expected, epsilon = 1e-2);
    }
    assert_eq!(out.diagnostics.kl, 0.0);
    assert_eq!(out.diagnostics.gen.dim(), (28, 28));
    assert!(out.diagnostics.gen.iter().all(|&p| p == 0.5));
}

#[test]
fn test_rejects_zero_samples() {
    let vae = small_vae(0);
    let err = vae.elbo(&batch(&[2, 12]), 0, &mut ZeroNoise).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn test_rejects_wrong_feature_count() {
    let vae = small_vae(0);

    let err = vae.elbo(&batch(&[2, 10]), 1, &mut ZeroNoise).unwrap_err();
    match err {
        Error::ShapeMismatch { expected, got } => {
            assert_eq!(expected, vec![2, 12]);
            assert_eq!(got, vec![2, 10]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(vae.elbo(&batch(&[12]), 1, &mut ZeroNoise).is_err());
    assert!(vae.elbo(&Tensor::scalar(1.0), 1, &mut ZeroNoise).is_err());
}

#[test]
fn test_rejects_empty_batch() {
    let vae = small_vae(0);
    let x = Tensor::with_shape(Vec::<f32>::new().into(), vec![0, 12], false);
    assert!(matches!(
        vae.elbo(&x, 1, &mut ZeroNoise),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let config = VaeConfig::new(12, 0);
    assert!(matches!(
        Vae::new(config, &mut StdRng::seed_from_u64(0)),
        Err(Error::ConfigError(_))
    ));
}

#[test]
fn test_rank_three_input_sets_image_layout() {
    let vae = small_vae(4);
    let out = vae.elbo(&batch(&[2, 3, 4]), 1, &mut ZeroNoise).unwrap();

    assert_eq!(out.elbo.shape(), &[2, 1]);
    assert_eq!(out.diagnostics.image.dim(), (3, 4));
    assert_eq!(out.diagnostics.pred.dim(), (3, 4));
    assert_eq!(out.diagnostics.gen.dim(), (3, 4));
}

#[test]
fn test_image_layout_fallbacks() {
    let vae = small_vae(0);
    assert_eq!(vae.image_layout(&[5, 12]), (1, 12));
    assert_eq!(vae.image_layout(&[5, 2, 6]), (2, 6));
    // Last two axes do not cover dim_in
    assert_eq!(vae.image_layout(&[5, 2, 2, 3]), (1, 12));

    let config = VaeConfig::new(12, 2).with_hidden_dim(8).with_image_shape(3, 4);
    let shaped = Vae::new(config, &mut StdRng::seed_from_u64(0)).unwrap();
    assert_eq!(shaped.image_layout(&[5, 12]), (3, 4));
}

#[test]
fn test_diagnostics_match_outputs() {
    let vae = small_vae(5);
    let x = batch(&[3, 12]);
    let out = vae.elbo(&x, 2, &mut GaussianNoise::seeded(4)).unwrap();
    let d = &out.diagnostics;

    assert_eq!(d.image.dim(), (1, 12));
    assert_eq!(d.image[[0, 5]], x.data()[5]);
    assert_eq!(d.pred[[0, 7]], out.reconstruction.data()[7]);
    assert_abs_diff_eq!(d.bce, out.recon_error.data().mean().unwrap(), epsilon = 1e-5);
    assert_abs_diff_eq!(d.kl, out.kl.data().mean().unwrap(), epsilon = 1e-6);
}

#[test]
fn test_forward_reduce_is_negative_mean_elbo() {
    let vae = small_vae(6);
    let x = batch(&[4, 12]);

    let elbo = vae.elbo(&x, 3, &mut GaussianNoise::seeded(8)).unwrap().elbo;
    let reduced = vae.forward(&x, 3, true, &mut GaussianNoise::seeded(8)).unwrap();
    let unreduced = vae.forward(&x, 3, false, &mut GaussianNoise::seeded(8)).unwrap();

    assert!(reduced.loss.shape().is_empty());
    assert_abs_diff_eq!(
        reduced.loss.item(),
        -elbo.data().mean().unwrap(),
        epsilon = 1e-4
    );
    assert_eq!(unreduced.loss.shape(), &[4, 3]);
    for (l, e) in unreduced.loss.data().iter().zip(elbo.data()) {
        assert_eq!(*l, -*e);
    }
}

#[test]
fn test_deterministic_with_fixed_noise() {
    let vae = small_vae(7);
    let x = batch(&[2, 12]);

    let a = vae.elbo(&x, 2, &mut GaussianNoise::seeded(11)).unwrap();
    let b = vae.elbo(&x, 2, &mut GaussianNoise::seeded(11)).unwrap();

    assert_eq!(a.elbo.data(), b.elbo.data());
    assert_eq!(a.diagnostics, b.diagnostics);

    let g1 = vae.generate(3, &mut FixedNoise::new(vec![0.3, -1.2]));
    let g2 = vae.generate(3, &mut FixedNoise::new(vec![0.3, -1.2]));
    assert_eq!(g1.data(), g2.data());
}

#[test]
fn test_zero_noise_decodes_posterior_mean() {
    let vae = small_vae(8);
    let x = batch(&[1, 12]);
    let out = vae.elbo(&x, 1, &mut ZeroNoise).unwrap();

    let mean = out.posterior.mean.data();
    let z = Tensor::with_shape(mean.clone(), vec![1, 2], false);
    let decoded = vae.decoder().apply(&z);
    assert_eq!(decoded.data(), out.reconstruction.data());
}

#[test]
fn test_generate_shape() {
    let vae = small_vae(0);
    let samples = vae.generate(5, &mut GaussianNoise::seeded(0));
    assert_eq!(samples.shape(), &[5, 12]);
    assert!(samples.data().iter().all(|&p| p > 0.0 && p < 1.0));
}

#[test]
fn test_named_parameters() {
    let vae = small_vae(0);
    let named = vae.named_parameters();

    assert_eq!(named.len(), 12);
    assert_eq!(named[0].0, "encoder.fc1.weight");
    assert_eq!(named[0].1.shape(), &[12, 8]);
    assert_eq!(named[6].0, "gaussian.log_var.weight");
    assert_eq!(named[11].1.shape(), &[12]);

    let unique: HashSet<_> = named.iter().map(|(n, _)| *n).collect();
    assert_eq!(unique.len(), 12);
}

#[test]
fn test_num_parameters() {
    let vae = small_vae(0);
    let (d, h, l) = (12, 8, 2);
    let expected = (d * h + h) + (h * h + h) + 2 * (h * l + l) + (l * h + h) + (h * d + d);
    assert_eq!(vae.num_parameters(), expected);
}

#[test]
fn test_backward_reaches_every_parameter() {
    let vae = small_vae(9);
    let mut loss = vae
        .forward(&batch(&[3, 12]), 2, true, &mut GaussianNoise::seeded(5))
        .unwrap()
        .loss;
    backward(&mut loss, None);

    for (name, p) in vae.named_parameters() {
        let grad = p.grad().unwrap_or_else(|| panic!("{name} has no gradient"));
        assert!(grad.iter().all(|g| g.is_finite()), "{name} has non-finite gradient");
    }

    vae.zero_grad();
    assert!(vae.parameters().iter().all(|p| p.grad().is_none()));
}

#[test]
fn test_gradient_descent_reduces_loss() {
    let mut vae = small_vae(10);
    let x = batch(&[4, 12]);
    let lr = 0.05;

    let loss_at = |vae: &Vae| {
        vae.forward(&x, 1, true, &mut ZeroNoise).unwrap().loss.item()
    };
    let initial = loss_at(&vae);

    for _ in 0..20 {
        let mut loss = vae.forward(&x, 1, true, &mut ZeroNoise).unwrap().loss;
        backward(&mut loss, None);
        for p in vae.parameters_mut() {
            let grad = p.grad().unwrap();
            p.data_mut().scaled_add(-lr, &grad);
        }
        vae.zero_grad();
    }

    let trained = loss_at(&vae);
    assert!(trained < initial, "loss did not decrease: {initial} -> {trained}");
}

#[test]
fn test_rank_one_batch_with_single_feature() {
    let config = VaeConfig::new(1, 2).with_hidden_dim(4);
    let vae = Vae::new(config, &mut StdRng::seed_from_u64(0)).unwrap();
    let x = Tensor::from_vec(vec![0.0, 0.5, 1.0], false);

    let out = vae.elbo(&x, 2, &mut ZeroNoise).unwrap();
    assert_eq!(out.elbo.shape(), &[3, 2]);
    assert_eq!(out.reconstruction.shape(), &[3, 2, 1]);
    assert_eq!(out.diagnostics.image.dim(), (1, 1));
    assert_eq!(out.diagnostics.image[[0, 0]], 0.0);
}

#[test]
fn test_configured_sample_count() {
    let config = VaeConfig::new(12, 2).with_hidden_dim(8).with_n_samples(5);
    let vae = Vae::new(config, &mut StdRng::seed_from_u64(0)).unwrap();
    let x = batch(&[2, 12]);

    let out = vae.elbo_default(&x, &mut GaussianNoise::seeded(1)).unwrap();
    assert_eq!(out.elbo.shape(), &[2, 5]);
    assert_eq!(out.reconstruction.shape(), &[2, 5, 12]);

    let unreduced = vae
        .forward_default(&x, false, &mut GaussianNoise::seeded(1))
        .unwrap();
    assert_eq!(unreduced.loss.shape(), &[2, 5]);
    for (l, e) in unreduced.loss.data().iter().zip(out.elbo.data()) {
        assert_eq!(*l, -*e);
    }
}
