//! End-to-end tests: configuration, ELBO, training steps, diagnostics sinks
//! and checkpoints working together.

use latente::config::load_config;
use latente::io::{load_model, save_model, SaveConfig};
use latente::monitor::{keys, DiagnosticsLogEntry, InMemorySink, JsonlSink};
use latente::noise::{GaussianNoise, ZeroNoise};
use latente::{backward, Tensor, Vae, VaeConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// Two 4x4 "images": a horizontal and a vertical bar
fn bars() -> Tensor {
    let mut data = vec![0.0f32; 2 * 16];
    for i in 0..4 {
        data[4 + i] = 1.0;
        data[16 + i * 4 + 1] = 1.0;
    }
    Tensor::with_shape(data.into(), vec![2, 4, 4], false)
}

fn model(seed: u64) -> Vae {
    let config = VaeConfig::new(16, 2).with_hidden_dim(24);
    Vae::new(config, &mut StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn test_model_from_yaml_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "dim_in: 16\ndim_latent: 3\nhidden_dim: 10\nn_samples: 2\nimage_shape: [4, 4]"
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let n_samples = config.n_samples;
    let vae = Vae::new(config, &mut StdRng::seed_from_u64(0)).unwrap();

    let x = Tensor::with_shape(vec![0.5; 3 * 16].into(), vec![3, 16], false);
    let out = vae.elbo(&x, n_samples, &mut GaussianNoise::seeded(0)).unwrap();

    assert_eq!(out.elbo.shape(), &[3, 2]);
    assert_eq!(out.posterior.mean.shape(), &[3, 3]);
    assert_eq!(out.diagnostics.gen.dim(), (4, 4));
}

#[test]
fn test_yaml_sample_count_drives_default_evaluation() {
    let yaml = "dim_in: 16\ndim_latent: 2\nhidden_dim: 8\nn_samples: 5\n";
    let config = VaeConfig::from_yaml_str(yaml).unwrap();
    let vae = Vae::new(config, &mut StdRng::seed_from_u64(2)).unwrap();

    let out = vae.elbo_default(&bars(), &mut GaussianNoise::seeded(0)).unwrap();
    assert_eq!(out.elbo.shape(), &[2, 5]);

    let loss = vae.forward_default(&bars(), true, &mut GaussianNoise::seeded(0)).unwrap().loss;
    assert!(loss.shape().is_empty());
    assert!(loss.item().is_finite());
}

#[test]
fn test_training_steps_reduce_loss() {
    let mut vae = model(3);
    let x = bars();
    let lr = 0.02;

    let eval = |vae: &Vae| vae.forward(&x, 1, true, &mut ZeroNoise).unwrap().loss.item();
    let before = eval(&vae);

    let mut noise = GaussianNoise::seeded(12);
    for _ in 0..30 {
        let mut loss = vae.forward(&x, 2, true, &mut noise).unwrap().loss;
        backward(&mut loss, None);
        for p in vae.parameters_mut() {
            if let Some(grad) = p.grad() {
                p.data_mut().scaled_add(-lr, &grad);
            }
        }
        vae.zero_grad();
    }

    let after = eval(&vae);
    assert!(after < before, "loss {before} -> {after}");
}

#[test]
fn test_diagnostics_reach_sinks() {
    let vae = model(1);
    let mut memory = InMemorySink::new();
    let mut jsonl = JsonlSink::new(Vec::new());
    let mut noise = GaussianNoise::seeded(5);

    for _ in 0..3 {
        let out = vae.forward(&bars(), 1, true, &mut noise).unwrap();
        out.diagnostics.emit(&mut memory).unwrap();
        out.diagnostics.emit(&mut jsonl).unwrap();
    }

    assert_eq!(memory.history(keys::BCE).len(), 3);
    assert_eq!(memory.stats(keys::KL).unwrap().count, 3);
    assert_eq!(memory.image(keys::IMAGE).unwrap().dim(), (4, 4));
    // First observation of the batch is the horizontal bar
    assert_eq!(memory.image(keys::IMAGE).unwrap()[[1, 2]], 1.0);

    let text = String::from_utf8(jsonl.into_inner()).unwrap();
    let entries: Vec<DiagnosticsLogEntry> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].step, 2);
    assert_eq!(entries[0].images[keys::GEN].shape, [4, 4]);
    assert!(entries[0].scalars[keys::BCE] > 0.0);
}

#[test]
fn test_checkpoint_after_training_step() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vae.json");
    let mut vae = model(8);

    let mut loss = vae.forward(&bars(), 1, true, &mut GaussianNoise::seeded(1)).unwrap().loss;
    backward(&mut loss, None);
    for p in vae.parameters_mut() {
        let grad = p.grad().unwrap();
        p.data_mut().scaled_add(-0.1, &grad);
    }

    save_model(&vae, &path, &SaveConfig::default()).unwrap();
    let restored = load_model(&path).unwrap();

    let a = vae.generate(2, &mut GaussianNoise::seeded(4));
    let b = restored.generate(2, &mut GaussianNoise::seeded(4));
    assert_eq!(a.data(), b.data());
    assert_eq!(restored.num_parameters(), vae.num_parameters());
}
