//! Tests for the config module

use super::*;
use proptest::prelude::*;

#[test]
fn test_minimal_config_defaults() {
    let config = VaeConfig::from_yaml_str("dim_in: 10\ndim_latent: 3\n").unwrap();

    assert_eq!(config.hidden_dim, DEFAULT_HIDDEN_DIM);
    assert_eq!(config.n_samples, 1);
    assert_eq!(config.image_shape, None);
    assert_eq!(config.init, WeightInit::KaimingUniform);
}

#[test]
fn test_full_config() {
    let yaml = r#"
dim_in: 64
dim_latent: 4
hidden_dim: 32
n_samples: 5
image_shape: [8, 8]
init: zeros
"#;
    let config = VaeConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.hidden_dim, 32);
    assert_eq!(config.n_samples, 5);
    assert_eq!(config.image_shape, Some([8, 8]));
    assert_eq!(config.init, WeightInit::Zeros);
}

#[test]
fn test_missing_required_field() {
    let result = VaeConfig::from_yaml_str("dim_in: 10\n");
    assert!(result.is_err());
}

#[test]
fn test_unknown_init_rejected() {
    let result = VaeConfig::from_yaml_str("dim_in: 10\ndim_latent: 2\ninit: xavier\n");
    assert!(result.is_err());
}

#[test]
fn test_image_shape_omitted_when_unset() {
    let yaml = VaeConfig::new(10, 2).to_yaml().unwrap();
    assert!(!yaml.contains("image_shape"));
}

#[test]
fn test_builder() {
    let config = VaeConfig::new(784, 2)
        .with_hidden_dim(128)
        .with_n_samples(3)
        .with_image_shape(28, 28)
        .with_init(WeightInit::Zeros);

    assert_eq!(config.hidden_dim, 128);
    assert_eq!(config.n_samples, 3);
    assert_eq!(config.image_shape, Some([28, 28]));
    assert_eq!(config.init, WeightInit::Zeros);
}

proptest! {
    #[test]
    fn prop_yaml_round_trip(
        dim_in in 1usize..2048,
        dim_latent in 1usize..64,
        hidden_dim in 1usize..512,
        n_samples in 1usize..16,
        zeros in any::<bool>(),
    ) {
        let init = if zeros { WeightInit::Zeros } else { WeightInit::KaimingUniform };
        let config = VaeConfig::new(dim_in, dim_latent)
            .with_hidden_dim(hidden_dim)
            .with_n_samples(n_samples)
            .with_init(init);

        let yaml = config.to_yaml().unwrap();
        let parsed = VaeConfig::from_yaml_str(&yaml).unwrap();
        prop_assert_eq!(parsed, config);
    }
}
