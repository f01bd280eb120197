use crate::sim::layers::Layer;

/// Splits the packet weight at an interaction site into the absorbed part
/// `w * (1 - albedo)` and the part that survives to scatter.
///
/// Returns `(remaining, absorbed)`.
pub fn drop_weight(weight: f64, layer: &Layer) -> (f64, f64) {
    if layer.mu_t() <= 0.0 {
        return (weight, 0.0);
    }
    let absorbed = weight * (1.0 - layer.albedo());
    (weight - absorbed, absorbed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::layers::{LayerSpec, LayerStack};

    fn layer(mua: f64, mus: f64) -> Layer {
        let stack = LayerStack::from_specs(&[
            LayerSpec::ambient("air", 1.0),
            LayerSpec::new("tissue", 1.4, 0.0, mua, mus, 1.0),
            LayerSpec::ambient("air", 1.0),
        ])
        .unwrap();
        stack.layer(1).clone()
    }

    #[test]
    fn test_albedo_split() {
        let (rest, absorbed) = drop_weight(0.5, &layer(1.0, 9.0));
        assert!((absorbed - 0.05).abs() < 1e-15);
        assert!((rest - 0.45).abs() < 1e-15);
    }

    #[test]
    fn test_pure_absorber_takes_everything() {
        let (rest, absorbed) = drop_weight(0.8, &layer(2.0, 0.0));
        assert_eq!(rest, 0.0);
        assert_eq!(absorbed, 0.8);
    }

    #[test]
    fn test_pure_scatterer_keeps_everything() {
        let (rest, absorbed) = drop_weight(0.8, &layer(0.0, 5.0));
        assert_eq!(rest, 0.8);
        assert_eq!(absorbed, 0.0);
    }
}
