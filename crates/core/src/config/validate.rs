use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Stage weights are positive and finite
/// - At least one supported video format
/// - Scene threshold in (0, 1]
/// - OCR confidence threshold in [0, 100]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let weights = &config.analysis.weights;
    for (name, weight) in [
        ("validate", weights.validate),
        ("audio", weights.audio),
        ("scenes", weights.scenes),
        ("frames", weights.frames),
    ] {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "analysis.weights.{} must be a positive number, got {}",
                name, weight
            )));
        }
    }

    if config.media.supported_formats.is_empty() {
        return Err(ConfigError::ValidationError(
            "media.supported_formats cannot be empty".to_string(),
        ));
    }

    let threshold = config.media.scene_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "media.scene_threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    let confidence = config.ocr.confidence_threshold;
    if !(0.0..=100.0).contains(&confidence) {
        return Err(ConfigError::ValidationError(format!(
            "ocr.confidence_threshold must be in [0, 100], got {}",
            confidence
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_bad_weight_fails() {
        let mut config = Config::default();
        config.analysis.weights.audio = 0.0;
        assert!(validate_config(&config).is_err());

        config.analysis.weights.audio = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_media_settings() {
        let mut config = Config::default();
        config.media.supported_formats.clear();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.media.scene_threshold = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.ocr.confidence_threshold = -1.0;
        assert!(validate_config(&config).is_err());
    }
}
