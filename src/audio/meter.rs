//! RMS energy helpers for the speech gate and ambient calibration.

pub(crate) const SILENCE_FLOOR_DB: f32 = -60.0;

/// Headroom kept above the measured room noise when calibrating.
const AMBIENT_MARGIN_DB: f32 = 6.0;

pub(crate) fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt().max(1e-6);
    20.0 * rms.log10()
}

/// Convert the CLI `--energy_threshold` (i16 amplitude scale, 1..=32768)
/// into decibels relative to full scale.
pub(crate) fn threshold_db_from_energy(threshold: u32) -> f32 {
    let normalized = (threshold as f32 / 32_768.0).max(1e-6);
    20.0 * normalized.log10()
}

/// Working speech gate: the CLI threshold, raised if the measured ambient
/// floor would otherwise keep the gate permanently open.
pub(crate) fn calibrated_threshold_db(cli_db: f32, ambient_db: f32) -> f32 {
    cli_db.max(ambient_db + AMBIENT_MARGIN_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_db_handles_empty() {
        assert_eq!(rms_db(&[]), SILENCE_FLOOR_DB);
    }

    #[test]
    fn rms_db_of_full_scale_is_zero() {
        let samples = vec![1.0f32; 512];
        assert!(rms_db(&samples).abs() < 0.01);
    }

    #[test]
    fn default_threshold_lands_near_minus_thirty_db() {
        let db = threshold_db_from_energy(1000);
        assert!((-31.0..=-29.0).contains(&db), "{db}");
    }

    #[test]
    fn calibration_never_lowers_the_cli_gate() {
        assert_eq!(calibrated_threshold_db(-30.0, -80.0), -30.0);
    }

    #[test]
    fn calibration_lifts_gate_above_noisy_rooms() {
        let db = calibrated_threshold_db(-30.0, -20.0);
        assert!(db > -20.0);
    }
}
