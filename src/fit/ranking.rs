//! Ordering and filtering of fit results

use super::{FitLevel, ModelFit};
use crate::models::UseCase;

/// Sort by composite score, highest first, with every Too Tight entry after
/// every runnable one. Equal keys keep their input order.
pub fn rank_models_by_fit(mut fits: Vec<ModelFit<'_>>) -> Vec<ModelFit<'_>> {
    fits.sort_by(|a, b| {
        (!a.is_runnable())
            .cmp(&!b.is_runnable())
            .then_with(|| b.score.total_cmp(&a.score))
    });
    fits
}

/// Keep only Perfect fits
pub fn filter_perfect_only(fits: Vec<ModelFit<'_>>) -> Vec<ModelFit<'_>> {
    fits.into_iter()
        .filter(|f| f.fit_level == FitLevel::Perfect)
        .collect()
}

/// Keep fits whose use case matches `label` (`coding`/`code`, `vision`, ...).
/// An unrecognized label keeps everything.
pub fn filter_by_use_case<'a>(fits: Vec<ModelFit<'a>>, label: &str) -> Vec<ModelFit<'a>> {
    match UseCase::from_label(label) {
        Some(use_case) => fits.into_iter().filter(|f| f.use_case == use_case).collect(),
        None => {
            tracing::debug!("Unknown use case '{}', not filtering", label);
            fits
        }
    }
}

/// Keep fits at least as good as `min`; Too Tight entries never pass
pub fn filter_min_fit(fits: Vec<ModelFit<'_>>, min: FitLevel) -> Vec<ModelFit<'_>> {
    fits.into_iter()
        .filter(|f| f.is_runnable() && f.fit_level <= min)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{analyze_all, RunMode};
    use crate::models::{test_model, LlmModel};
    use crate::system::fixtures::spec_no_gpu;
    use crate::system::SystemSpecs;

    fn fits_with<'a>(
        model: &'a LlmModel,
        spec: &'a SystemSpecs,
        levels: &[(FitLevel, f64)],
    ) -> Vec<ModelFit<'a>> {
        levels
            .iter()
            .map(|&(level, score)| {
                let mut fit = ModelFit::analyze(model, spec);
                fit.fit_level = level;
                fit.score = score;
                fit
            })
            .collect()
    }

    #[test]
    fn test_rank_too_tight_last() {
        let model = test_model("m", "7B");
        let spec = spec_no_gpu(32.0, 8);
        let fits = fits_with(
            &model,
            &spec,
            &[
                (FitLevel::TooTight, 95.0),
                (FitLevel::Good, 70.0),
                (FitLevel::Perfect, 90.0),
                (FitLevel::Marginal, 60.0),
            ],
        );
        let ranked = rank_models_by_fit(fits);
        let scores: Vec<f64> = ranked.iter().map(|f| f.score).collect();
        assert_eq!(scores, [90.0, 70.0, 60.0, 95.0]);
        assert_eq!(ranked[3].fit_level, FitLevel::TooTight);
    }

    #[test]
    fn test_rank_is_stable() {
        let model = test_model("m", "7B");
        let spec = spec_no_gpu(32.0, 8);
        let mut fits = fits_with(&model, &spec, &[(FitLevel::Good, 50.0), (FitLevel::Good, 50.0)]);
        fits[0].best_quant = "first".to_string();
        fits[1].best_quant = "second".to_string();
        let ranked = rank_models_by_fit(fits);
        assert_eq!(ranked[0].best_quant, "first");
        assert_eq!(ranked[1].best_quant, "second");
    }

    #[test]
    fn test_filter_perfect_only() {
        let model = test_model("m", "7B");
        let spec = spec_no_gpu(32.0, 8);
        let fits = fits_with(
            &model,
            &spec,
            &[
                (FitLevel::Perfect, 0.0),
                (FitLevel::Good, 0.0),
                (FitLevel::Perfect, 0.0),
                (FitLevel::Marginal, 0.0),
            ],
        );
        let out = filter_perfect_only(fits);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|f| f.fit_level == FitLevel::Perfect));
    }

    #[test]
    fn test_filter_by_use_case() {
        let spec = spec_no_gpu(32.0, 8);
        let mut code = test_model("code-model", "7B");
        code.use_case = "coding".to_string();
        let general = test_model("general-model", "7B");
        let models = vec![code, general];
        let fits = analyze_all(&models, &spec);
        assert!(fits.iter().all(|f| f.run_mode == RunMode::CpuOnly));

        let out = filter_by_use_case(fits.clone(), "coding");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].use_case, UseCase::Coding);
        assert_eq!(filter_by_use_case(fits.clone(), "CODE").len(), 1);
        assert_eq!(filter_by_use_case(fits, "unknown-uc").len(), 2);
    }

    #[test]
    fn test_filter_min_fit() {
        let model = test_model("m", "7B");
        let spec = spec_no_gpu(32.0, 8);
        let levels = [
            (FitLevel::Perfect, 0.0),
            (FitLevel::Good, 0.0),
            (FitLevel::Marginal, 0.0),
            (FitLevel::TooTight, 0.0),
        ];
        let count = |min| filter_min_fit(fits_with(&model, &spec, &levels), min).len();
        assert_eq!(count(FitLevel::Perfect), 1);
        assert_eq!(count(FitLevel::Good), 2);
        assert_eq!(count(FitLevel::Marginal), 3);
        assert_eq!(count(FitLevel::TooTight), 3);
    }
}
