//! The final-ranking score function (spec §4.8.3): a pure function of
//! `(seed_type, n_found, n_miss, chi2, pt)`, computed once at beam commit
//! time and never inlined into the search loop — kept here as a standalone,
//! swappable unit so a later iteration can plug in a different formula
//! without touching [`crate::candidate_finder::CandidateFinder`].

use trackforge_model::config::FinderConfig;
use trackforge_model::status::SeedType;

/// Computes the ranking score for a finished candidate.
///
/// `pt` is accepted for symmetry with the four-argument formula this
/// corrects (seed-type assignment already folds `pt` in at seeding time),
/// and is currently unused by the correction terms themselves.
#[must_use]
pub fn score(config: &FinderConfig, seed_type: SeedType, n_found: u32, n_miss: u32, chi2: f64, _pt: f64) -> f64 {
    let n_found = f64::from(n_found);
    let n_miss = f64::from(n_miss);
    let clamped_chi2 = chi2.clamp(0.0, config.max_chi2_for_ranking);

    let mut total = config.valid_hit_bonus * n_found - config.missing_hit_penalty * n_miss - clamped_chi2;

    let is_low_pt = matches!(seed_type, SeedType::LowPtEndcap | SeedType::LowPtBarrel);

    if seed_type == SeedType::LowPtEndcap {
        total -= 0.5 * config.valid_hit_bonus * n_found;
    }

    if is_low_pt {
        if n_found <= 8.0 {
            total -= 0.06 * config.valid_hit_bonus * n_found;
        } else if n_found > 12.0 {
            total += 0.08 * config.valid_hit_bonus * n_found;
        }
    } else if n_found <= 8.0 {
        total -= 0.15 * config.valid_hit_bonus * n_found;
    } else if n_found > 12.0 {
        total += 0.20 * config.valid_hit_bonus * n_found;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_pt_central_example_matches_the_documented_worked_case() {
        let config = FinderConfig::default();
        let computed = score(&config, SeedType::HighPtCentral, 10, 1, 15.0, 3.0);
        let expected = 10.0 * config.valid_hit_bonus - config.missing_hit_penalty - 15.0;
        assert!((computed - expected).abs() < 1.0e-9);
    }

    #[test]
    fn low_pt_endcap_applies_both_stacking_corrections_below_the_found_floor() {
        let config = FinderConfig::default();
        let computed = score(&config, SeedType::LowPtEndcap, 5, 0, 0.0, 0.5);
        let expected = config.valid_hit_bonus * 5.0
            - 0.5 * config.valid_hit_bonus * 5.0
            - 0.06 * config.valid_hit_bonus * 5.0;
        assert!((computed - expected).abs() < 1.0e-9);
    }

    #[test]
    fn chi2_beyond_the_ranking_cap_is_clamped_not_unbounded() {
        let config = FinderConfig::default();
        let at_cap = score(&config, SeedType::Other, 9, 0, config.max_chi2_for_ranking, 1.0);
        let far_beyond = score(&config, SeedType::Other, 9, 0, config.max_chi2_for_ranking * 100.0, 1.0);
        assert!((at_cap - far_beyond).abs() < 1.0e-9);
    }

    #[test]
    fn mid_range_found_count_gets_neither_bonus_nor_penalty() {
        let config = FinderConfig::default();
        let computed = score(&config, SeedType::HighPtCentral, 10, 2, 5.0, 2.0);
        let expected = 10.0 * config.valid_hit_bonus - 2.0 * config.missing_hit_penalty - 5.0;
        assert!((computed - expected).abs() < 1.0e-9);
    }
}
