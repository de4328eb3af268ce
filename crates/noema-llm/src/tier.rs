//! Model-tier selection
//!
//! A closed set of named tiers, each mapping to a concrete model and call
//! shape. Activities pick a tier by name or, given a budget, let
//! [`ModelTier::optimal_for_budget`] choose the best one that fits.

use crate::error::{LlmError, Result};

/// Closed set of model tiers an activity may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    FastCheap,
    Balanced,
    Deep,
    UltraFast,
    UltraCheap,
    UltraQuality,
}

impl ModelTier {
    pub const ALL: [ModelTier; 6] = [
        ModelTier::FastCheap,
        ModelTier::Balanced,
        ModelTier::Deep,
        ModelTier::UltraFast,
        ModelTier::UltraCheap,
        ModelTier::UltraQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::FastCheap => "fast_cheap",
            ModelTier::Balanced => "balanced",
            ModelTier::Deep => "deep",
            ModelTier::UltraFast => "ultra_fast",
            ModelTier::UltraCheap => "ultra_cheap",
            ModelTier::UltraQuality => "ultra_quality",
        }
    }

    /// Concrete model, call parameters, and pricing for this tier
    pub fn config(&self) -> TierConfig {
        match self {
            ModelTier::FastCheap => TierConfig {
                model: "gpt-4o-mini",
                temperature: 0.1,
                max_tokens: 1000,
                cost_per_1k: 0.00015,
                quality: 6,
            },
            ModelTier::Balanced => TierConfig {
                model: "gpt-4o-mini",
                temperature: 0.2,
                max_tokens: 1500,
                cost_per_1k: 0.00015,
                quality: 7,
            },
            ModelTier::Deep => TierConfig {
                model: "gpt-4o",
                temperature: 0.1,
                max_tokens: 4000,
                cost_per_1k: 0.0025,
                quality: 9,
            },
            ModelTier::UltraFast => TierConfig {
                model: "gpt-3.5-turbo",
                temperature: 0.1,
                max_tokens: 500,
                cost_per_1k: 0.0005,
                quality: 5,
            },
            ModelTier::UltraCheap => TierConfig {
                model: "gpt-4o-mini",
                temperature: 0.1,
                max_tokens: 500,
                cost_per_1k: 0.00015,
                quality: 6,
            },
            ModelTier::UltraQuality => TierConfig {
                model: "gpt-4o",
                temperature: 0.05,
                max_tokens: 8000,
                cost_per_1k: 0.0025,
                quality: 10,
            },
        }
    }

    /// Fixed task name -> default tier mapping
    pub fn default_for_task(task: &str) -> ModelTier {
        match task {
            "research_domain" => ModelTier::Deep,
            "analyze_research" => ModelTier::Balanced,
            "generate_example_questions" => ModelTier::FastCheap,
            "assess_document_relevance" => ModelTier::Balanced,
            _ => ModelTier::Balanced,
        }
    }

    /// Estimated cost in dollars for the given token count at this tier
    pub fn estimate_cost(&self, estimated_tokens: u32) -> f64 {
        self.config().cost_per_1k * (estimated_tokens as f64 / 1000.0)
    }

    /// Highest-quality tier whose estimated cost for `estimated_tokens`
    /// doesn't exceed `budget`, optionally requiring at least
    /// `min_quality` (0-10).
    pub fn optimal_for_budget(
        budget: f64,
        estimated_tokens: u32,
        min_quality: Option<u8>,
    ) -> Result<ModelTier> {
        let mut candidates: Vec<ModelTier> = ModelTier::ALL
            .into_iter()
            .filter(|t| t.estimate_cost(estimated_tokens) <= budget)
            .filter(|t| min_quality.map_or(true, |q| t.config().quality >= q))
            .collect();

        candidates.sort_by_key(|t| std::cmp::Reverse(t.config().quality));

        candidates.into_iter().next().ok_or(LlmError::BudgetExceeded {
            budget,
            quality: min_quality.map(|q| q.to_string()),
        })
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fast_cheap" => Ok(ModelTier::FastCheap),
            "balanced" => Ok(ModelTier::Balanced),
            "deep" => Ok(ModelTier::Deep),
            "ultra_fast" => Ok(ModelTier::UltraFast),
            "ultra_cheap" => Ok(ModelTier::UltraCheap),
            "ultra_quality" => Ok(ModelTier::UltraQuality),
            other => Err(format!("unknown model tier: {other}")),
        }
    }
}

/// Concrete model/call parameters a tier resolves to
#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    pub model: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub cost_per_1k: f64,
    /// 0-10, used only to rank tiers against a quality requirement
    pub quality: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_for_task() {
        assert_eq!(ModelTier::default_for_task("research_domain"), ModelTier::Deep);
        assert_eq!(
            ModelTier::default_for_task("generate_example_questions"),
            ModelTier::FastCheap
        );
        assert_eq!(ModelTier::default_for_task("unknown_task"), ModelTier::Balanced);
    }

    #[test]
    fn test_tier_roundtrip() {
        for tier in ModelTier::ALL {
            assert_eq!(tier.as_str().parse::<ModelTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_optimal_for_budget_picks_highest_quality_under_cap() {
        let tier = ModelTier::optimal_for_budget(0.01, 1000, None).unwrap();
        assert_eq!(tier, ModelTier::Deep);
    }

    #[test]
    fn test_optimal_for_budget_too_small_fails() {
        let result = ModelTier::optimal_for_budget(0.0000001, 1000, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_optimal_for_budget_respects_min_quality() {
        let tier = ModelTier::optimal_for_budget(10.0, 1000, Some(9)).unwrap();
        assert!(tier.config().quality >= 9);
    }
}
