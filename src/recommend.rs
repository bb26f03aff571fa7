//! Lower-carbon substitutes offered before a high-footprint add-to-cart

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ShopOptions;
use crate::models::Product;

/// A candidate intercepted in favour of up to `max_alternatives` eco-friendly substitutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub candidate: Product,
    /// Never empty
    pub alternatives: Vec<Product>,
}

impl Recommendation {
    pub fn alternative(&self, id: Uuid) -> Option<&Product> {
        self.alternatives.iter().find(|p| p.id == id)
    }
}

/// When to intercept and how many substitutes to offer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationRules {
    pub carbon_threshold: f64,
    pub max_alternatives: usize,
}

impl Default for RecommendationRules {
    fn default() -> Self {
        Self {
            carbon_threshold: 3.0,
            max_alternatives: 2,
        }
    }
}

impl From<&ShopOptions> for RecommendationRules {
    fn from(options: &ShopOptions) -> Self {
        Self {
            carbon_threshold: options.carbon_threshold,
            max_alternatives: options.max_alternatives,
        }
    }
}

impl RecommendationRules {
    /// Non-eco products above the threshold trigger a suggestion
    pub fn triggers(&self, candidate: &Product) -> bool {
        !candidate.is_eco_friendly && candidate.carbon_footprint > self.carbon_threshold
    }

    /// Decide whether to intercept adding `candidate`
    ///
    /// Alternatives are taken in catalog order: same category, strictly lower
    /// footprint, eco-friendly, not the candidate itself. `None` means add
    /// the candidate directly.
    pub fn decide(&self, candidate: &Product, catalog: &[Product]) -> Option<Recommendation> {
        if !self.triggers(candidate) {
            return None;
        }

        let alternatives = catalog
            .iter()
            .filter(|p| {
                p.id != candidate.id
                    && p.category == candidate.category
                    && p.carbon_footprint < candidate.carbon_footprint
                    && p.is_eco_friendly
            })
            .take(self.max_alternatives)
            .cloned()
            .collect::<Vec<_>>();

        if alternatives.is_empty() {
            return None;
        }
        Some(Recommendation {
            candidate: candidate.clone(),
            alternatives,
        })
    }
}

/// [`RecommendationRules::decide`] with the standard threshold of 3 and at most 2 alternatives
pub fn decide(candidate: &Product, catalog: &[Product]) -> Option<Recommendation> {
    RecommendationRules::default().decide(candidate, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(category: &str, carbon: f64, eco: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id: None,
            name: format!("{} item", category),
            description: String::new(),
            price: 10.0,
            carbon_footprint: carbon,
            eco_rating: 3,
            image_url: String::new(),
            category: category.to_string(),
            stock: 5,
            is_eco_friendly: eco,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn suggests_lower_carbon_kitchen_item() {
        let kettle = product("Kitchen", 5.0, false);
        let bamboo = product("Kitchen", 2.0, true);
        let catalog = vec![kettle.clone(), bamboo.clone()];

        let rec = decide(&kettle, &catalog).unwrap();
        assert_eq!(rec.candidate.id, kettle.id);
        assert_eq!(rec.alternatives, vec![bamboo]);
    }

    #[test]
    fn below_threshold_never_intercepts() {
        let light = product("Kitchen", 1.0, false);
        let catalog = vec![light.clone(), product("Kitchen", 0.1, true)];
        assert!(decide(&light, &catalog).is_none());
    }

    #[test]
    fn exactly_at_threshold_does_not_trigger() {
        let edge = product("Kitchen", 3.0, false);
        let catalog = vec![product("Kitchen", 0.5, true)];
        assert!(decide(&edge, &catalog).is_none());
    }

    #[test]
    fn eco_friendly_candidate_never_intercepts() {
        let eco = product("Kitchen", 9.0, true);
        let catalog = vec![product("Kitchen", 0.5, true)];
        assert!(decide(&eco, &catalog).is_none());
    }

    #[test]
    fn no_qualifying_alternative_means_no_interception() {
        let candidate = product("Office", 6.0, false);
        let catalog = vec![
            candidate.clone(),
            product("Kitchen", 1.0, true),
            product("Office", 6.0, true),
            product("Office", 2.0, false),
        ];
        assert!(decide(&candidate, &catalog).is_none());
    }

    #[test]
    fn caps_at_two_in_catalog_order() {
        let candidate = product("Fashion", 8.0, false);
        let first = product("Fashion", 4.0, true);
        let second = product("Fashion", 1.0, true);
        let third = product("Fashion", 0.5, true);
        let catalog = vec![first.clone(), candidate.clone(), second.clone(), third];

        let rec = decide(&candidate, &catalog).unwrap();
        let ids: Vec<_> = rec.alternatives.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(rec
            .alternatives
            .iter()
            .all(|p| p.id != candidate.id && p.carbon_footprint < candidate.carbon_footprint));
    }

    #[test]
    fn adding_an_alternative_keeps_existing_ones() {
        let candidate = product("Kitchen", 7.0, false);
        let only = product("Kitchen", 2.0, true);
        let mut catalog = vec![candidate.clone(), only.clone()];
        assert_eq!(decide(&candidate, &catalog).unwrap().alternatives.len(), 1);

        catalog.push(product("Kitchen", 1.0, true));
        let rec = decide(&candidate, &catalog).unwrap();
        assert_eq!(rec.alternatives.len(), 2);
        assert!(rec.alternative(only.id).is_some());

        catalog.retain(|p| p.id == candidate.id);
        assert!(decide(&candidate, &catalog).is_none());
    }

    #[test]
    fn custom_rules() {
        let rules = RecommendationRules {
            carbon_threshold: 1.0,
            max_alternatives: 1,
        };
        let candidate = product("Kitchen", 2.0, false);
        let catalog = vec![product("Kitchen", 0.5, true), product("Kitchen", 0.2, true)];
        assert_eq!(rules.decide(&candidate, &catalog).unwrap().alternatives.len(), 1);
    }
}
