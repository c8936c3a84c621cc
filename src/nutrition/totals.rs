//! Delivered nutrition
//!
//! Volume and macronutrients delivered by one preparation row, or summed
//! across all rows of a day.

use serde::{Deserialize, Serialize};

use super::catalog::NutrientProfile;

/// Delivered volume and macronutrients
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub ml: f64,
    pub kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
}

impl Nutrition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Nutrition delivered by `ml` milliliters of a product
    pub fn from_volume(ml: f64, profile: &NutrientProfile) -> Self {
        Self {
            ml,
            kcal: ml * profile.kcal_per_ml,
            protein_g: ml * profile.protein_g_per_ml,
            fat_g: ml * profile.fat_g_per_ml,
            carb_g: ml * profile.carb_g_per_ml,
        }
    }

    pub fn add(&self, other: &Nutrition) -> Self {
        Self {
            ml: self.ml + other.ml,
            kcal: self.kcal + other.kcal,
            protein_g: self.protein_g + other.protein_g,
            fat_g: self.fat_g + other.fat_g,
            carb_g: self.carb_g + other.carb_g,
        }
    }
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}

impl<'a> std::iter::Sum<&'a Nutrition> for Nutrition {
    fn sum<I: Iterator<Item = &'a Nutrition>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + *n)
    }
}
