//! Product catalog
//!
//! Static reference table of enteral and parenteral nutrition products with
//! their nutrient content per milliliter.

use serde::{Deserialize, Serialize};

/// Nutrient content of one milliliter of a product
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub kcal_per_ml: f64,
    pub protein_g_per_ml: f64,
    pub fat_g_per_ml: f64,
    pub carb_g_per_ml: f64,
}

impl NutrientProfile {
    pub const fn new(kcal_per_ml: f64, protein_g_per_ml: f64, fat_g_per_ml: f64, carb_g_per_ml: f64) -> Self {
        Self {
            kcal_per_ml,
            protein_g_per_ml,
            fat_g_per_ml,
            carb_g_per_ml,
        }
    }

    /// Profile used for unknown products
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Route of administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Enteral,
    Parenteral,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Enteral => "enteral",
            Route::Parenteral => "parenteral",
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub name: &'static str,
    pub route: Route,
    pub profile: NutrientProfile,
}

/// Lookup of nutrient profiles by product name
pub trait ProductCatalog {
    /// All products in display order
    fn products(&self) -> &[Product];

    /// Resolve a product by name (case-insensitive, surrounding whitespace ignored)
    fn lookup(&self, name: &str) -> Option<NutrientProfile> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        self.products()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
            .map(|p| p.profile)
    }

    /// Products whose name contains the query (case-insensitive)
    fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products()
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .collect()
    }
}

// Approximate manufacturer values, converted to per-ml content.
static BUILTIN_PRODUCTS: &[Product] = &[
    Product { name: "Nutrison", route: Route::Enteral, profile: NutrientProfile::new(1.0, 0.04, 0.039, 0.123) },
    Product { name: "Nutrison Energy", route: Route::Enteral, profile: NutrientProfile::new(1.5, 0.06, 0.058, 0.184) },
    Product { name: "Nutrison Protein Plus", route: Route::Enteral, profile: NutrientProfile::new(1.25, 0.063, 0.049, 0.141) },
    Product { name: "Fresubin Original", route: Route::Enteral, profile: NutrientProfile::new(1.0, 0.038, 0.034, 0.138) },
    Product { name: "Fresubin HP Energy", route: Route::Enteral, profile: NutrientProfile::new(1.5, 0.075, 0.058, 0.17) },
    Product { name: "Peptamen Intense", route: Route::Enteral, profile: NutrientProfile::new(1.0, 0.093, 0.037, 0.075) },
    Product { name: "SmofKabiven", route: Route::Parenteral, profile: NutrientProfile::new(1.1, 0.0507, 0.0378, 0.126) },
    Product { name: "Aminoven 10%", route: Route::Parenteral, profile: NutrientProfile::new(0.4, 0.1, 0.0, 0.0) },
    Product { name: "SMOFlipid 20%", route: Route::Parenteral, profile: NutrientProfile::new(2.0, 0.0, 0.2, 0.0) },
    Product { name: "Glucose 5%", route: Route::Parenteral, profile: NutrientProfile::new(0.2, 0.0, 0.0, 0.05) },
    Product { name: "Glucose 10%", route: Route::Parenteral, profile: NutrientProfile::new(0.4, 0.0, 0.0, 0.1) },
    Product { name: "Glucose 20%", route: Route::Parenteral, profile: NutrientProfile::new(0.8, 0.0, 0.0, 0.2) },
    Product { name: "Propofol 1%", route: Route::Parenteral, profile: NutrientProfile::new(1.1, 0.0, 0.1, 0.0) },
    Product { name: "Propofol 2%", route: Route::Parenteral, profile: NutrientProfile::new(1.1, 0.0, 0.1, 0.0) },
];

/// The built-in product table
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl ProductCatalog for BuiltinCatalog {
    fn products(&self) -> &[Product] {
        BUILTIN_PRODUCTS
    }
}

/// Named protein target range in g/kg/day
#[derive(Debug, Clone, Serialize)]
pub struct ProteinPreset {
    pub label: &'static str,
    pub min_g_per_kg: f64,
    pub max_g_per_kg: f64,
}

pub static PROTEIN_PRESETS: &[ProteinPreset] = &[
    ProteinPreset { label: "Renal, no RRT", min_g_per_kg: 0.8, max_g_per_kg: 1.0 },
    ProteinPreset { label: "Standard", min_g_per_kg: 1.2, max_g_per_kg: 1.5 },
    ProteinPreset { label: "Critical illness", min_g_per_kg: 1.3, max_g_per_kg: 2.0 },
    ProteinPreset { label: "CRRT / burns", min_g_per_kg: 1.5, max_g_per_kg: 2.5 },
];

/// Find a protein preset by label (case-insensitive)
pub fn protein_preset(label: &str) -> Option<&'static ProteinPreset> {
    let wanted = label.trim();
    PROTEIN_PRESETS.iter().find(|p| p.label.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = BuiltinCatalog;
        let profile = catalog.lookup("  nutrison protein plus ").unwrap();
        assert_eq!(profile.kcal_per_ml, 1.25);
        assert_eq!(profile.protein_g_per_ml, 0.063);
    }

    #[test]
    fn test_both_propofol_strengths() {
        let catalog = BuiltinCatalog;
        for name in ["Propofol 1%", "Propofol 2%"] {
            let profile = catalog.lookup(name).unwrap();
            assert_eq!(profile.kcal_per_ml, 1.1);
            assert_eq!(profile.fat_g_per_ml, 0.1);
        }
        assert_eq!(catalog.search("propofol").len(), 2);
    }

    #[test]
    fn test_lookup_unknown_or_empty() {
        let catalog = BuiltinCatalog;
        assert!(catalog.lookup("Mystery Feed").is_none());
        assert!(catalog.lookup("").is_none());
        assert!(catalog.lookup("   ").is_none());
    }

    #[test]
    fn test_search() {
        let catalog = BuiltinCatalog;
        let glucose = catalog.search("glucose");
        assert_eq!(glucose.len(), 3);
        assert!(glucose.iter().all(|p| p.route == Route::Parenteral));
        assert_eq!(catalog.search("").len(), catalog.products().len());
    }

    #[test]
    fn test_catalog_names_unique() {
        let catalog = BuiltinCatalog;
        let products = catalog.products();
        for (i, a) in products.iter().enumerate() {
            for b in &products[i + 1..] {
                assert!(!a.name.eq_ignore_ascii_case(b.name), "duplicate product {}", a.name);
            }
        }
    }

    #[test]
    fn test_protein_presets_ordered() {
        for preset in PROTEIN_PRESETS {
            assert!(preset.min_g_per_kg <= preset.max_g_per_kg, "{}", preset.label);
        }
        let standard = protein_preset("standard").unwrap();
        assert_eq!(standard.min_g_per_kg, 1.2);
        assert!(protein_preset("nope").is_none());
    }
}
