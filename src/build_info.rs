//! Build information module
//!
//! Build metadata embedded by `build.rs`, and what the calculator ships with.

use serde::Serialize;

use crate::nutrition::catalog::PROTEIN_PRESETS;
use crate::nutrition::{BuiltinCatalog, ProductCatalog};

/// Build number, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("NUTRICALC_BUILD_NUMBER") {
    Some(s) => match parse_build_number(s) {
        Some(n) => n,
        None => 0,
    },
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRICALC_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const fn parse_build_number(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            return None;
        }
        result = result * 10 + (bytes[i] - b'0') as u64;
        i += 1;
    }
    Some(result)
}

/// Build and content information reported by status and the startup banner
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    /// Products in the built-in catalog
    pub catalog_products: usize,
    pub protein_presets: usize,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            catalog_products: BuiltinCatalog.products().len(),
            protein_presets: PROTEIN_PRESETS.len(),
        }
    }

    fn banner_lines(&self) -> Vec<String> {
        vec![
            "===============================================".to_string(),
            "  Clinical Nutrition Calculator (nutricalc)".to_string(),
            format!("  Version: {} | Build: {}", self.version, self.build_number),
            format!("  Compiled: {}", self.build_timestamp),
            format!(
                "  Catalog: {} products, {} protein presets",
                self.catalog_products, self.protein_presets
            ),
            "===============================================".to_string(),
        ]
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    for line in BuildInfo::current().banner_lines() {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_number() {
        assert_eq!(parse_build_number("42"), Some(42));
        assert_eq!(parse_build_number(""), None);
        assert_eq!(parse_build_number("12a"), None);
    }

    #[test]
    fn test_banner_reports_catalog() {
        let info = BuildInfo::current();
        assert_eq!(info.catalog_products, BuiltinCatalog.products().len());
        let banner = info.banner_lines();
        assert!(banner.iter().any(|l| l.contains(&format!("{} products", info.catalog_products))));
        assert!(banner.iter().any(|l| l.contains(VERSION)));
    }
}
