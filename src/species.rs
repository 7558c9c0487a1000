//! Continuum species resolution
//!
//! An atmosphere is described by the species it contains. Some of them only
//! contribute through continuum sources (collision-induced absorption pairs
//! and H- bound-free/free-free), so before querying a database the species
//! list is split into the continuum sources to look up and the molecules
//! that have tabulated line opacities.

use serde::Serialize;
use tracing::warn;

/// Species that only enter through continuum sources
pub const CONTINUUM_ONLY_SPECIES: [&str; 7] = ["H", "H2-", "H2", "H-", "He", "N2", "H+"];

/// Species that pair with H2 for collision-induced absorption, in lookup order
const H2_PARTNERS: [&str; 4] = ["He", "N2", "H", "CH4"];

/// Species list split into continuum sources and molecular absorbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpeciesSplit {
    /// Continuum molecule names as stored in the continuum table
    pub continuum: Vec<String>,
    /// Remaining species with molecular opacities, input order kept
    pub molecular: Vec<String>,
}

/// Continuum sources needed for `species`
///
/// `has_electrons` enables the free-free and H2- sources. Names follow the
/// continuum table vocabulary (`H2H2`, `H2He`, `H-bf`, ...).
pub fn needed_continuum<S: AsRef<str>>(species: &[S], has_electrons: bool) -> Vec<String> {
    let has = |name: &str| species.iter().any(|s| s.as_ref() == name);
    let mut continuum = Vec::new();

    if has("H2") {
        continuum.push("H2H2".to_string());
        for partner in H2_PARTNERS {
            if has(partner) {
                continuum.push(format!("H2{}", partner));
            }
        }
    }
    if has("H-") {
        continuum.push("H-bf".to_string());
    }
    if has("H") && has_electrons {
        continuum.push("H-ff".to_string());
    }
    if has("H2") && has_electrons {
        continuum.push("H2-".to_string());
    }

    continuum
}

/// Drop continuum-only species, keeping the order of the rest
pub fn strip_continuum_species<S: AsRef<str>>(species: &[S]) -> Vec<String> {
    species
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !CONTINUUM_ONLY_SPECIES.contains(s))
        .map(|s| s.to_string())
        .collect()
}

/// Split an atmosphere's species into continuum sources and molecular absorbers
pub fn resolve_species<S: AsRef<str>>(species: &[S], has_electrons: bool) -> SpeciesSplit {
    if species.iter().any(|s| s.as_ref() == "H+") {
        warn!("No H+ continuum opacity included");
    }

    SpeciesSplit {
        continuum: needed_continuum(species, has_electrons),
        molecular: strip_continuum_species(species),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_jupiter_mix() {
        let species = ["H2", "He", "H2O", "CH4", "CO", "H-", "H"];
        assert_eq!(
            needed_continuum(&species, false),
            vec!["H2H2", "H2He", "H2H", "H2CH4", "H-bf"]
        );
        assert_eq!(
            needed_continuum(&species, true),
            vec!["H2H2", "H2He", "H2H", "H2CH4", "H-bf", "H-ff", "H2-"]
        );
    }

    #[test]
    fn test_no_h2_means_no_cia() {
        let species = ["He", "N2", "H2O"];
        assert!(needed_continuum(&species, true).is_empty());
    }

    #[test]
    fn test_h2_n2() {
        assert_eq!(needed_continuum(&["N2", "H2"], false), vec!["H2H2", "H2N2"]);
    }

    #[test]
    fn test_free_free_needs_atomic_hydrogen() {
        assert_eq!(needed_continuum(&["H2"], true), vec!["H2H2", "H2-"]);
        assert_eq!(needed_continuum(&["H"], true), vec!["H-ff"]);
        assert!(needed_continuum(&["H"], false).is_empty());
    }

    #[test]
    fn test_strip_continuum_species() {
        let species = ["H2", "H2O", "He", "H+", "TiO", "H-", "N2", "CO2", "H2-", "H"];
        assert_eq!(
            strip_continuum_species(&species),
            vec!["H2O", "TiO", "CO2"]
        );
    }

    #[test]
    fn test_resolve_species() {
        let split = resolve_species(&["H2", "He", "H2O"], false);
        assert_eq!(split.continuum, vec!["H2H2", "H2He"]);
        assert_eq!(split.molecular, vec!["H2O"]);

        let empty: [&str; 0] = [];
        assert_eq!(resolve_species(&empty, true), SpeciesSplit::default());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(needed_continuum(&["h2", "he"], false).is_empty());
        assert_eq!(strip_continuum_species(&["h2"]), vec!["h2"]);
    }
}
