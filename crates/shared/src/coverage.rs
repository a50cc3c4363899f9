//! Country coverage lookup: which distributors serve a given country.

use std::collections::BTreeMap;

use crate::models::{Country, GeoEntity};

/// Most countries offered for one lookup query.
pub const MAX_COUNTRY_MATCHES: usize = 10;

/// Countries matching a free-text query by name, exact ISO code or synonym,
/// case-insensitively. An empty query matches nothing.
pub fn match_countries<'a>(countries: &'a [Country], query: &str) -> Vec<&'a Country> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    countries
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.iso2.to_lowercase() == needle
                || c.synonyms.iter().any(|s| s.to_lowercase().contains(&needle))
        })
        .take(MAX_COUNTRY_MATCHES)
        .collect()
}

/// Every country some entity covers, once per ISO code, ordered by name.
pub fn countries_covered(entities: &[GeoEntity]) -> Vec<Country> {
    let mut by_code: BTreeMap<String, Country> = BTreeMap::new();
    for country in entities.iter().flat_map(|e| &e.countries) {
        by_code
            .entry(country.iso2.to_uppercase())
            .or_insert_with(|| country.clone());
    }
    let mut countries: Vec<Country> = by_code.into_values().collect();
    countries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    countries
}

/// Entities covering `iso2`, lowest priority rank first, ties by name.
pub fn entities_for_country<'a>(entities: &'a [GeoEntity], iso2: &str) -> Vec<&'a GeoEntity> {
    let mut matches: Vec<&GeoEntity> = entities
        .iter()
        .filter(|e| e.countries.iter().any(|c| c.iso2.eq_ignore_ascii_case(iso2)))
        .collect();
    matches.sort_by(|a, b| {
        a.priority_rank
            .cmp(&b.priority_rank)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    matches
}

pub fn country_name<'a>(countries: &'a [Country], iso2: &str) -> Option<&'a str> {
    countries
        .iter()
        .find(|c| c.iso2.eq_ignore_ascii_case(iso2))
        .map(|c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalogue() -> Vec<GeoEntity> {
        serde_json::from_value(json!([
            { "id": "nordic", "name": "Nordic Rehab", "status": "published", "priority_rank": 2,
              "countries": [
                { "iso2": "SE", "name": "Sweden" },
                { "iso2": "NO", "name": "Norway", "synonyms": ["Norge"] }
              ] },
            { "id": "baltic", "name": "Baltic Mobility", "status": "published", "priority_rank": 1,
              "countries": [ { "iso2": "se", "name": "Sweden" } ] },
            { "id": "alpha", "name": "alpha care", "status": "published", "priority_rank": 2,
              "countries": [ { "iso2": "SE", "name": "Sweden" } ] },
            { "id": "us-only", "name": "Prairie Supply", "status": "published",
              "countries": [ { "iso2": "US", "name": "United States", "synonyms": ["USA", "America"] } ] },
            { "id": "none", "name": "Local Shop", "status": "published" }
        ]))
        .unwrap()
    }

    fn ids(entities: Vec<&GeoEntity>) -> Vec<&str> {
        entities.into_iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_entities_for_country_orders_by_rank_then_name() {
        let all = catalogue();
        assert_eq!(ids(entities_for_country(&all, "SE")), vec!["baltic", "alpha", "nordic"]);
        assert_eq!(ids(entities_for_country(&all, "no")), vec!["nordic"]);
        assert!(entities_for_country(&all, "FR").is_empty());
    }

    #[test]
    fn test_countries_covered_dedups_by_code() {
        let countries = countries_covered(&catalogue());
        let names: Vec<&str> = countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Norway", "Sweden", "United States"]);
    }

    #[test]
    fn test_match_countries_by_name_code_and_synonym() {
        let countries = countries_covered(&catalogue());
        let names = |q: &str| -> Vec<String> {
            match_countries(&countries, q).into_iter().map(|c| c.name.clone()).collect()
        };
        assert_eq!(names("swe"), vec!["Sweden"]);
        assert_eq!(names("us"), vec!["United States"]);
        assert_eq!(names("norge"), vec!["Norway"]);
        assert!(names("  ").is_empty());
        assert!(names("atlantis").is_empty());
    }

    #[test]
    fn test_match_countries_is_capped() {
        let countries: Vec<Country> = (0..25)
            .map(|i| Country {
                iso2: format!("X{i}"),
                name: format!("Land {i}"),
                synonyms: Vec::new(),
            })
            .collect();
        assert_eq!(match_countries(&countries, "land").len(), MAX_COUNTRY_MATCHES);
    }

    #[test]
    fn test_country_name_lookup() {
        let countries = countries_covered(&catalogue());
        assert_eq!(country_name(&countries, "no"), Some("Norway"));
        assert_eq!(country_name(&countries, "FR"), None);
    }
}
