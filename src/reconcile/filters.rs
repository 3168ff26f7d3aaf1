use crate::core::{AdminError, Character, Planet, Result, parse_flag};

/// A scalar filter value as sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

impl FilterValue {
    /// Empty text counts as "no filter".
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Text(text) if text.is_empty())
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Text(text) => f.write_str(text),
            FilterValue::Number(number) => write!(f, "{}", number),
            FilterValue::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Flag(value)
    }
}

/// Ordered filter name to value mapping for one upstream read.
///
/// Entries without a value, or with empty text, are kept for inspection but
/// never reach the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<FilterValue>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(name, Some(value.into()));
        self
    }

    /// Name/value pairs that should be sent, in insertion order.
    pub fn active(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().filter_map(|(name, value)| match value {
            Some(value) if !value.is_empty() => Some((name.as_str(), value)),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }
}

/// Client-side predicate set for one record kind.
pub trait RecordFilter<T>: Clone + Default + std::fmt::Debug + PartialEq + Send + Sync {
    /// Field names accepted by [`RecordFilter::set_field`].
    fn fields() -> &'static [&'static str];

    fn matches(&self, record: &T) -> bool;

    /// True when any predicate is set.
    fn is_active(&self) -> bool;

    /// Sets (or with an empty value, clears) one predicate.
    fn set_field(&mut self, field: &str, value: &str) -> Result<()>;

    /// Upstream query parameters for the current predicates.
    fn to_query(&self) -> QueryFilters;

    /// Active predicates as `(field, value)` pairs, for display.
    fn describe(&self) -> Vec<(&'static str, String)>;
}

/// Case-insensitive substring test. An empty needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterFilters {
    pub name: String,
    pub race: String,
    pub ki: String,
    pub affiliation: String,
    pub gender: String,
}

impl RecordFilter<Character> for CharacterFilters {
    fn fields() -> &'static [&'static str] {
        &["name", "race", "ki", "affiliation", "gender"]
    }

    fn matches(&self, character: &Character) -> bool {
        let affiliation_matches = self.affiliation.is_empty()
            || character
                .affiliation
                .as_deref()
                .is_some_and(|affiliation| contains_ci(affiliation, &self.affiliation));

        contains_ci(&character.name, &self.name)
            && contains_ci(&character.race, &self.race)
            && contains_ci(&character.ki, &self.ki)
            && affiliation_matches
            && contains_ci(&character.gender, &self.gender)
    }

    fn is_active(&self) -> bool {
        !(self.name.is_empty()
            && self.race.is_empty()
            && self.ki.is_empty()
            && self.affiliation.is_empty()
            && self.gender.is_empty())
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        let slot = match field {
            "name" => &mut self.name,
            "race" => &mut self.race,
            "ki" => &mut self.ki,
            "affiliation" => &mut self.affiliation,
            "gender" => &mut self.gender,
            other => {
                return Err(AdminError::Validation(format!(
                    "Unknown character filter '{}'",
                    other
                )));
            }
        };
        *slot = value;
        Ok(())
    }

    fn to_query(&self) -> QueryFilters {
        QueryFilters::new()
            .with("name", self.name.as_str())
            .with("race", self.race.as_str())
            .with("ki", self.ki.as_str())
            .with("affiliation", self.affiliation.as_str())
            .with("gender", self.gender.as_str())
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        [
            ("name", &self.name),
            ("race", &self.race),
            ("ki", &self.ki),
            ("affiliation", &self.affiliation),
            ("gender", &self.gender),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field, value)| (field, value.clone()))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanetFilters {
    pub name: String,
    pub is_destroyed: Option<bool>,
}

impl RecordFilter<Planet> for PlanetFilters {
    fn fields() -> &'static [&'static str] {
        &["name", "isDestroyed"]
    }

    fn matches(&self, planet: &Planet) -> bool {
        contains_ci(&planet.name, &self.name)
            && self
                .is_destroyed
                .is_none_or(|destroyed| planet.is_destroyed == destroyed)
    }

    fn is_active(&self) -> bool {
        !self.name.is_empty() || self.is_destroyed.is_some()
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match field {
            "name" => self.name = value.to_string(),
            "isDestroyed" | "destroyed" => {
                self.is_destroyed = if value.is_empty() {
                    None
                } else {
                    Some(parse_flag(value)?)
                };
            }
            other => {
                return Err(AdminError::Validation(format!(
                    "Unknown planet filter '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    fn to_query(&self) -> QueryFilters {
        let mut query = QueryFilters::new().with("name", self.name.as_str());
        query.insert("isDestroyed", self.is_destroyed.map(FilterValue::Flag));
        query
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut active = Vec::new();
        if !self.name.is_empty() {
            active.push(("name", self.name.clone()));
        }
        if let Some(destroyed) = self.is_destroyed {
            active.push(("isDestroyed", destroyed.to_string()));
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_skip_empty_values() {
        let mut query = QueryFilters::new()
            .with("name", "Goku")
            .with("race", "")
            .with("page_hint", 3i64);
        query.insert("isDestroyed", None);

        let active: Vec<(String, String)> = query
            .active()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        assert_eq!(
            active,
            vec![
                ("name".to_string(), "Goku".to_string()),
                ("page_hint".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn insert_replaces_existing_entry_in_place() {
        let mut query = QueryFilters::new().with("name", "Goku").with("race", "Saiyan");
        query.insert("name", Some("Vegeta".into()));
        let names: Vec<&str> = query.active().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "race"]);
        assert_eq!(query.active().next().unwrap().1, &FilterValue::from("Vegeta"));
    }

    #[test]
    fn character_filters_are_case_insensitive() {
        let goku = Character::named(1, "Goku").race("Saiyan").gender("Male");
        let mut filters = CharacterFilters::default();
        assert!(filters.matches(&goku));
        assert!(!filters.is_active());

        filters.set_field("race", "SAIYAN").unwrap();
        assert!(filters.matches(&goku));
        filters.set_field("gender", "fem").unwrap();
        assert!(!filters.matches(&goku));
    }

    #[test]
    fn affiliation_filter_never_matches_missing_affiliation() {
        let drifter = Character::named(3, "Drifter");
        let filters = CharacterFilters {
            affiliation: "army".to_string(),
            ..CharacterFilters::default()
        };
        assert!(!filters.matches(&drifter));
        assert!(filters.matches(&Character::named(4, "Freezer").affiliation("Army of Frieza")));
    }

    #[test]
    fn planet_filters_match_destroyed_flag() {
        let namek = Planet::named(1, "Namek").destroyed(true);
        let earth = Planet::named(2, "Tierra");
        let mut filters = PlanetFilters::default();
        filters.set_field("isDestroyed", "true").unwrap();
        assert!(filters.matches(&namek));
        assert!(!filters.matches(&earth));

        filters.set_field("isDestroyed", "").unwrap();
        assert!(!filters.is_active());
        assert!(filters.matches(&earth));
    }

    #[test]
    fn planet_query_omits_unset_flag() {
        let filters = PlanetFilters::default();
        assert!(filters.to_query().is_empty());

        let filters = PlanetFilters {
            name: String::new(),
            is_destroyed: Some(false),
        };
        let active: Vec<_> = filters.to_query().active().map(|(n, v)| (n.to_string(), v.clone())).collect();
        assert_eq!(active, vec![("isDestroyed".to_string(), FilterValue::Flag(false))]);
    }
}
