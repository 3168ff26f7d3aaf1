use super::record::Record;
use super::{AdminError, Result};
use crate::reconcile::{CharacterFilters, PlanetFilters};
use serde::{Deserialize, Serialize};

/// A character as served by `/characters`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub ki: String,
    #[serde(default)]
    pub max_ki: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_planet: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Character {
    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn race(mut self, race: impl Into<String>) -> Self {
        self.race = race.into();
        self
    }

    pub fn ki(mut self, ki: impl Into<String>) -> Self {
        self.ki = ki.into();
        self
    }

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = gender.into();
        self
    }

    pub fn affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }
}

impl Record for Character {
    const COLLECTION: &'static str = "characters";
    const OVERLAY_KEY: &'static str = "localCharacters";
    const LABEL: &'static str = "character";

    type Filters = CharacterFilters;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fields() -> &'static [&'static str] {
        &["name", "ki", "maxKi", "race", "gender", "description", "image", "affiliation"]
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        match field {
            "name" => self.name = value,
            "ki" => self.ki = value,
            "maxKi" | "max_ki" => self.max_ki = value,
            "race" => self.race = value,
            "gender" => self.gender = value,
            "description" => self.description = value,
            "image" => self.image = value,
            "affiliation" => {
                self.affiliation = if value.is_empty() { None } else { Some(value) };
            }
            other => {
                return Err(AdminError::Validation(format!(
                    "Unknown character field '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Name", "Race", "Gender", "Ki", "Affiliation"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.race.clone(),
            self.gender.clone(),
            self.ki.clone(),
            self.affiliation.clone().unwrap_or_default(),
        ]
    }
}

/// A planet as served by `/planets`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_destroyed: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Planet {
    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn destroyed(mut self, is_destroyed: bool) -> Self {
        self.is_destroyed = is_destroyed;
        self
    }
}

impl Record for Planet {
    const COLLECTION: &'static str = "planets";
    const OVERLAY_KEY: &'static str = "localPlanets";
    const LABEL: &'static str = "planet";

    type Filters = PlanetFilters;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fields() -> &'static [&'static str] {
        &["name", "isDestroyed", "description", "image"]
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match field {
            "name" => self.name = value.to_string(),
            "isDestroyed" | "destroyed" => self.is_destroyed = parse_flag(value)?,
            "description" => self.description = value.to_string(),
            "image" => self.image = value.to_string(),
            other => {
                return Err(AdminError::Validation(format!(
                    "Unknown planet field '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Name", "Status", "Description"]
    }

    fn cells(&self) -> Vec<String> {
        let status = if self.is_destroyed { "Destroyed" } else { "Active" };
        let description: String = self.description.chars().take(100).collect();
        vec![
            self.id.to_string(),
            self.name.clone(),
            status.to_string(),
            description,
        ]
    }
}

/// Parses the textual forms accepted for boolean fields and filters.
pub fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "destroyed" => Ok(true),
        "false" | "no" | "0" | "active" => Ok(false),
        other => Err(AdminError::Validation(format!(
            "Expected true/false, got '{}'",
            other
        ))),
    }
}

/// Console roles. Only admins may create, edit or delete records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// The signed-in user, persisted verbatim under the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
