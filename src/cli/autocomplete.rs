use super::command::COMMANDS;
use dragonball_admin::{
    Character, CharacterFilters, Planet, PlanetFilters, Record, RecordFilter, View,
};
use std::collections::BTreeSet;

pub struct Autocompleter {
    commands: BTreeSet<&'static str>,
}

impl Autocompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.iter().copied().collect(),
        }
    }

    /// Field names known to the view: editable fields plus filter fields.
    fn fields(view: View) -> BTreeSet<&'static str> {
        match view {
            View::Characters => Character::fields()
                .iter()
                .chain(CharacterFilters::fields())
                .copied()
                .collect(),
            View::Planets => Planet::fields()
                .iter()
                .chain(PlanetFilters::fields())
                .copied()
                .collect(),
        }
    }

    /// Commands complete the first word, field names every later one.
    pub fn get_suggestions(&self, word: &str, first_word: bool, view: View) -> Vec<String> {
        let needle = word.to_lowercase();
        let candidates = if first_word {
            self.commands.clone()
        } else {
            let mut names = Self::fields(view);
            names.extend(["characters", "planets", "first", "prev", "next", "last"]);
            names
        };

        candidates
            .into_iter()
            .filter(|candidate| candidate.to_lowercase().starts_with(&needle) && *candidate != word)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_commands_then_fields() {
        let completer = Autocompleter::new();
        assert_eq!(completer.get_suggestions("fi", true, View::Characters), vec!["filter"]);
        assert_eq!(
            completer.get_suggestions("a", false, View::Characters),
            vec!["affiliation"]
        );
        assert_eq!(
            completer.get_suggestions("isd", false, View::Planets),
            vec!["isDestroyed"]
        );
        assert!(completer.get_suggestions("filter", true, View::Planets).is_empty());
    }
}
