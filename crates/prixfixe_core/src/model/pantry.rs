//! Ingredients, instruments and preparation techniques.

use super::envelope::owned_entity;

owned_entity! {
    /// Raw ingredient with its allergen profile.
    Ingredient / IngredientCreationInput in "ingredients" as "ingredient" {
        name: String,
        variant: String,
        description: String,
        warning: String,
        contains_egg: bool,
        contains_dairy: bool,
        contains_peanut: bool,
        contains_tree_nut: bool,
        contains_soy: bool,
        contains_wheat: bool,
        contains_shellfish: bool,
        contains_sesame: bool,
        contains_fish: bool,
        contains_gluten: bool,
        animal_flesh: bool,
        animal_derived: bool,
        considered_staple: bool,
        icon: String,
    }
}

impl Ingredient {
    /// Names of the allergens flagged on this ingredient.
    pub fn allergens(&self) -> Vec<&'static str> {
        [
            ("egg", self.contains_egg),
            ("dairy", self.contains_dairy),
            ("peanut", self.contains_peanut),
            ("tree_nut", self.contains_tree_nut),
            ("soy", self.contains_soy),
            ("wheat", self.contains_wheat),
            ("shellfish", self.contains_shellfish),
            ("sesame", self.contains_sesame),
            ("fish", self.contains_fish),
            ("gluten", self.contains_gluten),
        ]
        .into_iter()
        .filter_map(|(name, flagged)| flagged.then_some(name))
        .collect()
    }
}

owned_entity! {
    /// Kitchen tool.
    Instrument / InstrumentCreationInput in "instruments" as "instrument" {
        name: String,
        variant: String,
        description: String,
        icon: String,
    }
}

owned_entity! {
    /// Technique such as "dice" or "sear".
    Preparation / PreparationCreationInput in "preparations" as "preparation" {
        name: String,
        variant: String,
        description: String,
        allergy_warning: String,
        icon: String,
    }
}

owned_entity! {
    /// Instrument a preparation cannot be done without.
    RequiredPreparationInstrument / RequiredPreparationInstrumentCreationInput
        in "required_preparation_instruments" as "required preparation instrument" {
        instrument_id: u64,
        preparation_id: u64,
        notes: String,
    }
}
