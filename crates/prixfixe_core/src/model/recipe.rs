//! Recipes and the parts of their steps.
//!
//! Cross references are plain ids; archiving a recipe leaves its steps,
//! step parts and iterations untouched.

use super::envelope::owned_entity;

owned_entity! {
    Recipe / RecipeCreationInput in "recipes" as "recipe" {
        name: String,
        source: String,
        description: String,
        inspired_by_recipe_id: Option<u64>,
    }
}

owned_entity! {
    RecipeStep / RecipeStepCreationInput in "recipe_steps" as "recipe step" {
        /// Position within the recipe.
        index: u32,
        preparation_id: u64,
        prerequisite_step: u64,
        min_estimated_time_in_seconds: u32,
        max_estimated_time_in_seconds: u32,
        temperature_in_celsius: Option<u16>,
        notes: String,
        recipe_id: u64,
    }
}

owned_entity! {
    RecipeStepInstrument / RecipeStepInstrumentCreationInput
        in "recipe_step_instruments" as "recipe step instrument" {
        instrument_id: Option<u64>,
        recipe_step_id: u64,
        notes: String,
    }
}

owned_entity! {
    RecipeStepIngredient / RecipeStepIngredientCreationInput
        in "recipe_step_ingredients" as "recipe step ingredient" {
        ingredient_id: Option<u64>,
        quantity_type: String,
        quantity_value: f32,
        quantity_notes: String,
        /// The ingredient is the product of another recipe.
        product_of_recipe: bool,
        ingredient_notes: String,
        recipe_step_id: u64,
    }
}

owned_entity! {
    RecipeStepProduct / RecipeStepProductCreationInput
        in "recipe_step_products" as "recipe step product" {
        name: String,
        recipe_step_id: u64,
    }
}
