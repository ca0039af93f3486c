//! Attempts at cooking a recipe and what was recorded along the way.

use super::envelope::owned_entity;

owned_entity! {
    /// One attempt at a recipe with its closing ratings.
    RecipeIteration / RecipeIterationCreationInput in "recipe_iterations" as "recipe iteration" {
        recipe_id: u64,
        end_difficulty_rating: f32,
        end_complexity_rating: f32,
        end_taste_rating: f32,
        end_overall_rating: f32,
    }
}

owned_entity! {
    RecipeStepEvent / RecipeStepEventCreationInput in "recipe_step_events" as "recipe step event" {
        event_type: String,
        done: bool,
        recipe_iteration_id: u64,
        recipe_step_id: u64,
    }
}

owned_entity! {
    /// Photo or video attached to an iteration, optionally to one step.
    IterationMedia / IterationMediaCreationInput in "iteration_medias" as "iteration media" {
        path: String,
        mimetype: String,
        recipe_iteration_id: u64,
        recipe_step_id: Option<u64>,
    }
}
