//! Domain records of the recipe store.
//!
//! # Responsibility
//! - Define every persisted record and its creation payload.
//! - Keep column layout next to the field list that produces it.
//!
//! # Invariants
//! - Every record except `User` has exactly one owner in `belongs_to`.
//! - Deletion is a tombstone in `archived_on`, never a row removal.

pub mod envelope;
pub mod invitation;
pub mod iteration;
pub mod oauth2_client;
pub mod pantry;
pub mod recipe;
pub mod report;
pub mod user;
pub mod webhook;

pub use envelope::{DelimitedList, OwnedEntity};
pub use invitation::{Invitation, InvitationCreationInput};
pub use iteration::{
    IterationMedia, IterationMediaCreationInput, RecipeIteration, RecipeIterationCreationInput,
    RecipeStepEvent, RecipeStepEventCreationInput,
};
pub use oauth2_client::{OAuth2Client, OAuth2ClientCreationInput};
pub use pantry::{
    Ingredient, IngredientCreationInput, Instrument, InstrumentCreationInput, Preparation,
    PreparationCreationInput, RequiredPreparationInstrument,
    RequiredPreparationInstrumentCreationInput,
};
pub use recipe::{
    Recipe, RecipeCreationInput, RecipeStep, RecipeStepCreationInput, RecipeStepIngredient,
    RecipeStepIngredientCreationInput, RecipeStepInstrument, RecipeStepInstrumentCreationInput,
    RecipeStepProduct, RecipeStepProductCreationInput,
};
pub use report::{Report, ReportCreationInput};
pub use user::{User, UserCreationInput};
pub use webhook::{Webhook, WebhookCreationInput};
