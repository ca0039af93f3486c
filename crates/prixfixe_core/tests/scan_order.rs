use prixfixe_core::model::user::USER_COLUMNS;
use prixfixe_core::model::{
    Ingredient, IngredientCreationInput, Instrument, InstrumentCreationInput, OAuth2Client,
    OAuth2ClientCreationInput, OwnedEntity, RecipeStep, RecipeStepCreationInput, User,
};
use prixfixe_core::repo::scan::ScanError;
use prixfixe_core::testing::MockRow;
use rusqlite::types::Value;

fn stored<E: OwnedEntity>(input: E::Input) -> E {
    let mut entity = E::from_input(input);
    entity.assign_identity(12, 1_700_000_000);
    entity
}

fn assert_every_swap_fails<E: OwnedEntity + std::fmt::Debug + PartialEq>(entity: &E) {
    let canonical = MockRow::from_entity(entity);
    assert_eq!(&E::scan(&canonical).unwrap(), entity);

    for a in 0..canonical.len() {
        for b in (a + 1)..canonical.len() {
            let permuted = canonical.clone().swapped(a, b);
            match E::scan(&permuted) {
                Err(ScanError::ColumnMismatch { position, .. }) => assert_eq!(position, a),
                other => panic!("{} swap {a}<->{b} scanned: {other:?}", E::TABLE),
            }
        }
    }
}

#[test]
fn instrument_rejects_every_permutation() {
    let instrument: Instrument = stored(InstrumentCreationInput {
        name: "knife".to_string(),
        variant: "chef".to_string(),
        belongs_to: 4,
        ..InstrumentCreationInput::default()
    });
    assert_every_swap_fails(&instrument);
}

#[test]
fn ingredient_rejects_every_permutation() {
    let ingredient: Ingredient = stored(IngredientCreationInput {
        name: "flour".to_string(),
        contains_wheat: true,
        contains_gluten: true,
        belongs_to: 4,
        ..IngredientCreationInput::default()
    });
    assert_every_swap_fails(&ingredient);
}

#[test]
fn oauth2_client_rejects_every_permutation() {
    let client: OAuth2Client = stored(OAuth2ClientCreationInput {
        name: "cli".to_string(),
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        scopes: ["read"].into_iter().collect(),
        belongs_to: 1,
        ..OAuth2ClientCreationInput::default()
    });
    assert_every_swap_fails(&client);
}

#[test]
fn recipe_step_rejects_every_permutation() {
    let step: RecipeStep = stored(RecipeStepCreationInput {
        index: 1,
        temperature_in_celsius: Some(200),
        recipe_id: 3,
        belongs_to: 1,
        ..RecipeStepCreationInput::default()
    });
    assert_every_swap_fails(&step);
}

#[test]
fn values_of_the_wrong_type_fail_even_with_canonical_names() {
    let instrument: Instrument = stored(InstrumentCreationInput {
        name: "knife".to_string(),
        belongs_to: 4,
        ..InstrumentCreationInput::default()
    });
    let row = MockRow::from_entity(&instrument).with_value(1, Value::Integer(5));

    let err = Instrument::scan(&row).unwrap_err();
    assert!(matches!(
        err,
        ScanError::Conversion {
            column: "name",
            ..
        }
    ));
}

#[test]
fn user_rows_follow_their_own_projection() {
    let values = vec![
        Value::Integer(1),
        Value::Text("chef".to_string()),
        Value::Text("hash".to_string()),
        Value::Null,
        Value::Text("otp".to_string()),
        Value::Integer(0),
        Value::Integer(100),
        Value::Null,
        Value::Null,
    ];
    let row = MockRow::new(USER_COLUMNS.iter().copied().zip(values).collect());

    let user = User::scan(&row).unwrap();
    assert_eq!(user.username, "chef");
    assert!(!user.is_admin);

    let swapped = row.swapped(1, 2);
    assert!(matches!(
        User::scan(&swapped),
        Err(ScanError::ColumnMismatch { position: 1, .. })
    ));
}
