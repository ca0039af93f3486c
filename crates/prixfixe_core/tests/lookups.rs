use prixfixe_core::model::{
    Invitation, InvitationCreationInput, OAuth2Client, OAuth2ClientCreationInput, Webhook,
    WebhookCreationInput,
};
use prixfixe_core::{Database, OwnedRepository, QueryFilter};

fn migrated_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db
}

#[test]
fn oauth2_client_resolves_by_client_id() {
    let db = migrated_db();
    let repo = db.repository::<OAuth2Client>().unwrap();
    let created = repo
        .create(OAuth2ClientCreationInput {
            name: "ios".to_string(),
            client_id: "abc123".to_string(),
            client_secret: "shh".to_string(),
            redirect_uri: "app://callback".to_string(),
            scopes: ["*"].into_iter().collect(),
            implicit_allowed: true,
            belongs_to: 4,
        })
        .unwrap();

    let found = repo.get_by_client_id("abc123").unwrap();
    assert_eq!(found.id, created.id);
    assert!(found.implicit_allowed);
    assert!(found.has_scope("anything"));

    repo.archive(created.id, 4).unwrap();
    assert!(repo.get_by_client_id("abc123").unwrap_err().is_not_found());
}

#[test]
fn invitation_resolves_by_generated_code() {
    let db = migrated_db();
    let repo = db.repository::<Invitation>().unwrap();
    let created = repo
        .create(InvitationCreationInput::with_generated_code(9))
        .unwrap();

    let found = repo.get_by_code(&created.code).unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.belongs_to, 9);
    assert!(!found.consumed);
    assert!(repo.get_by_code("missing").unwrap_err().is_not_found());
}

#[test]
fn webhooks_list_across_owners() {
    let db = migrated_db();
    let repo = db.repository::<Webhook>().unwrap();
    for owner in [1, 2, 3] {
        repo.create(WebhookCreationInput {
            name: format!("hook for {owner}"),
            content_type: "application/json".to_string(),
            url: "https://example.com".to_string(),
            method: "POST".to_string(),
            belongs_to: owner,
            ..WebhookCreationInput::default()
        })
        .unwrap();
    }
    repo.archive(1, 1).unwrap();

    let page = repo
        .list_all(Some(&QueryFilter {
            limit: 1,
            ..QueryFilter::default()
        }))
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total_count, 2);

    let everything = repo.list_all(None).unwrap();
    let owners: Vec<_> = everything.items.iter().map(|hook| hook.belongs_to).collect();
    assert_eq!(owners, vec![2, 3]);
}

#[test]
fn listings_serialize_with_pagination_header() {
    let db = migrated_db();
    let repo = db.repository::<Webhook>().unwrap();
    repo.create(WebhookCreationInput {
        name: "json".to_string(),
        events: ["a", "b"].into_iter().collect(),
        belongs_to: 1,
        ..WebhookCreationInput::default()
    })
    .unwrap();

    let listed = repo.list(None, 1).unwrap();
    let json = serde_json::to_value(&listed).unwrap();
    assert_eq!(json["pagination"]["total_count"], 1);
    assert_eq!(json["pagination"]["page"], 1);
    assert_eq!(json["items"][0]["events"], serde_json::json!(["a", "b"]));
}
