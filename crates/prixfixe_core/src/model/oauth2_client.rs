//! Registered OAuth2 clients.

use super::envelope::{owned_entity, DelimitedList};

owned_entity! {
    /// Third-party application allowed to act for its owner.
    OAuth2Client / OAuth2ClientCreationInput in "oauth2_clients" as "oauth2 client" {
        name: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        /// Granted scopes, in grant order.
        scopes: DelimitedList,
        implicit_allowed: bool,
    }
}

impl OAuth2Client {
    /// Whether `scope` was granted to this client.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|granted| granted == scope || granted == "*")
    }
}
