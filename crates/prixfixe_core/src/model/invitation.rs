//! Sign-up invitations.

use super::envelope::owned_entity;
use uuid::Uuid;

owned_entity! {
    Invitation / InvitationCreationInput in "invitations" as "invitation" {
        code: String,
        consumed: bool,
    }
}

impl InvitationCreationInput {
    /// Unconsumed invitation with a fresh random code.
    pub fn with_generated_code(belongs_to: u64) -> Self {
        Self {
            code: Uuid::new_v4().simple().to_string(),
            consumed: false,
            belongs_to,
        }
    }
}
