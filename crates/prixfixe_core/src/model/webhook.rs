//! Outbound webhook subscriptions.
//!
//! Dispatch lives outside this crate; only the subscription is stored.

use super::envelope::{owned_entity, DelimitedList};

owned_entity! {
    Webhook / WebhookCreationInput in "webhooks" as "webhook" {
        name: String,
        content_type: String,
        url: String,
        method: String,
        events: DelimitedList,
        data_types: DelimitedList,
        topics: DelimitedList,
    }
}
