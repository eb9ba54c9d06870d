//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Role assignments for users. Only `admin` is recognised today.
    user_roles (user_id, role) {
        user_id -> Uuid,
        role -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only credit grants.
    ///
    /// `used_credits` is the only mutable column and is bounded by
    /// `total_credits` via a CHECK constraint. A partial unique index allows
    /// at most one `free` grant per user.
    credit_grants (id) {
        id -> Uuid,
        user_id -> Uuid,
        total_credits -> Int4,
        used_credits -> Int4,
        /// One of `free`, `purchase`, `adjustment`.
        source -> Varchar,
        /// Unique: a payment produces at most one grant.
        payment_record_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Payment intents and their settlement state.
    payment_records (id) {
        id -> Uuid,
        user_id -> Uuid,
        /// Minor currency units.
        amount -> Int8,
        currency -> Varchar,
        credits_purchased -> Int4,
        /// Unique local receipt key.
        transaction_id -> Varchar,
        /// Unique gateway order id.
        gateway_order_id -> Varchar,
        gateway_payment_id -> Nullable<Varchar>,
        /// One of `pending`, `success`, `failed`.
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// User posts and their lifecycle status.
    posts (id) {
        id -> Uuid,
        user_id -> Uuid,
        content -> Text,
        status -> Varchar,
        audio_file_name -> Nullable<Text>,
        scheduled_at -> Nullable<Timestamptz>,
        linkedin_post_id -> Nullable<Text>,
        image_url -> Nullable<Text>,
        image_source_type -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(credit_grants -> payment_records (payment_record_id));

diesel::allow_tables_to_appear_in_same_query!(credit_grants, payment_records, posts, user_roles);
