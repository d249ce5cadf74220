//! Table definitions for the event store.

diesel::table! {
    event_series (id) {
        id -> Uuid,
        calendar_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        color -> Nullable<Text>,
        category -> Nullable<Text>,
        all_day -> Bool,
        visibility -> Text,
        metadata -> Nullable<Jsonb>,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        status -> Text,
        recurrence -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_instance (id) {
        id -> Uuid,
        series_id -> Uuid,
        calendar_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        color -> Nullable<Text>,
        category -> Nullable<Text>,
        all_day -> Bool,
        visibility -> Text,
        metadata -> Nullable<Jsonb>,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(event_instance -> event_series (series_id));

diesel::allow_tables_to_appear_in_same_query!(event_series, event_instance);
