// Mirrors migrations/; regenerate with `diesel print-schema` after schema changes.

diesel::table! {
    stations (id) {
        id -> Int8,
        token_id -> Text,
        description -> Text,
        created -> Timestamptz,
        seen -> Nullable<Timestamptz>,
        version -> Nullable<Text>,
        is_public -> Bool,
        longitude -> Float8,
        latitude -> Float8,
    }
}

diesel::table! {
    measurements (id) {
        id -> Int8,
        station_id -> Int8,
        tstamp -> Timestamptz,
        temperature -> Nullable<Float4>,
        humidity -> Nullable<Float4>,
        pressure -> Nullable<Float4>,
        pm25 -> Nullable<Float4>,
        pm10 -> Nullable<Float4>,
        aqi -> Nullable<Int4>,
    }
}

diesel::joinable!(measurements -> stations (station_id));

diesel::allow_tables_to_appear_in_same_query!(measurements, stations);
