table! {
    standups (user_id, date) {
        user_id -> Text,
        date -> Date,
        yesterday -> Nullable<Text>,
        today -> Nullable<Text>,
        blocker -> Nullable<Text>,
        channel -> Nullable<Text>,
        modified_at -> Timestamp,
    }
}

pub const CREATE_STANDUPS: &str = "CREATE TABLE IF NOT EXISTS standups (
    user_id     TEXT NOT NULL,
    date        DATE NOT NULL,
    yesterday   TEXT,
    today       TEXT,
    blocker     TEXT,
    channel     TEXT,
    modified_at TIMESTAMP NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, date)
)";

pub const DROP_STANDUPS: &str = "DROP TABLE IF EXISTS standups";
