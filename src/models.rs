use crate::schema::standups;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

/// One user's standup for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = standups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StandupRecord {
    pub user_id: String,
    pub date: NaiveDate,
    pub yesterday: Option<String>,
    pub today: Option<String>,
    pub blocker: Option<String>,
    pub channel: Option<String>,
    pub modified_at: NaiveDateTime,
}

impl StandupRecord {
    pub fn get(&self, field: StandupField) -> Option<&str> {
        let value = match field {
            StandupField::Yesterday => &self.yesterday,
            StandupField::Today => &self.today,
            StandupField::Blocker => &self.blocker,
            StandupField::Channel => &self.channel,
        };
        value.as_deref()
    }

    /// All four fields are present and non-empty.
    pub fn is_complete(&self) -> bool {
        StandupField::ALL
            .iter()
            .all(|field| self.get(*field).map_or(false, |v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandupField {
    Yesterday,
    Today,
    Blocker,
    Channel,
}

impl StandupField {
    pub const ALL: [StandupField; 4] = [
        StandupField::Yesterday,
        StandupField::Today,
        StandupField::Blocker,
        StandupField::Channel,
    ];

    /// The Slack block `action_id` that carries this field.
    pub fn action_id(self) -> &'static str {
        match self {
            StandupField::Yesterday => "yesterday-message",
            StandupField::Today => "today-message",
            StandupField::Blocker => "blocker-message",
            StandupField::Channel => "channel-selection-action",
        }
    }

    pub fn from_action_id(action_id: &str) -> Option<StandupField> {
        match action_id {
            "yesterday-message" => Some(StandupField::Yesterday),
            "today-message" => Some(StandupField::Today),
            "blocker-message" => Some(StandupField::Blocker),
            "channel-selection-action" | "channel" => Some(StandupField::Channel),
            _ => None,
        }
    }
}

/// A partial write: only the fields that are `Some` get stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandupUpdate {
    pub yesterday: Option<String>,
    pub today: Option<String>,
    pub blocker: Option<String>,
    pub channel: Option<String>,
}

impl StandupUpdate {
    pub fn new() -> StandupUpdate {
        StandupUpdate::default()
    }

    pub fn with(mut self, field: StandupField, value: impl Into<String>) -> StandupUpdate {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: StandupField, value: impl Into<String>) {
        let slot = match field {
            StandupField::Yesterday => &mut self.yesterday,
            StandupField::Today => &mut self.today,
            StandupField::Blocker => &mut self.blocker,
            StandupField::Channel => &mut self.channel,
        };
        *slot = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.yesterday.is_none()
            && self.today.is_none()
            && self.blocker.is_none()
            && self.channel.is_none()
    }
}

#[derive(Insertable)]
#[diesel(table_name = standups)]
pub struct NewStandup<'a> {
    pub user_id: &'a str,
    pub date: NaiveDate,
    pub yesterday: Option<&'a str>,
    pub today: Option<&'a str>,
    pub blocker: Option<&'a str>,
    pub channel: Option<&'a str>,
}

// `None` fields are left out of the SET clause, so they keep their stored value.
#[derive(AsChangeset)]
#[diesel(table_name = standups)]
pub struct StandupChanges<'a> {
    pub yesterday: Option<&'a str>,
    pub today: Option<&'a str>,
    pub blocker: Option<&'a str>,
    pub channel: Option<&'a str>,
}

// `modified_at` comes from the database clock: the column default on insert,
// `now` on update.
impl<'a> NewStandup<'a> {
    pub fn new(user_id: &'a str, date: NaiveDate, update: &'a StandupUpdate) -> NewStandup<'a> {
        NewStandup {
            user_id,
            date,
            yesterday: update.yesterday.as_deref(),
            today: update.today.as_deref(),
            blocker: update.blocker.as_deref(),
            channel: update.channel.as_deref(),
        }
    }

    pub fn changes(&self) -> StandupChanges<'a> {
        StandupChanges {
            yesterday: self.yesterday,
            today: self.today,
            blocker: self.blocker,
            channel: self.channel,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{StandupField, StandupRecord, StandupUpdate};
    use chrono::NaiveDate;

    fn record(values: [Option<&str>; 4]) -> StandupRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        StandupRecord {
            user_id: "U1".to_string(),
            date,
            yesterday: values[0].map(String::from),
            today: values[1].map(String::from),
            blocker: values[2].map(String::from),
            channel: values[3].map(String::from),
            modified_at: date.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn complete_only_when_every_field_is_set() {
        for mask in 0..16u8 {
            let values = [
                (mask & 1 != 0).then_some("Shipped X"),
                (mask & 2 != 0).then_some("Ship Y"),
                (mask & 4 != 0).then_some("None"),
                (mask & 8 != 0).then_some("C123"),
            ];
            assert_eq!(record(values).is_complete(), mask == 15, "mask {:04b}", mask);
        }
    }

    #[test]
    fn empty_strings_do_not_count_as_complete() {
        let r = record([Some("a"), Some(""), Some("c"), Some("C1")]);
        assert!(!r.is_complete());

        let r = record([Some("a"), Some("b"), Some("   "), Some("C1")]);
        assert!(!r.is_complete());
    }

    #[test]
    fn action_ids_map_back_to_fields() {
        for field in StandupField::ALL.iter() {
            assert_eq!(StandupField::from_action_id(field.action_id()), Some(*field));
        }
        assert_eq!(StandupField::from_action_id("channel"), Some(StandupField::Channel));
        assert_eq!(StandupField::from_action_id("something-else"), None);
    }

    #[test]
    fn update_tracks_only_given_fields() {
        let update = StandupUpdate::new();
        assert!(update.is_empty());

        let update = update
            .with(StandupField::Today, "first")
            .with(StandupField::Today, "second")
            .with(StandupField::Channel, "C1");

        assert!(!update.is_empty());
        assert_eq!(update.today.as_deref(), Some("second"));
        assert_eq!(update.channel.as_deref(), Some("C1"));
        assert_eq!(update.yesterday, None);
        assert_eq!(update.blocker, None);
    }
}
