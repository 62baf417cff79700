//! User profile collected by the registration conversations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Profile fields gathered from the user.
///
/// Serialized with camelCase names; this is both the persisted user-state
/// record and the registration API's request/response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub user_name: Option<String>,
    pub known_as: Option<String>,
    /// Pre-formatted date string, stored as the user gave it or as a short date.
    pub date_of_birth: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub password: Option<String>,
    pub gender: Option<String>,
}

impl UserProfile {
    /// Build a profile from waterfall scratch values.
    pub fn from_values(values: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| values.get(key).cloned();
        Self {
            user_name: get(value_keys::USERNAME),
            known_as: get(value_keys::KNOWN_AS),
            date_of_birth: get(value_keys::DATE_OF_BIRTH),
            city: get(value_keys::CITY),
            country: get(value_keys::COUNTRY),
            password: get(value_keys::PASSWORD),
            gender: get(value_keys::GENDER),
        }
    }

    /// Overwrite every field that `other` has set.
    pub fn merge(&mut self, other: UserProfile) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.user_name, other.user_name);
        take(&mut self.known_as, other.known_as);
        take(&mut self.date_of_birth, other.date_of_birth);
        take(&mut self.city, other.city);
        take(&mut self.country, other.country);
        take(&mut self.password, other.password);
        take(&mut self.gender, other.gender);
    }

    /// One-line read-back of the confirmed answers.
    pub fn summary(&self) -> String {
        format!(
            "I have your name as {}, DateOfBirth as {}, city as {}, country as {}",
            display(&self.user_name),
            display(&self.date_of_birth),
            display(&self.city),
            display(&self.country),
        )
    }
}

fn display(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

/// Scratch-value keys used by the registration waterfall.
pub mod value_keys {
    pub const GENDER: &str = "gender";
    pub const USERNAME: &str = "username";
    pub const KNOWN_AS: &str = "knownas";
    pub const DATE_OF_BIRTH: &str = "dateofbirth";
    pub const CITY: &str = "city";
    pub const COUNTRY: &str = "country";
    pub const PASSWORD: &str = "password";
}

/// Property names of the persisted state records.
pub mod state_keys {
    /// Quick-flow cursor, conversation scoped.
    pub const CONVERSATION_FLOW: &str = "ConversationFlow";
    /// Waterfall cursor and scratch values, conversation scoped.
    pub const DIALOG_STATE: &str = "DialogState";
    /// Collected profile, user scoped.
    pub const USER_PROFILE: &str = "UserProfile";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> UserProfile {
        UserProfile {
            user_name: Some("bob".to_string()),
            known_as: Some("Bobby".to_string()),
            date_of_birth: Some("01/01/1990".to_string()),
            city: Some("Leeds".to_string()),
            country: Some("UK".to_string()),
            password: Some("hunter2".to_string()),
            gender: Some("Male".to_string()),
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(full_profile()).unwrap();
        for key in [
            "userName",
            "knownAs",
            "dateOfBirth",
            "city",
            "country",
            "password",
            "gender",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["userName"], "bob");
    }

    #[test]
    fn deserializes_partial_objects() {
        let profile: UserProfile = serde_json::from_str(r#"{"userName":"bob1"}"#).unwrap();
        assert_eq!(profile.user_name.as_deref(), Some("bob1"));
        assert!(profile.password.is_none());
    }

    #[test]
    fn from_values_maps_every_key() {
        let values: BTreeMap<String, String> = [
            ("gender", "Female"),
            ("username", "ann"),
            ("knownas", "Annie"),
            ("dateofbirth", "2/3/1988"),
            ("city", "Cork"),
            ("country", "Ireland"),
            ("password", "pw"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let profile = UserProfile::from_values(&values);
        assert_eq!(profile.gender.as_deref(), Some("Female"));
        assert_eq!(profile.user_name.as_deref(), Some("ann"));
        assert_eq!(profile.known_as.as_deref(), Some("Annie"));
        assert_eq!(profile.date_of_birth.as_deref(), Some("2/3/1988"));
        assert_eq!(profile.city.as_deref(), Some("Cork"));
        assert_eq!(profile.country.as_deref(), Some("Ireland"));
        assert_eq!(profile.password.as_deref(), Some("pw"));
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut profile = full_profile();
        profile.merge(UserProfile {
            city: Some("York".to_string()),
            ..Default::default()
        });
        assert_eq!(profile.city.as_deref(), Some("York"));
        assert_eq!(profile.user_name.as_deref(), Some("bob"));
    }

    #[test]
    fn summary_reads_back_answers() {
        let summary = full_profile().summary();
        assert_eq!(
            summary,
            "I have your name as bob, DateOfBirth as 01/01/1990, city as Leeds, country as UK"
        );
    }
}
