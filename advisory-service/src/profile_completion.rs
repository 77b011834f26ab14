use common_auth::UserProfile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{fetch_one, BackendResult, TableQuery, TableReader};

pub const ADVISORS_TABLE: &str = "advisors";
pub const PROFILES_TABLE: &str = "profiles";

/// Shown when either profile row is missing.
pub const MISSING_PROFILE_LABEL: &str = "פרופיל";

/// Row of the backend `advisors` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

pub struct RequiredField {
    pub key: &'static str,
    pub label: &'static str,
    present: fn(&AdvisorProfile, &UserProfile) -> bool,
}

impl RequiredField {
    pub fn is_present(&self, advisor: &AdvisorProfile, profile: &UserProfile) -> bool {
        (self.present)(advisor, profile)
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |text| !text.trim().is_empty())
}

fn has_company_name(advisor: &AdvisorProfile, _: &UserProfile) -> bool {
    filled(&advisor.company_name)
}

fn has_expertise(advisor: &AdvisorProfile, _: &UserProfile) -> bool {
    !advisor.expertise.is_empty()
}

fn has_location(advisor: &AdvisorProfile, _: &UserProfile) -> bool {
    filled(&advisor.location)
}

fn has_full_name(_: &AdvisorProfile, profile: &UserProfile) -> bool {
    filled(&profile.full_name)
}

fn has_phone(_: &AdvisorProfile, profile: &UserProfile) -> bool {
    filled(&profile.phone)
}

/// Declaration order decides which missing field is surfaced first.
pub const REQUIRED_FIELDS: [RequiredField; 5] = [
    RequiredField { key: "company_name", label: "שם החברה", present: has_company_name },
    RequiredField { key: "expertise", label: "תחומי מומחיות", present: has_expertise },
    RequiredField { key: "location", label: "מיקום", present: has_location },
    RequiredField { key: "full_name", label: "שם מלא", present: has_full_name },
    RequiredField { key: "phone", label: "טלפון", present: has_phone },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCompletion {
    pub percentage: u8,
    pub is_complete: bool,
    pub first_missing_field: String,
    pub missing_fields: Vec<String>,
}

pub fn calculate_profile_completion(
    advisor: Option<&AdvisorProfile>,
    profile: Option<&UserProfile>,
) -> ProfileCompletion {
    let (Some(advisor), Some(profile)) = (advisor, profile) else {
        return ProfileCompletion {
            percentage: 0,
            is_complete: false,
            first_missing_field: MISSING_PROFILE_LABEL.to_string(),
            missing_fields: REQUIRED_FIELDS.iter().map(|field| field.label.to_string()).collect(),
        };
    };

    let missing_fields: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !field.is_present(advisor, profile))
        .map(|field| field.label.to_string())
        .collect();
    let total = REQUIRED_FIELDS.len();
    let completed = total - missing_fields.len();
    let percentage = ((completed as f64 / total as f64) * 100.0).round() as u8;

    ProfileCompletion {
        percentage,
        is_complete: percentage == 100,
        first_missing_field: missing_fields.first().cloned().unwrap_or_default(),
        missing_fields,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileCompletionView {
    #[serde(flatten)]
    pub completion: ProfileCompletion,
    pub error: Option<String>,
}

async fn fetch_profiles(
    reader: &dyn TableReader,
    user_id: Uuid,
) -> BackendResult<(Option<AdvisorProfile>, Option<UserProfile>)> {
    let advisor = fetch_one(reader, TableQuery::new(ADVISORS_TABLE).eq("user_id", user_id)).await?;
    let profile = fetch_one(reader, TableQuery::new(PROFILES_TABLE).eq("id", user_id)).await?;
    Ok((advisor, profile))
}

/// Reads both profile rows for `user_id`. A failed read degrades to the
/// empty-profile result and reports the error alongside.
pub async fn load_profile_completion(reader: &dyn TableReader, user_id: Uuid) -> ProfileCompletionView {
    match fetch_profiles(reader, user_id).await {
        Ok((advisor, profile)) => ProfileCompletionView {
            completion: calculate_profile_completion(advisor.as_ref(), profile.as_ref()),
            error: None,
        },
        Err(err) => {
            tracing::warn!(%user_id, error = %err, "failed to load profiles for completion");
            ProfileCompletionView {
                completion: calculate_profile_completion(None, None),
                error: Some(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> (AdvisorProfile, UserProfile) {
        let user_id = Uuid::new_v4();
        (
            AdvisorProfile {
                id: Uuid::new_v4(),
                user_id,
                company_name: Some("Levi Engineering".into()),
                expertise: vec!["structural".into()],
                location: Some("Tel Aviv".into()),
            },
            UserProfile {
                id: user_id,
                full_name: Some("Dana Levi".into()),
                phone: Some("050-0000000".into()),
                ..UserProfile::default()
            },
        )
    }

    #[test]
    fn all_fields_present_is_complete() {
        let (advisor, profile) = complete();
        let result = calculate_profile_completion(Some(&advisor), Some(&profile));
        assert_eq!(result.percentage, 100);
        assert!(result.is_complete);
        assert_eq!(result.first_missing_field, "");
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn missing_company_name_is_reported() {
        let (mut advisor, profile) = complete();
        advisor.company_name = None;
        let result = calculate_profile_completion(Some(&advisor), Some(&profile));
        assert_eq!(result.percentage, 80);
        assert!(!result.is_complete);
        assert_eq!(result.first_missing_field, "שם החברה");
    }

    #[test]
    fn first_missing_follows_declaration_order() {
        let (mut advisor, mut profile) = complete();
        profile.phone = Some("   ".into());
        advisor.location = None;
        let result = calculate_profile_completion(Some(&advisor), Some(&profile));
        assert_eq!(result.percentage, 60);
        assert_eq!(result.first_missing_field, "מיקום");
        assert_eq!(result.missing_fields, vec!["מיקום".to_string(), "טלפון".to_string()]);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let (mut advisor, mut profile) = complete();
        advisor.expertise.clear();
        profile.full_name = None;
        advisor.company_name = Some(String::new());
        let result = calculate_profile_completion(Some(&advisor), Some(&profile));
        assert_eq!(result.percentage, 40);
        assert_eq!(result.first_missing_field, "שם החברה");
    }

    #[test]
    fn absent_profile_short_circuits() {
        let (advisor, _) = complete();
        let result = calculate_profile_completion(Some(&advisor), None);
        assert_eq!(result.percentage, 0);
        assert_eq!(result.first_missing_field, MISSING_PROFILE_LABEL);
        assert_eq!(result.missing_fields.len(), REQUIRED_FIELDS.len());
    }
}
