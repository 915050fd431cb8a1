// File: propcast-common/src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::user::User;

/// Specialty codes accepted on a profile, with their display names.
pub const SPECIALTIES: &[(&str, &str)] = &[
    ("first_time_buyers", "First-time Home Buyers"),
    ("luxury_homes", "Luxury Homes"),
    ("investment_properties", "Investment Properties"),
    ("downsizing", "Downsizing/Senior Living"),
    ("new_construction", "New Construction"),
    ("commercial", "Commercial Real Estate"),
    ("rural_farm", "Rural/Farm Properties"),
    ("foreclosures", "Foreclosures/REO"),
    ("relocation", "Relocation Services"),
    ("military_va", "Military/VA Loans"),
];

/// Selling style codes accepted on a profile, with their display names.
pub const SELLING_STYLES: &[(&str, &str)] = &[
    ("consultative", "Consultative Approach"),
    ("aggressive_marketing", "Aggressive Marketing"),
    ("white_glove", "White-Glove Service"),
    ("data_driven", "Data-Driven Strategy"),
    ("relationship_focused", "Relationship-Focused"),
    ("technology_forward", "Technology-Forward"),
    ("full_service", "Full-Service Support"),
];

fn lookup_display(table: &[(&str, &'static str)], code: &str) -> &'static str {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct AgentProfile {
    pub user_id: Uuid,
    pub phone: String,
    pub company_name: String,
    pub license_number: String,
    pub years_experience: String,
    pub awards: String,
    pub specialty: String,
    pub shortest_sale: String,
    pub highest_sale: String,
    pub avg_days_on_market: String,
    pub mission: String,
    pub value_proposition: String,
    pub selling_style: String,
    pub testimonial_1: String,
    pub testimonial_2: String,
    pub testimonial_3: String,
    pub community_ties: String,
    pub headshot_url: Option<String>,
    pub logo_url: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentProfile {
    pub fn new(user_id: Uuid, company_name: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            company_name: company_name.to_string(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }

    pub fn specialty_display(&self) -> &'static str {
        lookup_display(SPECIALTIES, &self.specialty)
    }

    pub fn selling_style_display(&self) -> &'static str {
        lookup_display(SELLING_STYLES, &self.selling_style)
    }

    pub fn experience_display(&self) -> &str {
        &self.years_experience
    }

    /// Flags the profile complete once the essentials are present and at
    /// least one performance statistic is filled in. Never clears the flag.
    pub fn mark_complete(&mut self, user: &User) -> bool {
        let essentials = [
            self.company_name.as_str(),
            user.first_name.as_str(),
            user.last_name.as_str(),
            user.email.as_str(),
        ];
        let has_stat = [
            &self.shortest_sale,
            &self.highest_sale,
            &self.avg_days_on_market,
        ]
        .iter()
        .any(|s| !s.is_empty());

        if essentials.iter().all(|s| !s.is_empty()) && has_stat {
            self.profile_completed = true;
            return true;
        }
        false
    }

    fn with_field(mut self, field: ProfileField, value: String) -> Self {
        match field {
            ProfileField::Phone => self.phone = value,
            ProfileField::CompanyName => self.company_name = value,
            ProfileField::LicenseNumber => self.license_number = value,
            ProfileField::YearsExperience => self.years_experience = value,
            ProfileField::Awards => self.awards = value,
            ProfileField::Specialty => self.specialty = value,
            ProfileField::ShortestSale => self.shortest_sale = value,
            ProfileField::HighestSale => self.highest_sale = value,
            ProfileField::AvgDaysOnMarket => self.avg_days_on_market = value,
            ProfileField::Mission => self.mission = value,
            ProfileField::ValueProposition => self.value_proposition = value,
            ProfileField::SellingStyle => self.selling_style = value,
            ProfileField::Testimonial1 => self.testimonial_1 = value,
            ProfileField::Testimonial2 => self.testimonial_2 = value,
            ProfileField::Testimonial3 => self.testimonial_3 = value,
            ProfileField::CommunityTies => self.community_ties = value,
            ProfileField::Headshot => self.headshot_url = Some(value),
            ProfileField::Logo => self.logo_url = Some(value),
        }
        self
    }
}

/// Every profile attribute a client may patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Phone,
    CompanyName,
    LicenseNumber,
    YearsExperience,
    Awards,
    Specialty,
    ShortestSale,
    HighestSale,
    AvgDaysOnMarket,
    Mission,
    ValueProposition,
    SellingStyle,
    Testimonial1,
    Testimonial2,
    Testimonial3,
    CommunityTies,
    Headshot,
    Logo,
}

/// Request key -> profile field.
pub const PROFILE_FIELD_MAP: &[(&str, ProfileField)] = &[
    ("phone", ProfileField::Phone),
    ("companyName", ProfileField::CompanyName),
    ("licenseNumber", ProfileField::LicenseNumber),
    ("yearsExperience", ProfileField::YearsExperience),
    ("awards", ProfileField::Awards),
    ("specialty", ProfileField::Specialty),
    ("shortestSale", ProfileField::ShortestSale),
    ("highestSale", ProfileField::HighestSale),
    ("avgDaysOnMarket", ProfileField::AvgDaysOnMarket),
    ("mission", ProfileField::Mission),
    ("valueProposition", ProfileField::ValueProposition),
    ("sellingStyle", ProfileField::SellingStyle),
    ("testimonial1", ProfileField::Testimonial1),
    ("testimonial2", ProfileField::Testimonial2),
    ("testimonial3", ProfileField::Testimonial3),
    ("communityTies", ProfileField::CommunityTies),
    ("headshot", ProfileField::Headshot),
    ("logo", ProfileField::Logo),
];

/// Returns the patch value for `key` when it is present and non-blank.
/// Numbers and booleans are accepted in their display form.
pub fn patch_value(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Applies the mapped keys of `payload` to a copy of `profile`.
pub fn apply_profile_patch(profile: &AgentProfile, payload: &Map<String, Value>) -> AgentProfile {
    PROFILE_FIELD_MAP
        .iter()
        .fold(profile.clone(), |acc, (key, field)| match patch_value(payload, key) {
            Some(value) => acc.with_field(*field, value),
            None => acc,
        })
}

/// Applies `first_name`, `last_name` and `email` from `payload` to a copy of `user`.
pub fn apply_user_patch(user: &User, payload: &Map<String, Value>) -> User {
    let mut next = user.clone();
    if let Some(v) = patch_value(payload, "first_name") {
        next.first_name = v;
    }
    if let Some(v) = patch_value(payload, "last_name") {
        next.last_name = v;
    }
    if let Some(v) = patch_value(payload, "email") {
        next.email = v;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> User {
        User::new("agent", "agent@example.com", "hash", "Ada", "Lovelace")
    }

    fn payload(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn patch_only_touches_present_non_blank_keys() {
        let mut profile = AgentProfile::new(Uuid::new_v4(), "Acme Realty");
        profile.phone = "555-0100".into();
        profile.mission = "Help families".into();

        let patched = apply_profile_patch(
            &profile,
            &payload(json!({
                "companyName": "Beacon Homes",
                "phone": "   ",
                "mission": null,
                "testimonial2": "Sold in a week!",
                "unknownKey": "ignored"
            })),
        );

        assert_eq!(patched.company_name, "Beacon Homes");
        assert_eq!(patched.phone, "555-0100");
        assert_eq!(patched.mission, "Help families");
        assert_eq!(patched.testimonial_2, "Sold in a week!");
        // original record untouched
        assert_eq!(profile.company_name, "Acme Realty");
    }

    #[test]
    fn patch_accepts_numbers_and_image_urls() {
        let profile = AgentProfile::new(Uuid::new_v4(), "Acme Realty");
        let patched = apply_profile_patch(
            &profile,
            &payload(json!({ "avgDaysOnMarket": 12, "logo": "https://cdn.example.com/logo.png" })),
        );
        assert_eq!(patched.avg_days_on_market, "12");
        assert_eq!(patched.logo_url.as_deref(), Some("https://cdn.example.com/logo.png"));
        assert_eq!(patched.headshot_url, None);
    }

    #[test]
    fn user_patch_skips_empty_values() {
        let u = user();
        let patched = apply_user_patch(&u, &payload(json!({ "first_name": "", "email": "new@example.com" })));
        assert_eq!(patched.first_name, "Ada");
        assert_eq!(patched.email, "new@example.com");
    }

    #[test]
    fn mark_complete_requires_a_performance_stat() {
        let u = user();
        let mut profile = AgentProfile::new(u.user_id, "Acme Realty");
        assert!(!profile.mark_complete(&u));
        assert!(!profile.profile_completed);

        profile.highest_sale = "$2.5M".into();
        assert!(profile.mark_complete(&u));
        assert!(profile.profile_completed);
    }

    #[test]
    fn mark_complete_never_clears_the_flag() {
        let mut u = user();
        let mut profile = AgentProfile::new(u.user_id, "Acme Realty");
        profile.shortest_sale = "7 days".into();
        assert!(profile.mark_complete(&u));

        u.last_name.clear();
        assert!(!profile.mark_complete(&u));
        assert!(profile.profile_completed);
    }

    #[test]
    fn display_names() {
        let mut profile = AgentProfile::new(Uuid::new_v4(), "Acme Realty");
        profile.specialty = "luxury_homes".into();
        profile.selling_style = "not_a_style".into();
        assert_eq!(profile.specialty_display(), "Luxury Homes");
        assert_eq!(profile.selling_style_display(), "");
    }
}
