//! Prompt templates for the recommendation session.

use crate::domain::models::UserProfile;

/// Session persona and ground rules for tool use.
pub const SYSTEM_PROMPT: &str = "\
You are a medical assistant that recommends health-check packages. \
You are given a user's basic information and have tools to look up their \
prior checkup record, find checkup records of similar patients, and search \
a disease knowledge base. Gather the evidence you need with the tools, then \
recommend suitable health-check packages with concrete check items and a \
short rationale grounded in what you retrieved. Do not invent records.";

/// Appended when the iteration budget runs out: demand a direct answer.
pub const OUTPUT_DIRECTIVE: &str = "\
Stop using tools now. Based on the information gathered so far, give your \
final recommendation directly: the recommended health-check packages, the \
check items they should contain, and a brief reason for each.";

/// Returned when the session cannot produce any model answer at all.
pub const FALLBACK_ANSWER: &str = "\
We could not generate a personalised recommendation at this time. Please \
try again later or consult a health-check advisor directly.";

/// Format the user's request message from their profile.
pub fn build_request(profile: &UserProfile) -> String {
    format!(
        "Please recommend health-check packages for this user.\n\
         patient_id: {}\n\
         profile: {}",
        profile.id,
        profile.merged_description()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_includes_all_fields() {
        let profile = UserProfile {
            id: "426815".to_string(),
            gender: "male".to_string(),
            age: 50,
            height: "172cm".to_string(),
            weight: "80kg".to_string(),
            medical_history: "hypertension".to_string(),
            symptoms: "dizziness".to_string(),
        };

        let request = build_request(&profile);
        assert!(request.contains("patient_id: 426815"));
        assert!(request.contains("age:50"));
        assert!(request.contains("symptoms:dizziness"));
    }
}
