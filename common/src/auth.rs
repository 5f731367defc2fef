use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Labour,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Farmer => write!(f, "farmer"),
            Role::Labour => write!(f, "labour"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
}

/// Signup carries exactly the profile fields.
pub type SignupRequest = User;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailLoginRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailOtpVerification {
    pub email: String,
    pub otp: String,
}

/// Phone login is verified by exchanging the identity token issued by the
/// SMS provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhoneOtpVerification {
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
}

pub const OTP_LENGTH: usize = 6;

/// One-time codes are exactly six ASCII digits.
pub fn is_valid_otp(otp: &str) -> bool {
    otp.len() == OTP_LENGTH && otp.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Labour).unwrap(), "\"labour\"");
        assert_eq!(serde_json::from_str::<Role>("\"farmer\"").unwrap(), Role::Farmer);
    }

    #[test]
    fn test_otp_shape() {
        assert!(is_valid_otp("012345"));
        assert!(!is_valid_otp("12345"));
        assert!(!is_valid_otp("1234567"));
        assert!(!is_valid_otp("12a456"));
        assert!(!is_valid_otp("١٢٣٤٥٦"));
    }

    #[test]
    fn test_signup_omits_missing_contacts() {
        let req = SignupRequest {
            name: "Rajesh Kumar".to_string(),
            email: None,
            phone: Some("+919800000000".to_string()),
            role: Role::Farmer,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("email").is_none());
        assert_eq!(value["role"], "farmer");
    }
}
