use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_SUPERUSER: &str = "superuser";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_PATIENT: &str = "patient";

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    /// Optional per RFC 7519; Supabase sets it, other issuers may not.
    #[serde(default)]
    pub typ: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Application role of the subject. Supabase puts the generic
    /// `authenticated` role in `role`, so `app_metadata.role` wins over it.
    pub fn application_role(&self) -> Option<String> {
        let metadata_role = self
            .app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .map(str::to_string);

        match self.role.as_deref() {
            None | Some("authenticated") => metadata_role.or_else(|| self.role.clone()),
            Some(role) => Some(role.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Superusers see and act on every appointment.
    pub fn is_superuser(&self) -> bool {
        self.role.as_deref() == Some(ROLE_SUPERUSER)
    }

    /// Staff may create appointments and read reports.
    pub fn is_staff(&self) -> bool {
        matches!(self.role.as_deref(), Some(ROLE_ADMIN) | Some(ROLE_SUPERUSER))
    }
}
