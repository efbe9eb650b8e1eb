use serde::{Deserialize, Serialize};

use crate::validate::{check, email, max_len, min_len, required, FieldError};

/// Form body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Registration payload that passed every rule.
#[derive(Debug)]
pub struct ValidRegistration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<ValidRegistration, Vec<FieldError>> {
        let full_name = self.full_name.trim().to_owned();
        let email_addr = self.email.trim().to_lowercase();

        let mut errors = Vec::new();
        check(&mut errors, required("full_name", &full_name));
        check(&mut errors, max_len("full_name", &full_name, 100));
        check(&mut errors, required("email", &email_addr));
        check(&mut errors, email("email", &email_addr));
        check(&mut errors, max_len("email", &email_addr, 100));
        check(&mut errors, min_len("password", &self.password, 8));
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ValidRegistration {
            full_name,
            email: email_addr,
            password: self.password,
        })
    }
}

/// Form body for login.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> Result<ValidLogin, Vec<FieldError>> {
        let email_addr = self.email.trim().to_lowercase();

        let mut errors = Vec::new();
        check(&mut errors, required("email", &email_addr));
        check(&mut errors, email("email", &email_addr));
        check(&mut errors, min_len("password", &self.password, 8));
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ValidLogin {
            email: email_addr,
            password: self.password,
        })
    }
}

/// Optional post-login destination, carried through the login form page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

impl From<&crate::auth::repo::User> for PublicUser {
    fn from(user: &crate::auth::repo::User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_normalizes_and_projects() {
        let form = RegisterForm {
            full_name: "  Ada Lovelace ".into(),
            email: "Ada@Example.COM ".into(),
            password: "first-programmer".into(),
        };
        let valid = form.validate().expect("valid form");
        assert_eq!(valid.full_name, "Ada Lovelace");
        assert_eq!(valid.email, "ada@example.com");
    }

    #[test]
    fn registration_collects_every_failure() {
        let form = RegisterForm {
            full_name: "".into(),
            email: "nope".into(),
            password: "short".into(),
        };
        let errors = form.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"full_name"));
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn login_requires_well_formed_email_and_password() {
        let form = LoginForm {
            email: "admin@example.com".into(),
            password: "hunter2hunter2".into(),
        };
        assert!(form.validate().is_ok());

        let form = LoginForm {
            email: "admin@example.com".into(),
            password: "short".into(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn public_user_hides_the_hash() {
        let user = crate::auth::repo::User {
            id: 1,
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("ada@example.com"));
    }
}
