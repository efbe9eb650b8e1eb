use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;
use crate::auth::session::Flash;
use crate::config::Limits;
use crate::projects::repo::{NewProject, Project, ProjectEdit};
use crate::validate::{check, max_len, required, url, FieldError};

/// Listing filters from the query string.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Form body for add and edit.
#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: Option<String>,
}

/// Project payload that passed every rule.
#[derive(Debug)]
pub struct ValidProject {
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: Option<String>,
}

impl ProjectForm {
    pub fn validate(self, limits: &Limits) -> Result<ValidProject, Vec<FieldError>> {
        let title = self.title.trim().to_owned();
        let description = self.description.trim().to_owned();
        let link = self.link.trim().to_owned();
        // An empty select submits as "", which means "use the default".
        let category = self
            .category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        let mut errors = Vec::new();
        check(&mut errors, required("title", &title));
        check(&mut errors, max_len("title", &title, limits.title_max));
        check(&mut errors, required("description", &description));
        check(
            &mut errors,
            max_len("description", &description, limits.description_max),
        );
        check(&mut errors, required("link", &link));
        check(&mut errors, max_len("link", &link, limits.link_max));
        if !link.is_empty() {
            check(&mut errors, url("link", &link));
        }
        if let Some(category) = &category {
            check(&mut errors, max_len("category", category, 50));
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ValidProject {
            title,
            description,
            link,
            category,
        })
    }
}

impl From<ValidProject> for NewProject {
    fn from(v: ValidProject) -> Self {
        NewProject {
            title: v.title,
            description: v.description,
            link: v.link,
            category: v.category,
        }
    }
}

impl From<ValidProject> for ProjectEdit {
    fn from(v: ValidProject) -> Self {
        ProjectEdit {
            title: v.title,
            description: v.description,
            link: v.link,
        }
    }
}

/// Payload standing in for the rendered listing page.
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub title: &'static str,
    pub projects: Vec<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    pub flash: Vec<Flash>,
}

#[derive(Debug, Serialize)]
pub struct AboutPage {
    pub title: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            title_max: 100,
            description_max: 255,
            link_max: 100,
        }
    }

    fn form(title: &str, description: &str, link: &str, category: Option<&str>) -> ProjectForm {
        ProjectForm {
            title: title.into(),
            description: description.into(),
            link: link.into(),
            category: category.map(Into::into),
        }
    }

    #[test]
    fn anchor_link_is_a_valid_project() {
        let valid = form("Simple Calculator", "A calculator.", "#", None)
            .validate(&limits())
            .expect("valid form");
        assert_eq!(valid.title, "Simple Calculator");
        assert_eq!(valid.category, None);
    }

    #[test]
    fn blank_category_falls_back_to_default() {
        let valid = form("Calc", "desc", "#", Some("  "))
            .validate(&limits())
            .expect("valid form");
        assert_eq!(valid.category, None);

        let valid = form("Calc", "desc", "#", Some("Tools"))
            .validate(&limits())
            .expect("valid form");
        assert_eq!(valid.category.as_deref(), Some("Tools"));
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let errors = form("", "", "", None).validate(&limits()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"description"));
        assert!(fields.contains(&"link"));
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let errors = form(&"t".repeat(101), "desc", "#", None)
            .validate(&limits())
            .unwrap_err();
        assert_eq!(errors[0].field, "title");

        let errors = form("Calc", &"d".repeat(256), "#", None)
            .validate(&limits())
            .unwrap_err();
        assert_eq!(errors[0].field, "description");
    }

    #[test]
    fn description_bound_is_configurable() {
        let mut limits = limits();
        limits.description_max = 500;
        assert!(form("Calc", &"d".repeat(400), "#", None)
            .validate(&limits)
            .is_ok());
    }

    #[test]
    fn bad_absolute_link_is_rejected() {
        let errors = form("Calc", "desc", "javascript:alert(1)", None)
            .validate(&limits())
            .unwrap_err();
        assert_eq!(errors[0].field, "link");
    }
}
