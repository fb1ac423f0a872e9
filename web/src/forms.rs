//! Submitted HTML forms. Every field is deserialized as text so that any
//! form-encoded body reaches [clean()](CollectionForm::clean), which converts
//! the values to their typed form or collects a message for every invalid field.
use crate::util::FormErrors;
use libbiobank::{MAX_TEXT_LENGTH, user::User};
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

pub(crate) const PASSWORD_MIN_LENGTH: usize = 8;

const REQUIRED: &str = "This field is required.";

fn required_text(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    let nchars = value.chars().count();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if nchars > MAX_TEXT_LENGTH {
        errors.add(
            field,
            format!("Ensure this value has at most {MAX_TEXT_LENGTH} characters (it has {nchars})."),
        );
    }
    value.to_string()
}

fn required_count(errors: &mut FormErrors, field: &str, value: &str) -> u32 {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return 0;
    }
    match value.parse::<i64>() {
        Err(_) => errors.add(field, "Enter a whole number."),
        Ok(n) if n < 0 => errors.add(field, "Ensure this value is greater than or equal to 0."),
        Ok(n) => match u32::try_from(n) {
            Ok(n) => return n,
            Err(_) => errors.add(
                field,
                format!("Ensure this value is less than or equal to {}.", u32::MAX),
            ),
        },
    }
    0
}

fn required_date(errors: &mut FormErrors, field: &str, value: &str) -> Option<Date> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let res = Date::parse(value, format_description!("[year]-[month]-[day]")).ok();
    if res.is_none() {
        errors.add(field, "Enter a valid date.");
    }
    res
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub(crate) struct CollectionForm {
    #[serde(default)]
    pub(crate) disease_term: String,
    #[serde(default)]
    pub(crate) title: String,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CleanCollection {
    pub(crate) disease_term: String,
    pub(crate) title: String,
}

impl CollectionForm {
    pub(crate) fn clean(&self) -> Result<CleanCollection, FormErrors> {
        let mut errors = FormErrors::default();
        let disease_term = required_text(&mut errors, "disease_term", &self.disease_term);
        let title = required_text(&mut errors, "title", &self.title);
        errors.or_value(CleanCollection {
            disease_term,
            title,
        })
    }
}

/// Sample fields. Any `collection` value in the submitted body is ignored since
/// the collection always comes from the route.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub(crate) struct SampleForm {
    #[serde(default)]
    pub(crate) donor_count: String,
    #[serde(default)]
    pub(crate) material_type: String,
    #[serde(default)]
    pub(crate) last_updated: String,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CleanSample {
    pub(crate) donor_count: u32,
    pub(crate) material_type: String,
    pub(crate) last_updated: Date,
}

impl SampleForm {
    pub(crate) fn clean(&self) -> Result<CleanSample, FormErrors> {
        let mut errors = FormErrors::default();
        let donor_count = required_count(&mut errors, "donor_count", &self.donor_count);
        let material_type = required_text(&mut errors, "material_type", &self.material_type);
        let last_updated = required_date(&mut errors, "last_updated", &self.last_updated);
        match last_updated {
            Some(last_updated) => errors.or_value(CleanSample {
                donor_count,
                material_type,
                last_updated,
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct SignupForm {
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password1: String,
    #[serde(default)]
    pub(crate) password2: String,
}

impl SignupForm {
    /// Checks everything that can be checked without the database. Whether the
    /// username is already taken is checked by the handler.
    pub(crate) fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.is_empty() {
            errors.add("username", REQUIRED);
        } else if let Err(e) = User::validate_username(&self.username) {
            errors.add("username", e.to_string());
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else {
            if self.password1.chars().count() < PASSWORD_MIN_LENGTH {
                errors.add(
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password2", "This password is entirely numeric.");
            }
            if self.password1.to_lowercase() == self.username.to_lowercase() {
                errors.add("password2", "The password is too similar to the username.");
            }
        }
        errors.or_value(())
    }
}
