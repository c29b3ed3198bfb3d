use lazy_static::lazy_static;
use regex::Regex;

use crate::error::StoreError;
use crate::users::repo_types::NewUser;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Checks a registration before any store access and hands back its password.
pub(crate) fn validate_new_user<'a>(
    context: impl Into<String>,
    user: &'a NewUser,
) -> Result<&'a str, StoreError> {
    if !is_valid_username(&user.username) {
        return Err(StoreError::validation(
            context,
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    match user.password.as_deref() {
        Some(pw) if !pw.is_empty() => Ok(pw),
        _ => Err(StoreError::validation(context, "password is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn new_user(username: &str, password: Option<&str>) -> NewUser {
        NewUser {
            first_name: "First".into(),
            last_name: "Last".into(),
            username: username.into(),
            password: password.map(Into::into),
        }
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("ada_l.99"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }

    #[test]
    fn password_is_required() {
        let err = validate_new_user("create user \"ada\"", &new_user("ada", None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("password is required"));

        let err = validate_new_user("c", &new_user("ada", Some(""))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn valid_user_yields_password() {
        let u = new_user("ada", Some("pw"));
        assert_eq!(validate_new_user("c", &u).expect("valid"), "pw");
    }
}
