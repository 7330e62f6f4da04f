//! Navigable views and their paths.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A view of the application, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    SignIn,
    SignOut,
    /// `/generate`: the user's interviews.
    Dashboard,
    /// `/generate/create`
    Create,
    /// `/generate/interview/edit/:id`
    Edit(String),
    /// `/generate/interview/:id`: the pre-start page with the camera gate.
    PreStart(String),
    /// `/generate/interview/:id/start`
    Session(String),
    /// `/feedback/:id`
    Feedback(String),
}

/// A path that does not match any route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown route: {0}")]
pub struct UnknownRoute(pub String);

impl Route {
    /// Whether the view needs a signed-in user.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Home | Route::SignIn | Route::SignOut)
    }

    /// The interview the view is about, if any.
    pub fn interview_id(&self) -> Option<&str> {
        match self {
            Route::Edit(id) | Route::PreStart(id) | Route::Session(id) | Route::Feedback(id) => {
                Some(id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::SignIn => write!(f, "/signin"),
            Route::SignOut => write!(f, "/signout"),
            Route::Dashboard => write!(f, "/generate"),
            Route::Create => write!(f, "/generate/create"),
            Route::Edit(id) => write!(f, "/generate/interview/edit/{}", id),
            Route::PreStart(id) => write!(f, "/generate/interview/{}", id),
            Route::Session(id) => write!(f, "/generate/interview/{}/start", id),
            Route::Feedback(id) => write!(f, "/feedback/{}", id),
        }
    }
}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let path = trimmed.trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["signin"] => Route::SignIn,
            ["signout"] => Route::SignOut,
            ["generate"] => Route::Dashboard,
            ["generate", "create"] => Route::Create,
            ["generate", "interview", "edit", id] => Route::Edit(id.to_string()),
            ["generate", "interview", id, "start"] => Route::Session(id.to_string()),
            ["generate", "interview", id] => Route::PreStart(id.to_string()),
            ["feedback", id] => Route::Feedback(id.to_string()),
            _ => return Err(UnknownRoute(trimmed.to_string())),
        };
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_parse_and_print_back() {
        let cases = [
            ("/", Route::Home),
            ("/signin", Route::SignIn),
            ("/signout", Route::SignOut),
            ("/generate", Route::Dashboard),
            ("/generate/create", Route::Create),
            ("/generate/interview/edit/abc", Route::Edit("abc".to_string())),
            ("/generate/interview/abc", Route::PreStart("abc".to_string())),
            ("/generate/interview/abc/start", Route::Session("abc".to_string())),
            ("/feedback/abc", Route::Feedback("abc".to_string())),
        ];
        for (path, route) in cases {
            assert_eq!(path.parse::<Route>().unwrap(), route, "{}", path);
            assert_eq!(route.to_string(), path);
        }
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert_eq!("/generate/".parse::<Route>().unwrap(), Route::Dashboard);
    }

    #[test]
    fn test_unknown_paths() {
        assert!("/admin".parse::<Route>().is_err());
        assert!("/generate/interview".parse::<Route>().is_err());
        assert!("/feedback".parse::<Route>().is_err());
    }

    #[test]
    fn test_auth_requirements() {
        assert!(!Route::Home.requires_auth());
        assert!(!Route::SignIn.requires_auth());
        assert!(Route::Dashboard.requires_auth());
        assert!(Route::Feedback("x".to_string()).requires_auth());
        assert_eq!(Route::Session("x".to_string()).interview_id(), Some("x"));
        assert_eq!(Route::Create.interview_id(), None);
    }
}
