use log::{debug, info};
use warp::http::Uri;

use crate::api::ChatBackend;
use crate::session;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, PartialEq, Eq)]
pub enum Access {
    Granted(String),
    Redirect,
}

/// Decides whether a request for the messages screen may render. Evaluated
/// once per page request; the token is looked up remotely every time.
pub async fn check_access(backend: &dyn ChatBackend, token: Option<String>) -> Access {
    let Some(token) = session::present(token) else {
        debug!("No session cookie, sending visitor to {}", LOGIN_PATH);
        return Access::Redirect;
    };

    match backend.check_user(&token).await {
        Ok(()) => Access::Granted(token),
        Err(e) => {
            info!("Session token rejected: {}", e);
            Access::Redirect
        }
    }
}

pub fn redirect_to_login() -> impl warp::Reply {
    warp::redirect::temporary(Uri::from_static(LOGIN_PATH))
}
