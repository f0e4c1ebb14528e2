use http::header::{HeaderValue, COOKIE, SET_COOKIE};
use http::request::Parts;
use leptos::prelude::*;
use leptos_axum::ResponseOptions;
use rag_client::access::{cookie_value, expired_cookie, issue_cookie};
use rag_client::{AccessKey, ApiClient};
use rag_types::{ConsoleError, ConsoleResult, SessionUser};

/// The backend client the console process was started with.
pub fn console_client() -> Result<ApiClient, ServerFnError> {
    use_context::<ApiClient>().ok_or_else(|| ServerFnError::new("console context unavailable"))
}

/// Session cookie sent with the request being served.
pub fn presented_key() -> Option<String> {
    let parts = use_context::<Parts>()?;
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(cookie_value)
        .map(str::to_string)
}

/// The user the caller is logged in as, if their cookie is current.
pub fn caller() -> Result<Option<SessionUser>, ServerFnError> {
    let client = console_client()?;
    Ok(presented_key().and_then(|key| client.guard().user_for(&key)))
}

/// The client, for callers holding the current session cookie only.
pub fn authorized_client() -> Result<ConsoleResult<ApiClient>, ServerFnError> {
    let client = console_client()?;
    let admitted = presented_key().is_some_and(|key| client.guard().user_for(&key).is_some());
    if !admitted {
        return Ok(Err(ConsoleError::Authentication("Not logged in".into())));
    }
    Ok(Ok(client))
}

pub fn set_session_cookie(key: &AccessKey) -> Result<(), ServerFnError> {
    insert_set_cookie(&issue_cookie(key))
}

pub fn clear_session_cookie() -> Result<(), ServerFnError> {
    insert_set_cookie(&expired_cookie())
}

fn insert_set_cookie(cookieValue: &str) -> Result<(), ServerFnError> {
    let responseOptions = use_context::<ResponseOptions>()
        .ok_or_else(|| ServerFnError::new("response context unavailable"))?;
    responseOptions.insert_header(
        SET_COOKIE,
        HeaderValue::from_str(cookieValue)
            .map_err(|e| ServerFnError::new(format!("cookie error: {e}")))?,
    );
    Ok(())
}
