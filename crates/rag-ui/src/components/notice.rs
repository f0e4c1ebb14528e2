use leptos::prelude::*;
use rag_types::ConsoleError;

/// Folds a transport failure into the typed error a view renders.
pub fn transport_error(e: ServerFnError) -> ConsoleError {
    ConsoleError::Network(e.to_string())
}

/// Inline rendering of a failed operation. Authentication failures mean
/// the session is gone, so they point back at the login page.
#[component]
pub fn ErrorNotice(error: ConsoleError) -> impl IntoView {
    let needsLogin = matches!(error, ConsoleError::Authentication(_));
    let messages = error.messages();

    view! {
        <div class="form-error">
            <ul>
                {messages.into_iter().map(|m| view! { <li>{m}</li> }).collect_view()}
            </ul>
            {needsLogin.then(|| view! { <a href="/login">"Sign in again"</a> })}
        </div>
    }
}
