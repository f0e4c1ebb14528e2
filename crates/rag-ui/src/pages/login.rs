use leptos::prelude::*;

#[server]
async fn login(username: String, password: String) -> Result<(), ServerFnError> {
    let client = crate::context::console_client()?;

    let signedIn = client
        .guard()
        .login(&username, &password)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;

    crate::context::set_session_cookie(&signedIn.key)?;
    leptos_axum::redirect("/");

    Ok(())
}

fn failure_message(e: &ServerFnError) -> String {
    match e {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let loginAction = ServerAction::<Login>::new();
    let loginValue = loginAction.value();

    let errorMessage = move || {
        loginValue
            .get()
            .and_then(|result| result.err())
            .map(|e| failure_message(&e))
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <div class="login-header">
                    <div class="login-icon">"R"</div>
                    <h1>"RAG Console"</h1>
                    <p>"Sign in to manage organizations and users"</p>
                </div>

                {move || {
                    errorMessage().map(|message| view! { <div class="login-error">{message}</div> })
                }}

                <ActionForm action=loginAction>
                    <div class="form-group">
                        <label for="username">"Username"</label>
                        <input
                            type="text"
                            id="username"
                            name="username"
                            autocomplete="username"
                            required
                        />
                    </div>
                    <div class="form-group">
                        <label for="password">"Password"</label>
                        <input
                            type="password"
                            id="password"
                            name="password"
                            autocomplete="current-password"
                            required
                        />
                    </div>
                    <button
                        type="submit"
                        class="btn btn-primary"
                        disabled=move || loginAction.pending().get()
                    >
                        {move || if loginAction.pending().get() { "Signing In..." } else { "Sign In" }}
                    </button>
                </ActionForm>
            </div>
        </div>
    }
}
