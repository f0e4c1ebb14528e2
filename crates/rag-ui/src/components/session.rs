use leptos::prelude::*;
use rag_types::{permits, Action, Role, SessionUser};

#[server]
pub async fn get_session() -> Result<Option<SessionUser>, ServerFnError> {
    crate::context::caller()
}

#[server]
pub async fn logout() -> Result<(), ServerFnError> {
    let client = crate::context::console_client()?;
    // Only the holder of the current cookie can end the session.
    if let Some(key) = crate::context::presented_key() {
        client.guard().revoke(&key);
    }
    crate::context::clear_session_cookie()?;
    leptos_axum::redirect("/login");
    Ok(())
}

/// Read-only view of the console session. The guard behind the server
/// functions is the only writer.
#[derive(Clone, Copy)]
pub struct SessionContext {
    user: ReadSignal<Option<SessionUser>>,
}

impl SessionContext {
    pub fn user(&self) -> Option<SessionUser> {
        self.user.get()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.with(|user| user.as_ref().map(|u| u.role))
    }

    pub fn can(&self, action: Action, target: Option<Role>) -> bool {
        permits(self.role(), action, target)
    }

    pub fn assignable_roles(&self) -> &'static [Role] {
        self.role().map(Role::assignable_roles).unwrap_or(&[])
    }
}

pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}

#[component]
pub fn SessionProvider(children: Children) -> impl IntoView {
    #[allow(unused_variables)]
    let (user, setUser) = signal(Option::<SessionUser>::None);

    #[cfg(feature = "hydrate")]
    {
        use wasm_bindgen_futures::spawn_local;

        spawn_local(async move {
            // A failed lookup renders as logged out.
            let current = get_session().await.ok().flatten();
            setUser.set(current);
        });
    }

    provide_context(SessionContext { user });

    children()
}
