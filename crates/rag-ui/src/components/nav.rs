use leptos::prelude::*;

use crate::components::session::{use_session, Logout};

#[component]
pub fn Nav() -> impl IntoView {
    let session = use_session();
    let logoutAction = ServerAction::<Logout>::new();

    view! {
        <nav class="nav-sidebar">
            <div class="nav-brand">
                <div class="brand-icon">"R"</div>
                <span class="brand-text">"RAG Console"</span>
            </div>
            <ul class="nav-links">
                <li class="nav-item">
                    <a href="/">
                        <span class="nav-icon">"\u{25A3}"</span>
                        <span>"Organizations"</span>
                    </a>
                </li>
            </ul>
            {move || {
                session
                    .user()
                    .map(|user| {
                        let badgeClass = format!("role-badge role-{}", user.role.as_str());
                        view! {
                            <div class="nav-session">
                                <span class="session-user">{user.username}</span>
                                <span class=badgeClass>{user.role.label()}</span>
                            </div>
                        }
                    })
            }}
            <ActionForm action=logoutAction>
                <button type="submit" class="btn btn-ghost btn-sm">
                    "Sign Out"
                </button>
            </ActionForm>
        </nav>
    }
}
