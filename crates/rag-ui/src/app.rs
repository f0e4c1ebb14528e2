use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::{
    components::{Route, Router, Routes},
    ParamSegment, StaticSegment,
};

use crate::components::nav::Nav;
use crate::components::session::SessionProvider;
use crate::components::toast::ToastProvider;
use crate::pages::login::LoginPage;
use crate::pages::orgs::OrgsPage;
use crate::pages::users::UsersPage;

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <link rel="icon" href="/favicon.svg" type="image/svg+xml" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Stylesheet id="leptos" href="/pkg/rag-console.css" />
        <Title text="RAG Console" />
        <ToastProvider>
            <Router>
                <Routes fallback=|| view! { <p>"Page not found."</p> }.into_any()>
                    <Route path=StaticSegment("login") view=LoginPage />
                    <Route path=StaticSegment("") view=OrgsView />
                    <Route
                        path=(StaticSegment("orgs"), ParamSegment("org_id"), StaticSegment("users"))
                        view=UsersView
                    />
                </Routes>
            </Router>
        </ToastProvider>
    }
}

#[component]
fn OrgsView() -> impl IntoView {
    // Mounted per route so the session is re-read after login and logout.
    view! {
        <SessionProvider>
            <div class="app-layout">
                <Nav />
                <main class="main-content">
                    <OrgsPage />
                </main>
            </div>
        </SessionProvider>
    }
}

#[component]
fn UsersView() -> impl IntoView {
    // Mounted per route so the session is re-read after login and logout.
    view! {
        <SessionProvider>
            <div class="app-layout">
                <Nav />
                <main class="main-content">
                    <UsersPage />
                </main>
            </div>
        </SessionProvider>
    }
}
