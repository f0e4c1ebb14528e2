use leptos::prelude::*;
use leptos_router::hooks::use_params_map;
use rag_types::{
    Action, ConsoleError, CreateUserRequest, CreatedUser, DeletedUser, OrgUser, Role, UserRoster,
};

use crate::components::notice::ErrorNotice;
#[allow(unused_imports)]
use crate::components::notice::transport_error;
use crate::components::session::use_session;
#[allow(unused_imports)]
use crate::components::toast::use_toasts;

#[server]
async fn list_users(org_id: String) -> Result<Result<Vec<OrgUser>, ConsoleError>, ServerFnError> {
    let client = match crate::context::authorized_client()? {
        Ok(client) => client,
        Err(e) => return Ok(Err(e)),
    };
    Ok(client.list_users(&org_id).await)
}

#[server]
async fn create_user(
    org_id: String,
    username: String,
    password: String,
    role: Role,
) -> Result<Result<CreatedUser, ConsoleError>, ServerFnError> {
    let client = match crate::context::authorized_client()? {
        Ok(client) => client,
        Err(e) => return Ok(Err(e)),
    };
    Ok(client.create_user(&org_id, &username, &password, role).await)
}

#[server]
async fn delete_user(
    org_id: String,
    username: String,
) -> Result<Result<DeletedUser, ConsoleError>, ServerFnError> {
    let client = match crate::context::authorized_client()? {
        Ok(client) => client,
        Err(e) => return Ok(Err(e)),
    };
    Ok(client.delete_user(&org_id, &username).await)
}

#[component]
pub fn UsersPage() -> impl IntoView {
    let params = use_params_map();
    let orgId = Memo::new(move |_| {
        params.with(|p| p.get("org_id").map(|v| v.to_string()).unwrap_or_default())
    });

    let session = use_session();
    #[allow(unused_variables)]
    let toasts = use_toasts();
    #[allow(unused_variables)]
    let (roster, setRoster) = signal(Option::<Result<UserRoster, ConsoleError>>::None);
    #[allow(unused_variables)]
    let (deleting, setDeleting) = signal(Option::<String>::None);

    // Refetch whenever the route points at another organization.
    #[cfg(feature = "hydrate")]
    {
        Effect::new(move |_| {
            use wasm_bindgen_futures::spawn_local;

            let org = orgId.get();
            setRoster.set(None);
            spawn_local(async move {
                let result = list_users(org.clone())
                    .await
                    .unwrap_or_else(|e| Err(transport_error(e)))
                    .map(UserRoster::new);
                // A late reply for an org we already navigated away from is dropped.
                if orgId.get_untracked() == org {
                    setRoster.set(Some(result));
                }
            });
        });
    }

    let onCreated = Callback::new(move |created: CreatedUser| {
        setRoster.update(|current| {
            if let Some(Ok(list)) = current {
                list.upsert(OrgUser {
                    username: created.username,
                    role: created.role,
                });
            }
        });
    });

    let onDelete = Callback::new(move |username: String| {
        #[cfg(feature = "hydrate")]
        {
            use wasm_bindgen_futures::spawn_local;

            setDeleting.set(Some(username.clone()));
            let org = orgId.get_untracked();
            spawn_local(async move {
                let result = delete_user(org, username.clone())
                    .await
                    .unwrap_or_else(|e| Err(transport_error(e)));
                setDeleting.set(None);
                match result {
                    Ok(_) => {
                        setRoster.update(|current| {
                            if let Some(Ok(list)) = current {
                                list.remove(&username);
                            }
                        });
                        toasts.success(format!("User {username} deleted"));
                    }
                    Err(e) => toasts.error(e.to_string()),
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = username;
        }
    });

    view! {
        <div class="dashboard-header">
            <h1>{move || format!("Users in {}", orgId.get())}</h1>
            <p class="subtitle">
                <a href="/">"\u{2190} Organizations"</a>
            </p>
        </div>
        {move || {
            session
                .can(Action::CreateUser, None)
                .then(|| view! { <CreateUserForm org_id=orgId on_created=onCreated /> })
        }}
        {move || match roster.get() {
            None => {
                view! {
                    <div class="loading">
                        <div class="spinner"></div>
                        "Loading users..."
                    </div>
                }
                    .into_any()
            }
            Some(Err(e)) => {
                view! {
                    <div class="card">
                        <ErrorNotice error=e />
                    </div>
                }
                    .into_any()
            }
            Some(Ok(list)) if list.is_empty() => {
                view! {
                    <div class="card">
                        <p>"No users in this organization"</p>
                    </div>
                }
                    .into_any()
            }
            Some(Ok(list)) => {
                let canDelete = session.can(Action::DeleteUser, None);
                let current = deleting.get();
                view! {
                    <div class="card">
                        <table>
                            <thead>
                                <tr>
                                    <th>"Username"</th>
                                    <th>"Role"</th>
                                    <th></th>
                                </tr>
                            </thead>
                            <tbody>
                                {list
                                    .users()
                                    .iter()
                                    .cloned()
                                    .map(|user| {
                                        let isDeleting = current.as_deref() == Some(user.username.as_str());
                                        view! {
                                            <UserRow
                                                user=user
                                                can_delete=canDelete
                                                is_deleting=isDeleting
                                                on_delete=onDelete
                                            />
                                        }
                                    })
                                    .collect_view()}
                            </tbody>
                        </table>
                    </div>
                }
                    .into_any()
            }
        }}
    }
}

#[component]
fn UserRow(
    user: OrgUser,
    can_delete: bool,
    is_deleting: bool,
    on_delete: Callback<String>,
) -> impl IntoView {
    let username = user.username.clone();
    let roleClass = format!("role-badge role-{}", user.role.as_str());

    view! {
        <tr>
            <td>{user.username}</td>
            <td>
                <span class=roleClass>{user.role.label()}</span>
            </td>
            <td>
                {can_delete
                    .then(|| {
                        view! {
                            <button
                                class="btn btn-danger btn-sm"
                                disabled=is_deleting
                                on:click=move |_| on_delete.run(username.clone())
                            >
                                {if is_deleting { "Deleting..." } else { "Delete" }}
                            </button>
                        }
                    })}
            </td>
        </tr>
    }
}

#[component]
fn CreateUserForm(org_id: Memo<String>, on_created: Callback<CreatedUser>) -> impl IntoView {
    let session = use_session();
    #[allow(unused_variables)]
    let toasts = use_toasts();
    let (username, setUsername) = signal(String::new());
    let (password, setPassword) = signal(String::new());
    let (role, setRole) = signal(Role::Viewer);
    let (error, setError) = signal(Option::<ConsoleError>::None);
    #[allow(unused_variables)]
    let (pending, setPending) = signal(false);

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let request = match CreateUserRequest::validate(
            &username.get_untracked(),
            &password.get_untracked(),
            role.get_untracked(),
            session.role(),
        ) {
            Ok(r) => r,
            Err(e) => {
                setError.set(Some(e));
                return;
            }
        };
        setError.set(None);

        #[cfg(feature = "hydrate")]
        {
            use wasm_bindgen_futures::spawn_local;

            setPending.set(true);
            let org = org_id.get_untracked();
            spawn_local(async move {
                let result = create_user(org, request.username, request.password, request.role)
                    .await
                    .unwrap_or_else(|e| Err(transport_error(e)));
                setPending.set(false);
                match result {
                    Ok(created) => {
                        toasts.success(format!("User {} created", created.username));
                        setUsername.set(String::new());
                        setPassword.set(String::new());
                        on_created.run(created);
                    }
                    Err(e) => setError.set(Some(e)),
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = request;
        }
    };

    view! {
        <form class="card form-card" on:submit=submit>
            <div class="card-title">"Add User"</div>
            {move || error.get().map(|e| view! { <ErrorNotice error=e /> })}
            <div class="form-row">
                <div class="form-group">
                    <label for="new_username">"Username"</label>
                    <input
                        type="text"
                        id="new_username"
                        prop:value=move || username.get()
                        on:input=move |ev| setUsername.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="new_password">"Password"</label>
                    <input
                        type="password"
                        id="new_password"
                        autocomplete="new-password"
                        prop:value=move || password.get()
                        on:input=move |ev| setPassword.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="new_role">"Role"</label>
                    <select
                        id="new_role"
                        on:change=move |ev| {
                            if let Ok(selected) = event_target_value(&ev).parse::<Role>() {
                                setRole.set(selected);
                            }
                        }
                    >
                        {move || {
                            session
                                .assignable_roles()
                                .iter()
                                .copied()
                                .map(|r| {
                                    view! {
                                        <option value=r.as_str() selected=move || role.get() == r>
                                            {r.label()}
                                        </option>
                                    }
                                })
                                .collect_view()
                        }}
                    </select>
                </div>
            </div>
            <button type="submit" class="btn btn-primary" disabled=move || pending.get()>
                {move || if pending.get() { "Adding..." } else { "Add User" }}
            </button>
        </form>
    }
}
