use leptos::prelude::*;
use rag_types::{Action, ConsoleError, CreateOrgRequest, Organization};

use crate::components::notice::ErrorNotice;
#[allow(unused_imports)]
use crate::components::notice::transport_error;
use crate::components::session::use_session;
#[allow(unused_imports)]
use crate::components::toast::use_toasts;

#[server]
async fn list_orgs() -> Result<Result<Vec<Organization>, ConsoleError>, ServerFnError> {
    let client = match crate::context::authorized_client()? {
        Ok(client) => client,
        Err(e) => return Ok(Err(e)),
    };
    Ok(client.list_orgs().await)
}

#[server]
async fn create_org(
    org_id: String,
    org_name: String,
) -> Result<Result<Organization, ConsoleError>, ServerFnError> {
    let client = match crate::context::authorized_client()? {
        Ok(client) => client,
        Err(e) => return Ok(Err(e)),
    };
    Ok(client.create_org(&org_id, &org_name).await)
}

#[component]
pub fn OrgsPage() -> impl IntoView {
    let session = use_session();
    #[allow(unused_variables)]
    let (orgs, setOrgs) = signal(Option::<Result<Vec<Organization>, ConsoleError>>::None);

    #[cfg(feature = "hydrate")]
    {
        use wasm_bindgen_futures::spawn_local;

        spawn_local(async move {
            let result = list_orgs().await.unwrap_or_else(|e| Err(transport_error(e)));
            setOrgs.set(Some(result));
        });
    }

    let onCreated = Callback::new(move |org: Organization| {
        setOrgs.update(|current| {
            if let Some(Ok(list)) = current {
                list.push(org);
            }
        });
    });

    view! {
        <div class="dashboard-header">
            <h1>"Organizations"</h1>
            <p class="subtitle">"Tenants served by the RAG backend"</p>
        </div>
        {move || {
            session
                .can(Action::CreateOrg, None)
                .then(|| view! { <CreateOrgForm on_created=onCreated /> })
        }}
        {move || match orgs.get() {
            None => {
                view! {
                    <div class="loading">
                        <div class="spinner"></div>
                        "Loading organizations..."
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
                        <p>"No organizations yet"</p>
                    </div>
                }
                    .into_any()
            }
            Some(Ok(list)) => {
                view! {
                    <div class="card">
                        <table>
                            <thead>
                                <tr>
                                    <th>"ID"</th>
                                    <th>"Name"</th>
                                    <th></th>
                                </tr>
                            </thead>
                            <tbody>
                                {list
                                    .into_iter()
                                    .map(|org| {
                                        let usersHref = format!("/orgs/{}/users", org.org_id);
                                        view! {
                                            <tr>
                                                <td><code>{org.org_id}</code></td>
                                                <td>{org.name}</td>
                                                <td>
                                                    <a class="btn btn-ghost btn-sm" href=usersHref>
                                                        "Users"
                                                    </a>
                                                </td>
                                            </tr>
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
fn CreateOrgForm(on_created: Callback<Organization>) -> impl IntoView {
    #[allow(unused_variables)]
    let toasts = use_toasts();
    let (orgId, setOrgId) = signal(String::new());
    let (orgName, setOrgName) = signal(String::new());
    let (error, setError) = signal(Option::<ConsoleError>::None);
    #[allow(unused_variables)]
    let (pending, setPending) = signal(false);

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        // Incomplete input is refused here and never reaches the backend.
        if let Err(e) = CreateOrgRequest::validate(&orgId.get_untracked(), &orgName.get_untracked())
        {
            setError.set(Some(e));
            return;
        }
        setError.set(None);

        #[cfg(feature = "hydrate")]
        {
            use wasm_bindgen_futures::spawn_local;

            setPending.set(true);
            let (id, name) = (orgId.get_untracked(), orgName.get_untracked());
            spawn_local(async move {
                let result = create_org(id, name)
                    .await
                    .unwrap_or_else(|e| Err(transport_error(e)));
                setPending.set(false);
                match result {
                    Ok(org) => {
                        toasts.success(format!("Organization {} created", org.org_id));
                        setOrgId.set(String::new());
                        setOrgName.set(String::new());
                        on_created.run(org);
                    }
                    Err(e) => {
                        toasts.error("Organization was not created");
                        setError.set(Some(e));
                    }
                }
            });
        }
    };

    view! {
        <form class="card form-card" on:submit=submit>
            <div class="card-title">"Create Organization"</div>
            {move || error.get().map(|e| view! { <ErrorNotice error=e /> })}
            <div class="form-row">
                <div class="form-group">
                    <label for="org_id">"Organization ID"</label>
                    <input
                        type="text"
                        id="org_id"
                        placeholder="acme"
                        prop:value=move || orgId.get()
                        on:input=move |ev| setOrgId.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="org_name">"Name"</label>
                    <input
                        type="text"
                        id="org_name"
                        placeholder="Acme Corp"
                        prop:value=move || orgName.get()
                        on:input=move |ev| setOrgName.set(event_target_value(&ev))
                    />
                </div>
            </div>
            <button type="submit" class="btn btn-primary" disabled=move || pending.get()>
                {move || if pending.get() { "Creating..." } else { "Create" }}
            </button>
        </form>
    }
}
