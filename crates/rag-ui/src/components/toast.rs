use leptos::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub level: ToastLevel,
}

/// Handle for raising transient notices after a mutation settles.
#[derive(Clone, Copy)]
pub struct ToastContext {
    toasts: RwSignal<Vec<Toast>>,
    next_id: StoredValue<u64>,
}

impl ToastContext {
    pub fn success(&self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(message.into(), ToastLevel::Error);
    }

    fn push(&self, message: String, level: ToastLevel) {
        let id = self.next_id.get_value();
        self.next_id.set_value(id + 1);

        self.toasts.update(|toasts| {
            toasts.push(Toast { id, message, level });
        });

        let toasts = self.toasts;
        set_timeout(
            move || {
                toasts.update(|list| list.retain(|t| t.id != id));
            },
            std::time::Duration::from_secs(5),
        );
    }
}

fn toast_class(level: ToastLevel) -> &'static str {
    match level {
        ToastLevel::Success => "toast toast-success",
        ToastLevel::Error => "toast toast-error",
    }
}

pub fn use_toasts() -> ToastContext {
    expect_context::<ToastContext>()
}

/// Provides toast context and renders the toast container.
#[component]
pub fn ToastProvider(children: Children) -> impl IntoView {
    let ctx = ToastContext {
        toasts: RwSignal::new(Vec::new()),
        next_id: StoredValue::new(0),
    };
    provide_context(ctx);

    view! {
        {children()}
        <div class="toast-container">
            <For each=move || ctx.toasts.get() key=|toast| toast.id let:toast>
                <div class=toast_class(toast.level)>{toast.message.clone()}</div>
            </For>
        </div>
    }
}
