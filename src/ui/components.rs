use crate::notice::ShownNotice;
use dioxus::prelude::*;

/// One labelled row of controls with a status line.
#[allow(non_snake_case)]
#[component]
pub fn RowButtons(
    #[props(into)] title: String,
    #[props(into)] status: String,
    children: Element,
) -> Element {
    rsx! {
        div {
            class: "row",
            div {
                class: "row-header",
                span { class: "row-title", "{title}" }
                span { class: "row-status", "{status}" }
            }
            div {
                class: "row-buttons",
                {children}
            }
        }
    }
}

#[allow(non_snake_case)]
#[component]
pub fn ActionButton(#[props(into)] label: String, enabled: bool, onpress: EventHandler<()>) -> Element {
    rsx! {
        button {
            class: "action",
            disabled: !enabled,
            onclick: move |_| onpress.call(()),
            "{label}"
        }
    }
}

#[allow(non_snake_case)]
#[component]
pub fn NoticeStack(notices: Vec<ShownNotice>, on_dismiss: EventHandler<u64>) -> Element {
    if notices.is_empty() {
        return rsx! {};
    }

    rsx! {
        div {
            class: "notice-stack",
            for shown in notices {
                div {
                    key: "{shown.id}",
                    class: if shown.notice.is_error() { "notice notice-error" } else { "notice" },
                    onclick: move |_| on_dismiss.call(shown.id),
                    "{shown.notice}"
                }
            }
        }
    }
}
