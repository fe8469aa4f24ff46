//! Annotated page viewer with pagination, zoom, and drag-to-pan.
//!
//! The component is stateless: it renders a [`ViewerState`] and turns
//! DOM events into [`ViewerAction`]s for the owner to apply.

use std::sync::Arc;

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::{
    LdChevronLeft, LdChevronRight, LdRotateCcw, LdZoomIn, LdZoomOut,
};
use symscan_pipeline::{
    BackendConfig, Point, ResultsPayload, ViewerAction, ViewerState, class_color,
    resolve_image_url, summarize,
};
use tracing::warn;

/// Props for the [`PageViewer`] component.
#[derive(Props, Clone)]
pub struct PageViewerProps {
    /// Where page images are served from.
    config: BackendConfig,
    /// Payload of the completed run.
    payload: Arc<ResultsPayload>,
    /// Current viewer state.
    state: ViewerState,
    /// Receives every user interaction.
    on_action: EventHandler<ViewerAction>,
}

impl PartialEq for PageViewerProps {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
            && self.config == other.config
            && self.state == other.state
            && self.on_action == other.on_action
    }
}

/// Parse the page-number input; anything non-numeric is ignored.
fn parse_page(value: &str) -> Option<ViewerAction> {
    value.trim().parse::<i64>().ok().map(ViewerAction::SetPage)
}

/// The paginated image viewer with a class legend.
#[component]
#[allow(clippy::too_many_lines)]
pub fn PageViewer(props: PageViewerProps) -> Element {
    let state = props.state;
    let on_action = props.on_action;
    let resolved = resolve_image_url(&props.config, &props.payload, state.current_page);
    let legend: Vec<String> = summarize(&props.payload.detections)
        .into_iter()
        .map(|row| row.class_name)
        .collect();

    let image_style = format!(
        "transform: {}; transition: {}; cursor: {};",
        state.transform_css(),
        state.transition_css(),
        state.cursor().css(),
    );
    let total_pages = state.total_pages;
    let current_page = state.current_page;
    let zoom = state.zoom_percent();

    rsx! {
        div { class: "panel viewer",
            div { class: "panel-header",
                h3 { "Annotated Pages" }
            }

            if !legend.is_empty() {
                ul { class: "legend",
                    for label in legend {
                        li { key: "{label}",
                            span { class: "swatch", style: "background-color: {class_color(&label)}" }
                            "{label}"
                        }
                    }
                }
            }

            div { class: "viewer-toolbar",
                div { class: "pager",
                    button {
                        class: "btn btn-icon",
                        disabled: !state.has_prev(),
                        aria_label: "Previous page",
                        onclick: move |_| on_action.call(ViewerAction::PrevPage),
                        Icon { width: 16, height: 16, icon: LdChevronLeft }
                    }
                    span { "Page" }
                    input {
                        r#type: "number",
                        class: "page-input",
                        min: "1",
                        max: "{total_pages}",
                        value: "{current_page}",
                        onchange: move |evt| {
                            if let Some(action) = parse_page(&evt.value()) {
                                on_action.call(action);
                            }
                        },
                    }
                    span { "of {total_pages}" }
                    button {
                        class: "btn btn-icon",
                        disabled: !state.has_next(),
                        aria_label: "Next page",
                        onclick: move |_| on_action.call(ViewerAction::NextPage),
                        Icon { width: 16, height: 16, icon: LdChevronRight }
                    }
                }

                div { class: "zoom",
                    button {
                        class: "btn btn-icon",
                        disabled: !state.can_zoom_out(),
                        aria_label: "Zoom out",
                        onclick: move |_| on_action.call(ViewerAction::ZoomOut),
                        Icon { width: 16, height: 16, icon: LdZoomOut }
                    }
                    span { class: "zoom-level", "{zoom}%" }
                    button {
                        class: "btn btn-icon",
                        disabled: !state.can_zoom_in(),
                        aria_label: "Zoom in",
                        onclick: move |_| on_action.call(ViewerAction::ZoomIn),
                        Icon { width: 16, height: 16, icon: LdZoomIn }
                    }
                    button {
                        class: "btn btn-icon",
                        aria_label: "Reset zoom",
                        onclick: move |_| on_action.call(ViewerAction::ZoomReset),
                        Icon { width: 16, height: 16, icon: LdRotateCcw }
                    }
                }
            }

            div {
                class: "viewport",
                onmousedown: move |evt: MouseEvent| {
                    evt.prevent_default();
                    let p = evt.client_coordinates();
                    on_action.call(ViewerAction::PointerDown(Point::new(p.x, p.y)));
                },
                onmousemove: move |evt: MouseEvent| {
                    if state.dragging {
                        let p = evt.client_coordinates();
                        on_action.call(ViewerAction::PointerMove(Point::new(p.x, p.y)));
                    }
                },
                onmouseup: move |_| on_action.call(ViewerAction::PointerUp),
                onmouseleave: move |_| on_action.call(ViewerAction::PointerLeave),

                {
                    match resolved.url {
                        Some(url) if !state.image_failed => {
                            let src = url.clone();
                            rsx! {
                                img {
                                    src: "{src}",
                                    alt: "Annotated page {current_page}",
                                    class: "page-image",
                                    draggable: "false",
                                    style: "{image_style}",
                                    onerror: move |_| {
                                        warn!(%url, "page image failed to load");
                                        on_action.call(ViewerAction::ImageFailed);
                                    },
                                }
                            }
                        }
                        _ => rsx! {
                            div { class: "placeholder",
                                p { "No image available for page {current_page}" }
                            }
                        },
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_input_parses_integers() {
        assert_eq!(parse_page(" 3 "), Some(ViewerAction::SetPage(3)));
        assert_eq!(parse_page("-1"), Some(ViewerAction::SetPage(-1)));
        assert_eq!(parse_page("two"), None);
        assert_eq!(parse_page(""), None);
    }
}
