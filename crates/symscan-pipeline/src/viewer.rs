//! Paginated result viewer with zoom and drag-to-pan.
//!
//! [`ViewerState`] is a plain value updated by a pure reducer,
//! [`ViewerState::apply`]. UI event handlers translate DOM events into
//! [`ViewerAction`]s and store the returned state; nothing else mutates
//! it.
//!
//! The rendered transform scales about the viewport center and then
//! translates by `pan_offset / scale`, so the translation is in
//! pre-scale space and the image tracks the cursor 1:1 at any zoom.

use std::ops::Sub;

use crate::config::BackendConfig;
use crate::types::ResultsPayload;

/// Smallest zoom factor.
pub const MIN_SCALE: f64 = 0.5;
/// Largest zoom factor.
pub const MAX_SCALE: f64 = 3.0;
/// Zoom change per zoom-in / zoom-out step.
pub const ZOOM_STEP: f64 = 0.25;

/// A 2-D position or offset in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Cursor shown over the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Not zoomed in; panning is disabled.
    Default,
    /// Zoomed in, ready to drag.
    Grab,
    /// Drag in progress.
    Grabbing,
}

impl Cursor {
    /// CSS `cursor` value.
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
        }
    }
}

/// Input to the viewer reducer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    /// Jump to a page. Out-of-range values clamp.
    SetPage(i64),
    /// Advance one page, stopping at the last.
    NextPage,
    /// Go back one page, stopping at the first.
    PrevPage,
    /// Increase zoom by [`ZOOM_STEP`].
    ZoomIn,
    /// Decrease zoom by [`ZOOM_STEP`].
    ZoomOut,
    /// Return to 100% with no pan.
    ZoomReset,
    /// Pointer pressed at a client position.
    PointerDown(Point),
    /// Pointer moved to a client position.
    PointerMove(Point),
    /// Pointer released.
    PointerUp,
    /// Pointer left the viewport.
    PointerLeave,
    /// A new payload arrived with this many pages.
    Load(usize),
    /// The current image failed to load.
    ImageFailed,
    /// Back to the initial state, as when a new upload begins.
    Reset,
}

/// Pagination, zoom, and pan state of the viewer.
///
/// `1 <= current_page <= total_pages` and
/// `MIN_SCALE <= scale <= MAX_SCALE` hold after every transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    /// 1-based page being shown.
    pub current_page: usize,
    /// Number of pages available (at least 1).
    pub total_pages: usize,
    /// Zoom factor.
    pub scale: f64,
    /// Accumulated pan, meaningful only while `scale > 1`.
    pub pan_offset: Point,
    /// Whether a drag is in progress.
    pub dragging: bool,
    /// Pointer position minus pan offset at drag start.
    pub drag_anchor: Point,
    /// The current image failed to load; show the placeholder.
    pub image_failed: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            scale: 1.0,
            pan_offset: Point::ZERO,
            dragging: false,
            drag_anchor: Point::ZERO,
            image_failed: false,
        }
    }
}

impl ViewerState {
    /// Apply one action and return the resulting state.
    #[must_use]
    pub fn apply(self, action: ViewerAction) -> Self {
        match action {
            ViewerAction::SetPage(page) => self.with_page(page),
            ViewerAction::NextPage => self.with_page(page_number(self.current_page) + 1),
            ViewerAction::PrevPage => self.with_page(page_number(self.current_page) - 1),
            ViewerAction::ZoomIn => Self {
                scale: (self.scale + ZOOM_STEP).min(MAX_SCALE),
                ..self
            },
            ViewerAction::ZoomOut => Self {
                scale: (self.scale - ZOOM_STEP).max(MIN_SCALE),
                ..self
            },
            ViewerAction::ZoomReset => Self {
                scale: 1.0,
                pan_offset: Point::ZERO,
                ..self
            },
            ViewerAction::PointerDown(pointer) if self.can_pan() => Self {
                dragging: true,
                drag_anchor: pointer - self.pan_offset,
                ..self
            },
            ViewerAction::PointerMove(pointer) if self.dragging && self.can_pan() => Self {
                pan_offset: pointer - self.drag_anchor,
                ..self
            },
            ViewerAction::PointerDown(_) | ViewerAction::PointerMove(_) => self,
            ViewerAction::PointerUp | ViewerAction::PointerLeave => Self {
                dragging: false,
                ..self
            },
            ViewerAction::Load(total_pages) => {
                let total_pages = total_pages.max(1);
                Self {
                    total_pages,
                    current_page: self.current_page.clamp(1, total_pages),
                    image_failed: false,
                    ..self
                }
            }
            ViewerAction::ImageFailed => Self {
                image_failed: true,
                ..self
            },
            ViewerAction::Reset => Self::default(),
        }
    }

    /// Clamp `page` into range; clears a previous image failure when
    /// the page actually changes.
    fn with_page(self, page: i64) -> Self {
        let last = page_number(self.total_pages).max(1);
        let clamped = usize::try_from(page.clamp(1, last)).unwrap_or(1);
        Self {
            current_page: clamped,
            image_failed: self.image_failed && clamped == self.current_page,
            ..self
        }
    }

    /// Dragging only pans while zoomed past 100%.
    fn can_pan(&self) -> bool {
        self.scale > 1.0
    }

    /// CSS `transform` for the image element.
    #[must_use]
    pub fn transform_css(&self) -> String {
        let tx = self.pan_offset.x / self.scale;
        let ty = self.pan_offset.y / self.scale;
        format!("scale({}) translate({tx}px, {ty}px)", self.scale)
    }

    /// CSS `transition` for the image element; disabled mid-drag so the
    /// image follows the pointer without lag.
    #[must_use]
    pub const fn transition_css(&self) -> &'static str {
        if self.dragging {
            "none"
        } else {
            "transform 0.2s"
        }
    }

    /// Cursor to show over the viewport.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        match (self.can_pan(), self.dragging) {
            (false, _) => Cursor::Default,
            (true, false) => Cursor::Grab,
            (true, true) => Cursor::Grabbing,
        }
    }

    /// Zoom as a rounded percentage, e.g. `125`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }

    /// Whether another zoom-in step would change the scale.
    #[must_use]
    pub fn can_zoom_in(&self) -> bool {
        self.scale < MAX_SCALE
    }

    /// Whether another zoom-out step would change the scale.
    #[must_use]
    pub fn can_zoom_out(&self) -> bool {
        self.scale > MIN_SCALE
    }

    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

fn page_number(page: usize) -> i64 {
    i64::try_from(page).unwrap_or(i64::MAX)
}

/// The image to show for a page, and the page count it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Absolute image URL, or `None` to show the placeholder.
    pub url: Option<String>,
    /// Number of pages in the payload (1 when only a preview exists).
    pub total_pages: usize,
}

/// Number of viewable pages in `payload`.
///
/// Per-page images take precedence; a lone preview counts as one page.
/// With neither, the viewer still has one (placeholder) page.
#[must_use]
pub fn page_count(payload: &ResultsPayload) -> usize {
    match payload.pages.as_deref() {
        Some(pages) if !pages.is_empty() => pages.len(),
        _ => 1,
    }
}

/// Resolve the image URL for `current_page` of `payload`.
///
/// Per-page images are matched by their `page` field; a missing match
/// yields no image. Without per-page images, the preview is used.
#[must_use]
pub fn resolve_image_url(
    config: &BackendConfig,
    payload: &ResultsPayload,
    current_page: usize,
) -> ResolvedImage {
    if let Some(pages) = payload.pages.as_deref().filter(|p| !p.is_empty()) {
        let url = pages
            .iter()
            .find(|p| usize::try_from(p.page).is_ok_and(|n| n == current_page))
            .map(|p| config.asset_url(&p.url));
        return ResolvedImage {
            url,
            total_pages: pages.len(),
        };
    }

    ResolvedImage {
        url: payload.preview.as_deref().map(|p| config.asset_url(p)),
        total_pages: 1,
    }
}
