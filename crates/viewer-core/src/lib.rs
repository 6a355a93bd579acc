//! Page layout and viewport model for a continuous-scroll PDF viewer.
//!
//! Pages arrive as pre-rendered bitmaps from a [`PageRenderer`]; this crate
//! decides where they go on a scrollable canvas, which page is current, and
//! how canvas rectangles map back to document space.

pub mod config;
pub mod geometry;
pub mod layout;
pub mod render;
pub mod search;
pub mod selection;
pub mod viewer;

pub use config::{ConfigError, ViewerConfig, POINTS_PER_INCH};
pub use geometry::{DocRect, DocSize, Point, Rect, Size};
pub use layout::{LayoutEntry, PageLayout, DEFAULT_PAGE_GAP, PLACEHOLDER_CANVAS};
pub use render::{PageImage, PageRenderer};
pub use search::SearchHits;
pub use selection::{first_page_text, map_selection, PageClip, SelectionGesture};
pub use viewer::{Viewer, ViewerError, ViewerEvent, ViewportState, ZOOM_EPSILON};
