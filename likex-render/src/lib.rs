pub mod form;
pub mod text;

pub use form::{FormRenderer, FormSurface, Widget, WidgetAction, WidgetRect};
pub use text::rasterize_text;
