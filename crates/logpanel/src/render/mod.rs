//! Render adapters: stateless transforms from caller data to entry content.
//!
//! | Adapter | Output |
//! |---------|--------|
//! | [`text::join_text`] | plain text with separator and terminator |
//! | [`rst::rst_to_html`] | HTML body fragment from reStructuredText |
//! | [`table::Table::to_html`] | `dataframe`-style HTML table |
//! | [`image::prepare_image`] | colormapped, display-scaled RGBA bitmap |

pub mod image;
pub mod rst;
pub mod table;
pub mod text;

pub use self::image::{
    AUTO_HEIGHT, AUTO_WIDTH, Colormap, ImageData, ImageOptions, Norm, ScalarField, display_size,
    prepare_image, render_image,
};
pub use rst::rst_to_html;
pub use table::{Cell, Table, TableOptions};
pub use text::join_text;
