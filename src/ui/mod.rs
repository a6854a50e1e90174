mod input;
mod renderer;
mod sensor;
mod state;
pub mod theme;

pub use input::TextInput;
pub use renderer::render;
pub use state::{AppState, Tab};
pub use theme::Theme;
