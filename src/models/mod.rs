mod alert;
mod channel;
mod reading;

pub use alert::*;
pub use channel::*;
pub use reading::*;
