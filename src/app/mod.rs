mod options;
mod session;
mod status;
mod validation;

pub use options::FormOptions;
pub use session::FormSession;
pub use status::{READY_STATUS, StatusLine};
pub use validation::{SubmitOutcome, TabBadge};
