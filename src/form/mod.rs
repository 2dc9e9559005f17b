mod array;
mod clock;
mod debounce;
mod error;
mod store;
mod validator;

pub use array::{ArrayStatus, UniqueEntries, first_duplicate, validate_env_entries};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{
    Commit, CommitReason, DEFAULT_ARRAY_DELAY, DEFAULT_COMPLEX_DELAY, DEFAULT_TEXT_DELAY,
    DebounceController, DebounceDelays, PendingCommit, TimerId,
};
pub use error::FormError;
pub use store::{FormStore, MemoryStore};
pub use validator::{EnvName, FieldValidator, REQUIRED_MESSAGE, Required, ValidatorRegistry};
