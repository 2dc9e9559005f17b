#![deny(rust_2018_idioms)]

pub mod app;
pub mod domain;
pub mod form;
pub mod io;

pub use app::{FormOptions, FormSession, SubmitOutcome, TabBadge};
pub use domain::{EnvEntry, EnvKind, FieldKey, FieldKind, FieldPath, FieldPattern, Tab};
pub use form::{
    DebounceController, DebounceDelays, FieldValidator, FormError, FormStore, MemoryStore,
    ValidatorRegistry, validate_env_entries,
};
pub use io::{DocumentFormat, InputScript, ReplayReport, replay};

pub mod prelude {
    pub use super::{
        DebounceController, DebounceDelays, FieldPath, FieldValidator, FormOptions,
        FormSession, FormStore, MemoryStore, SubmitOutcome, ValidatorRegistry,
    };
}
