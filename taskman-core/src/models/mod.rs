mod history;
mod page;
mod project;
mod sprint;
mod status;
mod task;
mod user;

pub use history::*;
pub use page::*;
pub use project::*;
pub use sprint::*;
pub use status::*;
pub use task::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
/// in partial updates.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
