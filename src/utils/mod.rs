//! Small, pure helpers shared across the crate.

pub mod dict_utils;
pub mod iter_utils;
pub mod string_utils;
pub mod time_utils;

pub use dict_utils::recursive_dict_update;
pub use iter_utils::{all_equal, flatten, symmetrical_iter, unique, Nested, Symmetric};
pub use string_utils::{capitalize, list_to_human, list_to_human_with, split_camel_case};
pub use time_utils::{decode_cf_times, to_datetime, to_datetimes, TimeValue};
