pub mod business_days;

pub use business_days::{
    closest_weekday, is_weekday, last_weekday_of_month, prev_month, prev_weekday,
};
