pub mod prelude;

pub mod categories;
pub mod companies;
pub mod contracts;
pub mod current_locations;
pub mod departments;
pub mod employees;
pub mod equipments;
pub mod movements;
pub mod profiles;
pub mod replace_pairs;
pub mod users;
